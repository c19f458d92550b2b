//! Monte-Carlo quadrature over the domain box.
//!
//! Sample points are uniform over the box (`p(r) = 1`), so an integral is the
//! sample mean times the box volume.

use crate::error::VesicleCoreError;
use crate::types::Point3;

/// Estimate `∫ f dV` from samples of `f` drawn uniformly over a box of volume
/// `domain_volume`.
///
/// An empty sample set integrates to zero.
pub fn monte_carlo_integral(values: &[f32], domain_volume: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    // f64 accumulator: grids reach millions of points.
    let sum: f64 = values.iter().map(|&v| v as f64).sum();
    (sum / values.len() as f64 * domain_volume as f64) as f32
}

/// `Σ w_i p_i / Σ w_i`.
///
/// Returns `None` when the weights sum to zero.
pub fn weighted_centroid(
    weights: &[f32],
    points: &[Point3],
) -> Result<Option<Point3>, VesicleCoreError> {
    if weights.len() != points.len() {
        return Err(VesicleCoreError::LengthMismatch {
            expected: points.len(),
            got: weights.len(),
        });
    }

    let mut total = 0.0f64;
    let mut moment = [0.0f64; 3];
    for (&w, p) in weights.iter().zip(points) {
        total += w as f64;
        moment[0] += w as f64 * p.x as f64;
        moment[1] += w as f64 * p.y as f64;
        moment[2] += w as f64 * p.z as f64;
    }

    if total == 0.0 {
        return Ok(None);
    }
    Ok(Some(Point3::new(
        (moment[0] / total) as f32,
        (moment[1] / total) as f32,
        (moment[2] / total) as f32,
    )))
}
