//! Core types: points, the simulation domain, and collocation points.

use core::ops::{Add, Div, Mul, Neg, Sub};

use crate::error::VesicleCoreError;

/// A 3D point or vector.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point3 {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Point3 {
    /// The origin.
    pub const ORIGIN: Point3 = Point3::splat(0.0);

    /// Create a new Point3.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Create a Point3 with all components set to the same value.
    #[inline]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// Convert to an array.
    #[inline]
    pub const fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Component by axis index (0 = x, 1 = y, anything else = z).
    #[inline]
    pub const fn axis(&self, axis: usize) -> f32 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Dot product.
    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Squared length of the vector.
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    /// Length of the vector.
    #[inline]
    pub fn length(self) -> f32 {
        libm::sqrtf(self.length_squared())
    }

    /// Squared distance to another point.
    #[inline]
    pub fn distance_squared(self, other: Self) -> f32 {
        (self - other).length_squared()
    }

    /// True if every component is finite.
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f32; 3]> for Point3 {
    #[inline]
    fn from(arr: [f32; 3]) -> Self {
        Self::new(arr[0], arr[1], arr[2])
    }
}

impl From<Point3> for [f32; 3] {
    #[inline]
    fn from(p: Point3) -> Self {
        p.as_array()
    }
}

impl Add for Point3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Point3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f32> for Point3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Div<f32> for Point3 {
    type Output = Self;

    #[inline]
    fn div(self, scalar: f32) -> Self {
        Self::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl Neg for Point3 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Axis-aligned simulation box over which the phase field is integrated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    /// Lower corner.
    pub min: Point3,
    /// Upper corner.
    pub max: Point3,
}

impl Domain {
    /// Create a domain from its two corners.
    #[inline]
    pub const fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// Cube `[lo, hi]³`.
    #[inline]
    pub const fn cube(lo: f32, hi: f32) -> Self {
        Self::new(Point3::splat(lo), Point3::splat(hi))
    }

    /// Edge lengths along each axis.
    #[inline]
    pub fn extent(&self) -> Point3 {
        self.max - self.min
    }

    /// Volume of the box. This is the normalization of a uniform
    /// Monte-Carlo estimate.
    #[inline]
    pub fn volume(&self) -> f32 {
        let e = self.extent();
        e.x * e.y * e.z
    }

    /// Center of the box.
    #[inline]
    pub fn center(&self) -> Point3 {
        (self.min + self.max) * 0.5
    }

    /// Check that every axis has a positive, finite extent.
    pub fn validate(&self) -> Result<(), VesicleCoreError> {
        for axis in 0..3 {
            let (lo, hi) = (self.min.axis(axis), self.max.axis(axis));
            if !(lo.is_finite() && hi.is_finite() && hi > lo) {
                return Err(VesicleCoreError::InvalidDomain {
                    axis: axis as u8,
                    min: lo,
                    max: hi,
                });
            }
        }
        Ok(())
    }

    /// True if the point lies inside or on the box.
    #[inline]
    pub fn contains(&self, p: Point3) -> bool {
        (0..3).all(|a| p.axis(a) >= self.min.axis(a) && p.axis(a) <= self.max.axis(a))
    }

    /// True if the point lies on one of the faces of the box.
    ///
    /// Tolerance is relative to the extent of each axis.
    pub fn is_on_boundary(&self, p: Point3) -> bool {
        let e = self.extent();
        (0..3).any(|a| {
            let tol = 1e-6 * libm::fabsf(e.axis(a));
            libm::fabsf(p.axis(a) - self.min.axis(a)) <= tol
                || libm::fabsf(p.axis(a) - self.max.axis(a)) <= tol
        })
    }

    /// Tag a point as boundary or interior.
    #[inline]
    pub fn tag(&self, p: Point3) -> PointTag {
        if self.is_on_boundary(p) {
            PointTag::Boundary
        } else {
            PointTag::Interior
        }
    }
}

impl Default for Domain {
    /// The `[-3, 3]³` box of the reference setup.
    fn default() -> Self {
        Self::cube(-3.0, 3.0)
    }
}

/// Location class of a collocation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointTag {
    /// Strictly inside the domain box.
    Interior,
    /// On a face of the domain box.
    Boundary,
}

/// A spatial sample at which the field and its derivatives are evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollocationPoint {
    /// Position in world units.
    pub position: Point3,
    /// Interior or boundary.
    pub tag: PointTag,
}

impl CollocationPoint {
    /// Create a collocation point, tagging it against the domain.
    #[inline]
    pub fn in_domain(position: Point3, domain: &Domain) -> Self {
        Self {
            position,
            tag: domain.tag(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_arithmetic() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(0.5, -1.0, 2.0);

        assert_eq!(a + b, Point3::new(1.5, 1.0, 5.0));
        assert_eq!(a - b, Point3::new(0.5, 3.0, 1.0));
        assert_eq!(a * 2.0, Point3::new(2.0, 4.0, 6.0));
        assert_eq!(-a, Point3::new(-1.0, -2.0, -3.0));
        assert!((a.dot(b) - 4.5).abs() < 1e-6);
        assert!((Point3::new(3.0, 4.0, 0.0).length() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_domain_volume_and_center() {
        let domain = Domain::cube(-3.0, 3.0);
        assert!((domain.volume() - 216.0).abs() < 1e-4);
        assert_eq!(domain.center(), Point3::ORIGIN);
        assert!(domain.validate().is_ok());
    }

    #[test]
    fn test_domain_validation() {
        let inverted = Domain::new(Point3::new(0.0, 1.0, 0.0), Point3::new(1.0, 0.0, 1.0));
        assert_eq!(
            inverted.validate(),
            Err(VesicleCoreError::InvalidDomain {
                axis: 1,
                min: 1.0,
                max: 0.0
            })
        );

        let flat = Domain::new(Point3::splat(0.0), Point3::new(1.0, 1.0, 0.0));
        assert!(flat.validate().is_err());
    }

    #[test]
    fn test_boundary_tagging() {
        let domain = Domain::cube(-1.0, 1.0);

        assert_eq!(domain.tag(Point3::new(0.0, 0.0, 0.0)), PointTag::Interior);
        assert_eq!(domain.tag(Point3::new(-1.0, 0.2, 0.3)), PointTag::Boundary);
        assert_eq!(domain.tag(Point3::new(0.5, 0.5, 1.0)), PointTag::Boundary);
        assert!(domain.contains(Point3::new(1.0, 1.0, 1.0)));
        assert!(!domain.contains(Point3::new(1.1, 0.0, 0.0)));
    }
}
