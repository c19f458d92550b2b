//! Global constraints on the vesicle shape.
//!
//! A constraint pins one integral quantity of the phase field (surface area,
//! enclosed volume, or center of mass) to a target. The solver enforces it as
//! a quadratic penalty; this module only keeps the targets and the latest
//! measured values.

use crate::density::reduced_volume;
use crate::types::Point3;

/// Which global quantity a constraint acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintKind {
    /// Membrane area `A = ∫ a(r) dV`.
    SurfaceArea,
    /// Enclosed volume `V = ∫ v(r) dV`.
    Volume,
    /// Centroid of the inside region.
    CenterOfMass,
}

impl ConstraintKind {
    /// All kinds, in reporting order.
    pub const ALL: [ConstraintKind; 3] = [
        ConstraintKind::SurfaceArea,
        ConstraintKind::Volume,
        ConstraintKind::CenterOfMass,
    ];

    /// Short name used in logs and checkpoint headers.
    pub const fn label(&self) -> &'static str {
        match self {
            ConstraintKind::SurfaceArea => "area",
            ConstraintKind::Volume => "volume",
            ConstraintKind::CenterOfMass => "center_of_mass",
        }
    }
}

/// Target or measured value of a constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintValue {
    /// Area or volume.
    Scalar(f32),
    /// Center of mass.
    Vector(Point3),
}

impl ConstraintValue {
    /// Squared distance between two values of the same shape.
    ///
    /// A scalar compared against a vector yields `None`.
    pub fn distance_squared(&self, other: &ConstraintValue) -> Option<f32> {
        match (self, other) {
            (ConstraintValue::Scalar(a), ConstraintValue::Scalar(b)) => Some((a - b) * (a - b)),
            (ConstraintValue::Vector(a), ConstraintValue::Vector(b)) => {
                Some(a.distance_squared(*b))
            }
            _ => None,
        }
    }

    /// The scalar payload, if any.
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            ConstraintValue::Scalar(v) => Some(*v),
            ConstraintValue::Vector(_) => None,
        }
    }

    /// The vector payload, if any.
    pub fn as_vector(&self) -> Option<Point3> {
        match self {
            ConstraintValue::Vector(v) => Some(*v),
            ConstraintValue::Scalar(_) => None,
        }
    }
}

/// A target for one global quantity, plus its last measured value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    /// Constrained quantity.
    pub kind: ConstraintKind,
    /// Value the penalty pulls towards.
    pub target: ConstraintValue,
    /// Last measured value, `None` before the first evaluation.
    pub current: Option<ConstraintValue>,
}

impl Constraint {
    /// Surface area constraint.
    pub const fn area(target: f32) -> Self {
        Self {
            kind: ConstraintKind::SurfaceArea,
            target: ConstraintValue::Scalar(target),
            current: None,
        }
    }

    /// Enclosed volume constraint.
    pub const fn volume(target: f32) -> Self {
        Self {
            kind: ConstraintKind::Volume,
            target: ConstraintValue::Scalar(target),
            current: None,
        }
    }

    /// Center-of-mass constraint.
    pub const fn center_of_mass(target: Point3) -> Self {
        Self {
            kind: ConstraintKind::CenterOfMass,
            target: ConstraintValue::Vector(target),
            current: None,
        }
    }

    /// Record a new measurement.
    pub fn update(&mut self, value: ConstraintValue) {
        self.current = Some(value);
    }

    /// `|current - target|²`, `None` before the first measurement.
    pub fn deviation_squared(&self) -> Option<f32> {
        self.current
            .as_ref()
            .and_then(|c| c.distance_squared(&self.target))
    }

    /// Deviation relative to the target magnitude, for scalar constraints.
    pub fn relative_deviation(&self) -> Option<f32> {
        let target = self.target.as_scalar()?;
        let current = self.current?.as_scalar()?;
        if target == 0.0 {
            return None;
        }
        Some(libm::fabsf(current - target) / libm::fabsf(target))
    }
}

/// Integral quantities measured from one evaluation of the phase field.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Measurements {
    /// Bending energy `E_b`.
    pub bending_energy: f32,
    /// Membrane area.
    pub area: f32,
    /// Enclosed volume.
    pub volume: f32,
    /// Centroid of the inside region.
    pub center_of_mass: Point3,
}

impl Measurements {
    /// Measured value of a constrained quantity.
    pub fn value_of(&self, kind: ConstraintKind) -> ConstraintValue {
        match kind {
            ConstraintKind::SurfaceArea => ConstraintValue::Scalar(self.area),
            ConstraintKind::Volume => ConstraintValue::Scalar(self.volume),
            ConstraintKind::CenterOfMass => ConstraintValue::Vector(self.center_of_mass),
        }
    }

    /// Reduced volume of the measured shape.
    pub fn reduced_volume(&self) -> f32 {
        reduced_volume(self.area, self.volume)
    }

    /// True if every quantity is finite.
    pub fn is_finite(&self) -> bool {
        self.bending_energy.is_finite()
            && self.area.is_finite()
            && self.volume.is_finite()
            && self.center_of_mass.is_finite()
    }
}

/// Up to one constraint per [`ConstraintKind`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ConstraintSet {
    area: Option<Constraint>,
    volume: Option<Constraint>,
    center_of_mass: Option<Constraint>,
}

impl ConstraintSet {
    /// A set with no active constraint.
    pub const fn new() -> Self {
        Self {
            area: None,
            volume: None,
            center_of_mass: None,
        }
    }

    /// Add or replace the constraint of the same kind.
    pub fn with(mut self, constraint: Constraint) -> Self {
        self.insert(constraint);
        self
    }

    /// Add or replace the constraint of the same kind.
    pub fn insert(&mut self, constraint: Constraint) {
        *self.slot_mut(constraint.kind) = Some(constraint);
    }

    /// Drop the constraint of the given kind.
    pub fn remove(&mut self, kind: ConstraintKind) -> Option<Constraint> {
        self.slot_mut(kind).take()
    }

    /// Constraint of the given kind, if active.
    pub fn get(&self, kind: ConstraintKind) -> Option<&Constraint> {
        match kind {
            ConstraintKind::SurfaceArea => self.area.as_ref(),
            ConstraintKind::Volume => self.volume.as_ref(),
            ConstraintKind::CenterOfMass => self.center_of_mass.as_ref(),
        }
    }

    /// Target of the given kind, if active.
    pub fn target(&self, kind: ConstraintKind) -> Option<ConstraintValue> {
        self.get(kind).map(|c| c.target)
    }

    /// Active constraints, in [`ConstraintKind::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        [
            self.area.as_ref(),
            self.volume.as_ref(),
            self.center_of_mass.as_ref(),
        ]
        .into_iter()
        .flatten()
    }

    /// Number of active constraints.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// True if no constraint is active.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record measured values on every active constraint.
    pub fn update_current(&mut self, measurements: &Measurements) {
        for kind in ConstraintKind::ALL {
            if let Some(c) = self.slot_mut(kind).as_mut() {
                c.update(measurements.value_of(kind));
            }
        }
    }

    fn slot_mut(&mut self, kind: ConstraintKind) -> &mut Option<Constraint> {
        match kind {
            ConstraintKind::SurfaceArea => &mut self.area,
            ConstraintKind::Volume => &mut self.volume,
            ConstraintKind::CenterOfMass => &mut self.center_of_mass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_distance() {
        let a = ConstraintValue::Scalar(3.0);
        let b = ConstraintValue::Scalar(1.0);
        assert_eq!(a.distance_squared(&b), Some(4.0));

        let u = ConstraintValue::Vector(Point3::new(1.0, 0.0, 0.0));
        let v = ConstraintValue::Vector(Point3::new(0.0, 2.0, 0.0));
        assert_eq!(u.distance_squared(&v), Some(5.0));
        assert_eq!(a.distance_squared(&u), None);
    }

    #[test]
    fn test_constraint_deviation() {
        let mut c = Constraint::volume(4.0);
        assert_eq!(c.deviation_squared(), None);

        c.update(ConstraintValue::Scalar(5.0));
        assert_eq!(c.deviation_squared(), Some(1.0));
        assert!((c.relative_deviation().unwrap() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_set_replaces_same_kind() {
        let set = ConstraintSet::new()
            .with(Constraint::area(1.0))
            .with(Constraint::area(2.0))
            .with(Constraint::volume(3.0));

        assert_eq!(set.len(), 2);
        assert_eq!(
            set.target(ConstraintKind::SurfaceArea),
            Some(ConstraintValue::Scalar(2.0))
        );
        assert_eq!(set.target(ConstraintKind::CenterOfMass), None);
    }

    #[test]
    fn test_update_current_only_touches_active() {
        let mut set = ConstraintSet::new().with(Constraint::center_of_mass(Point3::ORIGIN));
        let m = Measurements {
            bending_energy: 25.0,
            area: 12.0,
            volume: 4.0,
            center_of_mass: Point3::new(0.1, 0.0, 0.0),
        };
        set.update_current(&m);

        let com = set.get(ConstraintKind::CenterOfMass).unwrap();
        assert_eq!(com.current, Some(ConstraintValue::Vector(m.center_of_mass)));
        assert!(set.get(ConstraintKind::Volume).is_none());
        assert!(set.remove(ConstraintKind::CenterOfMass).is_some());
        assert!(set.is_empty());
    }
}
