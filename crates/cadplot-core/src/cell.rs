use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Point, PrimitiveId};

/// Counter-clockwise rotation restricted to right angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

    /// Map an angle in degrees onto a right-angle rotation.
    ///
    /// Angles are taken modulo 360, so `-90.0` and `450.0` are accepted.
    /// Anything that is not a multiple of 90 yields `None`.
    pub fn from_degrees(degrees: f64) -> Option<Self> {
        if !degrees.is_finite() {
            return None;
        }
        let normalized = degrees.rem_euclid(360.0);
        let quarter = (normalized / 90.0).round();
        if (normalized - quarter * 90.0).abs() > 1e-9 {
            return None;
        }
        match quarter as u32 % 4 {
            0 => Some(Rotation::R0),
            1 => Some(Rotation::R90),
            2 => Some(Rotation::R180),
            _ => Some(Rotation::R270),
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }

    /// Exact right-angle rotation about the origin.
    pub fn rotate(self, p: Point) -> Point {
        match self {
            Rotation::R0 => Point::new(p.x, p.y),
            Rotation::R90 => Point::new(-p.y, p.x),
            Rotation::R180 => Point::new(-p.x, -p.y),
            Rotation::R270 => Point::new(p.y, -p.x),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rotation must be 0, 90, 180 or 270 degrees, got {0}")]
pub struct InvalidRotation(pub u16);

impl TryFrom<u16> for Rotation {
    type Error = InvalidRotation;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::R0),
            90 => Ok(Rotation::R90),
            180 => Ok(Rotation::R180),
            270 => Ok(Rotation::R270),
            other => Err(InvalidRotation(other)),
        }
    }
}

/// The local transform of a placement relative to its parent cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// Translation offset, expressed in the parent's frame.
    pub offset: Point,
    /// Counter-clockwise rotation.
    pub rotation: Rotation,
    /// Mirror about the X axis, applied after rotation.
    pub mirror_x: bool,
}

impl Transform {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn new(offset: Point, rotation: Rotation, mirror_x: bool) -> Self {
        Self {
            offset,
            rotation,
            mirror_x,
        }
    }

    pub fn translate(x: f64, y: f64) -> Self {
        Self {
            offset: Point::new(x, y),
            ..Default::default()
        }
    }

    /// Rotate, then mirror, then translate. The order is fixed: offsets are
    /// defined in the parent's frame after rotation.
    pub fn apply(&self, point: &Point) -> Point {
        let mut p = self.rotation.rotate(*point);
        if self.mirror_x {
            p.y = -p.y;
        }
        p.translate(self.offset.x, self.offset.y)
    }
}

/// What a placement draws.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum PlacementTarget {
    Primitive(PrimitiveId),
    /// Looked up by name at resolution time.
    Cell(String),
}

/// A primitive or sub-cell placed inside a parent cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub target: PlacementTarget,
    pub transform: Transform,
}

impl Placement {
    /// Primitives carry absolute cell-local coordinates, so they are placed
    /// with the identity transform.
    pub fn primitive(id: PrimitiveId) -> Self {
        Self {
            target: PlacementTarget::Primitive(id),
            transform: Transform::identity(),
        }
    }

    pub fn cell(name: &str, transform: Transform) -> Self {
        Self {
            target: PlacementTarget::Cell(name.to_string()),
            transform,
        }
    }
}

/// A named group of placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub name: String,
    placements: Vec<Placement>,
}

impl Cell {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            placements: Vec::new(),
        }
    }

    pub fn add_placement(&mut self, placement: Placement) {
        self.placements.push(placement);
    }

    pub fn add_primitive(&mut self, id: PrimitiveId) {
        self.add_placement(Placement::primitive(id));
    }

    pub fn add_instance(&mut self, cell_name: &str, transform: Transform) {
        self.add_placement(Placement::cell(cell_name, transform));
    }

    pub fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub fn placement_count(&self) -> usize {
        self.placements.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.placements
            .iter()
            .filter(|p| matches!(p.target, PlacementTarget::Primitive(_)))
            .count()
    }

    pub fn instance_count(&self) -> usize {
        self.placement_count() - self.primitive_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-10 && (a.y - b.y).abs() < 1e-10,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(0.0), Some(Rotation::R0));
        assert_eq!(Rotation::from_degrees(90.0), Some(Rotation::R90));
        assert_eq!(Rotation::from_degrees(180.0), Some(Rotation::R180));
        assert_eq!(Rotation::from_degrees(270.0), Some(Rotation::R270));
        assert_eq!(Rotation::from_degrees(-90.0), Some(Rotation::R270));
        assert_eq!(Rotation::from_degrees(360.0), Some(Rotation::R0));
        assert_eq!(Rotation::from_degrees(45.0), None);
        assert_eq!(Rotation::from_degrees(f64::NAN), None);
    }

    #[test]
    fn test_right_angle_forms() {
        let p = Point::new(3.0, 2.0);
        assert_eq!(Rotation::R0.rotate(p), Point::new(3.0, 2.0));
        assert_eq!(Rotation::R90.rotate(p), Point::new(-2.0, 3.0));
        assert_eq!(Rotation::R180.rotate(p), Point::new(-3.0, -2.0));
        assert_eq!(Rotation::R270.rotate(p), Point::new(2.0, -3.0));
    }

    #[test]
    fn test_rotation_preserves_distance_and_closes_after_four_steps() {
        let origin = Point::origin();
        let p = Point::new(7.5, -1.5);
        for rotation in Rotation::ALL {
            let t = Transform::new(origin, rotation, false);
            let once = t.apply(&p);
            assert!((once.distance_to(&origin) - p.distance_to(&origin)).abs() < 1e-10);

            let mut q = p;
            for _ in 0..4 {
                q = t.apply(&q);
            }
            assert_close(q, p);
        }
    }

    #[test]
    fn test_mirror_is_involution() {
        let t = Transform::new(Point::origin(), Rotation::R0, true);
        let p = Point::new(4.0, 9.0);
        assert_eq!(t.apply(&p), Point::new(4.0, -9.0));
        assert_eq!(t.apply(&t.apply(&p)), p);
    }

    #[test]
    fn test_rotate_then_mirror_then_offset() {
        let t = Transform::new(Point::new(10.0, 5.0), Rotation::R90, true);
        // (1,0) -> rotate (0,1) -> mirror (0,-1) -> offset (10,4)
        assert_close(t.apply(&Point::new(1.0, 0.0)), Point::new(10.0, 4.0));
    }

    #[test]
    fn test_transform_translate() {
        let t = Transform::translate(10.0, 20.0);
        let result = t.apply(&Point::new(5.0, 5.0));
        assert!((result.x - 15.0).abs() < 1e-10);
        assert!((result.y - 25.0).abs() < 1e-10);
    }

    #[test]
    fn test_cell_counts() {
        let mut cell = Cell::new("nand2");
        cell.add_primitive(PrimitiveId(0));
        cell.add_primitive(PrimitiveId(1));
        cell.add_instance("inv", Transform::translate(1.0, 0.0));
        assert_eq!(cell.placement_count(), 3);
        assert_eq!(cell.primitive_count(), 2);
        assert_eq!(cell.instance_count(), 1);
    }

    #[test]
    fn test_rotation_serializes_as_degrees() {
        let json = serde_json::to_string(&Rotation::R270).unwrap();
        assert_eq!(json, "270");
        let back: Rotation = serde_json::from_str("90").unwrap();
        assert_eq!(back, Rotation::R90);
        let err = serde_json::from_str::<Rotation>("45").unwrap_err();
        assert!(err.to_string().contains("got 45"));
        assert_eq!(Rotation::try_from(45u16), Err(InvalidRotation(45)));
    }
}
