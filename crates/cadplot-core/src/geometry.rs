use std::fmt;

use serde::{Deserialize, Serialize};

use crate::LayerId;

/// A 2D point in layout units (raw dump units divided by the reader's scale).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self::default()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Convert from the layout's math convention (y up) to graphics convention (y down).
    ///
    /// Negative zeros are normalized to `0.0` so every output format agrees.
    pub fn flip_y(&self) -> Self {
        Self {
            x: self.x + 0.0,
            y: -self.y + 0.0,
        }
    }
}

/// Identifier handed out by [`crate::LayoutDatabase`] when a primitive is created.
///
/// Ids are dense and monotonically increasing, so they double as the arena index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimitiveId(pub u32);

impl PrimitiveId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path{}", self.0)
    }
}

/// An immutable polygon on a single layer.
///
/// The outline is implicitly closed; the last point does not have to repeat
/// the first one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    id: PrimitiveId,
    layer: LayerId,
    points: Vec<Point>,
}

impl Primitive {
    pub(crate) fn new(id: PrimitiveId, layer: LayerId, points: Vec<Point>) -> Self {
        Self { id, layer, points }
    }

    pub fn id(&self) -> PrimitiveId {
        self.id
    }

    pub fn layer(&self) -> LayerId {
        self.layer
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// Expand two opposite rectangle corners into a closed five-point outline.
///
/// The walk is (x1,y1) → (x1,y2) → (x2,y2) → (x2,y1) → (x1,y1), independent of
/// which corner is the lower-left one.
pub fn rect_outline(first: Point, second: Point) -> Vec<Point> {
    vec![
        Point::new(first.x, first.y),
        Point::new(first.x, second.y),
        Point::new(second.x, second.y),
        Point::new(second.x, first.y),
        Point::new(first.x, first.y),
    ]
}
