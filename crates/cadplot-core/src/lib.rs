//! # cadplot core
//!
//! Layout data model for Cadence stream dumps: primitives, cells and their
//! placements, layer styles, and the engine that flattens a cell hierarchy
//! into absolute, layer-tagged outlines.

pub mod geometry;
pub mod cell;
pub mod database;
pub mod layer;
pub mod resolve;

pub use database::LayoutDatabase;
pub use cell::{Cell, Placement, PlacementTarget, Rotation, Transform};
pub use layer::{LayerColor, LayerId, LayerStyle, StyleResolver, StyleTable, UnknownLayers};
pub use geometry::{Point, Primitive, PrimitiveId};
pub use resolve::{ResolveError, ResolvedPath, Resolver};
