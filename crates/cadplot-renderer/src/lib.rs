//! # cadplot renderer
//!
//! Turns resolved geometry into styled, paint-ordered records. Document
//! writers (SVG, JSON) consume a [`RenderFrame`] and do not need to know
//! about the cell hierarchy.

pub mod order;
pub mod render_data;

pub use order::{linearize, Layered};
pub use render_data::{RenderFrame, RenderPath};
