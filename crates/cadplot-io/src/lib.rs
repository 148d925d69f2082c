//! # cadplot I/O
//!
//! Reads Cadence Virtuoso ASCII stream dumps into a layout database, writes
//! render frames as SVG, and loads the JSON plot configuration.

pub mod config;
pub mod dump;
pub mod svg;

pub use config::{ConfigError, PlotConfig};
pub use dump::{DumpError, DumpReader};
pub use svg::{SvgConfig, SvgError, SvgWriter};
