//! SVG writer.
//!
//! Emits a plain SVG 1.0 document: one `<path>` per render record, in the
//! frame's paint order. The document size is a fixed placeholder; fitting the
//! page to the drawing is left to the viewer.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use cadplot_core::{LayerStyle, Point};
use cadplot_renderer::{RenderFrame, RenderPath};

#[derive(Error, Debug)]
pub enum SvgError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Path '{0}' has no points")]
    EmptyPath(String),
}

/// Document-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvgConfig {
    pub width: u32,
    pub height: u32,
    pub stroke_width: f64,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
            stroke_width: 2.0,
        }
    }
}

impl SvgConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_stroke_width(mut self, stroke_width: f64) -> Self {
        self.stroke_width = stroke_width;
        self
    }
}

pub struct SvgWriter<W: Write> {
    writer: W,
    config: SvgConfig,
}

impl<W: Write> SvgWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_config(writer, SvgConfig::default())
    }

    pub fn with_config(writer: W, config: SvgConfig) -> Self {
        Self { writer, config }
    }

    /// Write a complete document. Returns the number of paths written.
    pub fn write(&mut self, frame: &RenderFrame) -> Result<usize, SvgError> {
        self.write_header()?;
        for path in &frame.paths {
            self.write_path(path)?;
        }
        self.write_footer()?;
        self.writer.flush()?;

        log::info!(
            "Wrote {} paths for cell '{}'",
            frame.path_count(),
            frame.cell
        );
        Ok(frame.path_count())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), SvgError> {
        writeln!(
            self.writer,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"#
        )?;
        writeln!(self.writer, "<svg")?;
        writeln!(self.writer, r#"   xmlns:svg="http://www.w3.org/2000/svg""#)?;
        writeln!(self.writer, r#"   xmlns="http://www.w3.org/2000/svg""#)?;
        writeln!(self.writer, r#"   version="1.0""#)?;
        writeln!(self.writer, r#"   width="{}""#, self.config.width)?;
        writeln!(self.writer, r#"   height="{}""#, self.config.height)?;
        writeln!(self.writer, r#"   id="svg2">"#)?;
        writeln!(self.writer, "  <defs")?;
        writeln!(self.writer, r#"     id="defs4" />"#)?;
        Ok(())
    }

    fn write_path(&mut self, path: &RenderPath) -> Result<(), SvgError> {
        let data = path_data(&path.points).ok_or_else(|| SvgError::EmptyPath(path.id.clone()))?;
        writeln!(self.writer, "    <path")?;
        writeln!(self.writer, r#"       d="{}""#, data)?;
        writeln!(self.writer, r#"       id="{}""#, path.id)?;
        writeln!(
            self.writer,
            r#"       style="{}" />"#,
            style_attribute(&path.style, self.config.stroke_width)
        )?;
        Ok(())
    }

    fn write_footer(&mut self) -> Result<(), SvgError> {
        writeln!(self.writer, "</svg>")?;
        Ok(())
    }
}

/// `M x,y L x,y ... z`
fn path_data(points: &[Point]) -> Option<String> {
    let (first, rest) = points.split_first()?;
    let mut data = format!("M {},{}", number(first.x), number(first.y));
    for p in rest {
        data.push_str(&format!(" L {},{}", number(p.x), number(p.y)));
    }
    data.push_str(" z");
    Some(data)
}

fn style_attribute(style: &LayerStyle, stroke_width: f64) -> String {
    format!(
        "fill:{};fill-opacity:{};stroke:{};stroke-width:{};stroke-linecap:round;\
         stroke-linejoin:round;stroke-miterlimit:4;stroke-dasharray:none;\
         stroke-dashoffset:0;stroke-opacity:1",
        style.fill,
        style.fill_opacity,
        style.stroke,
        number(stroke_width)
    )
}

/// Shortest decimal form; negative zero prints as `0`.
fn number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}
