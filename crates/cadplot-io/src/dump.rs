//! Cadence ASCII stream dump reader.
//!
//! The dump is line oriented. Records are recognised by their leading words
//! and their fields are picked by whitespace-separated token position:
//!
//! ```text
//! Cell Name = inv, ...                         -> starts a cell
//! Cell Instance ... <name>                     -> instance, followed by
//!   Origin = (x,y) Angle = 90.0 Mirror = 0     -> its placement line
//! Rectangle ... <layer> ... (x1,y1) (x2,y2)    -> two opposite corners
//! Polygon ... <layer> ... <count>              -> followed by point lines,
//!   (x,y) (x,y) (x,y) (x,y)                    -> at most four per line
//! End Cell Definition                          -> closes the cell
//! ```
//!
//! An instance may only name a cell whose definition has already been
//! committed. Coordinates are integers in database units and are divided by
//! the reader scale (10 by default) on the way in.

use std::io::{self, BufRead};
use thiserror::Error;

use cadplot_core::cell::{Cell, Rotation, Transform};
use cadplot_core::database::LayoutDatabase;
use cadplot_core::geometry::{rect_outline, Point};
use cadplot_core::LayerId;

pub const DEFAULT_SCALE: f64 = 10.0;

// ── Record Prefixes ───────────────────────────────────────────────────

mod prefix {
    pub const CELL_NAME: &str = "Cell Name";
    pub const CELL_INSTANCE: &str = "Cell Instance";
    pub const END_CELL: &str = "End Cell Definition";
    pub const RECTANGLE: &str = "Rectangle";
    pub const POLYGON: &str = "Polygon";
}

// ── Token Positions ───────────────────────────────────────────────────

mod field {
    pub const CELL_NAME: usize = 3;
    pub const INSTANCE_CELL: usize = 6;
    pub const INSTANCE_ORIGIN: usize = 2;
    pub const INSTANCE_ANGLE: usize = 5;
    pub const INSTANCE_MIRROR: usize = 8;
    pub const LAYER: usize = 4;
    pub const RECT_FIRST: usize = 11;
    pub const RECT_SECOND: usize = 12;
    pub const POLYGON_COUNT: usize = 13;
    pub const POINTS_PER_LINE: usize = 4;
}

// ── Errors ────────────────────────────────────────────────────────────

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed record at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("{record} at line {line} is outside of any cell definition")]
    OutsideCell { line: usize, record: &'static str },

    #[error("Cell '{name}' instanced at line {line} before it was defined")]
    UndefinedCell { line: usize, name: String },

    #[error("Unexpected end of input after line {line}: {message}")]
    UnexpectedEof { line: usize, message: String },

    #[error("Invalid scale factor {0}; must be a positive number")]
    InvalidScale(f64),
}

// ── Dump Reader ───────────────────────────────────────────────────────

pub struct DumpReader<R: BufRead> {
    reader: R,
    line_no: usize,
    scale: f64,
    library_name: String,
}

impl<R: BufRead> DumpReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            scale: DEFAULT_SCALE,
            library_name: "imported".to_string(),
        }
    }

    /// Divide raw coordinates by `scale` instead of the default 10.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_library_name(mut self, name: &str) -> Self {
        self.library_name = name.to_string();
        self
    }

    /// Read the whole dump into a [`LayoutDatabase`].
    pub fn read(&mut self) -> Result<LayoutDatabase, DumpError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(DumpError::InvalidScale(self.scale));
        }

        let mut db = LayoutDatabase::new(&self.library_name);
        let mut current: Option<Cell> = None;

        while let Some(line) = self.read_line()? {
            let record = line.trim_start();

            if record.starts_with(prefix::CELL_NAME) {
                if let Some(cell) = current.take() {
                    db.add_cell(cell);
                }
                let name = self.token(record, field::CELL_NAME, "cell name")?;
                let name = name.trim_end_matches(',');
                log::debug!("Reading cell: {}", name);
                current = Some(Cell::new(name));
            } else if record.starts_with(prefix::CELL_INSTANCE) {
                let line = self.line_no;
                let cell = self.open_cell(&mut current, "Cell instance")?;
                let (name, transform) = self.read_instance(record)?;
                // Only committed cells can be placed; the open cell is not one yet.
                if !db.has_cell(&name) {
                    return Err(DumpError::UndefinedCell { line, name });
                }
                cell.add_instance(&name, transform);
            } else if record.starts_with(prefix::END_CELL) {
                if let Some(cell) = current.take() {
                    db.add_cell(cell);
                }
            } else if record.starts_with(prefix::RECTANGLE) {
                let cell = self.open_cell(&mut current, "Rectangle")?;
                let (layer, points) = self.read_rectangle(record)?;
                cell.add_primitive(db.add_primitive(layer, points));
            } else if record.starts_with(prefix::POLYGON) {
                let cell = self.open_cell(&mut current, "Polygon")?;
                let (layer, points) = self.read_polygon(record)?;
                cell.add_primitive(db.add_primitive(layer, points));
            }
        }

        if let Some(cell) = current.take() {
            db.add_cell(cell);
        }

        log::info!(
            "End of dump. {} cells, {} primitives read.",
            db.cell_count(),
            db.primitive_count()
        );
        Ok(db)
    }

    fn read_line(&mut self) -> Result<Option<String>, DumpError> {
        let mut buf = String::new();
        if self.reader.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some(buf))
    }

    fn open_cell<'c>(
        &self,
        current: &'c mut Option<Cell>,
        record: &'static str,
    ) -> Result<&'c mut Cell, DumpError> {
        current.as_mut().ok_or(DumpError::OutsideCell {
            line: self.line_no,
            record,
        })
    }

    fn read_instance(&mut self, record: &str) -> Result<(String, Transform), DumpError> {
        let name = self
            .token(record, field::INSTANCE_CELL, "instance cell name")?
            .trim_end_matches(',')
            .to_string();

        let placement = self.read_line()?.ok_or_else(|| DumpError::UnexpectedEof {
            line: self.line_no,
            message: format!("missing placement line for instance of '{}'", name),
        })?;

        let origin = self.token(&placement, field::INSTANCE_ORIGIN, "instance origin")?;
        let origin = self.point(origin)?;

        let angle_text = self.token(&placement, field::INSTANCE_ANGLE, "instance angle")?;
        let angle: f64 = angle_text
            .parse()
            .map_err(|_| self.malformed(format!("angle '{}' is not a number", angle_text)))?;
        let rotation = Rotation::from_degrees(angle)
            .ok_or_else(|| self.malformed(format!("angle {} is not a right angle", angle)))?;

        let mirror_text = self.token(&placement, field::INSTANCE_MIRROR, "instance mirror flag")?;
        let mirror: i64 = mirror_text
            .parse()
            .map_err(|_| self.malformed(format!("mirror flag '{}' is not an integer", mirror_text)))?;

        Ok((name, Transform::new(origin, rotation, mirror != 0)))
    }

    fn read_rectangle(&self, record: &str) -> Result<(LayerId, Vec<Point>), DumpError> {
        let layer = self.layer(record)?;
        let first = self.point(self.token(record, field::RECT_FIRST, "rectangle corner")?)?;
        let second = self.point(self.token(record, field::RECT_SECOND, "rectangle corner")?)?;
        Ok((layer, rect_outline(first, second)))
    }

    fn read_polygon(&mut self, record: &str) -> Result<(LayerId, Vec<Point>), DumpError> {
        let layer = self.layer(record)?;
        let count_text = self.token(record, field::POLYGON_COUNT, "polygon point count")?;
        let count: usize = count_text
            .parse()
            .map_err(|_| self.malformed(format!("point count '{}' is not a number", count_text)))?;
        if count == 0 {
            return Err(self.malformed("polygon has no points".to_string()));
        }

        let mut points = Vec::with_capacity(count);
        while points.len() < count {
            let line = self.read_line()?.ok_or_else(|| DumpError::UnexpectedEof {
                line: self.line_no,
                message: format!(
                    "polygon declared {} points but only {} were read",
                    count,
                    points.len()
                ),
            })?;
            let wanted = (count - points.len()).min(field::POINTS_PER_LINE);
            for index in 0..wanted {
                let token = self.token(&line, index, "polygon point")?;
                points.push(self.point(token)?);
            }
        }

        Ok((layer, points))
    }

    fn layer(&self, record: &str) -> Result<LayerId, DumpError> {
        let text = self.token(record, field::LAYER, "layer number")?;
        text.parse()
            .map_err(|_| self.malformed(format!("layer '{}' is not a layer number", text)))
    }

    fn token<'a>(&self, line: &'a str, index: usize, what: &str) -> Result<&'a str, DumpError> {
        line.split_whitespace().nth(index).ok_or_else(|| {
            self.malformed(format!("missing {} (token {})", what, index + 1))
        })
    }

    /// Parse `(x,y)` and apply the reader scale.
    fn point(&self, token: &str) -> Result<Point, DumpError> {
        let (x, y) = parse_coordinate(token)
            .ok_or_else(|| self.malformed(format!("'{}' is not an (x,y) coordinate", token)))?;
        Ok(Point::new(x as f64 / self.scale, y as f64 / self.scale))
    }

    fn malformed(&self, message: String) -> DumpError {
        DumpError::Malformed {
            line: self.line_no,
            message,
        }
    }
}

/// Parse a raw `(x,y)` integer pair.
fn parse_coordinate(token: &str) -> Option<(i64, i64)> {
    let inner = token.trim_matches(|c| c == '(' || c == ')');
    let (x, y) = inner.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadplot_core::PlacementTarget;
    use std::io::Cursor;

    fn read(text: &str) -> Result<LayoutDatabase, DumpError> {
        DumpReader::new(Cursor::new(text.as_bytes())).read()
    }

    fn primitive_points(db: &LayoutDatabase, cell: &str, index: usize) -> Vec<Point> {
        match &db.get_cell(cell).unwrap().placements()[index].target {
            PlacementTarget::Primitive(id) => db.primitive(*id).unwrap().points().to_vec(),
            other => panic!("expected a primitive, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("(10,-20)"), Some((10, -20)));
        assert_eq!(parse_coordinate("(a,1)"), None);
        assert_eq!(parse_coordinate("(1;2)"), None);
    }

    #[test]
    fn test_rectangle_expands_and_scales() {
        let db = read(
            "Cell Name = inv, Cell Number = 1\n\
             Rectangle Layer Number = 31 DataType Number = 0 Corners = (0,0) (100,200)\n\
             End Cell Definition\n",
        )
        .unwrap();

        assert_eq!(db.cell_count(), 1);
        assert_eq!(
            primitive_points(&db, "inv", 0),
            vec![
                Point::new(0.0, 0.0),
                Point::new(0.0, 20.0),
                Point::new(10.0, 20.0),
                Point::new(10.0, 0.0),
                Point::new(0.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_polygon_spans_continuation_lines() {
        let db = read(
            "Cell Name = poly,\n\
             Polygon Layer Number = 17 DataType Number = 0 Number Of Points = 6\n\
             (0,0) (0,10) (10,10) (10,20)\n\
             (20,20) (20,0)\n",
        )
        .unwrap();

        let points = primitive_points(&db, "poly", 0);
        assert_eq!(points.len(), 6);
        assert_eq!(points[3], Point::new(1.0, 2.0));
        assert_eq!(points[5], Point::new(2.0, 0.0));
        // The last cell is committed at end of input.
        assert_eq!(db.top_cell(), Some("poly"));
    }

    #[test]
    fn test_instance_record() {
        let db = read(
            "Cell Name = inv,\n\
             Rectangle Layer Number = 31 DataType Number = 0 Corners = (0,0) (10,10)\n\
             End Cell Definition\n\
             Cell Name = top,\n\
             Cell Instance Ref Cell Name = inv\n\
             Origin = (100,-50) Angle = 270.0 Mirror = 1\n\
             End Cell Definition\n",
        )
        .unwrap();

        let top = db.get_cell("top").unwrap();
        assert_eq!(top.instance_count(), 1);
        let placement = &top.placements()[0];
        assert_eq!(placement.target, PlacementTarget::Cell("inv".to_string()));
        assert_eq!(placement.transform.offset, Point::new(10.0, -5.0));
        assert_eq!(placement.transform.rotation, Rotation::R270);
        assert!(placement.transform.mirror_x);
    }

    #[test]
    fn test_instance_must_follow_definition() {
        let err = read(
            "Cell Name = top,\n\
             Cell Instance Ref Cell Name = leaf\n\
             Origin = (0,0) Angle = 0.0 Mirror = 0\n\
             End Cell Definition\n\
             Cell Name = leaf,\n\
             Rectangle Layer Number = 31 DataType Number = 0 Corners = (0,0) (10,10)\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DumpError::UndefinedCell { line: 2, ref name } if name == "leaf"
        ));
    }

    #[test]
    fn test_instance_of_open_cell_rejected() {
        let err = read(
            "Cell Name = loop,\n\
             Rectangle Layer Number = 31 DataType Number = 0 Corners = (0,0) (10,10)\n\
             Cell Instance Ref Cell Name = loop\n\
             Origin = (0,0) Angle = 0.0 Mirror = 0\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DumpError::UndefinedCell { line: 3, ref name } if name == "loop"
        ));
    }

    #[test]
    fn test_mutual_references_rejected() {
        let err = read(
            "Cell Name = a,\n\
             Cell Instance Ref Cell Name = b\n\
             Origin = (0,0) Angle = 0.0 Mirror = 0\n\
             Cell Name = b,\n\
             Cell Instance Ref Cell Name = a\n\
             Origin = (0,0) Angle = 0.0 Mirror = 0\n",
        )
        .unwrap_err();
        assert!(matches!(err, DumpError::UndefinedCell { line: 2, .. }));
    }

    #[test]
    fn test_custom_scale() {
        let db = DumpReader::new(Cursor::new(
            "Cell Name = a,\nRectangle Layer Number = 1 DataType Number = 0 Corners = (0,0) (1000,1000)\n"
                .as_bytes(),
        ))
        .with_scale(1000.0)
        .read()
        .unwrap();
        assert_eq!(primitive_points(&db, "a", 0)[2], Point::new(1.0, 1.0));
    }

    #[test]
    fn test_geometry_outside_cell_is_rejected() {
        let err = read("Rectangle Layer Number = 31 DataType Number = 0 Corners = (0,0) (1,1)\n")
            .unwrap_err();
        assert!(matches!(err, DumpError::OutsideCell { line: 1, .. }));

        let err = read(
            "Cell Name = a,\nEnd Cell Definition\n\
             Polygon Layer Number = 1 DataType Number = 0 Number Of Points = 1\n(0,0)\n",
        )
        .unwrap_err();
        assert!(matches!(err, DumpError::OutsideCell { line: 3, .. }));
    }

    #[test]
    fn test_malformed_records() {
        let bad_layer = read(
            "Cell Name = a,\nRectangle Layer Number = M1 DataType Number = 0 Corners = (0,0) (1,1)\n",
        )
        .unwrap_err();
        assert!(matches!(bad_layer, DumpError::Malformed { line: 2, .. }));

        let short = read("Cell Name = a,\nRectangle Layer Number = 31\n").unwrap_err();
        assert!(matches!(short, DumpError::Malformed { line: 2, .. }));

        let bad_angle = read(
            "Cell Name = a,\nCell Name = b,\nCell Instance Ref Cell Name = a\n\
             Origin = (0,0) Angle = 45.0 Mirror = 0\n",
        )
        .unwrap_err();
        assert!(matches!(bad_angle, DumpError::Malformed { line: 4, .. }));
    }

    #[test]
    fn test_truncated_input() {
        let err = read(
            "Cell Name = a,\nPolygon Layer Number = 1 DataType Number = 0 Number Of Points = 5\n\
             (0,0) (1,1) (2,2) (3,3)\n",
        )
        .unwrap_err();
        assert!(matches!(err, DumpError::UnexpectedEof { .. }));

        let err = read("Cell Name = a,\nCell Name = b,\nCell Instance Ref Cell Name = a\n")
            .unwrap_err();
        assert!(matches!(err, DumpError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_invalid_scale() {
        let err = DumpReader::new(Cursor::new(&b""[..]))
            .with_scale(0.0)
            .read()
            .unwrap_err();
        assert!(matches!(err, DumpError::InvalidScale(_)));
    }
}
