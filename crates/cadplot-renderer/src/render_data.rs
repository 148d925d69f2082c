use serde::Serialize;

use cadplot_core::{LayerId, LayerStyle, Point, ResolvedPath, StyleResolver, UnknownLayers};

use crate::order::{linearize, Layered};

/// A resolved outline with its style, ready for a document writer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPath {
    /// Unique element id within the frame.
    pub id: String,
    pub layer: LayerId,
    /// Closed outline in graphics coordinates (y down).
    pub points: Vec<Point>,
    pub style: LayerStyle,
}

impl Layered for RenderPath {
    fn layer(&self) -> LayerId {
        self.layer
    }
}

/// Everything a writer needs to emit one drawing, in paint order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderFrame {
    /// Name of the cell the frame was resolved from.
    pub cell: String,
    pub paths: Vec<RenderPath>,
    /// Layers drawn with the fallback style, with their record counts.
    pub unknown_layers: UnknownLayers,
}

impl RenderFrame {
    /// Attach styles to resolved paths and put them in draw order.
    ///
    /// The resolver's unknown-layer report is moved into the frame, so each
    /// frame only reports the layers it drew.
    pub fn build(cell: &str, resolved: Vec<ResolvedPath>, styles: &mut StyleResolver) -> Self {
        let mut paths: Vec<RenderPath> = resolved
            .into_iter()
            .map(|r| RenderPath {
                id: r.element_id(),
                layer: r.layer,
                style: styles.resolve(r.layer),
                points: r.points,
            })
            .collect();
        linearize(&mut paths);

        log::debug!("Render frame for '{}' holds {} paths", cell, paths.len());

        Self {
            cell: cell.to_string(),
            paths,
            unknown_layers: styles.take_unknown_layers(),
        }
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn paths_on_layer(&self, layer: LayerId) -> impl Iterator<Item = &RenderPath> {
        self.paths.iter().filter(move |p| p.layer == layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadplot_core::{Cell, LayerColor, LayoutDatabase, Resolver, StyleTable, Transform};

    fn square(x: f64) -> Vec<Point> {
        vec![
            Point::new(x, 0.0),
            Point::new(x, 1.0),
            Point::new(x + 1.0, 1.0),
            Point::new(x + 1.0, 0.0),
        ]
    }

    #[test]
    fn test_build_orders_by_layer() {
        let mut db = LayoutDatabase::new("frame");
        let mut top = Cell::new("top");
        for (i, layer) in [5, 1, 5, 3].into_iter().enumerate() {
            let id = db.add_primitive(layer, square(i as f64 * 10.0));
            top.add_primitive(id);
        }
        db.add_cell(top);

        let resolved = Resolver::new(&db).resolve("top").unwrap();
        let mut styles = StyleResolver::new(StyleTable::new());
        let frame = RenderFrame::build("top", resolved, &mut styles);

        let layers: Vec<LayerId> = frame.paths.iter().map(|p| p.layer).collect();
        assert_eq!(layers, vec![1, 3, 5, 5]);
        let ids: Vec<&str> = frame.paths.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["path1", "path3", "path0", "path2"]);
        assert_eq!(frame.paths_on_layer(5).count(), 2);
    }

    #[test]
    fn test_unknown_layers_reported_per_frame() {
        let mut db = LayoutDatabase::new("frame");
        let known = db.add_primitive(31, square(0.0));
        let unknown = db.add_primitive(999, square(5.0));
        let mut unit = Cell::new("unit");
        unit.add_primitive(known);
        unit.add_primitive(unknown);
        db.add_cell(unit);
        let mut top = Cell::new("top");
        top.add_instance("unit", Transform::identity());
        top.add_instance("unit", Transform::translate(20.0, 0.0));
        db.add_cell(top);

        let mut styles = StyleResolver::new(StyleTable::technology_default());
        let resolved = Resolver::new(&db).resolve("top").unwrap();
        let frame = RenderFrame::build("top", resolved, &mut styles);

        assert_eq!(frame.path_count(), 4);
        assert_eq!(frame.unknown_layers.len(), 1);
        assert_eq!(frame.unknown_layers.records_on(999), 2);
        for path in frame.paths_on_layer(999) {
            assert_eq!(path.style, LayerStyle::fallback());
            assert_eq!(path.style.fill, LayerColor::BLACK);
        }
        assert!(styles.unknown_layers().is_empty());
    }
}
