use std::collections::HashMap;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::cell::Cell;
use crate::geometry::{Point, Primitive, PrimitiveId};
use crate::LayerId;

/// Holds every cell and primitive read from one dump.
///
/// Primitives live in an arena indexed by [`PrimitiveId`]; cells are keyed by
/// name. Nothing in here is mutated once ingestion is over, so the same
/// database can be resolved from any number of roots.
#[derive(Debug, Default)]
pub struct LayoutDatabase {
    /// Library name.
    pub name: String,
    primitives: Vec<Primitive>,
    cells: HashMap<String, Cell>,
    /// Cell names in first-definition order.
    cell_order: Vec<String>,
    /// The most recently defined cell, used as the default root.
    top_cell: Option<String>,
}

impl LayoutDatabase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    // ── Primitives ───────────────────────────────────────────────────

    /// Store a polygon and hand out the next id.
    pub fn add_primitive(&mut self, layer: LayerId, points: Vec<Point>) -> PrimitiveId {
        let id = PrimitiveId(self.primitives.len() as u32);
        self.primitives.push(Primitive::new(id, layer, points));
        id
    }

    pub fn primitive(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(id.index())
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    // ── Cell management ──────────────────────────────────────────────

    /// Insert a finished cell. A cell with the same name is replaced, and the
    /// inserted cell becomes the default root.
    pub fn add_cell(&mut self, cell: Cell) {
        let name = cell.name.clone();
        if self.cells.insert(name.clone(), cell).is_some() {
            log::warn!("Cell '{}' is defined more than once; keeping the last definition", name);
        } else {
            self.cell_order.push(name.clone());
        }
        self.top_cell = Some(name);
    }

    pub fn get_cell(&self, name: &str) -> Option<&Cell> {
        self.cells.get(name)
    }

    pub fn has_cell(&self, name: &str) -> bool {
        self.cells.contains_key(name)
    }

    pub fn top_cell(&self) -> Option<&str> {
        self.top_cell.as_deref()
    }

    pub fn cell_names(&self) -> Vec<&str> {
        self.cell_order.iter().map(String::as_str).collect()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cells in first-definition order.
    pub fn all_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cell_order.iter().filter_map(|name| self.cells.get(name))
    }

    // ── Serialization ────────────────────────────────────────────────

    /// Pretty JSON with cells in definition order.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Serialize for LayoutDatabase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let cells: Vec<&Cell> = self.all_cells().collect();
        let mut state = serializer.serialize_struct("LayoutDatabase", 4)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("top_cell", &self.top_cell)?;
        state.serialize_field("primitives", &self.primitives)?;
        state.serialize_field("cells", &cells)?;
        state.end()
    }
}
