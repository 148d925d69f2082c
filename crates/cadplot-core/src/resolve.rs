//! Hierarchy flattening.
//!
//! Walks the placement tree below a root cell depth-first and produces the
//! absolute, graphics-convention outline of every primitive it reaches.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::cell::{Cell, PlacementTarget, Transform};
use crate::database::LayoutDatabase;
use crate::geometry::{Point, Primitive, PrimitiveId};
use crate::LayerId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Cell '{0}' referenced but not defined")]
    UnknownCell(String),

    #[error("Primitive {0} referenced but not defined")]
    UnknownPrimitive(PrimitiveId),

    #[error("No cells defined; nothing to resolve")]
    NoCells,

    #[error("Cell '{0}' instantiates itself through its own hierarchy")]
    Cycle(String),
}

/// One primitive placed at its absolute position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedPath {
    pub primitive: PrimitiveId,
    /// How many times this primitive was emitted before this record.
    pub occurrence: u32,
    pub layer: LayerId,
    /// Closed outline (first point repeated last), y pointing down.
    pub points: Vec<Point>,
}

impl ResolvedPath {
    /// Element id that stays unique when a cell is instantiated many times.
    pub fn element_id(&self) -> String {
        if self.occurrence == 0 {
            self.primitive.to_string()
        } else {
            format!("{}-{}", self.primitive, self.occurrence)
        }
    }
}

/// One level of the placement chain from the root down to the current cell.
struct Frame<'f> {
    transform: Transform,
    parent: Option<&'f Frame<'f>>,
}

impl Frame<'_> {
    fn root() -> Frame<'static> {
        Frame {
            transform: Transform::identity(),
            parent: None,
        }
    }

    /// Apply this level's transform, then every enclosing level's, innermost
    /// first.
    fn apply(&self, point: &Point) -> Point {
        let mut p = self.transform.apply(point);
        let mut outer = self.parent;
        while let Some(frame) = outer {
            p = frame.transform.apply(&p);
            outer = frame.parent;
        }
        p
    }
}

/// State owned by a single resolution run.
#[derive(Default)]
struct ResolveContext<'db> {
    out: Vec<ResolvedPath>,
    occurrences: HashMap<PrimitiveId, u32>,
    /// Cells on the path from the root to the cell being walked.
    active: Vec<&'db str>,
}

impl ResolveContext<'_> {
    fn emit(&mut self, primitive: &Primitive, frame: &Frame<'_>) {
        let occurrence = self.occurrences.entry(primitive.id()).or_insert(0);
        let mut points: Vec<Point> = primitive
            .points()
            .iter()
            .map(|p| frame.apply(p).flip_y())
            .collect();
        if let Some(first) = points.first().copied() {
            points.push(first);
        }
        self.out.push(ResolvedPath {
            primitive: primitive.id(),
            occurrence: *occurrence,
            layer: primitive.layer(),
            points,
        });
        *occurrence += 1;
    }
}

/// Read-only view over a [`LayoutDatabase`] that flattens cell hierarchies.
pub struct Resolver<'db> {
    db: &'db LayoutDatabase,
}

impl<'db> Resolver<'db> {
    pub fn new(db: &'db LayoutDatabase) -> Self {
        Self { db }
    }

    /// Resolve `root`, or the last defined cell when `root` is `None`.
    pub fn resolve_root(&self, root: Option<&str>) -> Result<Vec<ResolvedPath>, ResolveError> {
        let name = match root {
            Some(name) => name,
            None => self.db.top_cell().ok_or(ResolveError::NoCells)?,
        };
        self.resolve(name)
    }

    /// Flatten everything reachable from `root` in traversal order.
    ///
    /// On error nothing is returned; partial output is never exposed.
    pub fn resolve(&self, root: &str) -> Result<Vec<ResolvedPath>, ResolveError> {
        let cell = self.lookup_cell(root)?;
        let mut ctx = ResolveContext::default();
        self.walk(cell, &Frame::root(), &mut ctx)?;
        log::info!("Resolved cell '{}' into {} paths", root, ctx.out.len());
        Ok(ctx.out)
    }

    fn lookup_cell(&self, name: &str) -> Result<&'db Cell, ResolveError> {
        self.db
            .get_cell(name)
            .ok_or_else(|| ResolveError::UnknownCell(name.to_string()))
    }

    fn walk(
        &self,
        cell: &'db Cell,
        frame: &Frame<'_>,
        ctx: &mut ResolveContext<'db>,
    ) -> Result<(), ResolveError> {
        ctx.active.push(cell.name.as_str());
        for placement in cell.placements() {
            let child = Frame {
                transform: placement.transform,
                parent: Some(frame),
            };
            match &placement.target {
                PlacementTarget::Primitive(id) => {
                    let primitive = self
                        .db
                        .primitive(*id)
                        .ok_or(ResolveError::UnknownPrimitive(*id))?;
                    ctx.emit(primitive, &child);
                }
                PlacementTarget::Cell(name) => {
                    if ctx.active.contains(&name.as_str()) {
                        return Err(ResolveError::Cycle(name.clone()));
                    }
                    let sub = self.lookup_cell(name)?;
                    log::debug!("Descending into '{}' from '{}'", name, cell.name);
                    self.walk(sub, &child, ctx)?;
                }
            }
        }
        ctx.active.pop();
        Ok(())
    }
}
