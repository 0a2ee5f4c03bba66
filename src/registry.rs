use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::codec::{Direction, Edge};

/// Last configuration this process wrote to a line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineConfig {
    pub direction: Option<Direction>,
    pub edge: Option<Edge>,
}

/// Process-local cache of claimed lines, keyed by line id.
///
/// Only [`Line`](crate::Line) mutates it, and only after the matching control
/// file write succeeded. An unexport performed by another process is not
/// observed until the line is claimed again.
#[derive(Debug, Default)]
pub struct LineRegistry {
    lines: RwLock<FxHashMap<u32, LineConfig>>,
}

impl LineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u32) -> Option<LineConfig> {
        self.lines.read().get(&id).copied()
    }

    pub fn ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.lines.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// A fresh export comes up as `in`/`none`, so earlier entries are dropped.
    pub(crate) fn record_claim(&self, id: u32) {
        self.lines.write().insert(id, LineConfig::default());
    }

    pub(crate) fn record_direction(&self, id: u32, direction: Direction) {
        self.lines.write().entry(id).or_default().direction = Some(direction);
    }

    pub(crate) fn record_edge(&self, id: u32, edge: Edge) {
        self.lines.write().entry(id).or_default().edge = Some(edge);
    }

    pub(crate) fn forget(&self, id: u32) {
        self.lines.write().remove(&id);
    }
}
