//! Page/position ordering and wrap-around stepping over signature blocks.
//!
//! The sequencer stores registry indices, not block copies, so completion
//! changes made through the registry are always visible to navigation.

use log::debug;
use serde::Serialize;

use crate::model::SignatureBlock;

/// Registry indices of `blocks` sorted by page, then y, then x.
///
/// The sort is stable: blocks with equal keys keep their registry order.
pub fn order(blocks: &[SignatureBlock]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..blocks.len()).collect();
    indices.sort_by(|&a, &b| {
        let (pa, ya, xa) = blocks[a].order_key();
        let (pb, yb, xb) = blocks[b].order_key();
        pa.cmp(&pb)
            .then_with(|| ya.total_cmp(&yb))
            .then_with(|| xa.total_cmp(&xb))
    });
    indices
}

/// Signal that a block became current. The presentation layer scrolls it
/// into view and highlights it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Focus {
    /// Registry index of the focused block.
    #[serde(skip)]
    pub registry_index: usize,
    pub block_id: String,
    /// Position in the ordered list (0-based).
    pub index: usize,
    pub total: usize,
}

/// Ordered block list plus the current position in it.
#[derive(Debug, Clone, Default)]
pub struct NavigationSequencer {
    ordered: Vec<usize>,
    ordered_ids: Vec<String>,
    current: Option<usize>,
}

impl NavigationSequencer {
    pub fn new(blocks: &[SignatureBlock]) -> Self {
        let mut seq = Self::default();
        seq.reorder(blocks);
        seq
    }

    /// Recompute the order. The first block becomes current, or nothing
    /// when there are no blocks.
    pub fn reorder(&mut self, blocks: &[SignatureBlock]) {
        self.ordered = order(blocks);
        self.ordered_ids = self
            .ordered
            .iter()
            .map(|&i| blocks[i].id().to_string())
            .collect();
        self.current = if self.ordered.is_empty() { None } else { Some(0) };
    }

    /// Registry indices in navigation order.
    pub fn ordered(&self) -> &[usize] {
        &self.ordered
    }

    pub fn ordered_ids(&self) -> &[String] {
        &self.ordered_ids
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Current position in the ordered list.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Registry index of the current block.
    pub fn current(&self) -> Option<usize> {
        self.current.map(|i| self.ordered[i])
    }

    /// Focus signal for the current block.
    pub fn focus(&self) -> Option<Focus> {
        let index = self.current?;
        Some(Focus {
            registry_index: self.ordered[index],
            block_id: self.ordered_ids[index].clone(),
            index,
            total: self.ordered.len(),
        })
    }

    /// Step forward, wrapping from the last block to the first.
    pub fn next(&mut self) -> Option<Focus> {
        let len = self.ordered.len();
        let cur = self.current?;
        self.move_to((cur + 1) % len)
    }

    /// Step back, wrapping from the first block to the last.
    pub fn previous(&mut self) -> Option<Focus> {
        let len = self.ordered.len();
        let cur = self.current?;
        self.move_to((cur + len - 1) % len)
    }

    /// Jump to `index`, clamped into the valid range.
    pub fn go_to(&mut self, index: usize) -> Option<Focus> {
        if self.ordered.is_empty() {
            return None;
        }
        self.move_to(index.min(self.ordered.len() - 1))
    }

    /// Jump to the block with the given registry index.
    pub fn go_to_block(&mut self, registry_index: usize) -> Option<Focus> {
        let pos = self.ordered.iter().position(|&i| i == registry_index)?;
        self.move_to(pos)
    }

    /// Ordered position of the first incomplete block at or after the
    /// current one, wrapping around.
    pub fn next_incomplete(&self, blocks: &[SignatureBlock]) -> Option<usize> {
        let len = self.ordered.len();
        let start = self.current?;
        (0..len)
            .map(|step| (start + step) % len)
            .find(|&pos| !blocks[self.ordered[pos]].is_completed())
    }

    fn move_to(&mut self, index: usize) -> Option<Focus> {
        self.current = Some(index);
        let focus = self.focus();
        if let Some(f) = &focus {
            debug!("Navigate to block {} ({}/{})", f.block_id, f.index + 1, f.total);
        }
        focus
    }
}
