//! Progress and submission gating derived from block completion.

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{BlockType, SignatureBlock};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    fn count<'a>(blocks: impl Iterator<Item = &'a SignatureBlock>) -> Self {
        let mut p = Progress::default();
        for b in blocks {
            p.total += 1;
            if b.is_completed() {
                p.completed += 1;
            }
        }
        p
    }

    pub fn is_done(&self) -> bool {
        self.completed == self.total
    }
}

/// Snapshot of completion state for binding to UI controls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub completed: usize,
    pub total: usize,
    pub remaining: usize,
    pub required_completed: usize,
    pub required_total: usize,
    pub submittable: bool,
}

/// Completed and total counts over all blocks.
pub fn progress(blocks: &[SignatureBlock]) -> Progress {
    Progress::count(blocks.iter())
}

/// Completed and total counts over required blocks only.
pub fn required_progress(blocks: &[SignatureBlock]) -> Progress {
    Progress::count(blocks.iter().filter(|b| b.is_required()))
}

/// True when there is at least one required block and all of them are
/// completed. A document without required blocks is never submittable.
pub fn is_submittable(blocks: &[SignatureBlock]) -> bool {
    let required = required_progress(blocks);
    required.total > 0 && required.is_done()
}

/// Number of incomplete blocks, required or not.
pub fn remaining(blocks: &[SignatureBlock]) -> usize {
    blocks.iter().filter(|b| !b.is_completed()).count()
}

/// Progress per block type, in order of first appearance.
pub fn progress_by_type(blocks: &[SignatureBlock]) -> IndexMap<BlockType, Progress> {
    let mut out: IndexMap<BlockType, Progress> = IndexMap::new();
    for b in blocks {
        let p = out.entry(b.block_type().clone()).or_default();
        p.total += 1;
        if b.is_completed() {
            p.completed += 1;
        }
    }
    out
}

pub fn summary(blocks: &[SignatureBlock]) -> CompletionSummary {
    let all = progress(blocks);
    let required = required_progress(blocks);
    CompletionSummary {
        completed: all.completed,
        total: all.total,
        remaining: all.total - all.completed,
        required_completed: required.completed,
        required_total: required.total,
        submittable: required.total > 0 && required.is_done(),
    }
}
