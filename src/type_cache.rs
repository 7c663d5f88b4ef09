//! Per-type signature cache.
//!
//! Remembers the newest value captured for each [`BlockType`] together with
//! whether the entry prompt was ever shown for that type, so later blocks of
//! the same type can be filled without prompting again.

use chrono::Utc;
use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::{EsignError, Result};
use crate::model::{BlockType, CapturedSignature, SignatureBlock, SignatureTypeStatus};

/// Status and newest captured value for one block type.
#[derive(Debug, Clone, Default)]
struct TypeSlot {
    modal_shown: bool,
    signature: Option<CapturedSignature>,
}

/// Captured values and prompt bookkeeping, keyed by block type.
#[derive(Debug, Clone, Default)]
pub struct SignatureTypeCache {
    slots: IndexMap<BlockType, TypeSlot>,
}

impl SignatureTypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache with an untouched status entry for every given type.
    pub fn for_types<I>(types: I) -> Self
    where
        I: IntoIterator<Item = BlockType>,
    {
        let slots = types
            .into_iter()
            .map(|t| (t, TypeSlot::default()))
            .collect();
        Self { slots }
    }

    /// Store `text` as the newest value for `block_type`, replacing any
    /// earlier capture. Blank text is rejected and leaves the cache unchanged.
    pub fn capture(&mut self, block_type: &BlockType, text: &str) -> Result<CapturedSignature> {
        if text.trim().is_empty() {
            return Err(EsignError::EmptySignature(block_type.to_string()));
        }
        let captured = CapturedSignature {
            text: text.to_string(),
            timestamp: Utc::now(),
            block_type: block_type.clone(),
        };
        let slot = self.slots.entry(block_type.clone()).or_default();
        if slot.signature.is_some() {
            debug!("Replacing captured {} value", block_type);
        }
        slot.signature = Some(captured.clone());
        Ok(captured)
    }

    pub fn lookup(&self, block_type: &BlockType) -> Option<&CapturedSignature> {
        self.slots.get(block_type).and_then(|s| s.signature.as_ref())
    }

    pub fn status(&self, block_type: &BlockType) -> SignatureTypeStatus {
        self.slots
            .get(block_type)
            .map(|s| SignatureTypeStatus {
                modal_shown: s.modal_shown,
                captured: s.signature.is_some(),
            })
            .unwrap_or_default()
    }

    /// All tracked types with their status, in first-seen order.
    pub fn statuses(&self) -> Vec<(BlockType, SignatureTypeStatus)> {
        self.slots
            .keys()
            .map(|t| (t.clone(), self.status(t)))
            .collect()
    }

    pub fn mark_modal_shown(&mut self, block_type: &BlockType) {
        self.slots.entry(block_type.clone()).or_default().modal_shown = true;
    }

    /// The value to auto-apply for `block_type`, if one was captured.
    pub fn auto_apply_candidate(&self, block_type: &BlockType) -> Option<&CapturedSignature> {
        if self.status(block_type).captured {
            self.lookup(block_type)
        } else {
            None
        }
    }
}

/// Apply a captured value to one block.
///
/// Fails without touching the block when it is already completed, when
/// the captured value belongs to another type or when its text is blank.
pub fn apply_to_block(
    block: &mut SignatureBlock,
    captured: &CapturedSignature,
    auto_applied: bool,
) -> Result<()> {
    if block.is_completed() {
        warn!("Ignoring apply to already completed block {}", block.id());
        return Err(EsignError::BlockAlreadyCompleted(block.id().to_string()));
    }
    if block.block_type() != &captured.block_type {
        warn!(
            "Refusing to apply {} value to {} block {}",
            captured.block_type,
            block.block_type(),
            block.id()
        );
        return Err(EsignError::TypeMismatch {
            block: block.id().to_string(),
            expected: block.block_type().to_string(),
            found: captured.block_type.to_string(),
        });
    }
    if !block.complete(&captured.text, Utc::now(), auto_applied) {
        warn!("Refusing to apply empty {} value to block {}", captured.block_type, block.id());
        return Err(EsignError::EmptySignature(captured.block_type.to_string()));
    }
    Ok(())
}

/// Apply `captured` to every incomplete block of its type, in registry
/// order. Returns how many blocks were updated.
pub fn apply_to_all_of_type(blocks: &mut [SignatureBlock], captured: &CapturedSignature) -> usize {
    let mut count = 0;
    for block in blocks
        .iter_mut()
        .filter(|b| b.block_type() == &captured.block_type && !b.is_completed())
    {
        if block.complete(&captured.text, Utc::now(), true) {
            count += 1;
        }
    }
    debug!(
        "Applied {} value to {} additional blocks",
        captured.block_type, count
    );
    count
}
