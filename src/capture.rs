//! Signature capture state machine.
//!
//! Interacting with an incomplete block either fills it from the type cache
//! straight away or opens a prompt. The prompt is confirmed with typed text
//! and a consent acknowledgment, optionally applying the value to every
//! other incomplete block of the same type.
//!
//! ```text
//! Idle ──interact──▶ AutoApplied ──▶ Completed
//!   │
//!   └────interact──▶ Prompting ──confirm──▶ Completed
//!                        │
//!                        └──cancel──▶ Idle
//! ```

use log::{debug, info};
use serde::Serialize;

use crate::error::{EsignError, Result};
use crate::model::BlockType;
use crate::registry::BlockRegistry;
use crate::type_cache::{SignatureTypeCache, apply_to_all_of_type, apply_to_block};

/// An open entry prompt for one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptRequest {
    #[serde(skip)]
    pub registry_index: usize,
    pub block_id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub label: String,
    /// Whether the "apply to all blocks of this type" choice is shown.
    pub offer_apply_to_all: bool,
    /// Incomplete blocks of this type, the prompted one included.
    pub incomplete_of_type: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CaptureState {
    #[default]
    Idle,
    Prompting(PromptRequest),
}

/// What the user entered in the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureInput {
    pub text: String,
    pub consent: bool,
    pub apply_to_all: bool,
}

/// Why a prompt cannot be confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MissingInput {
    Text,
    Consent,
}

impl CaptureInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_consent(mut self) -> Self {
        self.consent = true;
        self
    }

    pub fn apply_to_all(mut self) -> Self {
        self.apply_to_all = true;
        self
    }

    /// First unmet precondition, or `None` when the input can be submitted.
    ///
    /// Text that is empty after trimming counts as missing. The trimmed text
    /// is what gets captured and stored on the block, not the raw input.
    pub fn missing(&self) -> Option<MissingInput> {
        if self.text.trim().is_empty() {
            Some(MissingInput::Text)
        } else if !self.consent {
            Some(MissingInput::Consent)
        } else {
            None
        }
    }

    pub fn is_ready(&self) -> bool {
        self.missing().is_none()
    }
}

/// Result of interacting with a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// Filled from the cached value of its type without prompting.
    AutoApplied { block_id: String },
    /// A prompt is now open.
    Prompted(PromptRequest),
    /// Nothing to do; completed blocks cannot be changed.
    AlreadyCompleted { block_id: String },
}

/// Result of confirming the open prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Precondition not met; the prompt stays open.
    Pending(MissingInput),
    Completed {
        block_id: String,
        block_type: BlockType,
        /// Other blocks filled by "apply to all".
        applied_to_others: usize,
    },
}

#[derive(Debug, Clone)]
pub struct CaptureFlow {
    state: CaptureState,
    apply_to_all_threshold: usize,
}

impl Default for CaptureFlow {
    fn default() -> Self {
        Self::new(2)
    }
}

impl CaptureFlow {
    /// `apply_to_all_threshold` is the minimum number of blocks sharing a
    /// type before "apply to all" is offered.
    pub fn new(apply_to_all_threshold: usize) -> Self {
        Self {
            state: CaptureState::Idle,
            apply_to_all_threshold,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn prompt(&self) -> Option<&PromptRequest> {
        match &self.state {
            CaptureState::Prompting(p) => Some(p),
            CaptureState::Idle => None,
        }
    }

    pub fn interact(
        &mut self,
        registry: &mut BlockRegistry,
        cache: &mut SignatureTypeCache,
        block_id: &str,
    ) -> Result<Interaction> {
        if let CaptureState::Prompting(open) = &self.state {
            return Err(EsignError::PromptAlreadyOpen(open.block_id.clone()));
        }
        let index = registry
            .index_of(block_id)
            .ok_or_else(|| EsignError::UnknownBlock(block_id.to_string()))?;
        let block = &registry.blocks()[index];
        if block.is_completed() {
            return Ok(Interaction::AlreadyCompleted {
                block_id: block_id.to_string(),
            });
        }
        let block_type = block.block_type().clone();

        if let Some(captured) = cache.auto_apply_candidate(&block_type).cloned() {
            apply_to_block(&mut registry.blocks_mut()[index], &captured, true)?;
            info!("Auto-applied {} to block {}", block_type, block_id);
            return Ok(Interaction::AutoApplied {
                block_id: block_id.to_string(),
            });
        }

        let incomplete_of_type = registry
            .blocks()
            .iter()
            .filter(|b| b.block_type() == &block_type && !b.is_completed())
            .count();
        let request = PromptRequest {
            registry_index: index,
            block_id: block_id.to_string(),
            label: block_type.prompt_label(),
            offer_apply_to_all: registry.count_of_type(&block_type) >= self.apply_to_all_threshold,
            incomplete_of_type,
            block_type: block_type.clone(),
        };
        cache.mark_modal_shown(&block_type);
        debug!("Prompting for {} on block {}", block_type, block_id);
        self.state = CaptureState::Prompting(request.clone());
        Ok(Interaction::Prompted(request))
    }

    pub fn confirm(
        &mut self,
        registry: &mut BlockRegistry,
        cache: &mut SignatureTypeCache,
        input: &CaptureInput,
    ) -> Result<ConfirmOutcome> {
        let request = match &self.state {
            CaptureState::Prompting(p) => p.clone(),
            CaptureState::Idle => return Err(EsignError::NoPromptOpen),
        };
        if let Some(missing) = input.missing() {
            return Ok(ConfirmOutcome::Pending(missing));
        }

        let text = input.text.trim();
        let captured = cache.capture(&request.block_type, text)?;
        let blocks = registry.blocks_mut();
        apply_to_block(&mut blocks[request.registry_index], &captured, false)?;

        let applied_to_others = if input.apply_to_all && request.offer_apply_to_all {
            let n = apply_to_all_of_type(blocks, &captured);
            info!("Applied {} to {} other blocks", request.block_type, n);
            n
        } else {
            0
        };

        self.state = CaptureState::Idle;
        Ok(ConfirmOutcome::Completed {
            block_id: request.block_id,
            block_type: request.block_type,
            applied_to_others,
        })
    }

    /// Close the prompt without changing any block.
    pub fn cancel(&mut self) -> Result<PromptRequest> {
        match std::mem::take(&mut self.state) {
            CaptureState::Prompting(p) => Ok(p),
            CaptureState::Idle => Err(EsignError::NoPromptOpen),
        }
    }
}
