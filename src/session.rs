//! Signing session controller.
//!
//! [`SigningSession`] owns every piece of mutable state for one signing
//! session: the block registry, the per-type signature cache, the navigation
//! sequencer and the capture prompt. It is created when a session starts and
//! dropped when it ends. Presentation code observes it through
//! [`SigningSession::subscribe`] instead of being driven by it.

use std::sync::Arc;

use indexmap::IndexMap;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::capture::{
    CaptureFlow, CaptureInput, CaptureState, ConfirmOutcome, Interaction, PromptRequest,
};
use crate::completion::{self, CompletionSummary, Progress};
use crate::error::{EsignError, Result};
use crate::model::{BlockType, BlockView, SignatureBlock};
use crate::navigation::{Focus, NavigationSequencer};
use crate::registry::{BlockRegistry, LegacyPlacement, RegistryConfig};
use crate::submit::{
    SignatureImageRenderer, SigningChannel, SigningPayload, SigningReceipt, build_payload,
};
use crate::template::TemplateConfigProvider;
use crate::type_cache::SignatureTypeCache;

// ────────────────────────────────────────────────────────────────────────────
// Session input
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signer {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

/// Identity and document data handed to the widget when a session starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    /// Opaque session token. Validation happens upstream; it only has to be present.
    #[serde(default)]
    pub session_token: String,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub signer: Signer,
    #[serde(default)]
    pub document_fields: IndexMap<String, serde_json::Value>,
    /// Placement for documents whose template carries no block map.
    #[serde(default)]
    pub legacy_placement: Option<LegacyPlacement>,
}

impl SessionData {
    pub fn validate(&self) -> Result<()> {
        if self.session_token.trim().is_empty() {
            return Err(EsignError::MissingSessionToken);
        }
        if self.document_id.trim().is_empty() {
            return Err(EsignError::MissingIdentifier("documentId"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub registry: RegistryConfig,
    /// Minimum number of blocks sharing a type before "apply to all" is offered.
    pub apply_to_all_threshold: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            apply_to_all_threshold: 2,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Events
// ────────────────────────────────────────────────────────────────────────────

/// State change notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum SessionEvent {
    /// A block became current; scroll it into view and highlight it.
    Focused(Focus),
    PromptOpened(PromptRequest),
    #[serde(rename_all = "camelCase")]
    PromptCancelled { block_id: String },
    #[serde(rename_all = "camelCase")]
    BlockCompleted { block_id: String, auto_applied: bool },
    /// "Applied to N blocks" notice after an apply-to-all.
    #[serde(rename_all = "camelCase")]
    AppliedToType { block_type: BlockType, count: usize },
    ProgressChanged(CompletionSummary),
    Submitted(SigningReceipt),
    SubmissionFailed { message: String },
}

pub type SessionListener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

// ────────────────────────────────────────────────────────────────────────────
// SigningSession
// ────────────────────────────────────────────────────────────────────────────

pub struct SigningSession {
    data: SessionData,
    registry: BlockRegistry,
    cache: SignatureTypeCache,
    navigation: NavigationSequencer,
    capture: CaptureFlow,
    receipt: Option<SigningReceipt>,
    listeners: Vec<SessionListener>,
}

impl SigningSession {
    /// Start a session: validate identity, fetch the template and build the
    /// registry, type cache and navigation order, in that order.
    ///
    /// Only a missing identity fails; a failing provider yields the fallback block.
    pub fn start(
        data: SessionData,
        provider: &mut dyn TemplateConfigProvider,
        config: &SessionConfig,
    ) -> Result<Self> {
        data.validate()?;
        let fetched = provider.fetch(&data.template_id);
        let registry =
            BlockRegistry::build(fetched, data.legacy_placement.as_ref(), &config.registry);
        let cache = SignatureTypeCache::for_types(registry.types());
        let navigation = NavigationSequencer::new(registry.blocks());
        info!(
            "Signing session for document {} started with {} blocks ({:?})",
            data.document_id,
            registry.len(),
            registry.source()
        );
        Ok(Self {
            data,
            registry,
            cache,
            navigation,
            capture: CaptureFlow::new(config.apply_to_all_threshold),
            receipt: None,
            listeners: Vec::new(),
        })
    }

    /// Register a listener. It immediately receives the current focus and
    /// progress, then every later change.
    pub fn subscribe(&mut self, listener: SessionListener) {
        if let Some(focus) = self.navigation.focus() {
            listener(&SessionEvent::Focused(focus));
        }
        listener(&SessionEvent::ProgressChanged(self.summary()));
        self.listeners.push(listener);
    }

    fn emit(&self, event: SessionEvent) {
        for l in &self.listeners {
            l(&event);
        }
    }

    fn emit_focus(&self, focus: Option<Focus>) -> Option<Focus> {
        if let Some(f) = &focus {
            self.emit(SessionEvent::Focused(f.clone()));
        }
        focus
    }

    fn emit_progress(&self) {
        self.emit(SessionEvent::ProgressChanged(self.summary()));
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn data(&self) -> &SessionData {
        &self.data
    }

    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    pub fn blocks(&self) -> &[SignatureBlock] {
        self.registry.blocks()
    }

    pub fn block(&self, id: &str) -> Option<&SignatureBlock> {
        self.registry.find(id)
    }

    pub fn views(&self) -> Vec<BlockView> {
        self.registry.views()
    }

    pub fn type_cache(&self) -> &SignatureTypeCache {
        &self.cache
    }

    pub fn navigation(&self) -> &NavigationSequencer {
        &self.navigation
    }

    pub fn capture_state(&self) -> &CaptureState {
        self.capture.state()
    }

    pub fn receipt(&self) -> Option<&SigningReceipt> {
        self.receipt.as_ref()
    }

    // ── Navigation ──────────────────────────────────────────────────────────

    pub fn current_block(&self) -> Option<&SignatureBlock> {
        self.navigation.current().and_then(|i| self.registry.get(i))
    }

    pub fn focus(&self) -> Option<Focus> {
        self.navigation.focus()
    }

    pub fn next(&mut self) -> Option<Focus> {
        let focus = self.navigation.next();
        self.emit_focus(focus)
    }

    pub fn previous(&mut self) -> Option<Focus> {
        let focus = self.navigation.previous();
        self.emit_focus(focus)
    }

    pub fn go_to(&mut self, index: usize) -> Option<Focus> {
        let focus = self.navigation.go_to(index);
        self.emit_focus(focus)
    }

    /// Move to the first incomplete block at or after the current one.
    pub fn go_to_next_incomplete(&mut self) -> Option<Focus> {
        let pos = self.navigation.next_incomplete(self.registry.blocks())?;
        self.go_to(pos)
    }

    /// Recompute the navigation order; the first block becomes current.
    pub fn reorder(&mut self) -> Option<Focus> {
        self.navigation.reorder(self.registry.blocks());
        let focus = self.navigation.focus();
        self.emit_focus(focus)
    }

    // ── Capture ─────────────────────────────────────────────────────────────

    /// Handle a click on a block.
    pub fn interact(&mut self, block_id: &str) -> Result<Interaction> {
        let outcome = self
            .capture
            .interact(&mut self.registry, &mut self.cache, block_id)?;
        match &outcome {
            Interaction::AutoApplied { block_id } => {
                self.emit(SessionEvent::BlockCompleted {
                    block_id: block_id.clone(),
                    auto_applied: true,
                });
                self.emit_progress();
            }
            Interaction::Prompted(request) => {
                self.emit(SessionEvent::PromptOpened(request.clone()));
            }
            Interaction::AlreadyCompleted { .. } => {}
        }
        Ok(outcome)
    }

    /// Interact with the current block, if any.
    pub fn interact_current(&mut self) -> Result<Option<Interaction>> {
        let Some(id) = self.current_block().map(|b| b.id().to_string()) else {
            return Ok(None);
        };
        self.interact(&id).map(Some)
    }

    /// Confirm the open prompt.
    pub fn confirm(&mut self, input: &CaptureInput) -> Result<ConfirmOutcome> {
        let outcome = self
            .capture
            .confirm(&mut self.registry, &mut self.cache, input)?;
        if let ConfirmOutcome::Completed {
            block_id,
            block_type,
            applied_to_others,
        } = &outcome
        {
            self.emit(SessionEvent::BlockCompleted {
                block_id: block_id.clone(),
                auto_applied: false,
            });
            if *applied_to_others > 0 {
                self.emit(SessionEvent::AppliedToType {
                    block_type: block_type.clone(),
                    count: *applied_to_others,
                });
            }
            self.emit_progress();
        }
        Ok(outcome)
    }

    /// Close the open prompt without changing any block.
    pub fn cancel(&mut self) -> Result<()> {
        let request = self.capture.cancel()?;
        self.emit(SessionEvent::PromptCancelled {
            block_id: request.block_id,
        });
        Ok(())
    }

    // ── Completion ──────────────────────────────────────────────────────────

    pub fn progress(&self) -> Progress {
        completion::progress(self.registry.blocks())
    }

    pub fn progress_by_type(&self) -> IndexMap<BlockType, Progress> {
        completion::progress_by_type(self.registry.blocks())
    }

    pub fn remaining(&self) -> usize {
        completion::remaining(self.registry.blocks())
    }

    pub fn is_submittable(&self) -> bool {
        completion::is_submittable(self.registry.blocks())
    }

    pub fn summary(&self) -> CompletionSummary {
        completion::summary(self.registry.blocks())
    }

    // ── Submission ──────────────────────────────────────────────────────────

    pub fn payload(&self, renderer: &dyn SignatureImageRenderer) -> Result<SigningPayload> {
        build_payload(&self.data, self.registry.blocks(), renderer)
            .map_err(|e| EsignError::ImageRender(format!("{:#}", e)))
    }

    /// Send the signed blocks to `channel`.
    ///
    /// A failed request leaves every block and captured value as it was, so
    /// the caller can simply try again.
    pub fn submit(
        &mut self,
        channel: &mut dyn SigningChannel,
        renderer: &dyn SignatureImageRenderer,
    ) -> Result<SigningReceipt> {
        if self.receipt.is_some() {
            return Err(EsignError::AlreadySubmitted(self.data.document_id.clone()));
        }
        let summary = self.summary();
        if !summary.submittable {
            return Err(EsignError::NotSubmittable {
                completed: summary.required_completed,
                required: summary.required_total,
            });
        }
        let payload = self.payload(renderer)?;
        match channel.submit(&payload) {
            Ok(receipt) => {
                info!(
                    "Document {} signed: {}",
                    receipt.document_id, receipt.status
                );
                self.receipt = Some(receipt.clone());
                self.emit(SessionEvent::Submitted(receipt.clone()));
                Ok(receipt)
            }
            Err(err) => {
                let message = format!("{:#}", err);
                error!("Signing request for {} failed: {}", self.data.document_id, message);
                self.emit(SessionEvent::SubmissionFailed {
                    message: message.clone(),
                });
                Err(EsignError::Submission(message))
            }
        }
    }
}
