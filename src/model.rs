use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ────────────────────────────────────────────────────────────────────────────
// BlockType
// ────────────────────────────────────────────────────────────────────────────

/// Category of mark expected in a block.
///
/// The set is open: templates may declare any type string. `"signature"` and
/// `"initial"` get dedicated variants because prompts and defaults depend on
/// them; everything else is kept verbatim in [`BlockType::Other`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    #[default]
    Signature,
    Initial,
    Other(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Signature => "signature",
            BlockType::Initial => "initial",
            BlockType::Other(s) => s.as_str(),
        }
    }

    /// Text shown above the input field when prompting for this type.
    pub fn prompt_label(&self) -> String {
        match self {
            BlockType::Signature => "Type your full name to sign".to_string(),
            BlockType::Initial => "Type your initials".to_string(),
            BlockType::Other(s) => format!("Enter your {}", s),
        }
    }
}

impl From<&str> for BlockType {
    fn from(s: &str) -> Self {
        match s.trim() {
            "signature" => BlockType::Signature,
            "initial" | "initials" => BlockType::Initial,
            other => BlockType::Other(other.to_string()),
        }
    }
}

impl From<String> for BlockType {
    fn from(s: String) -> Self {
        BlockType::from(s.as_str())
    }
}

impl From<BlockType> for String {
    fn from(t: BlockType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// Top-left anchor of a block as percentages (0–100) of the page size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Block size in pixels at 100% zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SignatureBlock
// ────────────────────────────────────────────────────────────────────────────

/// Value applied to a block once it has been signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub signature_text: String,
    pub timestamp: DateTime<Utc>,
    pub auto_applied: bool,
}

/// One placeable signature/initial region.
///
/// Placement fields are private and only readable: after construction only
/// the completion can change, and only from `None` to `Some`.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureBlock {
    id: String,
    page: u32,
    position: Position,
    dimensions: Dimensions,
    block_type: BlockType,
    required: bool,
    completion: Option<Completion>,
}

impl SignatureBlock {
    pub fn new(
        id: impl Into<String>,
        page: u32,
        position: Position,
        dimensions: Dimensions,
        block_type: BlockType,
        required: bool,
    ) -> Self {
        Self {
            id: id.into(),
            page: page.max(1),
            position,
            dimensions,
            block_type,
            required,
            completion: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn block_type(&self) -> &BlockType {
        &self.block_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_completed(&self) -> bool {
        self.completion.is_some()
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    pub fn signature_text(&self) -> Option<&str> {
        self.completion.as_ref().map(|c| c.signature_text.as_str())
    }

    pub fn is_auto_applied(&self) -> bool {
        self.completion.as_ref().is_some_and(|c| c.auto_applied)
    }

    /// Mark the block as completed. Returns `false` (and leaves the block
    /// untouched) when it was already completed or `text` is blank.
    pub(crate) fn complete(
        &mut self,
        text: &str,
        timestamp: DateTime<Utc>,
        auto_applied: bool,
    ) -> bool {
        if self.completion.is_some() || text.trim().is_empty() {
            return false;
        }
        self.completion = Some(Completion {
            signature_text: text.to_string(),
            timestamp,
            auto_applied,
        });
        true
    }

    /// Sort key used by navigation: page, then y, then x.
    pub fn order_key(&self) -> (u32, f64, f64) {
        (self.page, self.position.y, self.position.x)
    }

    /// Flat projection for a presentation layer.
    pub fn view(&self) -> BlockView {
        BlockView {
            id: self.id.clone(),
            page: self.page,
            position: self.position,
            dimensions: self.dimensions,
            block_type: self.block_type.clone(),
            required: self.required,
            completed: self.is_completed(),
            signature_text: self.signature_text().map(str::to_string),
            timestamp: self.completion.as_ref().map(|c| c.timestamp),
            auto_applied: self.is_auto_applied(),
        }
    }
}

/// Everything a UI needs to draw an overlay for a block and bind a click handler.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockView {
    pub id: String,
    pub page: u32,
    pub position: Position,
    pub dimensions: Dimensions,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub required: bool,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub auto_applied: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Captured values and per-type status
// ────────────────────────────────────────────────────────────────────────────

/// The most recent value entered for a block type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedSignature {
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub block_type: BlockType,
}

/// Whether the entry prompt has been shown for a type and whether a value
/// has been captured for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureTypeStatus {
    pub modal_shown: bool,
    pub captured: bool,
}
