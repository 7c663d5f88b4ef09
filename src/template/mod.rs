//! Template configuration: where signature blocks go on a document.
//!
//! A template config maps block ids to their default placement. Sub-modules:
//!
//! - [`source`] – Content sources (filesystem vs. ZIP) and providers built on them

pub mod source;

pub use source::*;

use anyhow::{Context, Result, anyhow};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::BlockType;

/// Placement description for a single block as delivered by the template API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPlacement {
    #[serde(default = "default_page")]
    pub default_page: i64,
    pub default_x: f64,
    pub default_y: f64,
    #[serde(default)]
    pub default_width: f64,
    #[serde(default)]
    pub default_height: f64,
    #[serde(rename = "type", default)]
    pub block_type: BlockType,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_page() -> i64 {
    1
}

fn default_required() -> bool {
    true
}

/// Ordered mapping of block id to placement. Insertion order is the
/// registry order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateConfig {
    pub blocks: IndexMap<String, BlockPlacement>,
}

impl TemplateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_block(mut self, id: impl Into<String>, placement: BlockPlacement) -> Self {
        self.blocks.insert(id.into(), placement);
        self
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Parse a template config from JSON.
    ///
    /// Accepts either the bare id → placement object or the same object
    /// wrapped in a top-level `signatureBlocks` key.
    pub fn from_json(text: &str) -> Result<Self> {
        let v: serde_json::Value =
            serde_json::from_str(text).context("Failed to parse template config JSON")?;
        let blocks_value = match v.get("signatureBlocks") {
            Some(inner) if inner.is_object() => inner.clone(),
            _ => v,
        };
        if !blocks_value.is_object() {
            return Err(anyhow!("Template config must be a JSON object"));
        }
        let config: TemplateConfig = serde_json::from_value(blocks_value)
            .context("Failed to deserialize template placements")?;
        Ok(config)
    }
}

/// Source of template configurations, keyed by template id.
pub trait TemplateConfigProvider {
    fn fetch(&mut self, template_id: &str) -> Result<TemplateConfig>;
}

/// Fixed two-page template used in dev mode and demos.
pub fn mock_template_config() -> TemplateConfig {
    TemplateConfig::new()
        .with_block(
            "signature_1",
            BlockPlacement {
                default_page: 1,
                default_x: 10.0,
                default_y: 85.0,
                default_width: 200.0,
                default_height: 50.0,
                block_type: BlockType::Signature,
                required: true,
            },
        )
        .with_block(
            "initial_1",
            BlockPlacement {
                default_page: 1,
                default_x: 80.0,
                default_y: 92.0,
                default_width: 80.0,
                default_height: 40.0,
                block_type: BlockType::Initial,
                required: false,
            },
        )
        .with_block(
            "initial_2",
            BlockPlacement {
                default_page: 2,
                default_x: 80.0,
                default_y: 92.0,
                default_width: 80.0,
                default_height: 40.0,
                block_type: BlockType::Initial,
                required: false,
            },
        )
        .with_block(
            "signature_2",
            BlockPlacement {
                default_page: 2,
                default_x: 10.0,
                default_y: 70.0,
                default_width: 200.0,
                default_height: 50.0,
                block_type: BlockType::Signature,
                required: true,
            },
        )
}

/// Provider that serves [`mock_template_config`] for every template id, or
/// fails every fetch when built with [`MockTemplateProvider::failing`].
#[derive(Debug, Clone, Default)]
pub struct MockTemplateProvider {
    failure: Option<String>,
}

impl MockTemplateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
        }
    }
}

impl TemplateConfigProvider for MockTemplateProvider {
    fn fetch(&mut self, template_id: &str) -> Result<TemplateConfig> {
        match &self.failure {
            Some(msg) => Err(anyhow!("Template {}: {}", template_id, msg)),
            None => Ok(mock_template_config()),
        }
    }
}

/// Any closure from template id to config is a provider; handy for fixtures.
impl<F> TemplateConfigProvider for F
where
    F: FnMut(&str) -> Result<TemplateConfig>,
{
    fn fetch(&mut self, template_id: &str) -> Result<TemplateConfig> {
        self(template_id)
    }
}
