//! Signature block registry.
//!
//! Builds the canonical list of [`SignatureBlock`]s for one signing session.
//! The list comes from the template config when it yields any blocks, from
//! the legacy single-block placement carried in session data otherwise, and
//! from a fixed fallback block when the template provider failed.

use anyhow::Result;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::model::{BlockType, BlockView, Dimensions, Position, SignatureBlock};
use crate::template::{BlockPlacement, TemplateConfig};

/// Single-block placement used by documents created before templates
/// carried a block map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegacyPlacement {
    pub page: u32,
    pub position: Position,
}

/// Where the blocks of a registry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RegistrySource {
    Template,
    Legacy,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Size given to legacy blocks and to template blocks without a usable size.
    pub legacy_dimensions: Dimensions,
    /// Block used when the template provider fails.
    pub fallback_block: SignatureBlock,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            legacy_dimensions: Dimensions::new(200.0, 50.0),
            fallback_block: SignatureBlock::new(
                "fallback_signature",
                1,
                Position::new(25.0, 90.0),
                Dimensions::new(200.0, 50.0),
                BlockType::Signature,
                true,
            ),
        }
    }
}

/// Owns the blocks of one signing session, in registry order.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    blocks: Vec<SignatureBlock>,
    source: RegistrySource,
}

impl BlockRegistry {
    /// Build from the outcome of a template fetch.
    ///
    /// A failed fetch is logged and replaced by the fallback block; it is
    /// never surfaced as an error.
    pub fn build(
        fetched: Result<TemplateConfig>,
        legacy: Option<&LegacyPlacement>,
        config: &RegistryConfig,
    ) -> Self {
        match fetched {
            Ok(template) => Self::from_template(&template, legacy, config),
            Err(err) => {
                warn!("Template config unavailable, using fallback block: {:#}", err);
                Self::fallback(config)
            }
        }
    }

    pub fn from_template(
        template: &TemplateConfig,
        legacy: Option<&LegacyPlacement>,
        config: &RegistryConfig,
    ) -> Self {
        let blocks: Vec<SignatureBlock> = template
            .blocks
            .iter()
            .map(|(id, placement)| block_from_placement(id, placement, config))
            .collect();
        if !blocks.is_empty() {
            info!("Registry built from template with {} blocks", blocks.len());
            return Self {
                blocks,
                source: RegistrySource::Template,
            };
        }
        match legacy {
            Some(legacy) => {
                info!("Template has no blocks, using legacy placement on page {}", legacy.page);
                Self {
                    blocks: vec![SignatureBlock::new(
                        "legacy_signature",
                        legacy.page,
                        clamp_position(legacy.position),
                        config.legacy_dimensions,
                        BlockType::Signature,
                        true,
                    )],
                    source: RegistrySource::Legacy,
                }
            }
            None => {
                warn!("Template has no blocks and no legacy placement, using fallback block");
                Self::fallback(config)
            }
        }
    }

    pub fn fallback(config: &RegistryConfig) -> Self {
        Self {
            blocks: vec![config.fallback_block.clone()],
            source: RegistrySource::Fallback,
        }
    }

    pub fn source(&self) -> RegistrySource {
        self.source
    }

    pub fn blocks(&self) -> &[SignatureBlock] {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut [SignatureBlock] {
        &mut self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SignatureBlock> {
        self.blocks.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.id() == id)
    }

    pub fn find(&self, id: &str) -> Option<&SignatureBlock> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    /// Distinct block types in order of first appearance.
    pub fn types(&self) -> Vec<BlockType> {
        let mut out: Vec<BlockType> = Vec::new();
        for b in &self.blocks {
            if !out.contains(b.block_type()) {
                out.push(b.block_type().clone());
            }
        }
        out
    }

    pub fn count_of_type(&self, block_type: &BlockType) -> usize {
        self.blocks
            .iter()
            .filter(|b| b.block_type() == block_type)
            .count()
    }

    pub fn views(&self) -> Vec<BlockView> {
        self.blocks.iter().map(SignatureBlock::view).collect()
    }
}

fn clamp_position(position: Position) -> Position {
    Position::new(position.x.clamp(0.0, 100.0), position.y.clamp(0.0, 100.0))
}

fn block_from_placement(
    id: &str,
    placement: &BlockPlacement,
    config: &RegistryConfig,
) -> SignatureBlock {
    let page = if placement.default_page < 1 {
        warn!(
            "Block {}: page {} out of range, using page 1",
            id, placement.default_page
        );
        1
    } else {
        u32::try_from(placement.default_page).unwrap_or(u32::MAX)
    };

    let raw = Position::new(placement.default_x, placement.default_y);
    let position = clamp_position(raw);
    if position != raw {
        warn!(
            "Block {}: position ({}, {}) clamped to ({}, {})",
            id, raw.x, raw.y, position.x, position.y
        );
    }

    let dimensions = if placement.default_width > 0.0 && placement.default_height > 0.0 {
        Dimensions::new(placement.default_width, placement.default_height)
    } else {
        debug!("Block {}: no usable size, using legacy dimensions", id);
        config.legacy_dimensions
    };

    SignatureBlock::new(
        id,
        page,
        position,
        dimensions,
        placement.block_type.clone(),
        placement.required,
    )
}
