//! Signing request assembly and the submission boundary.
//!
//! [`build_payload`] turns the completed blocks of a session into the JSON
//! body expected by the signing endpoint. Transport lives behind
//! [`SigningChannel`]; [`MockSigningChannel`] answers the way the dev-mode
//! endpoint does.

use anyhow::{Result, anyhow};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{BlockType, Dimensions, SignatureBlock};
use crate::session::{SessionData, Signer};

// ────────────────────────────────────────────────────────────────────────────
// Payload
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePosition {
    pub page_number: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureEntry {
    /// Data URI of the rendered signature.
    pub signature_image: String,
    pub position: SignaturePosition,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureData {
    pub signatures: Vec<SignatureEntry>,
}

/// Body of a signing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningPayload {
    pub template_id: String,
    pub document_id: String,
    pub signer: Signer,
    pub document_fields: IndexMap<String, serde_json::Value>,
    pub signature_data: SignatureData,
}

/// Response of a successful signing request. Fields beyond the fixed ones
/// are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningReceipt {
    pub status: String,
    pub document_id: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ────────────────────────────────────────────────────────────────────────────
// Signature images
// ────────────────────────────────────────────────────────────────────────────

/// Turns typed signature text into an image for the signing request.
pub trait SignatureImageRenderer {
    /// Return a data URI for `text` rendered at the block's size.
    fn render(&self, text: &str, block_type: &BlockType, dimensions: Dimensions) -> Result<String>;
}

/// Renders the text into a small SVG document.
#[derive(Debug, Clone)]
pub struct SvgSignatureRenderer {
    pub font_family: String,
    pub color: String,
}

impl Default for SvgSignatureRenderer {
    fn default() -> Self {
        Self {
            font_family: "'Brush Script MT', cursive".to_string(),
            color: "#1a237e".to_string(),
        }
    }
}

impl SvgSignatureRenderer {
    pub fn render_svg(&self, text: &str, block_type: &BlockType, dimensions: Dimensions) -> String {
        let font_scale = match block_type {
            BlockType::Initial => 0.5,
            _ => 0.6,
        };
        let font_size = (dimensions.height * font_scale).max(1.0);
        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                r#"<text x="50%" y="50%" dominant-baseline="middle" text-anchor="middle" "#,
                r#"font-family="{font}" font-size="{size}" fill="{color}">{text}</text></svg>"#
            ),
            w = dimensions.width,
            h = dimensions.height,
            font = html_escape::encode_double_quoted_attribute(&self.font_family),
            size = font_size,
            color = html_escape::encode_double_quoted_attribute(&self.color),
            text = html_escape::encode_text(text),
        )
    }
}

impl SignatureImageRenderer for SvgSignatureRenderer {
    fn render(&self, text: &str, block_type: &BlockType, dimensions: Dimensions) -> Result<String> {
        if dimensions.width <= 0.0 || dimensions.height <= 0.0 {
            return Err(anyhow!(
                "Invalid signature size {}x{}",
                dimensions.width,
                dimensions.height
            ));
        }
        let svg = self.render_svg(text, block_type, dimensions);
        Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg)))
    }
}

/// Assemble the signing request from every completed block, in registry order.
pub fn build_payload(
    data: &SessionData,
    blocks: &[SignatureBlock],
    renderer: &dyn SignatureImageRenderer,
) -> Result<SigningPayload> {
    let mut signatures = Vec::new();
    for block in blocks {
        let Some(text) = block.signature_text() else {
            continue;
        };
        let image = renderer.render(text, block.block_type(), block.dimensions())?;
        signatures.push(SignatureEntry {
            signature_image: image,
            position: SignaturePosition {
                page_number: block.page(),
                x: block.position().x,
                y: block.position().y,
                width: block.dimensions().width,
                height: block.dimensions().height,
            },
            block_type: block.block_type().clone(),
            id: block.id().to_string(),
        });
    }
    Ok(SigningPayload {
        template_id: data.template_id.clone(),
        document_id: data.document_id.clone(),
        signer: data.signer.clone(),
        document_fields: data.document_fields.clone(),
        signature_data: SignatureData { signatures },
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Channels
// ────────────────────────────────────────────────────────────────────────────

/// Delivers a signing request to the signing endpoint.
pub trait SigningChannel {
    fn submit(&mut self, payload: &SigningPayload) -> Result<SigningReceipt>;
}

/// In-process channel used in dev mode and tests.
///
/// Records every payload it receives and answers with a `SUCCESS` receipt
/// marked `mockData`, or fails with the configured message.
#[derive(Debug, Clone, Default)]
pub struct MockSigningChannel {
    failure: Option<String>,
    received: Vec<SigningPayload>,
}

impl MockSigningChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            received: Vec::new(),
        }
    }

    pub fn set_failure(&mut self, message: Option<String>) {
        self.failure = message;
    }

    pub fn received(&self) -> &[SigningPayload] {
        &self.received
    }
}

impl SigningChannel for MockSigningChannel {
    fn submit(&mut self, payload: &SigningPayload) -> Result<SigningReceipt> {
        self.received.push(payload.clone());
        if let Some(msg) = &self.failure {
            return Err(anyhow!("{}", msg));
        }
        let mut extra = serde_json::Map::new();
        extra.insert("mockData".to_string(), serde_json::Value::Bool(true));
        Ok(SigningReceipt {
            status: "SUCCESS".to_string(),
            document_id: payload.document_id.clone(),
            timestamp: Utc::now().to_rfc3339(),
            extra,
        })
    }
}
