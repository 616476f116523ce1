//! Block types: the closed set of page section variants and their content.
//!
//! ## Design: one sum type for content
//!
//! `BlockContent` is a tagged union keyed by [`BlockKind`]. Each variant
//! carries its own structured schema, so a block's content can never disagree
//! with its type, and renderers match exhaustively instead of switching on a
//! type string. `Generic` is the escape hatch: it keeps an unrecognized type
//! name and its raw JSON payload verbatim.
//!
//! Every typed field defaults to empty when absent, so an empty block of any
//! kind is valid. What makes content *invalid* lives in [`crate::schema`].

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::BlockId;
use crate::order::OrderKey;

/// What a block *is* (its section type).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum BlockKind {
    /// Page header: headline, subheadline, primary call to action.
    Hero,
    /// Free-form "about us" section.
    About,
    /// List of offered services.
    Services,
    /// Call-to-action banner.
    Cta,
    /// Contact details.
    Contact,
    /// Unrecognized type, payload kept as-is.
    Generic,
}

impl BlockKind {
    /// All variants, in declaration order.
    pub const ALL: [BlockKind; 6] = [
        BlockKind::Hero,
        BlockKind::About,
        BlockKind::Services,
        BlockKind::Cta,
        BlockKind::Contact,
        BlockKind::Generic,
    ];

    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Hero => "hero",
            BlockKind::About => "about",
            BlockKind::Services => "services",
            BlockKind::Cta => "cta",
            BlockKind::Contact => "contact",
            BlockKind::Generic => "generic",
        }
    }

    /// Check if this kind has a structured schema.
    pub fn is_typed(&self) -> bool {
        !matches!(self, BlockKind::Generic)
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Helper for `#[serde(skip_serializing_if)]` on optional strings.
fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().is_none_or(str::is_empty)
}

/// Hero section content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeroContent {
    pub headline: String,
    #[serde(skip_serializing_if = "is_blank")]
    pub subheadline: Option<String>,
    /// Label of the primary button.
    #[serde(skip_serializing_if = "is_blank")]
    pub cta_text: Option<String>,
    /// Target of the primary button.
    #[serde(skip_serializing_if = "is_blank")]
    pub cta_link: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub background_image: Option<String>,
}

/// About section content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AboutContent {
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "is_blank")]
    pub image: Option<String>,
}

/// One entry of a services list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceItem {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "is_blank")]
    pub icon: Option<String>,
}

/// Services section content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServicesContent {
    pub title: String,
    pub items: Vec<ServiceItem>,
}

/// Call-to-action banner content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CtaContent {
    pub headline: String,
    #[serde(skip_serializing_if = "is_blank")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub button_text: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub button_link: Option<String>,
}

/// Contact section content.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContactContent {
    pub title: String,
    #[serde(skip_serializing_if = "is_blank")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "is_blank")]
    pub address: Option<String>,
}

/// Opaque content of a block whose type this crate does not know.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericContent {
    /// The original type name, e.g. `"testimonials"`.
    pub kind: String,
    /// The raw payload, never interpreted.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Content of a block, keyed by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum BlockContent {
    Hero(HeroContent),
    About(AboutContent),
    Services(ServicesContent),
    Cta(CtaContent),
    Contact(ContactContent),
    Generic(GenericContent),
}

impl BlockContent {
    /// The kind this content belongs to.
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockContent::Hero(_) => BlockKind::Hero,
            BlockContent::About(_) => BlockKind::About,
            BlockContent::Services(_) => BlockKind::Services,
            BlockContent::Cta(_) => BlockKind::Cta,
            BlockContent::Contact(_) => BlockKind::Contact,
            BlockContent::Generic(_) => BlockKind::Generic,
        }
    }

    /// Empty content for a kind.
    pub fn empty(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Hero => BlockContent::Hero(HeroContent::default()),
            BlockKind::About => BlockContent::About(AboutContent::default()),
            BlockKind::Services => BlockContent::Services(ServicesContent::default()),
            BlockKind::Cta => BlockContent::Cta(CtaContent::default()),
            BlockKind::Contact => BlockContent::Contact(ContactContent::default()),
            BlockKind::Generic => BlockContent::Generic(GenericContent {
                kind: BlockKind::Generic.as_str().to_string(),
                payload: serde_json::Value::Null,
            }),
        }
    }

    /// Shorthand for a hero block with just a headline.
    pub fn hero(headline: impl Into<String>) -> Self {
        BlockContent::Hero(HeroContent {
            headline: headline.into(),
            ..Default::default()
        })
    }

    /// The payload as JSON, without the type tag.
    ///
    /// This is the shape generation prompts and raw renderers see. For
    /// `Generic` it is the verbatim payload.
    pub fn to_value(&self) -> serde_json::Value {
        let value = match self {
            BlockContent::Hero(c) => serde_json::to_value(c),
            BlockContent::About(c) => serde_json::to_value(c),
            BlockContent::Services(c) => serde_json::to_value(c),
            BlockContent::Cta(c) => serde_json::to_value(c),
            BlockContent::Contact(c) => serde_json::to_value(c),
            BlockContent::Generic(c) => return c.payload.clone(),
        };
        value.unwrap_or(serde_json::Value::Null)
    }
}

/// Who produced a content change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Typed or pasted by the person editing.
    #[default]
    User,
    /// Produced by the generation collaborator.
    Generated,
}

impl Provenance {
    pub fn is_generated(&self) -> bool {
        matches!(self, Provenance::Generated)
    }
}

/// A block as stored on a page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Stable identity, never reused.
    pub id: BlockId,
    /// Rank among the page's blocks.
    pub order: OrderKey,
    /// Structured content; determines the block's kind.
    pub content: BlockContent,
    /// Whether the content was produced or last modified by generation.
    #[serde(default)]
    pub ai_generated: bool,
    /// Content version, starts at 1 and grows by one per content mutation.
    pub version: u64,
    /// Unix millis.
    pub created_at: u64,
    /// Unix millis of the last content mutation.
    pub updated_at: u64,
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        self.content.kind()
    }
}

/// A block about to be inserted.
///
/// `id` is usually left empty so the store assigns a fresh one.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBlock {
    pub id: Option<BlockId>,
    pub content: BlockContent,
    pub ai_generated: bool,
}

impl NewBlock {
    /// A user-authored block.
    pub fn new(content: BlockContent) -> Self {
        Self {
            id: None,
            content,
            ai_generated: false,
        }
    }

    /// An empty block of the given kind.
    pub fn empty(kind: BlockKind) -> Self {
        Self::new(BlockContent::empty(kind))
    }

    /// A generation-authored block.
    pub fn generated(content: BlockContent) -> Self {
        Self {
            ai_generated: true,
            ..Self::new(content)
        }
    }

    /// Request a specific ID instead of a fresh one.
    pub fn with_id(mut self, id: BlockId) -> Self {
        self.id = Some(id);
        self
    }
}

impl From<BlockContent> for NewBlock {
    fn from(content: BlockContent) -> Self {
        Self::new(content)
    }
}
