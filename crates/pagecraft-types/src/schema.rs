//! Content schemas: parsing raw JSON into typed content and validating it.
//!
//! Structural rules (field names and types) come from the serde definitions
//! in [`crate::block`]. Semantic rules live here:
//!
//! - links must be absolute http(s), site-relative, anchors, `mailto:` or `tel:`
//! - a button label needs a link to go with it
//! - every service item needs a title
//! - an email address needs a local part and a domain
//!
//! `Generic` content is never rejected.

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::block::{BlockContent, BlockKind, GenericContent};

/// Content does not conform to the schema of its kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A field that must be present alongside another one is empty.
    #[error("{kind} block: field `{field}` is required")]
    MissingField { kind: BlockKind, field: String },

    /// A field is present but its value is not acceptable.
    #[error("{kind} block: field `{field}` is invalid: {reason}")]
    InvalidField {
        kind: BlockKind,
        field: String,
        reason: String,
    },

    /// The payload does not have the shape of the kind at all.
    #[error("{kind} block: malformed content: {reason}")]
    Malformed { kind: BlockKind, reason: String },

    /// Content of one kind was offered to a block of another kind.
    #[error("content of kind {found} cannot be stored in a {expected} block")]
    KindMismatch { expected: BlockKind, found: BlockKind },
}

impl ValidationError {
    fn missing(kind: BlockKind, field: impl Into<String>) -> Self {
        Self::MissingField {
            kind,
            field: field.into(),
        }
    }

    fn invalid(kind: BlockKind, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            kind,
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for schema checks.
pub type Result<T> = std::result::Result<T, ValidationError>;

impl BlockContent {
    /// Check the semantic rules for this content's kind.
    pub fn validate(&self) -> Result<()> {
        let kind = self.kind();
        match self {
            BlockContent::Hero(hero) => {
                check_button(kind, "cta_text", &hero.cta_text, "cta_link", &hero.cta_link)
            }
            BlockContent::About(_) => Ok(()),
            BlockContent::Services(services) => {
                for (i, item) in services.items.iter().enumerate() {
                    if item.title.trim().is_empty() {
                        return Err(ValidationError::missing(kind, format!("items[{i}].title")));
                    }
                }
                Ok(())
            }
            BlockContent::Cta(cta) => check_button(
                kind,
                "button_text",
                &cta.button_text,
                "button_link",
                &cta.button_link,
            ),
            BlockContent::Contact(contact) => match non_blank(&contact.email) {
                Some(email) if !is_plausible_email(email) => Err(ValidationError::invalid(
                    kind,
                    "email",
                    format!("`{email}` is not an email address"),
                )),
                _ => Ok(()),
            },
            BlockContent::Generic(_) => Ok(()),
        }
    }

    /// Check that this content may be stored in a block of `expected` kind.
    pub fn validate_for(&self, expected: BlockKind) -> Result<()> {
        let found = self.kind();
        if found != expected {
            return Err(ValidationError::KindMismatch { expected, found });
        }
        self.validate()
    }

    /// Decode a raw JSON payload (without the type tag) as content of `kind`,
    /// then validate it.
    ///
    /// For `Generic` the payload is kept verbatim.
    pub fn from_value(kind: BlockKind, value: Value) -> Result<Self> {
        let content = match kind {
            BlockKind::Hero => BlockContent::Hero(decode(kind, value)?),
            BlockKind::About => BlockContent::About(decode(kind, value)?),
            BlockKind::Services => BlockContent::Services(decode(kind, value)?),
            BlockKind::Cta => BlockContent::Cta(decode(kind, value)?),
            BlockKind::Contact => BlockContent::Contact(decode(kind, value)?),
            BlockKind::Generic => BlockContent::Generic(GenericContent {
                kind: kind.as_str().to_string(),
                payload: value,
            }),
        };
        content.validate()?;
        Ok(content)
    }

    /// Decode a payload labelled with a free-form type name.
    ///
    /// Known names must conform to their schema; unknown names become
    /// `Generic` content carrying the name and the untouched payload.
    pub fn from_raw(type_name: &str, value: Value) -> Result<Self> {
        match BlockKind::from_str(type_name) {
            Some(kind) if kind.is_typed() => Self::from_value(kind, value),
            _ => Ok(BlockContent::Generic(GenericContent {
                kind: type_name.to_string(),
                payload: value,
            })),
        }
    }
}

fn decode<T: DeserializeOwned>(kind: BlockKind, value: Value) -> Result<T> {
    if !value.is_object() {
        return Err(ValidationError::Malformed {
            kind,
            reason: "expected a JSON object".to_string(),
        });
    }
    serde_json::from_value(value).map_err(|e| ValidationError::Malformed {
        kind,
        reason: e.to_string(),
    })
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn check_button(
    kind: BlockKind,
    label_field: &str,
    label: &Option<String>,
    link_field: &str,
    link: &Option<String>,
) -> Result<()> {
    match (non_blank(label), non_blank(link)) {
        (Some(_), None) => Err(ValidationError::missing(kind, link_field)),
        (_, Some(link)) if !is_acceptable_link(link) => Err(ValidationError::invalid(
            kind,
            link_field,
            format!("`{link}` is not a supported link (label field `{label_field}`)"),
        )),
        _ => Ok(()),
    }
}

fn is_acceptable_link(link: &str) -> bool {
    const PREFIXES: [&str; 6] = ["https://", "http://", "/", "#", "mailto:", "tel:"];
    PREFIXES.iter().any(|p| link.starts_with(p)) && !link.contains(char::is_whitespace)
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        _ => false,
    }
}
