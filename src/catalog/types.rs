//! Core field types

use serde::{Deserialize, Serialize};
use std::fmt;

/// The input kind of a declared field.
///
/// Fields of different kinds are never merged: filling the same value into
/// incompatible input types silently corrupts generated documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Number,
    Checkbox,
    Signature,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Date => "date",
            FieldKind::Number => "number",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Signature => "signature",
        }
    }

    pub fn parse(s: &str) -> Option<FieldKind> {
        match s {
            "text" => Some(FieldKind::Text),
            "date" => Some(FieldKind::Date),
            "number" => Some(FieldKind::Number),
            "checkbox" => Some(FieldKind::Checkbox),
            "signature" => Some(FieldKind::Signature),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Merge state of a field.
///
/// A tagged union instead of loose metadata columns: a field cannot claim to
/// be both a primary and an alias, and an alias always carries its
/// back-reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum FieldRole {
    /// Canonical member of a group. Its declared name is the lookup key
    /// for submitted values. The alias list is derived from alias rows at
    /// load time, never stored.
    Primary {
        group_id: String,
        group_name: String,
        aliases: Vec<String>,
    },
    /// Non-canonical group member; inherits the primary's value at fill time.
    Alias {
        group_id: String,
        group_name: String,
        primary_id: String,
    },
    Unmerged,
}

impl FieldRole {
    pub fn group_id(&self) -> Option<&str> {
        match self {
            FieldRole::Primary { group_id, .. } | FieldRole::Alias { group_id, .. } => {
                Some(group_id)
            }
            FieldRole::Unmerged => None,
        }
    }

    pub fn is_unmerged(&self) -> bool {
        matches!(self, FieldRole::Unmerged)
    }
}

/// One declared fillable location on a document template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: String,
    pub template_id: String,
    /// Raw operator-entered name, not guaranteed unique.
    pub name: String,
    pub kind: FieldKind,
    /// 1-based page number.
    pub page: u32,
    /// PDF point space, origin bottom-left.
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub required: bool,
    pub validation_pattern: Option<String>,
    pub role: FieldRole,
}

impl Field {
    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}
