//! Fill resolution: submission values to draw instructions
//!
//! Pure computation over an in-memory catalog snapshot. A submission map is
//! keyed by canonical field name (the primary's declared name, never a field
//! id or page). Every group member with a value emits one instruction at its
//! own coordinates, which is what makes a single submitted value appear at
//! every physical location of the group.

use serde::Serialize;
use std::collections::HashMap;

use crate::catalog::{Field, FieldRole};
use crate::error::{AppError, Result};

/// One resolved text placement, ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawInstruction {
    /// 1-based page number
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub text: String,
}

/// Expand a value map into draw instructions.
///
/// Fields with no value (absent key or empty string) are silently skipped —
/// optional fields legitimately have no value. A broken group invariant
/// (alias without its primary, or a primary/alias disagreement) aborts the
/// whole resolve with `CatalogCorruption`: a document with values silently
/// missing is worse than no document.
///
/// Output is stably ordered by ascending page, declaration order within a
/// page, so rendering and test assertions are deterministic.
pub fn resolve(fields: &[Field], values: &HashMap<String, String>) -> Result<Vec<DrawInstruction>> {
    let by_id: HashMap<&str, &Field> = fields.iter().map(|f| (f.id.as_str(), f)).collect();

    let mut instructions = Vec::new();

    for field in fields {
        let canonical_name = match &field.role {
            FieldRole::Unmerged | FieldRole::Primary { .. } => field.name.as_str(),
            FieldRole::Alias {
                primary_id,
                group_id,
                ..
            } => {
                let primary = by_id.get(primary_id.as_str()).ok_or_else(|| {
                    AppError::CatalogCorruption(format!(
                        "alias field {} references missing primary {}",
                        field.id, primary_id
                    ))
                })?;
                match &primary.role {
                    FieldRole::Primary {
                        group_id: primary_group,
                        ..
                    } => {
                        if primary_group != group_id {
                            return Err(AppError::CatalogCorruption(format!(
                                "alias field {} is in group {} but its primary {} is in group {}",
                                field.id, group_id, primary.id, primary_group
                            )));
                        }
                        if primary.kind != field.kind {
                            return Err(AppError::CatalogCorruption(format!(
                                "alias field {} has kind {} but its primary {} has kind {}",
                                field.id, field.kind, primary.id, primary.kind
                            )));
                        }
                    }
                    _ => {
                        return Err(AppError::CatalogCorruption(format!(
                            "alias field {} references {} which is not a group primary",
                            field.id, primary.id
                        )));
                    }
                }
                primary.name.as_str()
            }
        };

        match values.get(canonical_name) {
            Some(value) if !value.is_empty() => {
                instructions.push(DrawInstruction {
                    page: field.page,
                    x: field.x,
                    y: field.y,
                    font_size: field.font_size,
                    text: value.clone(),
                });
            }
            _ => {} // no value submitted; skipping is not an error
        }
    }

    instructions.sort_by_key(|i| i.page);

    Ok(instructions)
}
