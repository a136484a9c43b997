//! Merge coordination: committing operator-approved field groups
//!
//! All catalog mutation goes through here. Every operation runs as a single
//! sqlx transaction so the catalog never holds a half-merged state, and each
//! row update is guarded with `group_id IS NULL` so two operators cannot
//! claim the same field for different groups.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::catalog::{Field, FieldRole};
use crate::db::FieldRepository;
use crate::error::{AppError, Result};

/// Result of a committed merge
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    pub group_id: String,
    pub primary_field_id: String,
    pub merged_count: usize,
    pub group_name: String,
}

/// Validate that a set of fields is compatible for merging.
///
/// Returns every violated rule, not just the first, so the operator can fix
/// the whole group in one pass. An empty list means the merge is allowed.
pub fn validate_merge(fields: &[Field]) -> Vec<String> {
    let mut issues = Vec::new();

    let mut kinds: Vec<&str> = fields.iter().map(|f| f.kind.as_str()).collect();
    kinds.sort_unstable();
    kinds.dedup();
    if kinds.len() > 1 {
        issues.push(format!("Fields have different types: {}", kinds.join(", ")));
    }

    let mut patterns: Vec<&str> = fields
        .iter()
        .filter_map(|f| f.validation_pattern.as_deref())
        .collect();
    patterns.sort_unstable();
    patterns.dedup();
    if patterns.len() > 1 {
        issues.push("Fields have conflicting validation rules".to_string());
    }

    let any_required = fields.iter().any(|f| f.required);
    let any_optional = fields.iter().any(|f| !f.required);
    if any_required && any_optional {
        issues.push("Some fields are required while others are not".to_string());
    }

    issues
}

/// Validate new candidates against a group's established primary only.
/// Already-committed aliases are not re-validated.
fn validate_against_primary(primary: &Field, candidates: &[Field]) -> Vec<String> {
    let mut issues = Vec::new();

    for field in candidates {
        if field.kind != primary.kind {
            issues.push(format!(
                "Fields have different types: field {} is {}, group is {}",
                field.id, field.kind, primary.kind
            ));
        }
        if field.required != primary.required {
            issues.push(format!(
                "Some fields are required while others are not: field {}",
                field.id
            ));
        }
        if let (Some(pattern), Some(group_pattern)) =
            (&field.validation_pattern, &primary.validation_pattern)
        {
            if pattern != group_pattern {
                issues.push(format!(
                    "Fields have conflicting validation rules: field {}",
                    field.id
                ));
            }
        }
    }

    issues
}

/// Coordinates merge state transitions on the field catalog
pub struct MergeCoordinator<'a> {
    pool: &'a SqlitePool,
}

impl<'a> MergeCoordinator<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Merge alias fields into a primary, creating a new field group.
    ///
    /// Atomic: either the primary and every alias are updated, or nothing is.
    pub async fn merge(
        &self,
        template_id: &str,
        primary_id: &str,
        alias_ids: &[String],
        group_name: Option<String>,
    ) -> Result<MergeOutcome> {
        if alias_ids.is_empty() {
            return Err(AppError::BadRequest(
                "at least one alias field is required".to_string(),
            ));
        }
        if alias_ids.iter().any(|id| id == primary_id) {
            return Err(AppError::BadRequest(
                "the primary field cannot also be an alias".to_string(),
            ));
        }
        let mut unique: Vec<&String> = alias_ids.iter().collect();
        unique.sort_unstable();
        unique.dedup();
        if unique.len() != alias_ids.len() {
            return Err(AppError::BadRequest(
                "duplicate field ids in the merge request".to_string(),
            ));
        }

        let repo = FieldRepository::new(self.pool);
        let mut all_ids: Vec<String> = Vec::with_capacity(alias_ids.len() + 1);
        all_ids.push(primary_id.to_string());
        all_ids.extend_from_slice(alias_ids);

        let fields = repo.get_many(template_id, &all_ids).await?;
        if fields.len() != all_ids.len() {
            let missing: Vec<&String> = all_ids
                .iter()
                .filter(|id| !fields.iter().any(|f| &f.id == *id))
                .collect();
            return Err(AppError::NotFound(format!(
                "fields not found in template: {}",
                missing
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }

        let mut issues = validate_merge(&fields);
        for field in &fields {
            if !field.role.is_unmerged() {
                issues.push(format!("Field {} already belongs to a group", field.id));
            }
        }
        if !issues.is_empty() {
            return Err(AppError::MergeValidation(issues));
        }

        let primary = fields
            .iter()
            .find(|f| f.id == primary_id)
            .ok_or_else(|| AppError::Internal("primary field vanished".to_string()))?;

        let group_id = Uuid::new_v4().to_string();
        let group_name = group_name.unwrap_or_else(|| primary.name.clone());
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE template_fields
            SET group_id = ?, is_primary = 1, primary_field_id = NULL,
                group_name = ?, updated_at = ?
            WHERE id = ? AND template_id = ? AND group_id IS NULL
            "#,
        )
        .bind(&group_id)
        .bind(&group_name)
        .bind(&now)
        .bind(primary_id)
        .bind(template_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() != 1 {
            // Claimed by a concurrent merge since validation; tx rolls back.
            return Err(AppError::MergeValidation(vec![format!(
                "Field {} already belongs to a group",
                primary_id
            )]));
        }

        for alias_id in alias_ids {
            let updated = sqlx::query(
                r#"
                UPDATE template_fields
                SET group_id = ?, is_primary = 0, primary_field_id = ?,
                    group_name = ?, updated_at = ?
                WHERE id = ? AND template_id = ? AND group_id IS NULL
                "#,
            )
            .bind(&group_id)
            .bind(primary_id)
            .bind(&group_name)
            .bind(&now)
            .bind(alias_id)
            .bind(template_id)
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() != 1 {
                return Err(AppError::MergeValidation(vec![format!(
                    "Field {} already belongs to a group",
                    alias_id
                )]));
            }
        }

        tx.commit().await?;

        tracing::info!(
            template_id,
            group_id,
            merged = alias_ids.len(),
            "merged fields into group"
        );

        Ok(MergeOutcome {
            group_id,
            primary_field_id: primary_id.to_string(),
            merged_count: alias_ids.len(),
            group_name,
        })
    }

    /// Add new alias fields to an existing group.
    ///
    /// New fields are validated against the group's established primary;
    /// committed aliases are not re-validated.
    pub async fn add_to_group(
        &self,
        template_id: &str,
        group_id: &str,
        field_ids: &[String],
    ) -> Result<MergeOutcome> {
        if field_ids.is_empty() {
            return Err(AppError::BadRequest(
                "at least one field is required".to_string(),
            ));
        }

        let repo = FieldRepository::new(self.pool);
        let members = repo.list_by_group(template_id, group_id).await?;
        if members.is_empty() {
            return Err(AppError::NotFound(format!("group not found: {}", group_id)));
        }
        let primary = members
            .iter()
            .find(|f| matches!(f.role, FieldRole::Primary { .. }))
            .ok_or_else(|| {
                AppError::CatalogCorruption(format!("group {} has no primary field", group_id))
            })?;
        let group_name = match &primary.role {
            FieldRole::Primary { group_name, .. } => group_name.clone(),
            _ => unreachable!(),
        };

        let candidates = repo.get_many(template_id, field_ids).await?;
        if candidates.len() != field_ids.len() {
            let missing: Vec<&str> = field_ids
                .iter()
                .filter(|id| !candidates.iter().any(|f| &f.id == *id))
                .map(|s| s.as_str())
                .collect();
            return Err(AppError::NotFound(format!(
                "fields not found in template: {}",
                missing.join(", ")
            )));
        }

        let mut issues = validate_against_primary(primary, &candidates);
        for field in &candidates {
            if !field.role.is_unmerged() {
                issues.push(format!("Field {} already belongs to a group", field.id));
            }
        }
        if !issues.is_empty() {
            return Err(AppError::MergeValidation(issues));
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        for field_id in field_ids {
            let updated = sqlx::query(
                r#"
                UPDATE template_fields
                SET group_id = ?, is_primary = 0, primary_field_id = ?,
                    group_name = ?, updated_at = ?
                WHERE id = ? AND template_id = ? AND group_id IS NULL
                "#,
            )
            .bind(group_id)
            .bind(&primary.id)
            .bind(&group_name)
            .bind(&now)
            .bind(field_id)
            .bind(template_id)
            .execute(&mut *tx)
            .await?;
            if updated.rows_affected() != 1 {
                return Err(AppError::MergeValidation(vec![format!(
                    "Field {} already belongs to a group",
                    field_id
                )]));
            }
        }

        tx.commit().await?;

        Ok(MergeOutcome {
            group_id: group_id.to_string(),
            primary_field_id: primary.id.clone(),
            merged_count: field_ids.len(),
            group_name,
        })
    }

    /// Dissolve a group: every member reverts to an independent field.
    /// The fields themselves are not deleted. Returns the member count.
    pub async fn dissolve(&self, template_id: &str, group_id: &str) -> Result<u64> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE template_fields
            SET group_id = NULL, is_primary = NULL, primary_field_id = NULL,
                group_name = NULL, updated_at = ?
            WHERE template_id = ? AND group_id = ?
            "#,
        )
        .bind(&now)
        .bind(template_id)
        .bind(group_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("group not found: {}", group_id)));
        }

        tracing::info!(template_id, group_id, "dissolved field group");

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldKind;

    fn field(id: &str, name: &str, kind: FieldKind) -> Field {
        Field {
            id: id.to_string(),
            template_id: "t1".to_string(),
            name: name.to_string(),
            kind,
            page: 1,
            x: 0.0,
            y: 0.0,
            font_size: 12.0,
            required: false,
            validation_pattern: None,
            role: FieldRole::Unmerged,
        }
    }

    #[test]
    fn compatible_fields_produce_no_issues() {
        let fields = vec![
            field("f1", "name", FieldKind::Text),
            field("f2", "name", FieldKind::Text),
        ];
        assert!(validate_merge(&fields).is_empty());
    }

    #[test]
    fn mixed_kinds_are_rejected_with_type_issue() {
        let fields = vec![
            field("f1", "date", FieldKind::Text),
            field("f2", "date", FieldKind::Date),
        ];
        let issues = validate_merge(&fields);
        assert!(!issues.is_empty());
        assert!(issues.iter().any(|i| i.contains("different types")));
    }

    #[test]
    fn conflicting_patterns_are_rejected() {
        let mut a = field("f1", "zip", FieldKind::Text);
        a.validation_pattern = Some(r"^\d{5}$".to_string());
        let mut b = field("f2", "zip", FieldKind::Text);
        b.validation_pattern = Some(r"^\d{4}$".to_string());

        let issues = validate_merge(&[a, b]);
        assert!(issues.iter().any(|i| i.contains("validation rules")));
    }

    #[test]
    fn single_pattern_is_compatible() {
        let mut a = field("f1", "zip", FieldKind::Text);
        a.validation_pattern = Some(r"^\d{5}$".to_string());
        let b = field("f2", "zip", FieldKind::Text);

        assert!(validate_merge(&[a, b]).is_empty());
    }

    #[test]
    fn mixed_required_flags_are_rejected() {
        let mut a = field("f1", "name", FieldKind::Text);
        a.required = true;
        let b = field("f2", "name", FieldKind::Text);

        let issues = validate_merge(&[a, b]);
        assert!(issues.iter().any(|i| i.contains("required")));
    }

    #[test]
    fn all_violations_are_reported_together() {
        let mut a = field("f1", "x", FieldKind::Text);
        a.required = true;
        a.validation_pattern = Some("a".to_string());
        let mut b = field("f2", "x", FieldKind::Date);
        b.validation_pattern = Some("b".to_string());

        let issues = validate_merge(&[a, b]);
        assert_eq!(issues.len(), 3);
    }
}
