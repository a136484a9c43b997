//! Redundant field detection
//!
//! Greedy single-pass clustering over the field catalog. Output is advisory:
//! group identifiers are ephemeral and the catalog is never mutated. Fields
//! of different kinds are never grouped, whatever the thresholds — filling
//! the same name into incompatible input types is unsafe.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{Field, FieldKind};

use super::similarity::{
    normalize_name, normalized_similarity, position_proximity, A4_HEIGHT_PT, A4_WIDTH_PT,
};

/// Detection thresholds and weights.
///
/// The defaults are empirically tuned; they are configuration, not law, and
/// every request may override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectOptions {
    /// Minimum name similarity to match on name alone
    pub name_similarity_threshold: f64,
    /// Minimum position proximity for the proximity rule
    pub position_proximity_threshold: f64,
    /// Only accept normalized-name equality
    pub exact_match_only: bool,
    /// Name weight in the combined score
    pub name_weight: f64,
    /// Position weight in the combined score
    pub position_weight: f64,
    /// Minimum combined score
    pub combined_threshold: f64,
    /// Name similarity floor required before proximity may carry a match
    pub proximity_name_floor: f64,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            name_similarity_threshold: 0.85,
            position_proximity_threshold: 0.70,
            exact_match_only: false,
            name_weight: 0.7,
            position_weight: 0.3,
            combined_threshold: 0.75,
            proximity_name_floor: 0.60,
        }
    }
}

/// Why a group was formed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    ExactName,
    FuzzyName,
    PositionProximity,
    Combined,
}

/// Summary of one group member
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub field_id: String,
    pub name: String,
    pub page: u32,
    pub x: f64,
    pub y: f64,
    pub field_kind: FieldKind,
}

/// A candidate cluster of likely-duplicate fields.
///
/// Transient: `group_id` is not stable across detection runs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedundantGroup {
    pub group_id: String,
    pub suggested_name: String,
    pub confidence: f64,
    pub match_reason: MatchReason,
    pub fields: Vec<GroupMember>,
}

/// A merge suggestion derived from a redundant group
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSuggestion {
    pub group_id: String,
    pub suggestion: String,
    pub confidence: f64,
    pub auto_mergeable: bool,
}

struct PairScore {
    index: usize,
    name_sim: f64,
    pos_sim: f64,
    exact_raw: bool,
    by_proximity: bool,
}

/// Detect redundant fields across pages.
///
/// Deterministic: fields are traversed in `(page, normalized name, id)`
/// order and output groups are sorted by descending confidence with the
/// anchor id as tie-break. Singletons are not emitted, and no field appears
/// in more than one group.
pub fn detect(fields: &[Field], opts: &DetectOptions) -> Vec<RedundantGroup> {
    let norms: Vec<String> = fields.iter().map(|f| normalize_name(&f.name)).collect();

    let mut order: Vec<usize> = (0..fields.len()).collect();
    order.sort_by(|&a, &b| {
        fields[a]
            .page
            .cmp(&fields[b].page)
            .then_with(|| norms[a].cmp(&norms[b]))
            .then_with(|| fields[a].id.cmp(&fields[b].id))
    });

    let mut processed = vec![false; fields.len()];
    let mut groups = Vec::new();

    for (pos, &ai) in order.iter().enumerate() {
        if processed[ai] {
            continue;
        }
        let anchor = &fields[ai];

        let mut matches: Vec<PairScore> = Vec::new();

        for &bi in &order[pos + 1..] {
            if processed[bi] {
                continue;
            }
            let candidate = &fields[bi];
            if anchor.kind != candidate.kind {
                continue;
            }

            let exact = norms[ai] == norms[bi];
            if !exact && opts.exact_match_only {
                continue;
            }

            let name_sim = if exact {
                1.0
            } else {
                normalized_similarity(&norms[ai], &norms[bi])
            };
            let pos_sim = position_proximity(
                anchor.position(),
                candidate.position(),
                A4_WIDTH_PT,
                A4_HEIGHT_PT,
            );

            let by_name = name_sim >= opts.name_similarity_threshold;
            let by_proximity = pos_sim >= opts.position_proximity_threshold
                && name_sim >= opts.proximity_name_floor;
            let by_combined = opts.name_weight * name_sim + opts.position_weight * pos_sim
                >= opts.combined_threshold;

            if exact || by_name || by_proximity || by_combined {
                matches.push(PairScore {
                    index: bi,
                    name_sim,
                    pos_sim,
                    exact_raw: anchor.name == candidate.name,
                    by_proximity: !exact && !by_name && by_proximity,
                });
            }
        }

        if matches.is_empty() {
            continue;
        }

        processed[ai] = true;
        for m in &matches {
            processed[m.index] = true;
        }

        let confidence = (matches.iter().map(|m| m.name_sim).sum::<f64>()
            / matches.len() as f64)
            .clamp(0.0, 1.0);
        let avg_proximity =
            matches.iter().map(|m| m.pos_sim).sum::<f64>() / matches.len() as f64;

        // Reason priority: exact > fuzzy > position > combined. "Exact"
        // requires identical raw names; names that merely normalize to the
        // same string report as fuzzy so they are not auto-merged unseen.
        let match_reason = if matches.iter().all(|m| m.exact_raw) {
            MatchReason::ExactName
        } else if confidence >= opts.name_similarity_threshold {
            MatchReason::FuzzyName
        } else if matches.iter().all(|m| m.by_proximity)
            && avg_proximity >= opts.position_proximity_threshold
        {
            MatchReason::PositionProximity
        } else {
            MatchReason::Combined
        };

        let member_indices: Vec<usize> = std::iter::once(ai)
            .chain(matches.iter().map(|m| m.index))
            .collect();

        groups.push(RedundantGroup {
            group_id: Uuid::new_v4().to_string(),
            suggested_name: suggest_name(&member_indices, fields),
            confidence,
            match_reason,
            fields: member_indices
                .iter()
                .map(|&i| {
                    let f = &fields[i];
                    GroupMember {
                        field_id: f.id.clone(),
                        name: f.name.clone(),
                        page: f.page,
                        x: f.x,
                        y: f.y,
                        field_kind: f.kind,
                    }
                })
                .collect(),
        });
    }

    groups.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.fields[0].field_id.cmp(&b.fields[0].field_id))
    });

    groups
}

/// Most frequent raw name in the group; ties broken by shortest string,
/// then lexicographic.
fn suggest_name(member_indices: &[usize], fields: &[Field]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for &i in member_indices {
        let name = fields[i].name.as_str();
        match counts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, c)) => *c += 1,
            None => counts.push((name, 1)),
        }
    }
    counts.sort_by(|(an, ac), (bn, bc)| {
        bc.cmp(ac)
            .then_with(|| an.len().cmp(&bn.len()))
            .then_with(|| an.cmp(bn))
    });
    counts[0].0.to_string()
}

/// Derive operator-facing merge suggestions from detected groups.
///
/// Only exact-name groups with confidence >= 0.95 are flagged safe for
/// automatic merging.
pub fn suggest_merges(groups: &[RedundantGroup]) -> Vec<MergeSuggestion> {
    groups
        .iter()
        .map(|group| {
            let pct = (group.confidence * 100.0).round() as u32;
            let (suggestion, auto_mergeable) = match group.match_reason {
                MatchReason::ExactName if group.confidence >= 0.95 => (
                    format!(
                        "Fields have identical names across {} locations. Safe to merge automatically.",
                        group.fields.len()
                    ),
                    true,
                ),
                MatchReason::FuzzyName if group.confidence >= 0.9 => (
                    format!(
                        "Fields have very similar names ({pct}% match). Review and merge if they represent the same data."
                    ),
                    false,
                ),
                MatchReason::PositionProximity | MatchReason::Combined => (
                    "Fields detected as similar based on name and position. Verify before merging."
                        .to_string(),
                    false,
                ),
                _ => (
                    format!("Potential match with {pct}% confidence. Manual review recommended."),
                    false,
                ),
            };

            MergeSuggestion {
                group_id: group.group_id.clone(),
                suggestion,
                confidence: group.confidence,
                auto_mergeable,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldRole;
    use std::collections::HashSet;

    fn field(id: &str, name: &str, page: u32, x: f64, y: f64, kind: FieldKind) -> Field {
        Field {
            id: id.to_string(),
            template_id: "t1".to_string(),
            name: name.to_string(),
            kind,
            page,
            x,
            y,
            font_size: 12.0,
            required: false,
            validation_pattern: None,
            role: FieldRole::Unmerged,
        }
    }

    #[test]
    fn detects_fuzzy_name_pair_across_pages() {
        let fields = vec![
            field("f1", "fullname", 1, 100.0, 700.0, FieldKind::Text),
            field("f2", "full_name", 3, 98.0, 702.0, FieldKind::Text),
        ];

        let groups = detect(&fields, &DetectOptions::default());
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.fields.len(), 2);
        assert!(matches!(
            group.match_reason,
            MatchReason::FuzzyName | MatchReason::Combined
        ));
        assert!(group.confidence >= 0.85);
    }

    #[test]
    fn identical_names_different_kinds_never_grouped() {
        let fields = vec![
            field("f1", "amount", 1, 100.0, 700.0, FieldKind::Text),
            field("f2", "amount", 2, 100.0, 700.0, FieldKind::Number),
        ];

        // Any thresholds <= 1.0 must keep these apart
        let mut opts = DetectOptions::default();
        for threshold in [0.0, 0.5, 1.0] {
            opts.name_similarity_threshold = threshold;
            opts.position_proximity_threshold = threshold;
            opts.combined_threshold = threshold;
            assert!(detect(&fields, &opts).is_empty());
        }
    }

    #[test]
    fn singletons_are_not_emitted() {
        let fields = vec![
            field("f1", "fullname", 1, 100.0, 700.0, FieldKind::Text),
            field("f2", "dateofbirth", 1, 100.0, 100.0, FieldKind::Date),
        ];
        assert!(detect(&fields, &DetectOptions::default()).is_empty());
    }

    #[test]
    fn no_field_appears_in_two_groups() {
        let fields = vec![
            field("f1", "name", 1, 100.0, 700.0, FieldKind::Text),
            field("f2", "name", 2, 100.0, 700.0, FieldKind::Text),
            field("f3", "name", 3, 100.0, 700.0, FieldKind::Text),
            field("f4", "email", 1, 100.0, 600.0, FieldKind::Text),
            field("f5", "e_mail", 2, 100.0, 600.0, FieldKind::Text),
        ];

        let groups = detect(&fields, &DetectOptions::default());
        let mut seen = HashSet::new();
        for group in &groups {
            for member in &group.fields {
                assert!(seen.insert(member.field_id.clone()), "field in two groups");
            }
        }
    }

    #[test]
    fn detection_is_idempotent_on_membership() {
        let fields = vec![
            field("f1", "name", 1, 100.0, 700.0, FieldKind::Text),
            field("f2", "full name", 2, 101.0, 698.0, FieldKind::Text),
            field("f3", "signature", 2, 400.0, 100.0, FieldKind::Signature),
            field("f4", "signature", 4, 400.0, 100.0, FieldKind::Signature),
        ];

        let opts = DetectOptions::default();
        let a = detect(&fields, &opts);
        let b = detect(&fields, &opts);

        let membership = |groups: &[RedundantGroup]| -> Vec<Vec<String>> {
            groups
                .iter()
                .map(|g| g.fields.iter().map(|m| m.field_id.clone()).collect())
                .collect()
        };
        assert_eq!(membership(&a), membership(&b));
        for (ga, gb) in a.iter().zip(b.iter()) {
            assert_eq!(ga.confidence, gb.confidence);
            assert_eq!(ga.match_reason, gb.match_reason);
        }
    }

    #[test]
    fn exact_raw_names_report_exact_and_auto_mergeable() {
        let fields = vec![
            field("f1", "client_name", 1, 100.0, 700.0, FieldKind::Text),
            field("f2", "client_name", 5, 100.0, 700.0, FieldKind::Text),
        ];

        let groups = detect(&fields, &DetectOptions::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].match_reason, MatchReason::ExactName);
        assert_eq!(groups[0].confidence, 1.0);

        let suggestions = suggest_merges(&groups);
        assert!(suggestions[0].auto_mergeable);
    }

    #[test]
    fn normalization_equal_names_are_not_auto_mergeable() {
        let fields = vec![
            field("f1", "fullname", 1, 100.0, 700.0, FieldKind::Text),
            field("f2", "full_name", 3, 98.0, 702.0, FieldKind::Text),
        ];

        let groups = detect(&fields, &DetectOptions::default());
        let suggestions = suggest_merges(&groups);
        assert!(!suggestions[0].auto_mergeable);
    }

    #[test]
    fn exact_match_only_skips_fuzzy_candidates() {
        let fields = vec![
            field("f1", "fullname", 1, 100.0, 700.0, FieldKind::Text),
            field("f2", "fullnames", 3, 98.0, 702.0, FieldKind::Text),
        ];

        let opts = DetectOptions {
            exact_match_only: true,
            ..DetectOptions::default()
        };
        assert!(detect(&fields, &opts).is_empty());
        assert_eq!(detect(&fields, &DetectOptions::default()).len(), 1);
    }

    #[test]
    fn suggested_name_prefers_most_frequent_then_shortest() {
        let fields = vec![
            field("f1", "full_name", 1, 100.0, 700.0, FieldKind::Text),
            field("f2", "fullname", 2, 100.0, 700.0, FieldKind::Text),
            field("f3", "fullname", 3, 100.0, 700.0, FieldKind::Text),
        ];

        let groups = detect(&fields, &DetectOptions::default());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].suggested_name, "fullname");
    }

    #[test]
    fn groups_sorted_by_descending_confidence() {
        let fields = vec![
            field("f1", "address line", 1, 50.0, 300.0, FieldKind::Text),
            field("f2", "address lines", 2, 350.0, 650.0, FieldKind::Text),
            field("f3", "city", 1, 100.0, 200.0, FieldKind::Text),
            field("f4", "city", 2, 100.0, 200.0, FieldKind::Text),
        ];

        let groups = detect(&fields, &DetectOptions::default());
        assert_eq!(groups.len(), 2);
        assert!(groups[0].confidence >= groups[1].confidence);
        assert_eq!(groups[0].suggested_name, "city");
    }
}
