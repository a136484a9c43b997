//! Similarity scoring between field declarations
//!
//! Pure functions, no catalog or I/O dependency.

/// Standard A4 page size in PDF points, assumed when the true page
/// geometry is unknown.
pub const A4_WIDTH_PT: f64 = 595.0;
pub const A4_HEIGHT_PT: f64 = 842.0;

/// Normalized Euclidean distance beyond which proximity collapses to zero
/// (20% of the page diagonal scale).
const PROXIMITY_CUTOFF: f64 = 0.2;

/// Normalize a field name for comparison: lower-case, strip underscores,
/// hyphens, and whitespace.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '_' | '-') && !c.is_whitespace())
        .collect()
}

/// Name similarity in [0, 1] between two raw field names.
///
/// Names are normalized first, then scored as
/// `1 - editDistance / max(len)`. Two empty normalized names are identical.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    normalized_similarity(&normalize_name(a), &normalize_name(b))
}

/// Name similarity over already-normalized names.
pub fn normalized_similarity(a_norm: &str, b_norm: &str) -> f64 {
    let max_len = a_norm.chars().count().max(b_norm.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - strsim::levenshtein(a_norm, b_norm) as f64 / max_len as f64
}

/// Position proximity in [0, 1] between two points in PDF point space.
///
/// Each axis is normalized by the page dimension, then the Euclidean
/// distance is converted to a similarity that reaches zero at
/// `PROXIMITY_CUTOFF`. Page numbers play no part: multi-page forms repeat
/// the same input at the same spot on different pages.
pub fn position_proximity(a: (f64, f64), b: (f64, f64), page_width: f64, page_height: f64) -> f64 {
    let dx = (a.0 - b.0).abs() / page_width;
    let dy = (a.1 - b.1).abs() / page_height;
    let distance = (dx * dx + dy * dy).sqrt();

    (1.0 - distance / PROXIMITY_CUTOFF).max(0.0)
}
