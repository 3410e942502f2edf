//! Diagnostics for coverage names that match no catalog feature.
//!
//! Matching in `build_matrix` is exact. Extraction output sometimes varies
//! capitalization or spelling between the feature list and the per-product
//! lists, which silently undercounts a product. `reconcile` reports every
//! stray name together with the catalog feature it most likely meant, and
//! never changes what the matrix counts.

use rivalmap_model::{CoverageMap, FeatureCatalog};
use rphonetic::{Encoder, Metaphone, Soundex};
use serde::Serialize;

/// Configuration for suggestion lookup.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Maximum edit distance for a spelling suggestion
    pub max_edit_distance: usize,
    /// Try phonetic encodings when spelling is too far off
    pub phonetic: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_edit_distance: 2,
            phonetic: true,
        }
    }
}

/// A coverage entry that names no catalog feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnmatchedName {
    pub product: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<Suggestion>,
}

/// The catalog feature a stray name most likely refers to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub feature: String,
    pub reason: MatchReason,
}

/// Why a suggestion was made.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "detail")]
pub enum MatchReason {
    /// Equal after case and punctuation normalization
    Normalized,
    /// Close in spelling
    EditDistance { distance: usize },
    /// Same phonetic code
    PhoneticMatch { algorithm: String, code: String },
}

/// Find coverage names that match no catalog feature.
///
/// Results are ordered by product, then name.
pub fn reconcile(
    catalog: &FeatureCatalog,
    coverage: &CoverageMap,
    config: &ReconcileConfig,
) -> Vec<UnmatchedName> {
    let mut unmatched = Vec::new();

    for (product, owned) in coverage.iter() {
        for name in owned.iter().filter(|n| !catalog.contains(n)) {
            let suggestion = suggest(catalog, name, config);
            tracing::warn!(
                product = %product,
                name = %name,
                suggestion = suggestion.as_ref().map(|s| s.feature.as_str()).unwrap_or("-"),
                "Coverage name matches no catalog feature"
            );
            unmatched.push(UnmatchedName {
                product: product.to_string(),
                name: name.clone(),
                suggestion,
            });
        }
    }

    unmatched
}

fn suggest(catalog: &FeatureCatalog, name: &str, config: &ReconcileConfig) -> Option<Suggestion> {
    let normalized = normalize_text(name);

    if let Some(feature) = catalog.names().find(|f| normalize_text(f) == normalized) {
        return Some(Suggestion {
            feature: feature.to_string(),
            reason: MatchReason::Normalized,
        });
    }

    // Closest spelling wins; ties go to the earlier catalog feature
    let closest = catalog
        .names()
        .map(|f| (f, edit_distance(&normalized, &normalize_text(f))))
        .filter(|(_, d)| *d <= config.max_edit_distance)
        .min_by_key(|(_, d)| *d);
    if let Some((feature, distance)) = closest {
        return Some(Suggestion {
            feature: feature.to_string(),
            reason: MatchReason::EditDistance { distance },
        });
    }

    if config.phonetic {
        for feature in catalog.names() {
            if let Some((algorithm, code)) = phonetic_match(name, feature) {
                return Some(Suggestion {
                    feature: feature.to_string(),
                    reason: MatchReason::PhoneticMatch { algorithm, code },
                });
            }
        }
    }

    None
}

/// Uppercase, drop punctuation, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    text.to_uppercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Compare two names by Soundex, then Metaphone.
///
/// Returns the algorithm and shared code on a match.
pub fn phonetic_match(a: &str, b: &str) -> Option<(String, String)> {
    let a = normalize_text(a).replace(' ', "");
    let b = normalize_text(b).replace(' ', "");
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let soundex = Soundex::default();
    let (sa, sb) = (soundex.encode(&a), soundex.encode(&b));
    if !sa.is_empty() && sa == sb {
        return Some(("soundex".to_string(), sa));
    }

    let metaphone = Metaphone::default();
    let (ma, mb) = (metaphone.encode(&a), metaphone.encode(&b));
    if !ma.is_empty() && ma == mb {
        return Some(("metaphone".to_string(), ma));
    }

    None
}
