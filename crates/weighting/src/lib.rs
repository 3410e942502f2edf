//! Feature weighting and weighted coverage scores.
//!
//! A product's score is the share of total feature weight it owns, on a
//! 0–100 scale:
//!
//! ```text
//! score(p) = 100 * Σ weight(f) for owned f / Σ weight(f) for all f
//! ```
//!
//! Weights come from category defaults or an explicit override table.

use rivalmap_model::{
    round2, FeatureCatalog, Matrix, ScoreMap, Weight, WeightTable, WeightedMatrix,
};

/// Category-based default weights, one entry per catalog feature.
pub fn default_weights(catalog: &FeatureCatalog) -> WeightTable {
    let mut table = WeightTable::new();
    for feature in catalog {
        table.set(feature.name.clone(), Weight::from(&feature.category));
    }
    table
}

/// Weights for a run: category defaults, or the override table with
/// `Weight::DEFAULT` for catalog features it does not mention.
///
/// Override entries for names outside the catalog are kept; they add to
/// the total but can never be owned.
pub fn resolve_weights(catalog: &FeatureCatalog, overrides: Option<&WeightTable>) -> WeightTable {
    let Some(overrides) = overrides else {
        return default_weights(catalog);
    };

    let mut table = overrides.clone();
    for name in catalog.names() {
        if table.weight(name).is_none() {
            table.set(name, Weight::DEFAULT);
        }
    }
    table
}

/// Per-column weights for a matrix. Columns missing from the table weigh
/// `Weight::DEFAULT`.
fn column_weights(matrix: &Matrix, weights: &WeightTable) -> Vec<f64> {
    matrix
        .features()
        .iter()
        .map(|f| weights.weight(f).unwrap_or(Weight::DEFAULT).value())
        .collect()
}

/// Score every product in the matrix.
///
/// The denominator is the table total plus the implicit weight of any
/// column the table lacks, so scores stay within 0–100. A zero total
/// yields all-zero scores.
///
/// Weights are divided by the largest one before summing, so any finite
/// table sums without overflow.
pub fn score(matrix: &Matrix, weights: &WeightTable) -> ScoreMap {
    let columns = column_weights(matrix, weights);

    let implicit = matrix
        .features()
        .iter()
        .filter(|f| weights.weight(f).is_none())
        .count();

    let largest = weights
        .iter()
        .map(|(_, w)| w)
        .chain((implicit > 0).then_some(Weight::DEFAULT.value()))
        .fold(0.0_f64, f64::max);

    if largest == 0.0 {
        tracing::debug!(
            features = matrix.features().len(),
            "Zero total weight, every product scores 0"
        );
        return matrix.products().iter().map(|p| (p.clone(), 0.0)).collect();
    }

    let total: f64 = weights.iter().map(|(_, w)| w / largest).sum::<f64>()
        + implicit as f64 * (Weight::DEFAULT.value() / largest);

    matrix
        .rows()
        .map(|(product, cells)| {
            let owned: f64 = cells
                .iter()
                .zip(&columns)
                .filter(|(owned, _)| **owned)
                .map(|(_, w)| w / largest)
                .sum();
            let share = (owned / total).min(1.0);
            (product.to_string(), round2(share * 100.0))
        })
        .collect()
}

/// Decorate a matrix with its column weights and per-cell contributions.
pub fn weighted_matrix(matrix: &Matrix, weights: &WeightTable) -> WeightedMatrix {
    let columns = column_weights(matrix, weights);

    let contributions = matrix
        .rows()
        .map(|(_, cells)| {
            cells
                .iter()
                .zip(&columns)
                .map(|(owned, w)| if *owned { *w } else { 0.0 })
                .collect()
        })
        .collect();

    WeightedMatrix {
        matrix: matrix.clone(),
        weights: columns,
        contributions,
    }
}
