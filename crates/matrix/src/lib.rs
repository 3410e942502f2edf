//! Feature coverage matrix construction.
//!
//! Provides pure functions over a catalog and coverage map:
//! - `build_matrix`: the dense products × features grid
//! - `category_coverage`: per-product share of each category owned
//! - `category_breakdown`: feature counts per category
//! - `feature_counts`: owned catalog features per product
//! - `reconcile`: diagnostics for coverage names that match no feature

mod reconcile;

pub use reconcile::{
    edit_distance, normalize_text, phonetic_match, reconcile, MatchReason, ReconcileConfig,
    Suggestion, UnmatchedName,
};

use rivalmap_model::{round2, AnalysisError, CategoryCoverage, CoverageMap, FeatureCatalog, Matrix};
use std::collections::BTreeMap;

/// Build the coverage matrix.
///
/// Rows are the coverage map's products in lexicographic order, columns the
/// catalog's features in catalog order. A cell is true only when the product
/// lists the exact feature name. Coverage names outside the catalog are
/// ignored.
pub fn build_matrix(catalog: &FeatureCatalog, coverage: &CoverageMap) -> Result<Matrix, AnalysisError> {
    let features: Vec<String> = catalog.names().map(str::to_string).collect();
    let products: Vec<String> = coverage.products().map(str::to_string).collect();

    let cells = products
        .iter()
        .map(|product| {
            features
                .iter()
                .map(|feature| coverage.owns(product, feature))
                .collect()
        })
        .collect();

    let matrix = Matrix::new(products, features, cells)?;

    tracing::debug!(
        products = matrix.products().len(),
        features = matrix.features().len(),
        "Built coverage matrix"
    );

    Ok(matrix)
}

/// Percentage of each category's features owned by each product.
///
/// Categories appear under their label; every product gets every category
/// present in the catalog.
pub fn category_coverage(catalog: &FeatureCatalog, coverage: &CoverageMap) -> CategoryCoverage {
    let breakdown = category_breakdown(catalog);

    coverage
        .products()
        .map(|product| {
            let per_category = breakdown
                .iter()
                .map(|(label, total)| {
                    let owned = catalog
                        .iter()
                        .filter(|f| f.category.label() == label)
                        .filter(|f| coverage.owns(product, &f.name))
                        .count();
                    let pct = if *total > 0 {
                        round2(owned as f64 / *total as f64 * 100.0)
                    } else {
                        0.0
                    };
                    (label.clone(), pct)
                })
                .collect::<BTreeMap<_, _>>();
            (product.to_string(), per_category)
        })
        .collect()
}

/// Number of features per category, in order of first appearance.
pub fn category_breakdown(catalog: &FeatureCatalog) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for feature in catalog {
        let label = feature.category.label();
        match counts.iter_mut().find(|(l, _)| l == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label.to_string(), 1)),
        }
    }
    counts
}

/// Owned catalog features per product, in matrix row order.
pub fn feature_counts(matrix: &Matrix) -> Vec<(String, usize)> {
    matrix
        .rows()
        .map(|(product, cells)| (product.to_string(), cells.iter().filter(|c| **c).count()))
        .collect()
}
