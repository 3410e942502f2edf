//! Ranking and end-to-end analysis.
//!
//! Orders scored products and runs the full pipeline from a catalog and
//! coverage map to a caller-owned `AnalysisResult`.

use rivalmap_explain::differentiators;
use rivalmap_matrix::{build_matrix, category_coverage};
use rivalmap_model::{AnalysisError, AnalysisInput, AnalysisResult, RankingEntry, ScoreMap};
use rivalmap_weighting::{resolve_weights, score};

/// Rank products by score.
///
/// Highest score first; equal scores are ordered by product name so the
/// output never depends on map iteration order. Ranks are 1-based and
/// consecutive, ties included. A NaN score sorts last.
pub fn rank(scores: &ScoreMap, main_product: &str) -> Vec<RankingEntry> {
    let mut ordered: Vec<(&String, f64)> = scores.iter().map(|(p, s)| (p, *s)).collect();

    ordered.sort_by(|(pa, sa), (pb, sb)| {
        sort_key(*sb)
            .total_cmp(&sort_key(*sa))
            .then_with(|| pa.cmp(pb))
    });

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, (product, score))| RankingEntry {
            rank: i + 1,
            product: product.clone(),
            score,
            is_main_product: product == main_product,
        })
        .collect()
}

fn sort_key(score: f64) -> f64 {
    if score.is_nan() {
        f64::NEG_INFINITY
    } else {
        score
    }
}

/// Run a complete analysis.
pub fn analyze(input: &AnalysisInput) -> Result<AnalysisResult, AnalysisError> {
    let matrix = build_matrix(&input.catalog, &input.coverage)?;
    let weights = resolve_weights(&input.catalog, input.weights.as_ref());
    let scores = score(&matrix, &weights);
    let ranking = rank(&scores, &input.main_product);

    if !ranking.iter().any(|e| e.is_main_product) {
        tracing::warn!(main_product = %input.main_product, "Main product has no coverage entry");
    }

    let result = AnalysisResult {
        main_product: input.main_product.clone(),
        catalog: input.catalog.clone(),
        coverage: input.coverage.clone(),
        differentiators: differentiators(&matrix, &input.main_product),
        category_coverage: category_coverage(&input.catalog, &input.coverage),
        matrix,
        weights,
        scores,
        ranking,
    };

    tracing::info!(
        main_product = %result.main_product,
        products = result.ranking.len(),
        features = result.catalog.len(),
        leader = result.leader().map(|e| e.product.as_str()).unwrap_or("-"),
        "Analysis complete"
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rivalmap_model::{CoverageMap, Feature, FeatureCatalog, WeightTable};

    fn scores(pairs: &[(&str, f64)]) -> ScoreMap {
        pairs.iter().map(|(p, s)| (p.to_string(), *s)).collect()
    }

    fn scenario_input(main: &str) -> AnalysisInput {
        let catalog = FeatureCatalog::new(vec![
            Feature::new("SSO", "Security"),
            Feature::new("API", "Integration"),
        ])
        .unwrap();
        let coverage = CoverageMap::new()
            .with_product("Acme", ["SSO"])
            .with_product("Beta", ["SSO", "API"]);
        AnalysisInput::new(main, catalog, coverage)
    }

    #[test]
    fn test_rank_scenario() {
        let ranking = rank(&scores(&[("Acme", 52.0), ("Beta", 100.0)]), "Acme");
        assert_eq!(
            ranking,
            vec![
                RankingEntry {
                    rank: 1,
                    product: "Beta".into(),
                    score: 100.0,
                    is_main_product: false,
                },
                RankingEntry {
                    rank: 2,
                    product: "Acme".into(),
                    score: 52.0,
                    is_main_product: true,
                },
            ]
        );
    }

    #[test]
    fn test_tie_break_by_name() {
        let ranking = rank(&scores(&[("Zeta", 50.0), ("Alpha", 50.0), ("Mid", 75.0)]), "");
        let order: Vec<_> = ranking.iter().map(|e| (e.rank, e.product.as_str())).collect();
        assert_eq!(order, vec![(1, "Mid"), (2, "Alpha"), (3, "Zeta")]);
    }

    #[test]
    fn test_main_product_exact_match() {
        let ranking = rank(&scores(&[("Acme", 10.0), ("acme", 20.0)]), "Acme");
        let flagged: Vec<_> = ranking.iter().filter(|e| e.is_main_product).collect();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].product, "Acme");
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(&ScoreMap::new(), "Acme").is_empty());
    }

    #[test]
    fn test_rank_survives_nan_scores() {
        let pairs: Vec<(String, f64)> = (0..48)
            .map(|i| {
                let score = if i % 3 == 0 { f64::NAN } else { i as f64 };
                (format!("p{:02}", i), score)
            })
            .collect();
        let scores: ScoreMap = pairs.into_iter().collect();

        let ranking = rank(&scores, "p01");
        assert_eq!(ranking.len(), 48);
        assert_eq!(ranking[0].product, "p47");
        assert!(ranking[..32].iter().all(|e| e.score.is_finite()));
        assert!(ranking[32..].iter().all(|e| e.score.is_nan()));
        assert_eq!(ranking[32].product, "p00");
        for (i, entry) in ranking.iter().enumerate() {
            assert_eq!(entry.rank, i + 1);
        }
    }

    #[test]
    fn test_analyze_with_huge_weights() {
        let mut overrides = WeightTable::new();
        overrides.insert("SSO", f64::MAX).unwrap();
        overrides.insert("API", f64::MAX).unwrap();
        let result = analyze(&scenario_input("Acme").with_weights(overrides)).unwrap();

        assert_eq!(result.scores["Acme"], 50.0);
        assert_eq!(result.scores["Beta"], 100.0);
        assert_eq!(result.ranking[0].product, "Beta");
    }

    #[test]
    fn test_analyze_scenario() {
        let result = analyze(&scenario_input("Acme")).unwrap();

        assert_eq!(result.scores["Acme"], 52.0);
        assert_eq!(result.scores["Beta"], 100.0);
        assert_eq!(result.leader().map(|e| e.product.as_str()), Some("Beta"));
        assert_eq!(result.main_entry().map(|e| e.rank), Some(2));
        assert_eq!(result.differentiators.unique_to_competitors, vec!["API".to_string()]);
        assert_eq!(result.category_coverage["Acme"]["Integration"], 0.0);
        assert_eq!(result.weights.get("SSO"), Some(1.3));
    }

    #[test]
    fn test_analyze_with_override() {
        let mut weights = WeightTable::new();
        weights.insert("API", 3.0).unwrap();
        let input = scenario_input("Beta").with_weights(weights);

        let result = analyze(&input).unwrap();
        // SSO falls back to 1.0: Acme owns 1.0 of 4.0
        assert_eq!(result.scores["Acme"], 25.0);
        assert_eq!(result.main_entry().map(|e| e.rank), Some(1));
    }

    #[test]
    fn test_analyze_missing_main_product() {
        let result = analyze(&scenario_input("Nobody")).unwrap();
        assert!(result.main_entry().is_none());
        assert_eq!(result.ranking.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_ranking_monotonic(
            entries in prop::collection::btree_map("[a-z]{1,5}", 0.0f64..=100.0, 0..20),
        ) {
            let ranking = rank(&entries, "");
            prop_assert_eq!(ranking.len(), entries.len());
            for pair in ranking.windows(2) {
                prop_assert!(pair[0].rank < pair[1].rank);
                prop_assert!(pair[0].score >= pair[1].score);
                if pair[0].score == pair[1].score {
                    prop_assert!(pair[0].product < pair[1].product);
                }
            }
        }
    }
}
