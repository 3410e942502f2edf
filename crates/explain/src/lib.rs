//! Explanation generation for competitor rankings.
//!
//! Turns matrices and rankings into structured, human-readable findings
//! suitable for CLI output and downstream reports.

use rivalmap_model::{Differentiators, Matrix, RankingEntry, WeightedMatrix};
use serde::{Deserialize, Serialize};

/// Competitive tier derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Score >= 75
    Leader,
    /// Score >= 50
    Contender,
    /// Everything below
    Niche,
}

impl Tier {
    pub fn from_score(score: f64) -> Self {
        if score >= 75.0 {
            Self::Leader
        } else if score >= 50.0 {
            Self::Contender
        } else {
            Self::Niche
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Leader => "LEADER",
            Self::Contender => "CONTENDER",
            Self::Niche => "NICHE",
        }
    }
}

/// A structured explanation for one ranked product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    /// Short summary (1 line)
    pub summary: String,

    /// Detailed explanation
    pub detail: String,

    pub tier: Tier,

    /// Features backing the score
    pub evidence: Vec<EvidenceItem>,
}

/// A feature supporting (or missing from) a product's score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// `owned_feature` or `missing_feature`
    pub kind: String,

    /// Feature name
    pub value: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Compare the main product's features against every competitor's.
///
/// Lists keep matrix column order. A main product that is not a matrix row
/// owns nothing.
pub fn differentiators(matrix: &Matrix, main_product: &str) -> Differentiators {
    let main_row = matrix
        .product_index(main_product)
        .and_then(|i| matrix.row(i));
    let competitors: Vec<&[bool]> = matrix
        .rows()
        .filter(|(product, _)| *product != main_product)
        .map(|(_, cells)| cells)
        .collect();

    let mut result = Differentiators::default();

    for (col, feature) in matrix.features().iter().enumerate() {
        let main_owns = main_row.map(|row| row[col]).unwrap_or(false);
        let any_competitor = competitors.iter().any(|row| row[col]);
        let all_competitors = competitors.iter().all(|row| row[col]);

        if main_owns && !any_competitor {
            result.unique_to_product.push(feature.clone());
        }
        if !main_owns && any_competitor {
            result.unique_to_competitors.push(feature.clone());
        }
        if main_owns && !competitors.is_empty() && all_competitors {
            result.common_features.push(feature.clone());
        }
    }

    result
}

/// Explain one ranking entry using its weighted matrix row.
pub fn explain_entry(entry: &RankingEntry, weighted: &WeightedMatrix) -> Explanation {
    let tier = Tier::from_score(entry.score);
    let matrix = &weighted.matrix;

    let evidence: Vec<EvidenceItem> = matrix
        .features()
        .iter()
        .filter_map(|feature| {
            let contribution = weighted.contribution(&entry.product, feature)?;
            let weight = weighted.weight(feature)?;
            let owned = matrix.get(&entry.product, feature)?;
            Some(EvidenceItem {
                kind: if owned { "owned_feature" } else { "missing_feature" }.to_string(),
                value: feature.clone(),
                context: Some(format!("weight {:.2}, contributes {:.2}", weight, contribution)),
            })
        })
        .collect();

    let owned = evidence.iter().filter(|e| e.kind == "owned_feature").count();
    let whose = if entry.is_main_product { "Your product" } else { "Competitor" };

    Explanation {
        summary: format!("#{} {} ({:.2})", entry.rank, entry.product, entry.score),
        detail: format!(
            "{} '{}' owns {} of {} compared features, covering {:.2}% of the total feature weight.",
            whose,
            entry.product,
            owned,
            matrix.features().len(),
            entry.score
        ),
        tier,
        evidence,
    }
}

/// One-line summary of a ranking from the main product's point of view.
pub fn summarize_ranking(ranking: &[RankingEntry]) -> String {
    let Some(leader) = ranking.first() else {
        return "No products ranked.".to_string();
    };

    let total = ranking.len();
    match ranking.iter().find(|e| e.is_main_product) {
        Some(main) if main.rank == 1 => format!(
            "{}: your product {} leads with {:.2} ({} ranked)",
            Tier::from_score(main.score).label(),
            main.product,
            main.score,
            total
        ),
        Some(main) => format!(
            "{}: your product {} ranks {} of {} with {:.2} (leader {} at {:.2}, gap {:.2})",
            Tier::from_score(main.score).label(),
            main.product,
            main.rank,
            total,
            main.score,
            leader.product,
            leader.score,
            leader.score - main.score
        ),
        None => format!(
            "Leader {} at {:.2} ({} ranked); main product was not scored",
            leader.product, leader.score, total
        ),
    }
}
