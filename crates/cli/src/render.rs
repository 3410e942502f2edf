//! Plain-text rendering for terminal output.

use rivalmap_explain::Explanation;
use rivalmap_matrix::{UnmatchedName, MatchReason};
use rivalmap_model::{AnalysisResult, Matrix};
use std::fmt::Write;

const OWNED: &str = "✓";
const MISSING: &str = "✗";

fn width(s: &str) -> usize {
    s.chars().count()
}

fn pad(s: &str, to: usize) -> String {
    format!("{}{}", s, " ".repeat(to.saturating_sub(width(s))))
}

/// Render the matrix as a ✓/✗ grid, one product per line.
pub fn render_matrix(matrix: &Matrix) -> String {
    let first = matrix
        .products()
        .iter()
        .map(|p| width(p))
        .chain(std::iter::once(width("Product")))
        .max()
        .unwrap_or(0);
    let columns: Vec<usize> = matrix.features().iter().map(|f| width(f).max(1)).collect();

    let mut out = String::new();
    let mut header = pad("Product", first);
    for (feature, w) in matrix.features().iter().zip(&columns) {
        header.push_str("  ");
        header.push_str(&pad(feature, *w));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for (product, cells) in matrix.rows() {
        let mut line = pad(product, first);
        for (cell, w) in cells.iter().zip(&columns) {
            line.push_str("  ");
            line.push_str(&pad(if *cell { OWNED } else { MISSING }, *w));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Render a full analysis: ranking, explanations and differentiators.
pub fn render_analysis(result: &AnalysisResult, explanations: &[Explanation], summary: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Analysis for: {}", result.main_product);
    let _ = writeln!(
        out,
        "{} products × {} features",
        result.matrix.products().len(),
        result.matrix.features().len()
    );
    out.push_str("---\n");
    out.push_str(&render_matrix(&result.matrix));
    out.push_str("---\n");

    for (entry, explanation) in result.ranking.iter().zip(explanations) {
        let marker = if entry.is_main_product { " *" } else { "" };
        let _ = writeln!(
            out,
            "\n{}. {}{} ({:.2}) [{}]",
            entry.rank,
            entry.product,
            marker,
            entry.score,
            explanation.tier.label()
        );
        let _ = writeln!(out, "   {}", explanation.detail);
        if let Some(by_category) = result.category_coverage.get(&entry.product) {
            let parts: Vec<String> = by_category
                .iter()
                .map(|(category, pct)| format!("{} {:.0}%", category, pct))
                .collect();
            if !parts.is_empty() {
                let _ = writeln!(out, "   Categories: {}", parts.join(", "));
            }
        }
    }

    let diff = &result.differentiators;
    out.push_str("\n---\n");
    let _ = writeln!(out, "Unique to {}: {}", result.main_product, list(&diff.unique_to_product));
    let _ = writeln!(out, "Gaps vs competitors: {}", list(&diff.unique_to_competitors));
    let _ = writeln!(out, "Common features: {}", list(&diff.common_features));
    out.push_str("---\n");
    let _ = writeln!(out, "{}", summary);

    out
}

/// Render reconciliation findings.
pub fn render_unmatched(unmatched: &[UnmatchedName]) -> String {
    if unmatched.is_empty() {
        return "All coverage names match catalog features.\n".to_string();
    }

    let mut out = String::new();
    for item in unmatched {
        let _ = write!(out, "{}: '{}' matches no feature", item.product, item.name);
        if let Some(suggestion) = &item.suggestion {
            let why = match &suggestion.reason {
                MatchReason::Normalized => "differs only in case or punctuation".to_string(),
                MatchReason::EditDistance { distance } => format!("{} edit(s) away", distance),
                MatchReason::PhoneticMatch { algorithm, code } => {
                    format!("sounds alike ({} {})", algorithm, code)
                }
            };
            let _ = write!(out, "; did you mean '{}'? ({})", suggestion.feature, why);
        }
        out.push('\n');
    }
    let _ = writeln!(out, "---\nTotal: {} unmatched", unmatched.len());
    out
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rivalmap_matrix::Suggestion;

    #[test]
    fn test_render_matrix() {
        let matrix = Matrix::new(
            vec!["Acme".into(), "Beta".into()],
            vec!["SSO".into(), "API".into()],
            vec![vec![true, false], vec![true, true]],
        )
        .unwrap();

        assert_eq!(
            render_matrix(&matrix),
            "Product  SSO  API\nAcme     ✓    ✗\nBeta     ✓    ✓\n"
        );
    }

    #[test]
    fn test_render_empty_matrix() {
        assert_eq!(render_matrix(&Matrix::default()), "Product\n");
    }

    #[test]
    fn test_render_unmatched() {
        let text = render_unmatched(&[UnmatchedName {
            product: "Acme".into(),
            name: "sso".into(),
            suggestion: Some(Suggestion {
                feature: "SSO".into(),
                reason: MatchReason::Normalized,
            }),
        }]);
        assert!(text.contains("did you mean 'SSO'"));
        assert!(text.contains("Total: 1 unmatched"));

        assert!(render_unmatched(&[]).starts_with("All coverage names"));
    }
}
