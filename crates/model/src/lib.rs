//! Core domain model for rivalmap competitor analysis.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `Feature` / `FeatureCatalog`: the comparable capabilities being analyzed
//! - `CoverageMap`: which product claims which feature
//! - `Matrix`: the dense products × features grid
//! - `WeightTable`, `ScoreMap`, `RankingEntry`: scoring outputs
//! - `AnalysisResult`: the caller-owned bundle of one analysis run

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// Errors raised when analysis inputs are structurally wrong.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AnalysisError {
    pub fn invalid(context: impl Into<String>) -> Self {
        Self::InvalidInput(context.into())
    }
}

/// Category label attached to a feature.
///
/// Matching is exact: "security" is not "Security" and falls into `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FeatureCategory {
    CoreFunctionality,
    Security,
    Integration,
    Performance,
    Pricing,
    Support,
    UiUx,
    Analytics,
    General,
    /// Any label not in the fixed table
    Other(String),
}

impl Default for FeatureCategory {
    fn default() -> Self {
        Self::General
    }
}

impl From<&str> for FeatureCategory {
    fn from(s: &str) -> Self {
        match s {
            "Core Functionality" => Self::CoreFunctionality,
            "Security" => Self::Security,
            "Integration" => Self::Integration,
            "Performance" => Self::Performance,
            "Pricing" => Self::Pricing,
            "Support" => Self::Support,
            "UI/UX" => Self::UiUx,
            "Analytics" => Self::Analytics,
            "General" => Self::General,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for FeatureCategory {
    fn from(s: String) -> Self {
        match Self::from(s.as_str()) {
            Self::Other(_) => Self::Other(s),
            known => known,
        }
    }
}

impl From<FeatureCategory> for String {
    fn from(category: FeatureCategory) -> Self {
        category.label().to_string()
    }
}

impl FeatureCategory {
    /// Get the label as it appears in extraction output.
    pub fn label(&self) -> &str {
        match self {
            Self::CoreFunctionality => "Core Functionality",
            Self::Security => "Security",
            Self::Integration => "Integration",
            Self::Performance => "Performance",
            Self::Pricing => "Pricing",
            Self::Support => "Support",
            Self::UiUx => "UI/UX",
            Self::Analytics => "Analytics",
            Self::General => "General",
            Self::Other(label) => label,
        }
    }

    /// Get the default importance weight for features in this category.
    pub fn base_weight(&self) -> f64 {
        match self {
            Self::CoreFunctionality => 1.5,
            Self::Security => 1.3,
            Self::Integration | Self::Performance => 1.2,
            Self::Pricing => 1.1,
            Self::Support | Self::UiUx | Self::Analytics | Self::General | Self::Other(_) => 1.0,
        }
    }
}

/// A comparable capability extracted for an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Unique name within the catalog
    #[serde(rename = "feature_name", alias = "name")]
    pub name: String,

    /// Short description
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    /// Category label
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: FeatureCategory,
}

/// Read `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Feature {
    pub fn new(name: impl Into<String>, category: impl Into<FeatureCategory>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category: category.into(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Ordered list of features. Insertion order is the column order of every
/// matrix built from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Feature>", into = "Vec<Feature>")]
pub struct FeatureCatalog {
    features: Vec<Feature>,
}

impl FeatureCatalog {
    /// Build a catalog, rejecting duplicate feature names.
    pub fn new(features: Vec<Feature>) -> Result<Self, AnalysisError> {
        let mut seen = HashSet::with_capacity(features.len());
        for feature in &features {
            if !seen.insert(feature.name.as_str()) {
                return Err(AnalysisError::invalid(format!(
                    "duplicate feature name '{}' in catalog",
                    feature.name
                )));
            }
        }
        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|f| f.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl TryFrom<Vec<Feature>> for FeatureCatalog {
    type Error = AnalysisError;

    fn try_from(features: Vec<Feature>) -> Result<Self, Self::Error> {
        Self::new(features)
    }
}

impl From<FeatureCatalog> for Vec<Feature> {
    fn from(catalog: FeatureCatalog) -> Self {
        catalog.features
    }
}

impl<'a> IntoIterator for &'a FeatureCatalog {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

/// Product name → names of the features that product claims.
///
/// Names are not checked against any catalog; stray names are kept and
/// simply never match a column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageMap(BTreeMap<String, BTreeSet<String>>);

impl CoverageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add features to a product, creating the product if needed.
    pub fn insert<I, S>(&mut self, product: impl Into<String>, features: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .entry(product.into())
            .or_default()
            .extend(features.into_iter().map(Into::into));
    }

    pub fn with_product<I, S>(mut self, product: impl Into<String>, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(product, features);
        self
    }

    /// Product names in lexicographic order.
    pub fn products(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn features_of(&self, product: &str) -> Option<&BTreeSet<String>> {
        self.0.get(product)
    }

    /// Whether `product` claims `feature`. Unknown products own nothing.
    pub fn owns(&self, product: &str, feature: &str) -> bool {
        self.0
            .get(product)
            .map(|owned| owned.contains(feature))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.0.iter().map(|(p, f)| (p.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P, I, S> FromIterator<(P, I)> for CoverageMap
where
    P: Into<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (P, I)>>(iter: T) -> Self {
        let mut coverage = Self::new();
        for (product, features) in iter {
            coverage.insert(product, features);
        }
        coverage
    }
}

/// Dense boolean grid of products (rows) × features (columns).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Matrix {
    products: Vec<String>,
    features: Vec<String>,
    cells: Vec<Vec<bool>>,
}

impl Matrix {
    /// Assemble a matrix, checking that every row has one cell per feature.
    pub fn new(
        products: Vec<String>,
        features: Vec<String>,
        cells: Vec<Vec<bool>>,
    ) -> Result<Self, AnalysisError> {
        if cells.len() != products.len() {
            return Err(AnalysisError::invalid(format!(
                "matrix has {} rows for {} products",
                cells.len(),
                products.len()
            )));
        }
        if let Some(dup) = first_duplicate(&products) {
            return Err(AnalysisError::invalid(format!("duplicate product '{}' in matrix", dup)));
        }
        if let Some(dup) = first_duplicate(&features) {
            return Err(AnalysisError::invalid(format!("duplicate feature '{}' in matrix", dup)));
        }
        if let Some((i, row)) = cells
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != features.len())
        {
            return Err(AnalysisError::invalid(format!(
                "row '{}' has {} cells, expected {}",
                products[i],
                row.len(),
                features.len()
            )));
        }
        Ok(Self {
            products,
            features,
            cells,
        })
    }

    pub fn products(&self) -> &[String] {
        &self.products
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn product_index(&self, product: &str) -> Option<usize> {
        self.products.iter().position(|p| p == product)
    }

    pub fn feature_index(&self, feature: &str) -> Option<usize> {
        self.features.iter().position(|f| f == feature)
    }

    /// Cell value, or `None` when either key is not part of the grid.
    pub fn get(&self, product: &str, feature: &str) -> Option<bool> {
        let row = self.product_index(product)?;
        let col = self.feature_index(feature)?;
        Some(self.cells[row][col])
    }

    pub fn row(&self, index: usize) -> Option<&[bool]> {
        self.cells.get(index).map(Vec::as_slice)
    }

    /// Iterate rows as `(product, cells)` in row order.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[bool])> {
        self.products
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter().map(Vec::as_slice))
    }

    pub fn cell_count(&self) -> usize {
        self.products.len() * self.features.len()
    }
}

fn first_duplicate(names: &[String]) -> Option<&str> {
    let mut seen = HashSet::with_capacity(names.len());
    names
        .iter()
        .find(|n| !seen.insert(n.as_str()))
        .map(String::as_str)
}

impl<'de> Deserialize<'de> for Matrix {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            products: Vec<String>,
            features: Vec<String>,
            cells: Vec<Vec<bool>>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Self::new(raw.products, raw.features, raw.cells).map_err(serde::de::Error::custom)
    }
}

/// A validated feature weight: finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Weight(f64);

impl Weight {
    /// Weight of a feature with no category or override.
    pub const DEFAULT: Weight = Weight(1.0);

    pub fn new(value: f64) -> Result<Self, AnalysisError> {
        if !value.is_finite() || value < 0.0 {
            return Err(AnalysisError::invalid(format!(
                "weight must be a finite number >= 0, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<&FeatureCategory> for Weight {
    fn from(category: &FeatureCategory) -> Self {
        Self(category.base_weight())
    }
}

/// Feature name → importance weight. Weights are finite and non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct WeightTable(BTreeMap<String, f64>);

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw weight, rejecting negative or non-finite values.
    pub fn insert(&mut self, feature: impl Into<String>, weight: f64) -> Result<(), AnalysisError> {
        let feature = feature.into();
        let weight = Weight::new(weight).map_err(|AnalysisError::InvalidInput(reason)| {
            AnalysisError::invalid(format!("feature '{}': {}", feature, reason))
        })?;
        self.set(feature, weight);
        Ok(())
    }

    pub fn set(&mut self, feature: impl Into<String>, weight: Weight) {
        self.0.insert(feature.into(), weight.value());
    }

    pub fn get(&self, feature: &str) -> Option<f64> {
        self.0.get(feature).copied()
    }

    pub fn weight(&self, feature: &str) -> Option<Weight> {
        self.0.get(feature).map(|w| Weight(*w))
    }

    /// Sum of every weight in the table.
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<BTreeMap<String, f64>> for WeightTable {
    type Error = AnalysisError;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut table = Self::new();
        for (feature, weight) in map {
            table.insert(feature, weight)?;
        }
        Ok(table)
    }
}

impl From<WeightTable> for BTreeMap<String, f64> {
    fn from(table: WeightTable) -> Self {
        table.0
    }
}

/// Round half-up to two decimal places.
///
/// Only meaningful for non-negative values, which is all scores and
/// percentages ever are.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Product name → weighted coverage score (0–100).
pub type ScoreMap = BTreeMap<String, f64>;

/// Product name → category label → percentage of that category owned.
pub type CategoryCoverage = BTreeMap<String, BTreeMap<String, f64>>;

/// Boolean matrix decorated with weights and per-cell contributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedMatrix {
    pub matrix: Matrix,

    /// One weight per matrix column
    pub weights: Vec<f64>,

    /// `contributions[row][col]` is the column weight if owned, else 0
    pub contributions: Vec<Vec<f64>>,
}

impl WeightedMatrix {
    pub fn weight(&self, feature: &str) -> Option<f64> {
        self.matrix.feature_index(feature).map(|i| self.weights[i])
    }

    pub fn contribution(&self, product: &str, feature: &str) -> Option<f64> {
        let row = self.matrix.product_index(product)?;
        let col = self.matrix.feature_index(feature)?;
        Some(self.contributions[row][col])
    }

    /// Sum of a product's contributions.
    pub fn product_total(&self, product: &str) -> Option<f64> {
        let row = self.matrix.product_index(product)?;
        Some(self.contributions[row].iter().sum())
    }
}

/// One row of the final ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    /// 1-based position
    pub rank: usize,
    pub product: String,
    pub score: f64,
    pub is_main_product: bool,
}

/// Feature-level comparison of the main product against its competitors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Differentiators {
    /// Features only the main product owns
    pub unique_to_product: Vec<String>,

    /// Features some competitor owns but the main product lacks
    pub unique_to_competitors: Vec<String>,

    /// Features every product owns
    pub common_features: Vec<String>,
}

/// Everything an analysis run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInput {
    /// The caller's own product
    pub main_product: String,
    pub catalog: FeatureCatalog,
    pub coverage: CoverageMap,

    /// Explicit weights; category defaults are used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<WeightTable>,
}

impl AnalysisInput {
    pub fn new(main_product: impl Into<String>, catalog: FeatureCatalog, coverage: CoverageMap) -> Self {
        Self {
            main_product: main_product.into(),
            catalog,
            coverage,
            weights: None,
        }
    }

    pub fn with_weights(mut self, weights: WeightTable) -> Self {
        self.weights = Some(weights);
        self
    }
}

/// Result of one analysis run, owned by the caller and passed explicitly
/// between request boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub main_product: String,
    pub catalog: FeatureCatalog,
    pub coverage: CoverageMap,
    pub matrix: Matrix,
    pub weights: WeightTable,
    pub scores: ScoreMap,
    pub ranking: Vec<RankingEntry>,
    pub differentiators: Differentiators,
    pub category_coverage: CategoryCoverage,
}

impl AnalysisResult {
    /// The ranking entry for the main product, if it was scored.
    pub fn main_entry(&self) -> Option<&RankingEntry> {
        self.ranking.iter().find(|e| e.is_main_product)
    }

    pub fn leader(&self) -> Option<&RankingEntry> {
        self.ranking.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_category_from_str() {
        assert_eq!(FeatureCategory::from("Security"), FeatureCategory::Security);
        assert_eq!(FeatureCategory::from("UI/UX"), FeatureCategory::UiUx);
        assert_eq!(
            FeatureCategory::from("security"),
            FeatureCategory::Other("security".into())
        );
    }

    #[test]
    fn test_category_base_weight() {
        assert_eq!(FeatureCategory::CoreFunctionality.base_weight(), 1.5);
        assert_eq!(FeatureCategory::Pricing.base_weight(), 1.1);
        assert_eq!(FeatureCategory::from("Compliance").base_weight(), 1.0);
    }

    #[test]
    fn test_feature_deserialization_defaults() {
        let feature: Feature = serde_json::from_str(r#"{"feature_name": "SSO"}"#).unwrap();
        assert_eq!(feature.name, "SSO");
        assert_eq!(feature.description, "");
        assert_eq!(feature.category, FeatureCategory::General);
    }

    #[test]
    fn test_feature_null_fields_default() {
        let feature: Feature = serde_json::from_str(
            r#"{"feature_name": "SSO", "description": null, "category": null}"#,
        )
        .unwrap();
        assert_eq!(feature.description, "");
        assert_eq!(feature.category, FeatureCategory::General);
    }

    #[test]
    fn test_category_keeps_unknown_label() {
        let feature: Feature =
            serde_json::from_str(r#"{"feature_name": "Audit", "category": "Compliance"}"#).unwrap();
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["category"], "Compliance");
    }

    #[test]
    fn test_catalog_rejects_duplicates() {
        let result = FeatureCatalog::new(vec![
            Feature::new("SSO", "Security"),
            Feature::new("SSO", "Integration"),
        ]);
        assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));

        let from_json: Result<FeatureCatalog, _> = serde_json::from_str(
            r#"[{"feature_name": "A"}, {"feature_name": "A"}]"#,
        );
        assert!(from_json.is_err());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(52.000000000000007), 52.0);
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(66.666666), 66.67);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_coverage_owns() {
        let coverage = CoverageMap::new().with_product("Acme", ["SSO"]);
        assert!(coverage.owns("Acme", "SSO"));
        assert!(!coverage.owns("Acme", "API"));
        assert!(!coverage.owns("Nobody", "SSO"));
    }

    #[test]
    fn test_matrix_rejects_ragged_rows() {
        let result = Matrix::new(
            vec!["Acme".into()],
            vec!["SSO".into(), "API".into()],
            vec![vec![true]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_weight_table_rejects_negative() {
        let mut table = WeightTable::new();
        assert!(table.insert("SSO", -1.0).is_err());
        assert!(table.insert("SSO", f64::NAN).is_err());
        assert!(table.insert("SSO", 0.0).is_ok());
        assert_eq!(table.total(), 0.0);
    }

    #[test]
    fn test_matrix_rejects_duplicate_columns() {
        let result = Matrix::new(
            vec!["Acme".into()],
            vec!["SSO".into(), "SSO".into()],
            vec![vec![true, false]],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_weight_from_category() {
        assert_eq!(Weight::from(&FeatureCategory::Security).value(), 1.3);
        assert_eq!(Weight::DEFAULT.value(), 1.0);
        assert!(Weight::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_result_serialization() {
        let catalog = FeatureCatalog::new(vec![Feature::new("SSO", "Security")]).unwrap();
        let coverage = CoverageMap::new().with_product("Acme", ["SSO"]);
        let matrix = Matrix::new(vec!["Acme".into()], vec!["SSO".into()], vec![vec![true]]).unwrap();
        let mut weights = WeightTable::new();
        weights.insert("SSO", 1.3).unwrap();

        let result = AnalysisResult {
            main_product: "Acme".into(),
            catalog,
            coverage,
            matrix,
            weights,
            scores: ScoreMap::from([("Acme".to_string(), 100.0)]),
            ranking: vec![RankingEntry {
                rank: 1,
                product: "Acme".into(),
                score: 100.0,
                is_main_product: true,
            }],
            differentiators: Differentiators::default(),
            category_coverage: CategoryCoverage::new(),
        };

        let json = serde_json::to_string(&result).unwrap();
        let parsed: AnalysisResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
        assert_eq!(parsed.main_entry().map(|e| e.rank), Some(1));
    }
}
