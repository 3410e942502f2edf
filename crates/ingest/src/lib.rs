//! Ingestion of upstream extraction output.
//!
//! Converts the loosely-typed JSON produced by feature extraction into
//! validated model types:
//! - `features`: list of `{feature_name, description, category}`
//! - `product_features`: map of product name → list of feature names
//!
//! Missing optional keys are defaulted; anything of the wrong shape is
//! rejected with `AnalysisError::InvalidInput` before any work is done.

use rivalmap_model::{AnalysisError, CoverageMap, Feature, FeatureCatalog, WeightTable};
use serde_json::{Map, Value};

/// Validated output of one extraction run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub catalog: FeatureCatalog,
    pub coverage: CoverageMap,
}

/// Parse extraction JSON text.
pub fn parse_extraction_str(text: &str) -> Result<Extraction, AnalysisError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| AnalysisError::invalid(format!("extraction is not valid JSON: {}", e)))?;
    parse_extraction(&value)
}

/// Parse an extraction document.
///
/// Absent `features` / `product_features` keys mean "nothing extracted";
/// present keys must hold a list and an object respectively.
pub fn parse_extraction(value: &Value) -> Result<Extraction, AnalysisError> {
    let root = value
        .as_object()
        .ok_or_else(|| AnalysisError::invalid(format!("extraction must be an object, got {}", kind(value))))?;

    let catalog = match root.get("features") {
        None => FeatureCatalog::default(),
        Some(features) => parse_catalog(features)?,
    };

    let coverage = match root.get("product_features") {
        None => CoverageMap::new(),
        Some(products) => parse_coverage(products)?,
    };

    tracing::debug!(
        features = catalog.len(),
        products = coverage.len(),
        "Parsed extraction"
    );

    Ok(Extraction { catalog, coverage })
}

/// Parse the feature list.
pub fn parse_catalog(value: &Value) -> Result<FeatureCatalog, AnalysisError> {
    let items = value
        .as_array()
        .ok_or_else(|| AnalysisError::invalid(format!("features must be a list, got {}", kind(value))))?;

    let features = items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_feature(i, item))
        .collect::<Result<Vec<_>, _>>()?;

    FeatureCatalog::new(features)
}

fn parse_feature(index: usize, value: &Value) -> Result<Feature, AnalysisError> {
    let obj = value.as_object().ok_or_else(|| {
        AnalysisError::invalid(format!("features[{}] must be an object, got {}", index, kind(value)))
    })?;

    let name = match obj.get("feature_name") {
        Some(Value::String(name)) => name.clone(),
        Some(other) => {
            return Err(AnalysisError::invalid(format!(
                "features[{}].feature_name must be a string, got {}",
                index,
                kind(other)
            )))
        }
        None => {
            return Err(AnalysisError::invalid(format!(
                "features[{}] is missing feature_name",
                index
            )))
        }
    };

    let description = optional_str(obj, "description", index)?.unwrap_or_default();
    let category = optional_str(obj, "category", index)?.unwrap_or_else(|| "General".to_string());

    Ok(Feature::new(name, category).with_description(description))
}

fn optional_str(obj: &Map<String, Value>, key: &str, index: usize) -> Result<Option<String>, AnalysisError> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(AnalysisError::invalid(format!(
            "features[{}].{} must be a string, got {}",
            index,
            key,
            kind(other)
        ))),
    }
}

/// Parse the product → feature names mapping.
pub fn parse_coverage(value: &Value) -> Result<CoverageMap, AnalysisError> {
    let products = value.as_object().ok_or_else(|| {
        AnalysisError::invalid(format!("product_features must be an object, got {}", kind(value)))
    })?;

    let mut coverage = CoverageMap::new();
    for (product, owned) in products {
        let names = owned.as_array().ok_or_else(|| {
            AnalysisError::invalid(format!(
                "product_features['{}'] must be a list, got {}",
                product,
                kind(owned)
            ))
        })?;

        let names = names
            .iter()
            .map(|n| {
                n.as_str().map(str::to_string).ok_or_else(|| {
                    AnalysisError::invalid(format!(
                        "product_features['{}'] contains a {}, expected a feature name",
                        product,
                        kind(n)
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        coverage.insert(product.clone(), names);
    }

    Ok(coverage)
}

/// Parse a weight override object (`{"SSO": 2.0, ...}`).
pub fn parse_weights(value: &Value) -> Result<WeightTable, AnalysisError> {
    let entries = value
        .as_object()
        .ok_or_else(|| AnalysisError::invalid(format!("weights must be an object, got {}", kind(value))))?;

    let mut table = WeightTable::new();
    for (feature, weight) in entries {
        let weight = weight.as_f64().ok_or_else(|| {
            AnalysisError::invalid(format!("weight for '{}' must be a number, got {}", feature, kind(weight)))
        })?;
        table.insert(feature.clone(), weight)?;
    }

    Ok(table)
}

/// Parse weight override JSON text.
pub fn parse_weights_str(text: &str) -> Result<WeightTable, AnalysisError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| AnalysisError::invalid(format!("weights are not valid JSON: {}", e)))?;
    parse_weights(&value)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
