//! Ordered feature schema
//!
//! Records the exact column order of a feature matrix. A fitted model
//! carries its schema and refuses to predict against a matrix built with a
//! different one — column-name-based selection is never used at predict
//! time.

use serde::{Deserialize, Serialize};

pub const INTERCEPT: &str = "intercept";

/// Ordered list of matrix columns, intercept first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(feature_columns: Vec<String>) -> Self {
        let mut columns = Vec::with_capacity(feature_columns.len() + 1);
        columns.push(INTERCEPT.to_string());
        columns.extend(feature_columns);
        Self { columns }
    }

    /// All columns, intercept included.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Matrix width this schema describes.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn describe(&self) -> String {
        self.columns.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intercept_is_first() {
        let schema = FeatureSchema::new(vec!["hour".to_string(), "lag_1".to_string()]);
        assert_eq!(schema.columns()[0], "intercept");
        assert_eq!(schema.width(), 3);
    }

    #[test]
    fn test_order_matters_for_equality() {
        let a = FeatureSchema::new(vec!["hour".to_string(), "lag_1".to_string()]);
        let b = FeatureSchema::new(vec!["lag_1".to_string(), "hour".to_string()]);
        assert_ne!(a, b);
    }
}
