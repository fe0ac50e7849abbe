//! Feature descriptor document and the input schema derived from it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Declarative metadata describing which columns the model consumes and
/// how each one is collected.
///
/// Loaded once from `features.json` and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    /// Every column the model consumes, in the order the model expects.
    #[serde(default)]
    pub feature_columns: Vec<String>,
    /// Columns collected as free text.
    #[serde(default)]
    pub categorical_columns: Vec<String>,
    /// Columns collected as numbers.
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    /// Output class labels, in the positions of the probability vector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_labels: Option<Vec<String>>,
}

impl FeatureDescriptor {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Checks the descriptor for problems that would make record assembly ambiguous.
    ///
    /// Duplicate feature columns are rejected. Subset entries that are not
    /// feature columns are reported through the log and otherwise ignored,
    /// since they never reach the form or the model.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for name in &self.feature_columns {
            if !seen.insert(name.as_str()) {
                return Err(format!("Duplicate feature column '{}'", name));
            }
        }

        for (set, names) in [
            ("categorical_columns", &self.categorical_columns),
            ("numeric_columns", &self.numeric_columns),
        ] {
            for name in names.iter().filter(|n| !seen.contains(n.as_str())) {
                log::warn!("{} lists '{}' which is not a feature column", set, name);
            }
        }
        Ok(())
    }
}

/// How a field is collected from the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Categorical,
    Numeric,
    /// Unclassified field, collected as free text.
    Freeform,
}

impl FieldKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldKind::Numeric)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Derives the ordered input schema from a descriptor.
///
/// One entry per feature column, in declared order. A name listed as both
/// categorical and numeric resolves to categorical.
pub fn resolve(descriptor: &FeatureDescriptor) -> Vec<FieldSpec> {
    let categorical: HashSet<&str> = descriptor.categorical_columns.iter().map(String::as_str).collect();
    let numeric: HashSet<&str> = descriptor.numeric_columns.iter().map(String::as_str).collect();

    descriptor
        .feature_columns
        .iter()
        .map(|name| {
            let kind = if categorical.contains(name.as_str()) {
                FieldKind::Categorical
            } else if numeric.contains(name.as_str()) {
                FieldKind::Numeric
            } else {
                FieldKind::Freeform
            };
            FieldSpec::new(name.clone(), kind)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn liver_descriptor() -> FeatureDescriptor {
        FeatureDescriptor {
            feature_columns: names(&["Age", "Bilirubin", "Sex"]),
            categorical_columns: names(&["Sex"]),
            numeric_columns: names(&["Age", "Bilirubin"]),
            class_labels: None,
        }
    }

    #[test]
    fn test_resolve_liver_example() {
        let schema = resolve(&liver_descriptor());
        assert_eq!(
            schema,
            vec![
                FieldSpec::new("Age", FieldKind::Numeric),
                FieldSpec::new("Bilirubin", FieldKind::Numeric),
                FieldSpec::new("Sex", FieldKind::Categorical),
            ]
        );
    }

    #[test]
    fn test_unclassified_fields_fall_back_to_freeform() {
        let mut descriptor = liver_descriptor();
        descriptor.feature_columns.push("Drug".into());
        let schema = resolve(&descriptor);
        assert_eq!(schema.len(), 4);
        assert_eq!(schema[3], FieldSpec::new("Drug", FieldKind::Freeform));
    }

    #[test]
    fn test_categorical_wins_over_numeric() {
        let mut descriptor = liver_descriptor();
        descriptor.numeric_columns.push("Sex".into());
        descriptor.categorical_columns.push("Age".into());
        let schema = resolve(&descriptor);
        assert_eq!(schema[0].kind, FieldKind::Categorical);
        assert_eq!(schema[2].kind, FieldKind::Categorical);
    }

    #[test]
    fn test_resolve_preserves_order_and_is_pure() {
        let descriptor = FeatureDescriptor {
            feature_columns: names(&["Z", "A", "M", "B"]),
            categorical_columns: vec![],
            numeric_columns: names(&["M"]),
            class_labels: None,
        };
        let first = resolve(&descriptor);
        let second = resolve(&descriptor);
        assert_eq!(first, second);
        let order: Vec<&str> = first.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(order, vec!["Z", "A", "M", "B"]);
    }

    #[test]
    fn test_missing_keys_default_to_empty() -> Result<(), Box<dyn std::error::Error>> {
        let descriptor = FeatureDescriptor::from_json(r#"{"feature_columns": ["Age", "Edema"]}"#)?;
        assert!(descriptor.categorical_columns.is_empty());
        assert!(descriptor.class_labels.is_none());
        let schema = resolve(&descriptor);
        assert!(schema.iter().all(|f| f.kind == FieldKind::Freeform));
        Ok(())
    }

    #[test]
    fn test_validate_rejects_duplicate_columns() {
        let mut descriptor = liver_descriptor();
        assert!(descriptor.validate().is_ok());
        descriptor.feature_columns.push("Age".into());
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn test_validate_tolerates_stray_subset_names() {
        let mut descriptor = liver_descriptor();
        descriptor.numeric_columns.push("Cholesterol".into());
        assert!(descriptor.validate().is_ok());
        assert_eq!(resolve(&descriptor).len(), 3);
    }
}
