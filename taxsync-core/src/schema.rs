//! Custom-attribute field schema registry.
//!
//! The registry is an explicit, ordered list of field-to-property mappings
//! resolved at configuration time. Extension happens by calling
//! [`SchemaRegistry::register`] before a run starts — there is no runtime
//! introspection of the store's field layout.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The value type a field may carry. Only these are supported for
/// synchronization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Text,
    Uri,
}

/// Whether a field holds one value or a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    Single,
    Multiple,
}

/// One field-to-remote-property mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field id on the local node (key into its custom value map).
    pub field_id: String,
    /// Remote property the value is written to / read from.
    pub remote_property: String,
    pub cardinality: Cardinality,
    pub value_type: ValueType,
}

/// Field ids whose values live directly on the node rather than in its
/// custom value map; they stay in the registry for property resolution
/// but are excluded from the custom-attribute write path.
const BUILTIN_FIELDS: &[&str] = &["alt_labels", "hidden_labels"];

/// An ordered list of field schemas for one synchronization setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaRegistry {
    fields: Vec<FieldSchema>,
}

impl Default for SchemaRegistry {
    /// The built-in mappings: alternative labels, hidden labels, and exact
    /// matches.
    fn default() -> Self {
        Self {
            fields: vec![
                FieldSchema {
                    field_id: "alt_labels".to_string(),
                    remote_property: "skos:altLabel".to_string(),
                    cardinality: Cardinality::Multiple,
                    value_type: ValueType::Text,
                },
                FieldSchema {
                    field_id: "hidden_labels".to_string(),
                    remote_property: "skos:hiddenLabel".to_string(),
                    cardinality: Cardinality::Multiple,
                    value_type: ValueType::Text,
                },
                FieldSchema {
                    field_id: "exact_match".to_string(),
                    remote_property: "skos:exactMatch".to_string(),
                    cardinality: Cardinality::Multiple,
                    value_type: ValueType::Uri,
                },
            ],
        }
    }
}

impl SchemaRegistry {
    pub fn empty() -> Self {
        Self { fields: Vec::new() }
    }

    /// Register an additional field mapping.
    ///
    /// Fails with [`ConfigError::DuplicateField`] when the field id is
    /// already present and [`ConfigError::InvalidField`] when id or
    /// property is empty.
    pub fn register(&mut self, field: FieldSchema) -> Result<(), ConfigError> {
        if field.field_id.is_empty() {
            return Err(ConfigError::InvalidField {
                field_id: field.field_id,
                reason: "field id must not be empty".to_string(),
            });
        }
        if field.remote_property.is_empty() {
            return Err(ConfigError::InvalidField {
                field_id: field.field_id,
                reason: "remote property must not be empty".to_string(),
            });
        }
        if self.fields.iter().any(|f| f.field_id == field.field_id) {
            return Err(ConfigError::DuplicateField {
                field_id: field.field_id,
            });
        }
        self.fields.push(field);
        Ok(())
    }

    /// All registered fields in registration order.
    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Fields written through the custom-attribute path (everything except
    /// the builtin label fields).
    pub fn custom_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields
            .iter()
            .filter(|f| !BUILTIN_FIELDS.contains(&f.field_id.as_str()))
    }

    /// The property list requested from the remote service when fetching
    /// concepts. Always includes `skos:broader` for hierarchy resolution.
    pub fn skos_properties(&self) -> Vec<String> {
        let mut properties: Vec<String> =
            self.fields.iter().map(|f| f.remote_property.clone()).collect();
        properties.push("skos:broader".to_string());
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_builtin_mappings() {
        let registry = SchemaRegistry::default();
        let ids: Vec<&str> = registry.fields().iter().map(|f| f.field_id.as_str()).collect();
        assert_eq!(ids, vec!["alt_labels", "hidden_labels", "exact_match"]);
    }

    #[test]
    fn skos_properties_always_include_broader() {
        let registry = SchemaRegistry::empty();
        assert_eq!(registry.skos_properties(), vec!["skos:broader".to_string()]);
    }

    #[test]
    fn custom_fields_exclude_builtin_labels() {
        let registry = SchemaRegistry::default();
        let ids: Vec<&str> = registry.custom_fields().map(|f| f.field_id.as_str()).collect();
        assert_eq!(ids, vec!["exact_match"]);
    }

    #[test]
    fn register_appends_in_order() {
        let mut registry = SchemaRegistry::default();
        registry
            .register(FieldSchema {
                field_id: "scope_note".to_string(),
                remote_property: "skos:scopeNote".to_string(),
                cardinality: Cardinality::Single,
                value_type: ValueType::Text,
            })
            .expect("register");
        assert_eq!(registry.fields().last().unwrap().field_id, "scope_note");
        assert!(registry
            .skos_properties()
            .contains(&"skos:scopeNote".to_string()));
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut registry = SchemaRegistry::default();
        let err = registry
            .register(FieldSchema {
                field_id: "exact_match".to_string(),
                remote_property: "skos:exactMatch".to_string(),
                cardinality: Cardinality::Multiple,
                value_type: ValueType::Uri,
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateField { .. }));
    }

    #[test]
    fn register_rejects_empty_property() {
        let mut registry = SchemaRegistry::empty();
        let err = registry
            .register(FieldSchema {
                field_id: "x".to_string(),
                remote_property: String::new(),
                cardinality: Cardinality::Single,
                value_type: ValueType::Text,
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidField { .. }));
    }
}
