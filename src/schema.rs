//! Schema Registry
//!
//! Loads the field-mapping schema document and indexes it by
//! (object type, field name).

use crate::error::{ImportError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

const DEFAULT_ID_FIELD: &str = "id";

/// How many target ids a relationship field carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Single,
    Array,
}

/// A relationship-producing rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipRule {
    pub target_type: String,
    pub relationship_type: String,
    pub cardinality: Cardinality,
    pub target_id_field: String,
    pub relationship_only: bool,
    /// Identity field of the source record; `id` when unset.
    pub source_id_field: Option<String>,
}

/// Resolved mapping for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingRule {
    /// Store the value as a JSON string property.
    Serialize,
    Relationship(RelationshipRule),
    /// A rule exists but neither serializes nor links. The field is dropped.
    Inert,
}

/// Rule object as written in the schema document.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RuleDocument {
    #[serde(default)]
    serialize: bool,
    #[serde(rename = "type")]
    target_type: Option<String>,
    relationship: Option<String>,
    data_type: Option<String>,
    id_field: Option<String>,
    #[serde(default)]
    relationship_only: bool,
    related_node_id_field: Option<String>,
}

impl RuleDocument {
    fn resolve(self, object_type: &str, field: &str) -> Result<MappingRule> {
        let cardinality = match self.data_type.as_deref() {
            Some("array") => Cardinality::Array,
            _ => Cardinality::Single,
        };

        if self.serialize {
            if self.relationship_only {
                return Err(ImportError::Configuration(format!(
                    "rule {}.{} is both serialize and relationshipOnly",
                    object_type, field
                )));
            }
            return Ok(MappingRule::Serialize);
        }

        let links = self.relationship_only || cardinality == Cardinality::Array;
        if !links {
            return Ok(MappingRule::Inert);
        }

        let (target_type, relationship_type) = match (self.target_type, self.relationship) {
            (Some(t), Some(r)) if !t.is_empty() && !r.is_empty() => (t, r),
            _ => {
                return Err(ImportError::Configuration(format!(
                    "relationship rule {}.{} needs both `type` and `relationship`",
                    object_type, field
                )))
            }
        };

        Ok(MappingRule::Relationship(RelationshipRule {
            target_type,
            relationship_type,
            cardinality,
            target_id_field: self
                .id_field
                .unwrap_or_else(|| DEFAULT_ID_FIELD.to_string()),
            relationship_only: self.relationship_only,
            source_id_field: self.related_node_id_field,
        }))
    }
}

/// Field rules indexed by object type, then field name.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    rules: HashMap<String, HashMap<String, MappingRule>>,
}

impl SchemaRegistry {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ImportError::Configuration(format!("cannot read schema {}: {}", path.display(), e))
        })?;
        let registry = Self::from_json_str(&content)?;
        info!(
            "📐 Loaded schema from {} ({} object types, {} rules)",
            path.display(),
            registry.rules.len(),
            registry.rule_count()
        );
        Ok(registry)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let document: HashMap<String, HashMap<String, RuleDocument>> =
            serde_json::from_str(content)
                .map_err(|e| ImportError::Configuration(format!("malformed schema: {}", e)))?;

        let mut rules = HashMap::new();
        for (object_type, fields) in document {
            let mut resolved = HashMap::new();
            for (field, rule) in fields {
                let mapping = rule.resolve(&object_type, &field)?;
                resolved.insert(field, mapping);
            }
            rules.insert(object_type, resolved);
        }

        Ok(Self { rules })
    }

    pub fn rule(&self, object_type: &str, field: &str) -> Option<&MappingRule> {
        self.rules.get(object_type)?.get(field)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.values().map(HashMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_relationship_rule() {
        let schema = SchemaRegistry::from_json_str(
            r#"{"Pilot": {"ships": {"type": "Ship", "relationship": "PILOTS", "dataType": "array", "idField": "id"}}}"#,
        )
        .unwrap();

        let rule = schema.rule("Pilot", "ships").unwrap();
        assert_eq!(
            rule,
            &MappingRule::Relationship(RelationshipRule {
                target_type: "Ship".to_string(),
                relationship_type: "PILOTS".to_string(),
                cardinality: Cardinality::Array,
                target_id_field: "id".to_string(),
                relationship_only: false,
                source_id_field: None,
            })
        );
    }

    #[test]
    fn test_relationship_only_rule_defaults_id_field() {
        let schema = SchemaRegistry::from_json_str(
            r#"{"Pilot": {"faction": {"type": "Faction", "relationship": "FLIES_FOR", "relationshipOnly": true, "relatedNodeIdField": "xws"}}}"#,
        )
        .unwrap();

        match schema.rule("Pilot", "faction") {
            Some(MappingRule::Relationship(rule)) => {
                assert!(rule.relationship_only);
                assert_eq!(rule.cardinality, Cardinality::Single);
                assert_eq!(rule.target_id_field, "id");
                assert_eq!(rule.source_id_field.as_deref(), Some("xws"));
            }
            other => panic!("unexpected rule: {:?}", other),
        }
    }

    #[test]
    fn test_serialize_and_inert_rules() {
        let schema = SchemaRegistry::from_json_str(
            r#"{"Ship": {"maneuvers": {"serialize": true}, "size": {"relationship": "HAS_SIZE"}}}"#,
        )
        .unwrap();

        assert_eq!(schema.rule("Ship", "maneuvers"), Some(&MappingRule::Serialize));
        assert_eq!(schema.rule("Ship", "size"), Some(&MappingRule::Inert));
        assert_eq!(schema.rule("Ship", "name"), None);
        assert_eq!(schema.rule("Upgrade", "name"), None);
        assert_eq!(schema.rule_count(), 2);
    }

    #[test]
    fn test_ambiguous_rule_is_fatal() {
        let err = SchemaRegistry::from_json_str(
            r#"{"Pilot": {"ship": {"serialize": true, "relationshipOnly": true, "type": "Ship", "relationship": "FLIES"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }

    #[test]
    fn test_incomplete_relationship_rule_is_fatal() {
        let err = SchemaRegistry::from_json_str(
            r#"{"Pilot": {"ships": {"dataType": "array", "type": "Ship"}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Pilot.ships"));
    }

    #[test]
    fn test_malformed_schema_is_fatal() {
        let err = SchemaRegistry::from_json_str("[1, 2").unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }

    #[test]
    fn test_missing_schema_file_is_fatal() {
        let err = SchemaRegistry::from_path(Path::new("/nonexistent/schema.json")).unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }
}
