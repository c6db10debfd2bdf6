//! Node Assembler
//!
//! Classifies every field of one record and collects the results: the
//! node's property map plus the relationship evidence to act on once the
//! node has been written.

use crate::classifier::{classify, DropReason, FieldAction};
use crate::schema::{RelationshipRule, SchemaRegistry};
use crate::store::Locator;
use crate::value::{PropertyMap, Record, Scalar};
use tracing::warn;

/// Targets of one array-cardinality field.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLink<'r> {
    pub rule: &'r RelationshipRule,
    pub targets: Vec<Scalar>,
}

/// One relationshipOnly field.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleLink<'r> {
    pub rule: &'r RelationshipRule,
    pub target: Scalar,
}

#[derive(Debug, Default, PartialEq)]
pub struct Assembly<'r> {
    pub properties: PropertyMap,
    pub array_links: Vec<ArrayLink<'r>>,
    pub single_links: Vec<SingleLink<'r>>,
    /// Composite values serialized because no rule covered them.
    pub fallback_serialized: usize,
    pub dropped_fields: usize,
    /// Array elements with no usable target id.
    pub unusable_targets: usize,
}

/// Classify all fields of `record`.
pub fn assemble<'r>(schema: &'r SchemaRegistry, object_type: &str, record: &Record) -> Assembly<'r> {
    let mut assembly = Assembly::default();

    for (field, value) in record {
        match classify(schema, object_type, field, value) {
            FieldAction::Property(scalar) => {
                assembly.properties.insert(field.clone(), scalar);
            }
            FieldAction::Serialized { blob, fallback } => {
                if fallback {
                    warn!(
                        "No mapping rule for nested field {}.{}; storing it serialized",
                        object_type, field
                    );
                    assembly.fallback_serialized += 1;
                }
                assembly.properties.insert(field.clone(), Scalar::Text(blob));
            }
            FieldAction::LinkEach { rule, targets, unusable } => {
                assembly.unusable_targets += unusable;
                assembly.array_links.push(ArrayLink { rule, targets });
            }
            FieldAction::LinkOne { rule, target } => {
                if !target.is_null() {
                    assembly.single_links.push(SingleLink { rule, target });
                }
            }
            FieldAction::Drop(reason) => {
                match reason {
                    DropReason::InertRule => warn!(
                        "Rule for {}.{} neither serializes nor links; field dropped",
                        object_type, field
                    ),
                    DropReason::ShapeMismatch => warn!(
                        "Value of {}.{} does not fit its relationship rule; field dropped",
                        object_type, field
                    ),
                }
                assembly.dropped_fields += 1;
            }
        }
    }

    assembly
}

/// Identity value of a record: its scalar, non-null `id`.
pub fn record_id(record: &Record) -> Option<Scalar> {
    Scalar::from_json(record.get("id")?).filter(|id| !id.is_null())
}

/// Left-hand locator of a relationshipOnly link. Uses the rule's source id
/// field when set, `id` otherwise.
pub fn source_locator(object_type: &str, rule: &RelationshipRule, record: &Record) -> Option<Locator> {
    let field = rule.source_id_field.as_deref().unwrap_or("id");
    let value = Scalar::from_json(record.get(field)?).filter(|v| !v.is_null())?;
    Some(Locator::new(object_type, field, value))
}

/// Human-readable name for log lines.
pub fn display_name(record: &Record) -> String {
    ["name", "title", "id"]
        .iter()
        .find_map(|key| record.get(*key).and_then(Scalar::from_json))
        .map(|s| s.to_string())
        .unwrap_or_else(|| "<unnamed>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn schema() -> SchemaRegistry {
        SchemaRegistry::from_json_str(
            r#"{
                "Pilot": {
                    "ships": {"type": "Ship", "relationship": "PILOTS", "dataType": "array", "idField": "id"},
                    "faction": {"type": "Faction", "relationship": "FLIES_FOR", "relationshipOnly": true, "idField": "name", "relatedNodeIdField": "xws"},
                    "skill": {"relationship": "HAS_SKILL"}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_flat_record_without_rules_maps_verbatim() {
        let schema = SchemaRegistry::default();
        let rec = record(json!({"id": 1, "name": "Han", "unique": true, "cost": 4.5, "slot": null}));

        let assembly = assemble(&schema, "Pilot", &rec);

        assert_eq!(assembly.properties.len(), rec.len());
        for (key, value) in &rec {
            assert_eq!(assembly.properties.get(key), Scalar::from_json(value).as_ref());
        }
        assert!(assembly.array_links.is_empty());
        assert!(assembly.single_links.is_empty());
    }

    #[test]
    fn test_relationship_fields_are_not_properties() {
        let schema = schema();
        let rec = record(json!({
            "id": 1, "xws": "han", "name": "Han",
            "ships": [10, 11], "faction": "Rebel", "skill": 9, "stats": {"a": 1}
        }));

        let assembly = assemble(&schema, "Pilot", &rec);

        assert!(!assembly.properties.contains_key("ships"));
        assert!(!assembly.properties.contains_key("faction"));
        assert!(!assembly.properties.contains_key("skill"));
        assert_eq!(
            assembly.properties.get("stats"),
            Some(&Scalar::Text(r#"{"a":1}"#.to_string()))
        );
        assert_eq!(assembly.array_links.len(), 1);
        assert_eq!(assembly.array_links[0].targets, vec![Scalar::Int(10), Scalar::Int(11)]);
        assert_eq!(assembly.single_links.len(), 1);
        assert_eq!(assembly.single_links[0].target, Scalar::Text("Rebel".to_string()));
        assert_eq!(assembly.fallback_serialized, 1);
        assert_eq!(assembly.dropped_fields, 1);
    }

    #[test]
    fn test_null_relationship_only_value_links_nothing() {
        let schema = schema();
        let assembly = assemble(&schema, "Pilot", &record(json!({"id": 1, "faction": null})));
        assert!(assembly.single_links.is_empty());
        assert!(!assembly.properties.contains_key("faction"));
    }

    #[test]
    fn test_record_id() {
        assert_eq!(record_id(&record(json!({"id": "a"}))), Some(Scalar::Text("a".to_string())));
        assert_eq!(record_id(&record(json!({"id": null}))), None);
        assert_eq!(record_id(&record(json!({"id": [1]}))), None);
        assert_eq!(record_id(&record(json!({"name": "x"}))), None);
    }

    #[test]
    fn test_source_locator_uses_related_field() {
        let schema = schema();
        let rule = match schema.rule("Pilot", "faction") {
            Some(crate::schema::MappingRule::Relationship(rule)) => rule,
            other => panic!("unexpected rule: {:?}", other),
        };
        let rec = record(json!({"id": 1, "xws": "han"}));
        assert_eq!(
            source_locator("Pilot", rule, &rec),
            Some(Locator::new("Pilot", "xws", Scalar::Text("han".to_string())))
        );
    }

    #[test]
    fn test_display_name_prefers_name() {
        assert_eq!(display_name(&record(json!({"id": 3, "name": "Luke"}))), "Luke");
        assert_eq!(display_name(&record(json!({"id": 3}))), "3");
        assert_eq!(display_name(&record(json!({}))), "<unnamed>");
    }
}
