//! Field Classifier
//!
//! Decides, per record field, whether it becomes a property, a serialized
//! blob, or relationship evidence. Classification is pure: store side
//! effects happen in the importer once the record's node exists.

use crate::schema::{Cardinality, MappingRule, RelationshipRule, SchemaRegistry};
use crate::value::{FieldValue, Scalar};
use serde_json::Value;

/// Why a field produced neither a property nor a relationship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Rule present but neither serializes nor links.
    InertRule,
    /// Relationship rule whose shape does not fit the value.
    ShapeMismatch,
}

/// What to do with one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldAction<'r> {
    /// Store the scalar verbatim.
    Property(Scalar),
    /// Store a JSON string. `fallback` is set when no rule asked for it.
    Serialized { blob: String, fallback: bool },
    /// Stub each target and link to it. Elements without a usable id are
    /// counted in `unusable`.
    LinkEach {
        rule: &'r RelationshipRule,
        targets: Vec<Scalar>,
        unusable: usize,
    },
    /// Link to a target that is resolved later, never created here.
    LinkOne {
        rule: &'r RelationshipRule,
        target: Scalar,
    },
    Drop(DropReason),
}

/// Classify one (object type, field, value) triple.
pub fn classify<'r>(
    schema: &'r SchemaRegistry,
    object_type: &str,
    field: &str,
    value: &Value,
) -> FieldAction<'r> {
    let rule = schema.rule(object_type, field);

    match (FieldValue::parse(value), rule) {
        (FieldValue::Scalar(scalar), None) => FieldAction::Property(scalar),
        (parsed @ (FieldValue::Sequence(_) | FieldValue::Composite(_)), None) => {
            FieldAction::Serialized {
                blob: parsed.to_blob(),
                fallback: true,
            }
        }
        (parsed, Some(MappingRule::Serialize)) => FieldAction::Serialized {
            blob: parsed.to_blob(),
            fallback: false,
        },
        (FieldValue::Scalar(scalar), Some(MappingRule::Relationship(rule))) if rule.relationship_only => {
            FieldAction::LinkOne { rule, target: scalar }
        }
        (FieldValue::Sequence(items), Some(MappingRule::Relationship(rule)))
            if rule.cardinality == Cardinality::Array =>
        {
            let mut targets = Vec::with_capacity(items.len());
            let mut unusable = 0;
            for item in &items {
                match element_id(item, &rule.target_id_field) {
                    Some(id) => targets.push(id),
                    None => unusable += 1,
                }
            }
            FieldAction::LinkEach { rule, targets, unusable }
        }
        (_, Some(MappingRule::Inert)) | (FieldValue::Scalar(_), Some(MappingRule::Relationship(_))) => {
            FieldAction::Drop(DropReason::InertRule)
        }
        (_, Some(MappingRule::Relationship(_))) => FieldAction::Drop(DropReason::ShapeMismatch),
    }
}

/// Target id carried by one sequence element.
fn element_id(item: &Value, id_field: &str) -> Option<Scalar> {
    let id = match item {
        Value::Object(map) => Scalar::from_json(map.get(id_field)?)?,
        other => Scalar::from_json(other)?,
    };
    (!id.is_null()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> SchemaRegistry {
        SchemaRegistry::from_json_str(
            r#"{
                "Pilot": {
                    "ships": {"type": "Ship", "relationship": "PILOTS", "dataType": "array", "idField": "id"},
                    "faction": {"type": "Faction", "relationship": "FLIES_FOR", "relationshipOnly": true, "idField": "name"},
                    "text": {"serialize": true},
                    "skill": {"relationship": "HAS_SKILL"}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_scalar_without_rule_is_verbatim_property() {
        let schema = schema();
        assert_eq!(
            classify(&schema, "Pilot", "name", &json!("Han")),
            FieldAction::Property(Scalar::Text("Han".to_string()))
        );
        assert_eq!(
            classify(&schema, "Unknown", "cost", &json!(3)),
            FieldAction::Property(Scalar::Int(3))
        );
    }

    #[test]
    fn test_composite_without_rule_falls_back_to_blob() {
        let schema = schema();
        assert_eq!(
            classify(&schema, "Pilot", "stats", &json!({"attack": 3})),
            FieldAction::Serialized {
                blob: r#"{"attack":3}"#.to_string(),
                fallback: true
            }
        );
    }

    #[test]
    fn test_serialize_rule_applies_to_scalars_and_sequences() {
        let schema = schema();
        assert_eq!(
            classify(&schema, "Pilot", "text", &json!("Han")),
            FieldAction::Serialized {
                blob: "\"Han\"".to_string(),
                fallback: false
            }
        );
        assert_eq!(
            classify(&schema, "Pilot", "text", &json!(["a", "b"])),
            FieldAction::Serialized {
                blob: r#"["a","b"]"#.to_string(),
                fallback: false
            }
        );
    }

    #[test]
    fn test_array_rule_collects_targets() {
        let schema = schema();
        match classify(&schema, "Pilot", "ships", &json!([10, {"id": 11}, {"name": "x"}, null])) {
            FieldAction::LinkEach { rule, targets, unusable } => {
                assert_eq!(rule.target_type, "Ship");
                assert_eq!(targets, vec![Scalar::Int(10), Scalar::Int(11)]);
                assert_eq!(unusable, 2);
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_relationship_only_scalar_links_without_property() {
        let schema = schema();
        match classify(&schema, "Pilot", "faction", &json!("Rebel Alliance")) {
            FieldAction::LinkOne { rule, target } => {
                assert_eq!(rule.relationship_type, "FLIES_FOR");
                assert_eq!(target, Scalar::Text("Rebel Alliance".to_string()));
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn test_inert_rule_drops_scalar() {
        let schema = schema();
        assert_eq!(
            classify(&schema, "Pilot", "skill", &json!(9)),
            FieldAction::Drop(DropReason::InertRule)
        );
    }

    #[test]
    fn test_scalar_under_array_rule_is_dropped() {
        let schema = schema();
        assert_eq!(
            classify(&schema, "Pilot", "ships", &json!(10)),
            FieldAction::Drop(DropReason::InertRule)
        );
    }

    #[test]
    fn test_composite_under_relationship_rule_is_shape_mismatch() {
        let schema = schema();
        assert_eq!(
            classify(&schema, "Pilot", "ships", &json!({"id": 10})),
            FieldAction::Drop(DropReason::ShapeMismatch)
        );
        assert_eq!(
            classify(&schema, "Pilot", "faction", &json!(["Rebel"])),
            FieldAction::Drop(DropReason::ShapeMismatch)
        );
    }
}
