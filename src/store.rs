//! Graph Store Adapter
//!
//! The narrow interface the import engine needs from a property graph
//! database, plus the node and locator types that flow through it.

use crate::error::StoreError;
use crate::value::{PropertyMap, Scalar};
use serde::Serialize;
use std::fmt;

/// Opaque handle to a node that exists in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeRef(pub i64);

/// Finds a node by (label, identifying property, value).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Locator {
    pub object_type: String,
    pub id_field: String,
    pub id_value: Scalar,
}

impl Locator {
    pub fn new(object_type: impl Into<String>, id_field: impl Into<String>, id_value: Scalar) -> Self {
        Self {
            object_type: object_type.into(),
            id_field: id_field.into(),
            id_value,
        }
    }

    /// Stable string key, used for run-local indexes.
    pub fn key(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}",
            self.object_type,
            self.id_field,
            self.id_value.to_json_string()
        )
    }

    /// Property map of a stub node for this locator.
    pub fn stub_properties(&self) -> PropertyMap {
        let mut properties = PropertyMap::new();
        properties.insert(self.id_field.clone(), self.id_value.clone());
        properties
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}={})", self.object_type, self.id_field, self.id_value)
    }
}

/// Property graph store consumed by the importer.
///
/// Lookups observe committed state only; writes go to the open transaction.
#[allow(async_fn_in_trait)]
pub trait GraphStore {
    /// Delete every node and relationship.
    async fn reset_all(&mut self) -> Result<(), StoreError>;

    async fn begin(&mut self) -> Result<(), StoreError>;

    async fn commit(&mut self) -> Result<(), StoreError>;

    async fn find_node(&mut self, locator: &Locator) -> Result<Option<NodeRef>, StoreError>;

    /// Fails with [`StoreError::NodeRejected`] for an invalid property set
    /// without disturbing the open transaction.
    async fn create_node(&mut self, label: &str, properties: &PropertyMap) -> Result<NodeRef, StoreError>;

    /// Apply `properties` on top of the node's existing ones.
    async fn set_properties(&mut self, node: NodeRef, properties: &PropertyMap) -> Result<(), StoreError>;

    async fn create_relationship(
        &mut self,
        left: NodeRef,
        relationship_type: &str,
        right: NodeRef,
    ) -> Result<(), StoreError>;
}

/// Checks shared by every store before a node write.
pub fn validate_node(label: &str, properties: &PropertyMap) -> Result<(), StoreError> {
    if label.is_empty() {
        return Err(StoreError::NodeRejected("empty node label".to_string()));
    }
    validate_properties(properties)
}

/// Property checks, applied to both new nodes and merges into existing ones.
pub fn validate_properties(properties: &PropertyMap) -> Result<(), StoreError> {
    for (key, value) in properties {
        if key.is_empty() {
            return Err(StoreError::NodeRejected("empty property name".to_string()));
        }
        if let Scalar::Float(x) = value {
            if !x.is_finite() {
                return Err(StoreError::NodeRejected(format!(
                    "property `{}` is not a finite number",
                    key
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_key_distinguishes_value_types() {
        let text = Locator::new("Ship", "id", Scalar::Text("10".to_string()));
        let int = Locator::new("Ship", "id", Scalar::Int(10));
        assert_ne!(text.key(), int.key());
        assert_eq!(int.key(), Locator::new("Ship", "id", Scalar::Int(10)).key());
    }

    #[test]
    fn test_locator_display() {
        let locator = Locator::new("Ship", "xws", Scalar::Text("xwing".to_string()));
        assert_eq!(locator.to_string(), "Ship(xws=xwing)");
    }

    #[test]
    fn test_stub_properties_hold_only_identity() {
        let locator = Locator::new("Ship", "id", Scalar::Int(10));
        let props = locator.stub_properties();
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("id"), Some(&Scalar::Int(10)));
    }

    #[test]
    fn test_validate_node_rejects_empty_keys_and_labels() {
        let mut props = PropertyMap::new();
        props.insert(String::new(), Scalar::Int(1));
        assert!(matches!(validate_node("Pilot", &props), Err(StoreError::NodeRejected(_))));
        assert!(matches!(validate_node("", &PropertyMap::new()), Err(StoreError::NodeRejected(_))));
    }

    #[test]
    fn test_validate_node_rejects_non_finite_floats() {
        let mut props = PropertyMap::new();
        props.insert("cost".to_string(), Scalar::Float(f64::NAN));
        assert!(validate_node("Upgrade", &props).is_err());
        assert!(validate_properties(&props).is_err());
    }
}
