//! In-memory graph store.
//!
//! Writes are staged in the open transaction and become visible to
//! `find_node` only after `commit`, mirroring a database whose lookups run
//! outside the writing transaction.

use crate::error::StoreError;
use crate::store::{validate_node, validate_properties, GraphStore, Locator, NodeRef};
use crate::value::PropertyMap;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct StoredNode {
    pub label: String,
    pub properties: PropertyMap,
    committed: bool,
}

#[derive(Debug, Clone)]
pub struct StoredRelationship {
    pub left: NodeRef,
    pub relationship_type: String,
    pub right: NodeRef,
    committed: bool,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    nodes: Vec<StoredNode>,
    relationships: Vec<StoredRelationship>,
    in_transaction: bool,
    commits: usize,
    reserved_properties: HashSet<String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject any node carrying a property with this name.
    pub fn with_reserved_property(mut self, name: impl Into<String>) -> Self {
        self.reserved_properties.insert(name.into());
        self
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StoredNode> {
        self.nodes.iter().filter(|n| n.committed)
    }

    pub fn nodes_with_label<'a>(&'a self, label: &'a str) -> Vec<&'a StoredNode> {
        self.nodes().filter(|n| n.label == label).collect()
    }

    pub fn relationships(&self) -> impl Iterator<Item = &StoredRelationship> {
        self.relationships.iter().filter(|r| r.committed)
    }

    pub fn node(&self, node: NodeRef) -> Option<&StoredNode> {
        usize::try_from(node.0).ok().and_then(|i| self.nodes.get(i))
    }

    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// Committed graph rendered as sorted node and edge descriptions,
    /// so two graphs compare equal when they are isomorphic on content.
    pub fn canonical_graph(&self) -> (Vec<String>, Vec<String>) {
        let describe = |node: &StoredNode| {
            let props = serde_json::to_string(&node.properties).unwrap_or_default();
            format!("{}{}", node.label, props)
        };

        let mut nodes: Vec<String> = self.nodes().map(describe).collect();
        nodes.sort();

        let mut edges: Vec<String> = self
            .relationships()
            .filter_map(|r| {
                let left = self.node(r.left)?;
                let right = self.node(r.right)?;
                Some(format!("{}-[{}]->{}", describe(left), r.relationship_type, describe(right)))
            })
            .collect();
        edges.sort();

        (nodes, edges)
    }

    fn require_transaction(&self) -> Result<(), StoreError> {
        if self.in_transaction {
            Ok(())
        } else {
            Err(StoreError::Backend("no open transaction".to_string()))
        }
    }

    fn reject_reserved(&self, properties: &PropertyMap) -> Result<(), StoreError> {
        match properties.keys().find(|k| self.reserved_properties.contains(*k)) {
            Some(key) => Err(StoreError::NodeRejected(format!("reserved property `{}`", key))),
            None => Ok(()),
        }
    }

    fn node_mut(&mut self, node: NodeRef) -> Result<&mut StoredNode, StoreError> {
        usize::try_from(node.0)
            .ok()
            .and_then(|i| self.nodes.get_mut(i))
            .ok_or_else(|| StoreError::Backend(format!("unknown node {}", node.0)))
    }
}

impl GraphStore for InMemoryStore {
    async fn reset_all(&mut self) -> Result<(), StoreError> {
        self.nodes.clear();
        self.relationships.clear();
        self.in_transaction = false;
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.in_transaction {
            return Err(StoreError::Backend("transaction already open".to_string()));
        }
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        self.require_transaction()?;
        self.nodes.iter_mut().for_each(|n| n.committed = true);
        self.relationships.iter_mut().for_each(|r| r.committed = true);
        self.in_transaction = false;
        self.commits += 1;
        Ok(())
    }

    async fn find_node(&mut self, locator: &Locator) -> Result<Option<NodeRef>, StoreError> {
        let found = self.nodes.iter().position(|n| {
            n.committed
                && n.label == locator.object_type
                && n.properties.get(&locator.id_field) == Some(&locator.id_value)
        });
        Ok(found.map(|i| NodeRef(i as i64)))
    }

    async fn create_node(&mut self, label: &str, properties: &PropertyMap) -> Result<NodeRef, StoreError> {
        self.require_transaction()?;
        validate_node(label, properties)?;
        self.reject_reserved(properties)?;

        self.nodes.push(StoredNode {
            label: label.to_string(),
            properties: properties.clone(),
            committed: false,
        });
        Ok(NodeRef(self.nodes.len() as i64 - 1))
    }

    async fn set_properties(&mut self, node: NodeRef, properties: &PropertyMap) -> Result<(), StoreError> {
        self.require_transaction()?;
        validate_properties(properties)?;
        self.reject_reserved(properties)?;
        let stored = self.node_mut(node)?;
        stored
            .properties
            .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn create_relationship(
        &mut self,
        left: NodeRef,
        relationship_type: &str,
        right: NodeRef,
    ) -> Result<(), StoreError> {
        self.require_transaction()?;
        self.node_mut(left)?;
        self.node_mut(right)?;
        self.relationships.push(StoredRelationship {
            left,
            relationship_type: relationship_type.to_string(),
            right,
            committed: false,
        });
        Ok(())
    }
}
