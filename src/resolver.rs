//! Node Resolution and Deferred Linking
//!
//! Find-or-create deduplication for relationship targets, the queue of
//! pending relationships, and the second pass that turns them into edges.

use crate::batcher::TransactionBatcher;
use crate::error::StoreError;
use crate::store::{GraphStore, Locator, NodeRef};
use crate::value::{PropertyMap, Scalar};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const RECORD_ID_FIELD: &str = "id";

// ============================================================================
// Pending Relationships
// ============================================================================

/// A relationship waiting for both endpoints to exist.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRelationship {
    pub left: Locator,
    pub relationship_type: String,
    pub right: Locator,
}

#[derive(Debug, Default)]
pub struct RelationshipQueue {
    pending: Vec<PendingRelationship>,
}

impl RelationshipQueue {
    pub fn push(&mut self, relationship: PendingRelationship) {
        self.pending.push(relationship);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingRelationship> {
        self.pending.iter()
    }
}

// ============================================================================
// Node Resolver
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum IndexEntry {
    /// Created ahead of its own record, carries only the id property.
    Stub(NodeRef),
    Record(NodeRef),
}

impl IndexEntry {
    fn node(self) -> NodeRef {
        match self {
            IndexEntry::Stub(n) | IndexEntry::Record(n) => n,
        }
    }
}

/// How a record's node came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created(NodeRef),
    /// The record filled in a stub created earlier in the run.
    Merged(NodeRef),
}

/// Run-local index of every node this run created or found.
#[derive(Debug, Default)]
pub struct NodeResolver {
    index: HashMap<String, IndexEntry>,
    misses: HashMap<String, Option<NodeRef>>,
    stubs_created: usize,
}

impl NodeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stubs_created(&self) -> usize {
        self.stubs_created
    }

    /// Return the node for `locator`, creating and committing a stub if no
    /// such node exists yet.
    pub async fn find_or_create<S: GraphStore>(
        &mut self,
        batcher: &mut TransactionBatcher<'_, S>,
        locator: &Locator,
    ) -> Result<NodeRef, StoreError> {
        let key = locator.key();
        if let Some(entry) = self.index.get(&key) {
            return Ok(entry.node());
        }

        if let Some(node) = batcher.find_node(locator).await? {
            self.index.insert(key, IndexEntry::Record(node));
            return Ok(node);
        }

        let node = batcher.create_node(&locator.object_type, &locator.stub_properties()).await?;
        batcher.intermediate_commit().await?;
        debug!("Created stub node {}", locator);

        self.stubs_created += 1;
        self.misses.remove(&key);
        self.index.insert(key, IndexEntry::Stub(node));
        Ok(node)
    }

    /// Write the node for a full record. When a stub of the same type was
    /// keyed by any of the record's properties, the record is merged into it.
    ///
    /// The record is indexed under every non-null scalar property so later
    /// references find it before it is committed, whatever their id field.
    pub async fn register_record<S: GraphStore>(
        &mut self,
        batcher: &mut TransactionBatcher<'_, S>,
        object_type: &str,
        id: &Scalar,
        properties: &PropertyMap,
    ) -> Result<Registration, StoreError> {
        let locator = Locator::new(object_type, RECORD_ID_FIELD, id.clone());

        if let Some(node) = self.matching_stub(object_type, &locator, properties) {
            batcher.set_properties(node, properties).await?;
            self.index_record(object_type, properties, node, true);
            return Ok(Registration::Merged(node));
        }

        if let Some(IndexEntry::Record(_)) = self.index.get(&locator.key()) {
            warn!("⚠️  Duplicate id {}; creating a second node", locator);
        }

        let node = batcher.create_node(object_type, properties).await?;
        self.index_record(object_type, properties, node, false);
        Ok(Registration::Created(node))
    }

    /// First stub of `object_type` keyed by one of `properties`, `id` first.
    fn matching_stub(
        &self,
        object_type: &str,
        locator: &Locator,
        properties: &PropertyMap,
    ) -> Option<NodeRef> {
        let by_id = std::iter::once(locator.clone());
        let by_property = properties
            .iter()
            .filter(|(field, value)| field.as_str() != RECORD_ID_FIELD && !value.is_null())
            .map(|(field, value)| Locator::new(object_type, field.as_str(), value.clone()));

        by_id
            .chain(by_property)
            .find_map(|candidate| match self.index.get(&candidate.key()) {
                Some(IndexEntry::Stub(node)) => Some(*node),
                _ => None,
            })
    }

    /// Point every scalar-property locator of a record at `node`. Existing
    /// records keep their entries; a stub entry is replaced only by the
    /// record merged into it.
    fn index_record(
        &mut self,
        object_type: &str,
        properties: &PropertyMap,
        node: NodeRef,
        merged: bool,
    ) {
        for (field, value) in properties.iter().filter(|(_, v)| !v.is_null()) {
            let key = Locator::new(object_type, field.as_str(), value.clone()).key();
            self.misses.remove(&key);
            match self.index.get(&key) {
                Some(IndexEntry::Record(_)) => {}
                Some(IndexEntry::Stub(stub)) if !merged || *stub != node => {}
                _ => {
                    self.index.insert(key, IndexEntry::Record(node));
                }
            }
        }
    }

    /// Look up an existing node without creating anything.
    pub async fn lookup<S: GraphStore>(
        &mut self,
        batcher: &mut TransactionBatcher<'_, S>,
        locator: &Locator,
    ) -> Result<Option<NodeRef>, StoreError> {
        let key = locator.key();
        if let Some(entry) = self.index.get(&key) {
            return Ok(Some(entry.node()));
        }
        if let Some(cached) = self.misses.get(&key) {
            return Ok(*cached);
        }

        let found = batcher.find_node(locator).await?;
        self.misses.insert(key, found);
        Ok(found)
    }
}

// ============================================================================
// Relationship Resolution
// ============================================================================

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionStats {
    pub created: usize,
    pub dropped: usize,
}

/// Second pass: emit an edge for every pending relationship whose endpoints
/// both exist. The rest are dropped and counted.
pub async fn resolve_relationships<S: GraphStore>(
    batcher: &mut TransactionBatcher<'_, S>,
    resolver: &mut NodeResolver,
    queue: &RelationshipQueue,
) -> Result<ResolutionStats, StoreError> {
    info!("🔗 Resolving {} pending relationships", queue.len());
    let mut stats = ResolutionStats::default();

    for pending in queue.iter() {
        let left = resolver.lookup(batcher, &pending.left).await?;
        let right = resolver.lookup(batcher, &pending.right).await?;

        match (left, right) {
            (Some(left), Some(right)) => {
                batcher
                    .create_relationship(left, &pending.relationship_type, right)
                    .await?;
                stats.created += 1;
            }
            _ => {
                debug!(
                    "Dropped {} -[{}]-> {} (left found: {}, right found: {})",
                    pending.left,
                    pending.relationship_type,
                    pending.right,
                    left.is_some(),
                    right.is_some()
                );
                stats.dropped += 1;
            }
        }
    }

    info!(
        "   Created {} relationships, dropped {} with missing endpoints",
        stats.created, stats.dropped
    );
    Ok(stats)
}
