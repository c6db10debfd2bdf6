//! Transaction Batcher
//!
//! Owns the transaction lifecycle for a run: one transaction is open from
//! `begin` until `finish`, with intermediate commits that publish freshly
//! created stub nodes to later lookups.

use crate::error::StoreError;
use crate::store::{GraphStore, Locator, NodeRef};
use crate::value::PropertyMap;
use tracing::debug;

pub struct TransactionBatcher<'s, S: GraphStore> {
    store: &'s mut S,
    open: bool,
    commits: usize,
}

impl<'s, S: GraphStore> TransactionBatcher<'s, S> {
    pub fn new(store: &'s mut S) -> Self {
        Self {
            store,
            open: false,
            commits: 0,
        }
    }

    pub async fn begin(&mut self) -> Result<(), StoreError> {
        self.store.begin().await?;
        self.open = true;
        Ok(())
    }

    /// Commit everything written so far and open a fresh transaction.
    pub async fn intermediate_commit(&mut self) -> Result<(), StoreError> {
        self.commit().await?;
        self.begin().await
    }

    /// Final commit of the run.
    pub async fn finish(mut self) -> Result<usize, StoreError> {
        self.commit().await?;
        Ok(self.commits)
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if !self.open {
            return Err(StoreError::Backend("commit without an open transaction".to_string()));
        }
        self.store.commit().await?;
        self.open = false;
        self.commits += 1;
        debug!("Committed transaction #{}", self.commits);
        Ok(())
    }

    pub async fn find_node(&mut self, locator: &Locator) -> Result<Option<NodeRef>, StoreError> {
        self.store.find_node(locator).await
    }

    pub async fn create_node(&mut self, label: &str, properties: &PropertyMap) -> Result<NodeRef, StoreError> {
        self.store.create_node(label, properties).await
    }

    pub async fn set_properties(&mut self, node: NodeRef, properties: &PropertyMap) -> Result<(), StoreError> {
        self.store.set_properties(node, properties).await
    }

    pub async fn create_relationship(
        &mut self,
        left: NodeRef,
        relationship_type: &str,
        right: NodeRef,
    ) -> Result<(), StoreError> {
        self.store.create_relationship(left, relationship_type, right).await
    }
}
