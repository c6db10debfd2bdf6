//! Neo4j Graph Store
//!
//! [`GraphStore`] over a neo4rs connection. Writes run inside an explicit
//! transaction; lookups run on the pool, so they only see committed data.

use crate::error::StoreError;
use crate::store::{validate_node, validate_properties, GraphStore, Locator, NodeRef};
use crate::value::{PropertyMap, Scalar};
use neo4rs::{query, BoltNull, BoltType, Graph, Txn};
use std::collections::HashMap;
use tracing::{error, info, warn};

// ============================================================================
// Helper: Convert to BoltType-compatible values
// ============================================================================

type BoltMap = HashMap<String, BoltType>;

fn scalar_to_bolt(value: &Scalar) -> BoltType {
    match value {
        Scalar::Null => BoltType::Null(BoltNull),
        Scalar::Bool(b) => (*b).into(),
        Scalar::Int(i) => (*i).into(),
        Scalar::Float(x) => (*x).into(),
        Scalar::Text(s) => s.clone().into(),
    }
}

/// Neo4j does not store null properties, so they are left out.
fn properties_to_bolt(properties: &PropertyMap) -> BoltMap {
    properties
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), scalar_to_bolt(v)))
        .collect()
}

/// Backtick-quote a label, relationship type, or property key.
fn escape_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn create_node_cypher(label: &str) -> String {
    format!(
        "CREATE (n:{} $props) RETURN id(n) AS id",
        escape_identifier(label)
    )
}

fn find_node_cypher(locator: &Locator) -> String {
    format!(
        "MATCH (n:{}) WHERE n.{} = $value RETURN id(n) AS id LIMIT 1",
        escape_identifier(&locator.object_type),
        escape_identifier(&locator.id_field)
    )
}

fn create_relationship_cypher(relationship_type: &str) -> String {
    format!(
        "MATCH (a), (b) WHERE id(a) = $left AND id(b) = $right CREATE (a)-[:{}]->(b)",
        escape_identifier(relationship_type)
    )
}

const SET_PROPERTIES_CYPHER: &str = "MATCH (n) WHERE id(n) = $id SET n += $props";
const RESET_CYPHER: &str = "MATCH (n) DETACH DELETE n";

// ============================================================================
// Store
// ============================================================================

pub struct Neo4jStore {
    graph: Graph,
    txn: Option<Txn>,
}

impl Neo4jStore {
    pub fn new(graph: Graph) -> Self {
        Self { graph, txn: None }
    }

    /// Connect to Neo4j with exponential backoff retry logic
    pub async fn connect_with_retry(
        uri: &str,
        user: &str,
        password: &str,
        max_retries: u32,
    ) -> Result<Self, StoreError> {
        use tokio::time::{sleep, Duration};

        let max_retries = max_retries.max(1);
        let mut attempt = 1;
        loop {
            info!("🔄 Attempting to connect to Neo4j at {}... (attempt {}/{})", uri, attempt, max_retries);

            match Graph::new(uri, user, password).await {
                Ok(graph) => {
                    info!("✅ Successfully connected to Neo4j");
                    return Ok(Self::new(graph));
                }
                Err(e) if attempt < max_retries => {
                    let wait_time = 2u64.pow(attempt - 1); // 1s, 2s, 4s, 8s
                    warn!("⚠️  Failed to connect to Neo4j: {}. Retrying in {}s (attempt {}/{})...",
                          e, wait_time, attempt, max_retries);
                    sleep(Duration::from_secs(wait_time)).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!("❌ Failed to connect to Neo4j after {} attempts: {}", max_retries, e);
                    return Err(e.into());
                }
            }
        }
    }

    fn txn(&mut self) -> Result<&mut Txn, StoreError> {
        self.txn
            .as_mut()
            .ok_or_else(|| StoreError::Backend("no open transaction".to_string()))
    }
}

impl GraphStore for Neo4jStore {
    async fn reset_all(&mut self) -> Result<(), StoreError> {
        self.graph.run(query(RESET_CYPHER)).await?;
        Ok(())
    }

    async fn begin(&mut self) -> Result<(), StoreError> {
        if self.txn.is_some() {
            return Err(StoreError::Backend("transaction already open".to_string()));
        }
        self.txn = Some(self.graph.start_txn().await?);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let txn = self
            .txn
            .take()
            .ok_or_else(|| StoreError::Backend("no open transaction".to_string()))?;
        txn.commit().await?;
        Ok(())
    }

    async fn find_node(&mut self, locator: &Locator) -> Result<Option<NodeRef>, StoreError> {
        let q = query(&find_node_cypher(locator)).param("value", scalar_to_bolt(&locator.id_value));
        let mut rows = self.graph.execute(q).await?;
        match rows.next().await? {
            Some(row) => {
                let id: i64 = row
                    .get("id")
                    .map_err(|e| StoreError::Backend(format!("missing node id in result: {}", e)))?;
                Ok(Some(NodeRef(id)))
            }
            None => Ok(None),
        }
    }

    async fn create_node(&mut self, label: &str, properties: &PropertyMap) -> Result<NodeRef, StoreError> {
        validate_node(label, properties)?;
        let q = query(&create_node_cypher(label)).param("props", properties_to_bolt(properties));

        let txn = self.txn()?;
        let mut rows = txn.execute(q).await?;
        let row = rows
            .next(txn.handle())
            .await?
            .ok_or_else(|| StoreError::Backend(format!("CREATE {} returned no row", label)))?;
        let id: i64 = row
            .get("id")
            .map_err(|e| StoreError::Backend(format!("missing node id in result: {}", e)))?;
        Ok(NodeRef(id))
    }

    async fn set_properties(&mut self, node: NodeRef, properties: &PropertyMap) -> Result<(), StoreError> {
        validate_properties(properties)?;
        let q = query(SET_PROPERTIES_CYPHER)
            .param("id", node.0)
            .param("props", properties_to_bolt(properties));
        self.txn()?.run(q).await?;
        Ok(())
    }

    async fn create_relationship(
        &mut self,
        left: NodeRef,
        relationship_type: &str,
        right: NodeRef,
    ) -> Result<(), StoreError> {
        if relationship_type.is_empty() {
            return Err(StoreError::Backend("empty relationship type".to_string()));
        }
        let q = query(&create_relationship_cypher(relationship_type))
            .param("left", left.0)
            .param("right", right.0);
        self.txn()?.run(q).await?;
        Ok(())
    }
}
