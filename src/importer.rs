//! Import Run
//!
//! Drives the two passes of an import: ingest every record of every batch
//! as a node, then resolve the queued relationships into edges.

use crate::assembler::{assemble, display_name, record_id, source_locator};
use crate::batch::Batch;
use crate::batcher::TransactionBatcher;
use crate::error::{Result, StoreError};
use crate::naming::derive_type;
use crate::resolver::{resolve_relationships, NodeResolver, PendingRelationship, Registration, RelationshipQueue};
use crate::schema::SchemaRegistry;
use crate::store::{GraphStore, Locator, NodeRef};
use crate::summary::{BatchSummary, RunSummary, SkipReason, SkippedRecord};
use crate::value::Record;
use tracing::{debug, error, info, warn};

/// Result of ingesting one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Created(NodeRef),
    Merged(NodeRef),
    Skipped(SkipReason),
}

/// Reset the store and import all `batches` into it.
pub async fn run_import<S: GraphStore>(
    store: &mut S,
    schema: &SchemaRegistry,
    batches: &[Batch],
) -> Result<RunSummary> {
    let summary = RunSummary::new();
    info!("🚀 Starting import run {} ({} batches)", summary.run_id, batches.len());

    info!("🧹 Resetting graph store");
    store.reset_all().await?;

    let mut importer = Importer::new(store, schema, summary);
    importer.begin().await?;
    for batch in batches {
        importer.ingest_batch(batch).await?;
    }
    importer.finish().await
}

pub struct Importer<'s, 'a, S: GraphStore> {
    schema: &'a SchemaRegistry,
    batcher: TransactionBatcher<'s, S>,
    resolver: NodeResolver,
    queue: RelationshipQueue,
    summary: RunSummary,
}

impl<'s, 'a, S: GraphStore> Importer<'s, 'a, S> {
    pub fn new(store: &'s mut S, schema: &'a SchemaRegistry, summary: RunSummary) -> Self {
        Self {
            schema,
            batcher: TransactionBatcher::new(store),
            resolver: NodeResolver::new(),
            queue: RelationshipQueue::default(),
            summary,
        }
    }

    pub async fn begin(&mut self) -> Result<()> {
        self.batcher.begin().await?;
        Ok(())
    }

    pub fn queue(&self) -> &RelationshipQueue {
        &self.queue
    }

    pub async fn ingest_batch(&mut self, batch: &Batch) -> Result<()> {
        let object_type = derive_type(&batch.label);
        info!(
            "📥 Ingesting {} as {} ({} records)",
            batch.source.display(),
            object_type,
            batch.records.len()
        );

        for (index, record) in batch.records.iter().enumerate() {
            if let RecordOutcome::Skipped(reason) = self.ingest_record(&object_type, record).await? {
                self.summary.skipped.push(SkippedRecord {
                    object_type: object_type.clone(),
                    index,
                    name: display_name(record),
                    reason,
                });
            }
        }

        self.summary.batches.push(BatchSummary {
            label: batch.label.clone(),
            object_type,
            records: batch.records.len(),
        });
        Ok(())
    }

    /// Classify and write one record. Only fatal store failures are
    /// returned as errors; a rejected record yields `Skipped`.
    pub async fn ingest_record(&mut self, object_type: &str, record: &Record) -> Result<RecordOutcome> {
        let name = display_name(record);
        info!("[{}] {}", object_type, name);

        let Some(id) = record_id(record) else {
            error!("❌ [{}] {} has no scalar id; skipping record", object_type, name);
            return Ok(RecordOutcome::Skipped(SkipReason::MissingId));
        };

        let assembly = assemble(self.schema, object_type, record);

        let registration = match self
            .resolver
            .register_record(&mut self.batcher, object_type, &id, &assembly.properties)
            .await
        {
            Ok(registration) => registration,
            Err(StoreError::NodeRejected(reason)) => {
                error!("❌ [{}] {} rejected: {}", object_type, name, reason);
                return Ok(RecordOutcome::Skipped(SkipReason::NodeRejected(reason)));
            }
            Err(e) => return Err(e.into()),
        };

        self.summary.fields_serialized_fallback += assembly.fallback_serialized;
        self.summary.fields_dropped += assembly.dropped_fields;
        self.summary.relationships_dropped += assembly.unusable_targets;

        let outcome = match registration {
            Registration::Created(node) => {
                self.summary.nodes_created += 1;
                RecordOutcome::Created(node)
            }
            Registration::Merged(node) => {
                self.summary.stubs_merged += 1;
                RecordOutcome::Merged(node)
            }
        };

        let left = Locator::new(object_type, "id", id);
        for link in assembly.array_links {
            for target in link.targets {
                let right = Locator::new(
                    link.rule.target_type.as_str(),
                    link.rule.target_id_field.as_str(),
                    target,
                );
                match self.resolver.find_or_create(&mut self.batcher, &right).await {
                    Ok(_) => {}
                    Err(StoreError::NodeRejected(reason)) => {
                        warn!("⚠️  Stub {} rejected: {}", right, reason);
                        self.summary.relationships_dropped += 1;
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
                self.queue.push(PendingRelationship {
                    left: left.clone(),
                    relationship_type: link.rule.relationship_type.clone(),
                    right,
                });
            }
        }

        for link in assembly.single_links {
            let Some(source) = source_locator(object_type, link.rule, record) else {
                debug!(
                    "[{}] {} lacks its source id field; {} link not queued",
                    object_type, name, link.rule.relationship_type
                );
                self.summary.relationships_dropped += 1;
                continue;
            };
            self.queue.push(PendingRelationship {
                left: source,
                relationship_type: link.rule.relationship_type.clone(),
                right: Locator::new(
                    link.rule.target_type.as_str(),
                    link.rule.target_id_field.as_str(),
                    link.target,
                ),
            });
        }

        Ok(outcome)
    }

    /// Publish all nodes, resolve the queue, and make the final commit.
    pub async fn finish(mut self) -> Result<RunSummary> {
        self.batcher.intermediate_commit().await?;

        let stats = resolve_relationships(&mut self.batcher, &mut self.resolver, &self.queue).await?;

        let mut summary = self.summary;
        summary.relationships_queued = self.queue.len();
        summary.relationships_created = stats.created;
        summary.relationships_dropped += stats.dropped;
        summary.stubs_created = self.resolver.stubs_created();
        summary.commits = self.batcher.finish().await?;
        summary.finish();
        summary.log();
        Ok(summary)
    }
}
