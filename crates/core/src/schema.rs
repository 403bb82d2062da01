//! Schema service: graph validation/repair and type-system upgrades.

use async_trait::async_trait;

use crate::error::CoreError;
use crate::graph::{AnnotationGraph, CURRENT_SCHEMA_VERSION};
use crate::identity::Identity;
use crate::types::DbId;

/// Result of an upgrade attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum UpgradeOutcome {
    Upgraded(AnnotationGraph),
    /// The graph already matches the current type system.
    AlreadyCurrent,
}

#[async_trait]
pub trait SchemaService: Send + Sync {
    /// Idempotent in-place normalization. Must not renumber annotation ids.
    async fn validate_and_repair(
        &self,
        graph: &mut AnnotationGraph,
        document_id: DbId,
        identity: &Identity,
    ) -> Result<(), CoreError>;

    /// Bring an older graph forward to the current annotation type system.
    async fn upgrade(
        &self,
        graph: AnnotationGraph,
        document_id: DbId,
        username: &str,
    ) -> Result<UpgradeOutcome, CoreError>;
}

/// Default schema service.
///
/// Repair drops annotations whose offsets fall outside the text and orders
/// the rest by `(begin, end, id)`. Upgrade renumbers ids densely and stamps
/// [`CURRENT_SCHEMA_VERSION`] on graphs from older versions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NormalizingSchemaService;

#[async_trait]
impl SchemaService for NormalizingSchemaService {
    async fn validate_and_repair(
        &self,
        graph: &mut AnnotationGraph,
        _document_id: DbId,
        _identity: &Identity,
    ) -> Result<(), CoreError> {
        if graph.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(CoreError::Validation(format!(
                "Graph schema version {} is newer than supported version {CURRENT_SCHEMA_VERSION}",
                graph.schema_version
            )));
        }
        let text = &graph.text;
        graph
            .annotations
            .retain(|a| a.begin <= a.end && a.covered_text(text).is_some());
        graph
            .annotations
            .sort_by_key(|a| (a.begin, a.end, a.id));
        Ok(())
    }

    async fn upgrade(
        &self,
        mut graph: AnnotationGraph,
        _document_id: DbId,
        _username: &str,
    ) -> Result<UpgradeOutcome, CoreError> {
        if graph.schema_version >= CURRENT_SCHEMA_VERSION {
            return Ok(UpgradeOutcome::AlreadyCurrent);
        }
        for (idx, annotation) in graph.annotations.iter_mut().enumerate() {
            annotation.id = idx as u64 + 1;
        }
        graph.schema_version = CURRENT_SCHEMA_VERSION;
        Ok(UpgradeOutcome::Upgraded(graph))
    }
}
