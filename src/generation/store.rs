//! Access to the per-tenant result collection.

use super::error::GenerationError;
use super::listener::ResultRecord;
use crate::config::CollectionConfig;
use crate::firestore::models::ListenResponse;
use crate::firestore::snapshot::DocumentSnapshot;
use crate::firestore::{FirebaseFirestore, FirestoreError};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

pub type RecordStream = BoxStream<'static, Result<ResultRecord, GenerationError>>;

/// Source of completed generation records for a tenant.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Opens a subscription delivering every change to the tenant's results.
    async fn subscribe(&self, tenant_id: &str) -> Result<RecordStream, GenerationError>;

    /// Reads every stored result record of the tenant.
    async fn list(&self, tenant_id: &str) -> Result<Vec<ResultRecord>, GenerationError>;
}

/// `ResultStore` backed by Cloud Firestore.
#[derive(Clone)]
pub struct FirestoreResults {
    firestore: FirebaseFirestore,
    collections: CollectionConfig,
}

impl FirestoreResults {
    pub fn new(firestore: FirebaseFirestore, collections: CollectionConfig) -> Self {
        Self {
            firestore,
            collections,
        }
    }
}

fn record_from_snapshot(snapshot: DocumentSnapshot) -> Result<ResultRecord, FirestoreError> {
    Ok(ResultRecord {
        id: snapshot.id().to_string(),
        data: snapshot.data()?,
        create_time: snapshot.create_time().map(str::to_string),
    })
}

/// Maps one listen message to a record, an error, or nothing worth reporting.
fn record_from_event(
    event: Result<ListenResponse, FirestoreError>,
) -> Option<Result<ResultRecord, GenerationError>> {
    let event = match event {
        Ok(event) => event,
        Err(e) => return Some(Err(GenerationError::Listener(e.to_string()))),
    };

    if let Some(change) = event.document_change {
        return Some(
            record_from_snapshot(DocumentSnapshot::new(change.document))
                .map_err(|e| GenerationError::Listener(e.to_string())),
        );
    }

    if let Some(cause) = event.target_change.and_then(|change| change.cause) {
        return Some(Err(GenerationError::Listener(format!(
            "target removed by server ({}): {}",
            cause.code, cause.message
        ))));
    }

    None
}

#[async_trait]
impl ResultStore for FirestoreResults {
    async fn subscribe(&self, tenant_id: &str) -> Result<RecordStream, GenerationError> {
        let path = self.collections.results_path(tenant_id);
        tracing::debug!(%path, "Opening result subscription");

        let stream = self.firestore.collection(&path).listen().await?;
        Ok(stream
            .filter_map(|event| futures::future::ready(record_from_event(event)))
            .boxed())
    }

    async fn list(&self, tenant_id: &str) -> Result<Vec<ResultRecord>, GenerationError> {
        let path = self.collections.results_path(tenant_id);
        let documents = self.firestore.collection(&path).list_documents().await?;

        let records = documents
            .into_iter()
            .map(|document| record_from_snapshot(DocumentSnapshot::new(document)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
