use super::models::Document;
use super::reference::convert_fields_to_serde_value;
use super::FirestoreError;
use serde::de::DeserializeOwned;

/// A snapshot of a document in Firestore.
///
/// The data can be extracted with `.data()`.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub(crate) document: Document,
}

impl DocumentSnapshot {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// The ID of the document.
    pub fn id(&self) -> &str {
        self.document.id()
    }

    /// The time the document was created.
    pub fn create_time(&self) -> Option<&str> {
        self.document.create_time.as_deref()
    }

    /// Retrieves all fields in the document as a specific type.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, FirestoreError> {
        let serde_value = convert_fields_to_serde_value(self.document.fields.clone())?;
        Ok(serde_json::from_value(serde_value)?)
    }
}

impl From<Document> for DocumentSnapshot {
    fn from(document: Document) -> Self {
        Self::new(document)
    }
}
