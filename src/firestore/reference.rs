use super::listen::{listen_request, ListenStream};
use super::models::{
    CollectionSelector, Document, ListDocumentsResponse, ListenRequest, QueryTarget,
    StructuredQuery, Target, Value, ValueType,
};
use super::FirestoreError;
use crate::core::parse_error_response;
use reqwest_middleware::ClientWithMiddleware;
use serde::de::Error;
use serde_json::map::Map;
use serde_json::Value as SerdeValue;
use std::collections::HashMap;
use url::Url;

const LIST_PAGE_SIZE: u32 = 100;

/// Target id used for listen streams opened by this client.
pub(crate) const LISTEN_TARGET_ID: i32 = 1;

// Helper to convert Firestore's value map to a standard serde_json::Value
pub(crate) fn convert_fields_to_serde_value(
    fields: HashMap<String, Value>,
) -> Result<SerdeValue, FirestoreError> {
    let mut map = Map::new();
    for (key, value) in fields {
        map.insert(key, convert_value_to_serde_value(value)?);
    }
    Ok(SerdeValue::Object(map))
}

pub(crate) fn convert_value_to_serde_value(value: Value) -> Result<SerdeValue, FirestoreError> {
    use serde_json::json;
    Ok(match value.value_type {
        ValueType::StringValue(s) => SerdeValue::String(s),
        ValueType::IntegerValue(s) => {
            let i: i64 = s.parse().map_err(|e| {
                <serde_json::Error as Error>::custom(format!(
                    "Failed to parse integer string '{}': {}",
                    s, e
                ))
            })?;
            SerdeValue::Number(i.into())
        }
        ValueType::DoubleValue(d) => SerdeValue::Number(
            serde_json::Number::from_f64(d).ok_or_else(|| {
                <serde_json::Error as Error>::custom(format!("Invalid f64 value: {}", d))
            })?,
        ),
        ValueType::BooleanValue(b) => SerdeValue::Bool(b),
        ValueType::MapValue(map_value) => convert_fields_to_serde_value(map_value.fields)?,
        ValueType::ArrayValue(array_value) => {
            let values = array_value
                .values
                .into_iter()
                .map(convert_value_to_serde_value)
                .collect::<Result<Vec<_>, _>>()?;
            SerdeValue::Array(values)
        }
        ValueType::NullValue(_) => SerdeValue::Null,
        ValueType::TimestampValue(s) => SerdeValue::String(s),
        ValueType::GeoPointValue(gp) => {
            json!({ "latitude": gp.latitude, "longitude": gp.longitude })
        }
        ValueType::BytesValue(s) => SerdeValue::String(s),
        ValueType::ReferenceValue(s) => SerdeValue::String(s),
    })
}

/// A reference to a (possibly nested) collection, e.g. `shops/shop1/images`.
#[derive(Clone)]
pub struct CollectionReference<'a> {
    pub(crate) client: &'a ClientWithMiddleware,
    pub(crate) base_url: &'a str,
    pub(crate) database: &'a str,
    pub(crate) path: String,
}

impl<'a> CollectionReference<'a> {
    /// The collection id (last path segment).
    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Resource name of the parent document, or of the documents root for top-level
    /// collections.
    pub fn parent_name(&self) -> String {
        match self.path.rsplit_once('/') {
            Some((parent, _)) => format!("{}/documents/{}", self.database, parent),
            None => format!("{}/documents", self.database),
        }
    }

    /// Lists every document in the collection, following page tokens.
    pub async fn list_documents(&self) -> Result<Vec<Document>, FirestoreError> {
        let mut documents = Vec::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let mut url = Url::parse(&format!("{}/{}", self.base_url, self.path))
                .map_err(|e| FirestoreError::ApiError(format!("Invalid collection URL: {}", e)))?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", &LIST_PAGE_SIZE.to_string());
                if let Some(token) = next_page_token.take() {
                    query.append_pair("pageToken", &token);
                }
            }

            let response = self.client.get(url).send().await?;

            if !response.status().is_success() {
                return Err(FirestoreError::ApiError(
                    parse_error_response(response, "List documents failed").await,
                ));
            }

            let page: ListDocumentsResponse = response.json().await?;
            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) if !token.is_empty() => next_page_token = Some(token),
                _ => break,
            }
        }

        Ok(documents)
    }

    /// Opens a real-time listen stream over the collection.
    pub async fn listen(&self) -> Result<ListenStream, FirestoreError> {
        let request = ListenRequest {
            database: self.database.to_string(),
            add_target: Target {
                query: QueryTarget {
                    parent: self.parent_name(),
                    structured_query: StructuredQuery {
                        from: vec![CollectionSelector {
                            collection_id: self.id().to_string(),
                        }],
                    },
                },
                target_id: LISTEN_TARGET_ID,
            },
        };

        listen_request(self.client, self.base_url, &request).await
    }
}
