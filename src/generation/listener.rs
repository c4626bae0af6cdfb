//! Matching of result-collection changes against the outstanding job.

use super::types::{GenerationResult, JobHandle, UrlPair};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A changed document of the tenant's result collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRecord {
    pub id: String,
    pub data: serde_json::Value,
    /// Document creation time reported by the store, used when the record has no
    /// `createdAt` field of its own.
    pub create_time: Option<String>,
}

impl ResultRecord {
    pub fn new(id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            data,
            create_time: None,
        }
    }
}

/// What a single change means for the outstanding job.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenOutcome {
    /// The record belongs to another job.
    Unrelated,
    /// The record is the awaited job but has no results yet.
    Pending,
    Completed(GenerationResult),
}

/// Pairs standard URLs with high-quality URLs by position.
///
/// Standard URLs without a counterpart pair with `None`; surplus high-quality URLs
/// are dropped.
pub fn pair_urls(standard: &[String], high_quality: &[String]) -> Vec<UrlPair> {
    standard
        .iter()
        .enumerate()
        .map(|(i, url)| UrlPair {
            standard: url.clone(),
            high_quality: high_quality.get(i).cloned(),
        })
        .collect()
}

/// Reads a list of URLs. `None` when the field is missing or not a list of strings.
fn url_list(data: &Value, field: &str) -> Option<Vec<String>> {
    let value = data.get(field)?;
    match serde_json::from_value(value.clone()) {
        Ok(urls) => Some(urls),
        Err(e) => {
            tracing::warn!(field, error = %e, "Ignoring malformed URL list");
            None
        }
    }
}

fn text_field(data: &Value, field: &str) -> Option<String> {
    data.get(field).and_then(Value::as_str).map(str::to_string)
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Accepts RFC 3339 strings and epoch milliseconds.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_rfc3339(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}

/// Builds a result from a record regardless of which job it belongs to. Returns
/// `None` while the record has no standard results.
///
/// Only `imagesUrl` decides completion. Auxiliary fields of an unexpected type are
/// left empty.
pub fn result_from_record(record: &ResultRecord) -> Option<GenerationResult> {
    let data = &record.data;
    let standard = url_list(data, "imagesUrl").filter(|urls| !urls.is_empty())?;
    let high_quality = url_list(data, "imagesUrl2").unwrap_or_default();
    if !high_quality.is_empty() && high_quality.len() != standard.len() {
        tracing::warn!(
            job_id = %record.id,
            standard = standard.len(),
            high_quality = high_quality.len(),
            "Mismatched result URL lists"
        );
    }

    let created_at = data
        .get("createdAt")
        .and_then(parse_timestamp)
        .or_else(|| record.create_time.as_deref().and_then(parse_rfc3339));

    Some(GenerationResult {
        job_id: JobHandle::new(record.id.clone()),
        images: pair_urls(&standard, &high_quality),
        created_at,
        prompt: text_field(data, "prompt"),
        product_url: text_field(data, "productUrl"),
    })
}

/// Checks one change against the outstanding handle.
pub fn match_record(outstanding: &JobHandle, record: &ResultRecord) -> ListenOutcome {
    if record.id != outstanding.as_str() {
        return ListenOutcome::Unrelated;
    }
    match result_from_record(record) {
        Some(result) => ListenOutcome::Completed(result),
        None => ListenOutcome::Pending,
    }
}
