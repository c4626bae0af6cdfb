use super::models::{ListenRequest, ListenResponse};
use super::FirestoreError;
use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, Stream};
use reqwest::header;
use reqwest_middleware::ClientWithMiddleware;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A stream of `ListenResponse` messages.
///
/// The REST listen endpoint answers with one long JSON array (`[{...},\n{...}`) that
/// grows as changes happen; the stream yields each element as soon as it is complete.
pub struct ListenStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: BytesMut,
}

impl ListenStream {
    pub fn new(
        inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    ) -> Self {
        Self {
            inner,
            buffer: BytesMut::new(),
        }
    }
}

impl Stream for ListenStream {
    type Item = Result<ListenResponse, FirestoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            // Drop array punctuation and whitespace between elements.
            let skip = leading_separators(&self.buffer);
            self.buffer.advance(skip);

            if let Some(&first) = self.buffer.first() {
                if first != b'{' {
                    self.buffer.clear();
                    return Poll::Ready(Some(Err(FirestoreError::ApiError(format!(
                        "Unexpected byte in listen stream: {:?}",
                        first as char
                    )))));
                }
            }

            if let Some(len) = find_json_boundary(&self.buffer) {
                let bytes = self.buffer.split_to(len);
                return match serde_json::from_slice::<ListenResponse>(&bytes) {
                    Ok(msg) => Poll::Ready(Some(Ok(msg))),
                    Err(e) => Poll::Ready(Some(Err(FirestoreError::SerializationError(e)))),
                };
            }

            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    self.buffer.extend_from_slice(&chunk);
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(FirestoreError::RequestError(e))));
                }
                Poll::Ready(None) => {
                    if !self.buffer.is_empty() {
                        self.buffer.clear();
                        return Poll::Ready(Some(Err(FirestoreError::ApiError(
                            "Stream ended with incomplete JSON".into(),
                        ))));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

fn leading_separators(buf: &[u8]) -> usize {
    buf.iter()
        .take_while(|b| b.is_ascii_whitespace() || matches!(b, b'[' | b']' | b','))
        .count()
}

/// Finds the length of the JSON object at the start of the buffer.
fn find_json_boundary(buf: &[u8]) -> Option<usize> {
    if buf.first() != Some(&b'{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in buf.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }

    None
}

pub async fn listen_request(
    client: &ClientWithMiddleware,
    base_url: &str,
    request: &ListenRequest,
) -> Result<ListenStream, FirestoreError> {
    // base_url is ".../databases/(default)/documents"; the endpoint is "documents:listen".
    let url = format!("{}:listen", base_url);

    let response = client
        .post(&url)
        .header(header::CONTENT_TYPE, "application/json")
        .body(serde_json::to_vec(request)?)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(FirestoreError::ApiError(format!(
            "Listen failed {}: {}",
            status, text
        )));
    }

    let stream = stream::unfold(response, |mut resp| async move {
        match resp.chunk().await {
            Ok(Some(bytes)) => Some((Ok(bytes), resp)),
            Ok(None) => None,
            Err(e) => Some((Err(e), resp)),
        }
    });

    Ok(ListenStream::new(Box::pin(stream)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn stream_of(chunks: Vec<&'static str>) -> ListenStream {
        let items: Vec<Result<Bytes, reqwest::Error>> = chunks
            .into_iter()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect();
        ListenStream::new(Box::pin(stream::iter(items)))
    }

    #[test]
    fn test_find_json_boundary() {
        let buf = br#"{"a":1}"#;
        assert_eq!(find_json_boundary(buf), Some(7));

        let buf = br#"{"a":{"b":2}}"#;
        assert_eq!(find_json_boundary(buf), Some(13));

        let buf = br#"{"a":1"#;
        assert_eq!(find_json_boundary(buf), None);

        let buf = br#"{"a":"}"}"#;
        assert_eq!(find_json_boundary(buf), Some(9));

        let buf = br#"{"a":"\"}"}"#;
        assert_eq!(find_json_boundary(buf), Some(11));

        let buf = br#"{"a":[1,2]}"#;
        assert_eq!(find_json_boundary(buf), Some(11));

        let buf = br#"{"a":1}{"b":2}"#;
        assert_eq!(find_json_boundary(buf), Some(7));

        let buf = br#"[{"a":1}]"#;
        assert_eq!(find_json_boundary(buf), None);
    }

    #[test]
    fn test_leading_separators() {
        assert_eq!(leading_separators(b"[\n{"), 2);
        assert_eq!(leading_separators(b",\r\n  {"), 5);
        assert_eq!(leading_separators(b"]"), 1);
        assert_eq!(leading_separators(b"{"), 0);
    }

    #[tokio::test]
    async fn test_stream_splits_array_elements_across_chunks() {
        let mut stream = stream_of(vec![
            "[{\"targetChange\":{\"targetChangeType\":\"ADD\",\"targetIds\":[1]}}\n,",
            "{\"documentChange\":{\"document\":{\"name\":\"projects/p/databases/(default)/documents/shops/s/images/job1\",",
            "\"fields\":{}},\"targetIds\":[1]}}\n]",
        ]);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(
            first.target_change.unwrap().target_change_type.as_deref(),
            Some("ADD")
        );

        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.document_change.unwrap().document.id(), "job1");

        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_reports_truncated_message() {
        let mut stream = stream_of(vec!["[{\"targetChange\":{"]);
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, FirestoreError::ApiError(_)));
        assert!(stream.next().await.is_none());
    }
}
