use super::*;
use futures::StreamExt;
use httpmock::prelude::*;
use serde::Deserialize;
use serde_json::json;

const DOCUMENTS_PATH: &str = "/v1/projects/p/databases/(default)/documents";

fn firestore_for(server: &MockServer) -> FirebaseFirestore {
    let client = ClientBuilder::new(Client::new()).build();
    FirebaseFirestore::new_with_client(client, server.url(DOCUMENTS_PATH))
}

#[derive(Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ResultFields {
    images_url: Vec<String>,
    count: i64,
}

#[test]
fn test_database_name() {
    assert_eq!(
        database_name("https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents"),
        "projects/demo/databases/(default)"
    );
    assert_eq!(
        database_name("http://127.0.0.1:8080/v1/projects/p/databases/(default)/documents"),
        "projects/p/databases/(default)"
    );
}

#[test]
fn test_collection_parent_name() {
    let client = ClientBuilder::new(Client::new()).build();
    let db = FirebaseFirestore::new_with_client(
        client,
        format!("http://localhost{}", DOCUMENTS_PATH),
    );

    let nested = db.collection("shops/shop1/images");
    assert_eq!(nested.id(), "images");
    assert_eq!(
        nested.parent_name(),
        "projects/p/databases/(default)/documents/shops/shop1"
    );

    let top = db.collection("shops");
    assert_eq!(top.parent_name(), "projects/p/databases/(default)/documents");
}

#[tokio::test]
async fn test_list_documents() {
    let server = MockServer::start();
    let db = firestore_for(&server);

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path(format!("{}/shops/shop1/images", DOCUMENTS_PATH))
            .query_param("pageSize", "100");
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({
                "documents": [{
                    "name": "projects/p/databases/(default)/documents/shops/shop1/images/job1",
                    "fields": {
                        "imagesUrl": { "arrayValue": { "values": [
                            { "stringValue": "https://cdn/a.png" }
                        ] } },
                        "count": { "integerValue": "2" }
                    },
                    "createTime": "2024-05-01T10:00:00Z",
                    "updateTime": "2024-05-01T10:00:05Z"
                }]
            }));
    });

    let documents = db.collection("shops/shop1/images").list_documents().await.unwrap();
    assert_eq!(documents.len(), 1);

    let snapshot = snapshot::DocumentSnapshot::from(documents[0].clone());
    assert_eq!(snapshot.id(), "job1");
    assert_eq!(snapshot.create_time(), Some("2024-05-01T10:00:00Z"));
    assert_eq!(
        snapshot.data::<ResultFields>().unwrap(),
        ResultFields {
            images_url: vec!["https://cdn/a.png".to_string()],
            count: 2,
        }
    );

    mock.assert();
}

#[tokio::test]
async fn test_list_documents_empty_collection() {
    let server = MockServer::start();
    let db = firestore_for(&server);

    let mock = server.mock(|when, then| {
        when.method(GET).path(format!("{}/shops/empty/images", DOCUMENTS_PATH));
        then.status(200)
            .header("content-type", "application/json")
            .json_body(json!({}));
    });

    let documents = db.collection("shops/empty/images").list_documents().await.unwrap();
    assert!(documents.is_empty());
    mock.assert();
}

#[tokio::test]
async fn test_list_documents_api_error() {
    let server = MockServer::start();
    let db = firestore_for(&server);

    server.mock(|when, then| {
        when.method(GET).path(format!("{}/shops/shop1/images", DOCUMENTS_PATH));
        then.status(403)
            .header("content-type", "application/json")
            .json_body(json!({
                "error": { "code": 403, "message": "Missing or insufficient permissions.", "status": "PERMISSION_DENIED" }
            }));
    });

    let err = db.collection("shops/shop1/images").list_documents().await.unwrap_err();
    match err {
        FirestoreError::ApiError(msg) => assert!(msg.contains("PERMISSION_DENIED")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_listen_sends_query_target_and_streams_changes() {
    let server = MockServer::start();
    let db = firestore_for(&server);

    let body = concat!(
        "[{\"targetChange\":{\"targetChangeType\":\"ADD\",\"targetIds\":[1]}}\n",
        ",{\"documentChange\":{\"document\":{",
        "\"name\":\"projects/p/databases/(default)/documents/shops/shop1/images/job1\",",
        "\"fields\":{\"imagesUrl\":{\"arrayValue\":{\"values\":[{\"stringValue\":\"u1\"}]}}},",
        "\"createTime\":\"2024-05-01T10:00:00Z\",\"updateTime\":\"2024-05-01T10:00:00Z\"},",
        "\"targetIds\":[1]}}\n]"
    );

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path(format!("{}:listen", DOCUMENTS_PATH))
            .json_body(json!({
                "database": "projects/p/databases/(default)",
                "addTarget": {
                    "query": {
                        "parent": "projects/p/databases/(default)/documents/shops/shop1",
                        "structuredQuery": { "from": [{ "collectionId": "images" }] }
                    },
                    "targetId": 1
                }
            }));
        then.status(200)
            .header("content-type", "application/json")
            .body(body);
    });

    let mut stream = db.collection("shops/shop1/images").listen().await.unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert!(first.target_change.is_some());

    let second = stream.next().await.unwrap().unwrap();
    let change = second.document_change.unwrap();
    assert_eq!(change.document.id(), "job1");
    assert_eq!(change.target_ids, vec![1]);

    assert!(stream.next().await.is_none());
    mock.assert();
}

#[tokio::test]
async fn test_listen_rejected() {
    let server = MockServer::start();
    let db = firestore_for(&server);

    server.mock(|when, then| {
        when.method(POST).path(format!("{}:listen", DOCUMENTS_PATH));
        then.status(401).body("unauthenticated");
    });

    let result = db.collection("shops/shop1/images").listen().await;
    assert!(matches!(result, Err(FirestoreError::ApiError(_))));
}
