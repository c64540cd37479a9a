//! Integration tests for the key-value backends.
//!
//! The in-memory backend is tested directly against the backend contract.
//! The HTTP API backend is tested against a mockito server, covering the
//! wire shape (path, headers, body) and status handling.

use tc_playbook::store::memory::InMemoryHashBackend;
use tc_playbook::store::{DeleteOutcome, KeyValueBackend, StorageError, WriteAck};

// ─── In-Memory Backend ─────────────────────────────────────────────────────

mod memory_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_create_then_update() {
        let backend = InMemoryHashBackend::new();
        let first = backend.create("ctx", "#App:1:a!String", b"\"x\"").await.unwrap();
        let second = backend.create("ctx", "#App:1:a!String", b"\"y\"").await.unwrap();
        assert_eq!(first, WriteAck::Created);
        assert_eq!(second, WriteAck::Updated);
        assert_eq!(
            backend.read("ctx", "#App:1:a!String").await.unwrap(),
            Some(b"\"y\"".to_vec())
        );
    }

    #[tokio::test]
    async fn test_contexts_are_isolated() {
        let backend = InMemoryHashBackend::new();
        backend.create("ctx-a", "k", b"1").await.unwrap();
        assert_eq!(backend.read("ctx-b", "k").await.unwrap(), None);
        assert_eq!(backend.len("ctx-a"), 1);
        assert_eq!(backend.len("ctx-b"), 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let backend = InMemoryHashBackend::new();
        backend.create("ctx", "k", b"1").await.unwrap();
        assert_eq!(backend.delete("ctx", "k").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(backend.delete("ctx", "k").await.unwrap(), DeleteOutcome::NotFound);
        assert_eq!(backend.delete("nope", "k").await.unwrap(), DeleteOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_read_all_returns_whole_context() {
        let backend = InMemoryHashBackend::new();
        backend.create("ctx", "a", b"1").await.unwrap();
        backend.create("ctx", "b", b"2").await.unwrap();
        backend.create("other", "c", b"3").await.unwrap();

        let all = backend.read_all("ctx").await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all["a"], b"1".to_vec());
        assert!(backend.read_all("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writers_on_distinct_contexts() {
        let backend = std::sync::Arc::new(InMemoryHashBackend::new());
        let mut handles = Vec::new();
        for i in 0..8 {
            let backend = backend.clone();
            handles.push(tokio::spawn(async move {
                let context = format!("ctx-{i}");
                for j in 0..25 {
                    backend
                        .create(&context, &format!("k{j}"), b"v")
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        for i in 0..8 {
            assert_eq!(backend.len(&format!("ctx-{i}")), 25);
        }
    }
}

// ─── HTTP API Backend ──────────────────────────────────────────────────────

#[cfg(feature = "http-client")]
mod api_tests {
    use super::*;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use tc_playbook::config::ApiBackendConfig;
    use tc_playbook::store::api::ApiBackend;
    use tc_playbook::{OutputRequest, PlaybookStore};

    const ENCODED_IP: &str = "/internal/playbooks/keyValue/%23App%3A1%3Aip%21String";

    fn backend_for(server: &mockito::ServerGuard) -> ApiBackend {
        ApiBackend::new(ApiBackendConfig::new(server.url()).with_token("TC-Token abc")).unwrap()
    }

    #[tokio::test]
    async fn test_create_puts_octet_stream_with_context_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", ENCODED_IP)
            .match_header("db-context", "ctx-1")
            .match_header("content-type", "application/octet-stream")
            .match_header("authorization", "TC-Token abc")
            .match_body(r#""1.2.3.4""#)
            .with_status(200)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let ack = backend
            .create("ctx-1", "#App:1:ip!String", br#""1.2.3.4""#)
            .await
            .unwrap();
        assert_eq!(ack, WriteAck::Accepted);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", ENCODED_IP)
            .match_header("db-context", "ctx-1")
            .with_status(200)
            .with_body(r#""1.2.3.4""#)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let raw = backend.read("ctx-1", "#App:1:ip!String").await.unwrap();
        assert_eq!(raw, Some(br#""1.2.3.4""#.to_vec()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_read_not_found_and_empty_body_are_absent() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", Matcher::Regex("missing".to_string()))
            .with_status(404)
            .create_async()
            .await;
        let _empty = server
            .mock("GET", Matcher::Regex("empty".to_string()))
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let backend = backend_for(&server);
        assert_eq!(backend.read("ctx", "#App:1:missing!String").await.unwrap(), None);
        assert_eq!(backend.read("ctx", "#App:1:empty!String").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_server_error_is_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("PUT", Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let err = backend.create("ctx", "#App:1:ip!String", b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_delete_is_unsupported() {
        let server = mockito::Server::new_async().await;
        let backend = backend_for(&server);
        let err = backend.delete("ctx", "k").await.unwrap_err();
        assert!(matches!(err, StorageError::Unsupported { operation: "delete" }));
        assert!(backend.read_all("ctx").await.is_err());
    }

    #[tokio::test]
    async fn test_facade_absorbs_server_failure() {
        let mut server = mockito::Server::new_async().await;
        let _put = server
            .mock("PUT", Matcher::Any)
            .with_status(503)
            .create_async()
            .await;
        let _get = server
            .mock("GET", Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let store = PlaybookStore::new(backend_for(&server), "ctx")
            .with_output_request(OutputRequest::from_csv("#App:1:ip!String"));
        assert_eq!(store.create().string("#App:1:ip!String", "1.2.3.4").await.unwrap(), None);
        assert_eq!(store.read().string("#App:1:ip!String").await.unwrap(), None);
        assert_eq!(
            store.delete().variable("#App:1:ip!String").await,
            Some(DeleteOutcome::Unsupported)
        );
    }
}
