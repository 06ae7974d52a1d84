//! Prefix cache scenarios, including the full stack: index -> HTTP client
//! -> gateway -> sled.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sledgate_api::{Api, ApiConfig};
    use sledgate_cache::{CacheStorage, MemoryStorage, PrefixIndex, S3Config, S3Storage};
    use sledgate_server::{GatewayService, Metrics, serve_with_shutdown};
    use sledgate_store::{KvObserver, ObjectStore};
    use tokio::net::TcpListener;

    fn tokens() -> Vec<String> {
        ["A", "B", "C", "D", "E", "F", "G", "H"]
            .iter()
            .map(|s| (*s).to_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_should_index_and_recover_prefix_in_memory() {
        let mut index = PrefixIndex::new(4, 1, Arc::new(MemoryStorage::new()));
        let data = vec![42u8; 8];

        let obj_id = index
            .store(&tokens(), &data, "replica-1", 1)
            .await
            .expect("store");
        assert!(!obj_id.is_empty());
        assert_eq!(index.prefix_count(), 2);

        let hit = index.lookup(&tokens(), 0).expect("hit");
        assert_eq!(hit.obj_id, obj_id);
        assert_eq!(hit.prefix_tokens, 8);
        assert_eq!(hit.usable_len_bytes, 8);

        let out = index.load(&obj_id, hit.usable_len_bytes).await.expect("load");
        assert_eq!(out, data);
    }

    #[tokio::test]
    async fn test_should_run_against_a_live_gateway() {
        // Boot the whole gateway on an ephemeral port.
        let dir = tempfile::tempdir().expect("tempdir");
        let db = sled::Config::new()
            .path(dir.path())
            .temporary(true)
            .open()
            .expect("open sled");
        let metrics = Arc::new(Metrics::new());
        let store = ObjectStore::with_observer(db, Arc::clone(&metrics) as Arc<dyn KvObserver>);
        let api = Arc::new(Api::new(store, ApiConfig::default()));
        let service = GatewayService::new(api, metrics, 64 * 1024 * 1024);

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            serve_with_shutdown(listener, service, async {
                stopped.await.ok();
            })
            .await
            .expect("serve");
        });

        let storage = S3Storage::new(S3Config {
            endpoint: format!("http://{addr}"),
            bucket: "prompt-cache".to_owned(),
            ..S3Config::default()
        })
        .expect("client");
        storage.create_bucket().await.expect("create bucket");
        // Second creation is idempotent through the whole stack.
        storage.create_bucket().await.expect("create bucket again");

        let mut index = PrefixIndex::new(4, 1, Arc::new(storage));
        let data = vec![42u8; 8];

        let obj_id = index
            .store(&tokens(), &data, "replica-1", 1)
            .await
            .expect("store");
        assert_eq!(index.prefix_count(), 2);

        let hit = index.lookup(&tokens(), 0).expect("hit");
        assert_eq!(hit.prefix_tokens, 8);
        assert_eq!(hit.usable_len_bytes, 8);

        // Load goes over HTTP with a leading range; the gateway answers 206.
        let out = index.load(&obj_id, hit.usable_len_bytes).await.expect("load");
        assert_eq!(out, data);

        // A shorter aligned prefix is served from the same object.
        let head = tokens()[..4].to_vec();
        let hit = index.lookup(&head, 0).expect("hit");
        assert_eq!(hit.prefix_tokens, 4);
        assert_eq!(hit.usable_len_bytes, 4);
        let out = index.load(&hit.obj_id, hit.usable_len_bytes).await.expect("load");
        assert_eq!(out, vec![42u8; 4]);

        stop.send(()).ok();
    }

    #[tokio::test]
    async fn test_should_treat_unreachable_gateway_as_storage_error() {
        let storage = S3Storage::new(S3Config {
            endpoint: "http://127.0.0.1:1".to_owned(),
            bucket: "prompt-cache".to_owned(),
            timeout_ms: 200,
            connect_timeout_ms: 200,
            ..S3Config::default()
        })
        .expect("client");

        let mut index = PrefixIndex::new(4, 1, Arc::new(storage));
        let result = index.store(&tokens(), &[1, 2, 3, 4], "w", 0).await;
        assert!(result.is_err());
        // A failed store leaves nothing indexed.
        assert_eq!(index.prefix_count(), 0);
    }

    #[tokio::test]
    async fn test_should_report_advisory_size_from_memory_backend() {
        let storage = MemoryStorage::new();
        storage.put("a", b"1").await.expect("put");
        storage.put("b", b"2").await.expect("put");
        assert_eq!(storage.size(), 2);
    }
}
