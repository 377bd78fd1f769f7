//! `in`: download a window of archives ending at the requested version and
//! render the requested summaries over them.
//!
//! The window is the target version plus everything older, newest first,
//! truncated to the largest limit across all summaries (0 = unbounded).
//! Downloads run one at a time in window order; summaries run afterwards in
//! request order. Files already written stay on disk if a later step fails.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use results_core::{
    base_name, decode_all, sort_descending, InRequest, InResponse, KeyCodec, KeyError, Summary,
    Version, VersionedKey,
};
use results_store::{ResultStore, StoreError};
use tracing::{debug, info, instrument};

use crate::error::{ResourceError, Result};
use crate::viewer::SummaryViewer;

/// Largest limit across `summaries`; 0 when none of them sets one.
pub fn effective_limit(summaries: &[Summary]) -> usize {
    summaries.iter().map(|s| s.limit).max().unwrap_or(0)
}

/// Ordered list of keys to download for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchWindow {
    keys: Vec<VersionedKey>,
    dropped: usize,
}

impl FetchWindow {
    /// Select keys at or before `target`, newest first, keeping at most
    /// `limit` of them (0 keeps all).
    pub fn resolve<I, S>(
        codec: &KeyCodec,
        all_keys: I,
        target: &Version,
        limit: usize,
    ) -> std::result::Result<Self, KeyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let target = codec.parse(&target.key)?;

        let mut keys: Vec<_> = decode_all(codec, all_keys)?
            .into_iter()
            .filter(|k| k.timestamp <= target)
            .collect();
        sort_descending(&mut keys);

        let mut dropped = 0;
        if limit > 0 && keys.len() > limit {
            dropped = keys.len() - limit;
            keys.truncate(limit);
        }

        Ok(Self { keys, dropped })
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(|k| k.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Eligible keys cut by the limit
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

pub struct Fetcher {
    store: Arc<dyn ResultStore>,
    viewer: Arc<dyn SummaryViewer>,
    codec: KeyCodec,
}

impl Fetcher {
    pub fn new(store: Arc<dyn ResultStore>, viewer: Arc<dyn SummaryViewer>) -> Self {
        Self {
            store,
            viewer,
            codec: KeyCodec::standard().clone(),
        }
    }

    pub fn with_codec(mut self, codec: KeyCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Handle an `in` request, writing archives into `output_dir`.
    pub async fn get(&self, request: &InRequest, output_dir: &Path) -> Result<InResponse> {
        let fetched = self
            .fetch(&request.version, &request.params.summaries, output_dir)
            .await?;
        Ok(InResponse::new(request.version.clone(), fetched))
    }

    /// Download the window ending at `target` and print every summary.
    /// Returns the number of archives downloaded.
    #[instrument(skip_all, fields(target = %target.key, output_dir = %output_dir.display()))]
    pub async fn fetch(
        &self,
        target: &Version,
        summaries: &[Summary],
        output_dir: &Path,
    ) -> Result<usize> {
        self.codec.parse(&target.key)?;
        ensure_dir(output_dir).await?;

        let keys = self.store.list().await?;
        let limit = effective_limit(summaries);
        let window = FetchWindow::resolve(&self.codec, keys, target, limit)?;
        info!(
            selected = window.len(),
            dropped = window.dropped(),
            limit,
            "resolved fetch window"
        );

        for key in window.keys() {
            self.download(key, output_dir).await?;
        }

        for summary in summaries {
            self.viewer.print_summary(summary, output_dir).await?;
        }

        Ok(window.len())
    }

    async fn download(&self, key: &str, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(base_name(key));
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|e| ResourceError::io("unable to create", &path, e))?;

        self.store.get(key, &mut file).await.map_err(|e| match e {
            StoreError::Sink { source, .. } => ResourceError::io("unable to write", &path, source),
            other => other.into(),
        })?;
        debug!(key, path = %path.display(), "downloaded");
        Ok(path)
    }
}

async fn ensure_dir(dir: &Path) -> Result<()> {
    let meta = tokio::fs::metadata(dir)
        .await
        .map_err(|e| ResourceError::io("unable to use output dir", dir, e))?;
    if !meta.is_dir() {
        return Err(ResourceError::io(
            "unable to use output dir",
            dir,
            std::io::Error::other("not a directory"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use results_store::MemoryStore;
    use std::sync::Mutex;

    use crate::viewer::SummaryError;

    const T1: &str = "test-results-2018-01-01T15:04:05Z.xml";
    const T2: &str = "test-results-2018-01-02T15:04:05Z.xml";
    const T3: &str = "test-results-2018-01-03T15:04:05Z.xml";

    #[derive(Default)]
    struct RecordingViewer {
        calls: Mutex<Vec<Summary>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl SummaryViewer for RecordingViewer {
        async fn print_summary(
            &self,
            summary: &Summary,
            _results_dir: &Path,
        ) -> std::result::Result<(), SummaryError> {
            self.calls.lock().unwrap().push(summary.clone());
            if self.fail_on.as_deref() == Some(summary.kind.as_str()) {
                return Err(SummaryError::Failed {
                    kind: summary.kind.clone(),
                    reason: "viewer exploded".to_string(),
                });
            }
            Ok(())
        }
    }

    fn store_with(keys: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for key in keys {
            store.insert(*key, format!("<testsuite name=\"{key}\"/>"));
        }
        store
    }

    fn window_keys(window: &FetchWindow) -> Vec<&str> {
        window.keys().collect()
    }

    #[test]
    fn test_effective_limit_is_maximum() {
        assert_eq!(effective_limit(&[]), 0);
        assert_eq!(effective_limit(&[Summary::new("pass-fail", 0)]), 0);
        assert_eq!(
            effective_limit(&[Summary::new("pass-fail", 10), Summary::new("frequent-failures", 5)]),
            10
        );
        assert_eq!(
            effective_limit(&[Summary::new("pass-fail", 0), Summary::new("frequent-failures", 5)]),
            5
        );
    }

    #[test]
    fn test_window_includes_target_and_older() {
        let window =
            FetchWindow::resolve(KeyCodec::standard(), [T2, T1, T3], &Version::new(T2), 0).unwrap();
        assert_eq!(window_keys(&window), vec![T2, T1]);
        assert_eq!(window.dropped(), 0);
    }

    #[test]
    fn test_window_limit_keeps_most_recent() {
        let window =
            FetchWindow::resolve(KeyCodec::standard(), [T2, T1, T3], &Version::new(T3), 1).unwrap();
        assert_eq!(window_keys(&window), vec![T3]);
        assert_eq!(window.dropped(), 2);
    }

    #[test]
    fn test_window_limit_larger_than_selection() {
        let window = FetchWindow::resolve(
            KeyCodec::standard(),
            [T2, T1, T3],
            &Version::new(T2),
            100,
        )
        .unwrap();
        assert_eq!(window_keys(&window), vec![T2, T1]);
    }

    #[test]
    fn test_window_target_older_than_everything() {
        let window = FetchWindow::resolve(
            KeyCodec::standard(),
            [T2, T1, T3],
            &Version::new("test-results-2017-12-31T00:00:00Z.xml"),
            0,
        )
        .unwrap();
        assert!(window.is_empty());
    }

    #[test]
    fn test_window_rejects_invalid_target() {
        let err = FetchWindow::resolve(
            KeyCodec::standard(),
            [T1],
            &Version::new("test-results-invalid-date.xml"),
            0,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid-date"));
    }

    #[tokio::test]
    async fn test_get_downloads_window_and_prints_summaries() {
        let store = store_with(&[T2, T1, T3]);
        let viewer = Arc::new(RecordingViewer::default());
        let out = tempfile::tempdir().unwrap();

        let fetcher = Fetcher::new(store.clone(), viewer.clone());
        let request = InRequest {
            source: Default::default(),
            version: Version::new(T2),
            params: results_core::InParams {
                summaries: vec![
                    Summary::new("pass-fail", 10),
                    Summary::new("frequent-failures", 5),
                ],
            },
        };
        let resp = fetcher.get(&request, out.path()).await.unwrap();

        assert_eq!(resp, InResponse::new(Version::new(T2), 2));
        assert_eq!(store.get_calls(), vec![T2, T1]);
        assert_eq!(
            std::fs::read_to_string(out.path().join(T1)).unwrap(),
            format!("<testsuite name=\"{T1}\"/>")
        );
        assert!(out.path().join(T2).exists());
        assert!(!out.path().join(T3).exists());
        assert_eq!(
            *viewer.calls.lock().unwrap(),
            vec![Summary::new("pass-fail", 10), Summary::new("frequent-failures", 5)]
        );
    }

    #[tokio::test]
    async fn test_fetch_limit_one() {
        let store = store_with(&[T2, T1, T3]);
        let out = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(store.clone(), Arc::new(RecordingViewer::default()));

        let count = fetcher
            .fetch(&Version::new(T2), &[Summary::new("pass-fail", 1)], out.path())
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.get_calls(), vec![T2]);
    }

    #[tokio::test]
    async fn test_fetch_writes_base_name_for_prefixed_keys() {
        let store = store_with(&["nightly/linux/test-results-2018-01-01T15:04:05Z.xml"]);
        let out = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(store, Arc::new(RecordingViewer::default()));

        let count = fetcher
            .fetch(&Version::new(T1), &[], out.path())
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(out.path().join(T1).exists());
    }

    #[tokio::test]
    async fn test_fetch_nothing_eligible_still_prints_summaries() {
        let store = store_with(&[T3]);
        let viewer = Arc::new(RecordingViewer::default());
        let out = tempfile::tempdir().unwrap();

        let count = Fetcher::new(store.clone(), viewer.clone())
            .fetch(&Version::new(T1), &[Summary::new("pass-fail", 0)], out.path())
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(store.get_calls().is_empty());
        assert_eq!(viewer.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_on_invalid_target() {
        let store = store_with(&[T1]);
        let out = tempfile::tempdir().unwrap();
        let err = Fetcher::new(store.clone(), Arc::new(RecordingViewer::default()))
            .fetch(&Version::new("test-results-invalid-date.xml"), &[], out.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid-date"));
        assert!(store.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_error_on_list_failure() {
        let store = store_with(&[T1]);
        store.fail_with("some-error");
        let out = tempfile::tempdir().unwrap();

        let err = Fetcher::new(store, Arc::new(RecordingViewer::default()))
            .fetch(&Version::new(T2), &[], out.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("some-error"));
    }

    #[tokio::test]
    async fn test_fetch_error_on_missing_output_dir() {
        let store = store_with(&[T1]);
        let out = tempfile::tempdir().unwrap();
        let missing = out.path().join("does-not-exist");

        let err = Fetcher::new(store.clone(), Arc::new(RecordingViewer::default()))
            .fetch(&Version::new(T2), &[], &missing)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Io { .. }));
        assert!(err.to_string().contains("does-not-exist"));
        assert!(store.get_calls().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_write_failure_names_local_path() {
        /// Fails every download while writing to the local file
        struct BrokenSinkStore;

        #[async_trait]
        impl ResultStore for BrokenSinkStore {
            async fn list(&self) -> std::result::Result<Vec<String>, StoreError> {
                Ok(vec![T1.to_string()])
            }

            async fn get(
                &self,
                key: &str,
                _sink: &mut (dyn tokio::io::AsyncWrite + Send + Unpin),
            ) -> std::result::Result<(), StoreError> {
                Err(StoreError::Sink {
                    key: key.to_string(),
                    source: std::io::Error::other("disk full"),
                })
            }

            async fn put(&self, _key: &str, _body: Vec<u8>) -> std::result::Result<(), StoreError> {
                Ok(())
            }

            async fn delete(&self, _key: &str) -> std::result::Result<(), StoreError> {
                Ok(())
            }
        }

        let out = tempfile::tempdir().unwrap();
        let err = Fetcher::new(Arc::new(BrokenSinkStore), Arc::new(RecordingViewer::default()))
            .fetch(&Version::new(T1), &[], out.path())
            .await
            .unwrap_err();

        match &err {
            ResourceError::Io { path, .. } => assert_eq!(path, &out.path().join(T1)),
            other => panic!("expected io error, got {other:?}"),
        }
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_fetch_summary_failure_aborts_remaining() {
        let store = store_with(&[T1]);
        let viewer = Arc::new(RecordingViewer {
            fail_on: Some("pass-fail".to_string()),
            ..Default::default()
        });
        let out = tempfile::tempdir().unwrap();

        let err = Fetcher::new(store, viewer.clone())
            .fetch(
                &Version::new(T1),
                &[Summary::new("pass-fail", 0), Summary::new("frequent-failures", 0)],
                out.path(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Summary(_)));
        assert_eq!(viewer.calls.lock().unwrap().len(), 1);
        // Downloaded archives stay for inspection.
        assert!(out.path().join(T1).exists());
    }
}
