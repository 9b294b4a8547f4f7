//! Append pipeline behaviour: dedup, retry on failure, truncation, restarts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tailpost_watch::testing::{CollectingSink, MockDocumentService};
use tailpost_watch::{
    AppendError, AppendPipeline, Error, FileStateTracker, IncrementalReader, LineCache,
    PassOutcome, Services,
};
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    file: PathBuf,
    cache_file: PathBuf,
    docs: Arc<MockDocumentService>,
    sink: Arc<CollectingSink>,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("chat.txt");
        std::fs::write(&file, "").unwrap();
        Self {
            file,
            cache_file: temp.path().join("cache.json"),
            _temp: temp,
            docs: MockDocumentService::new(),
            sink: CollectingSink::new(),
        }
    }

    fn pipeline_with(&self, cache: LineCache) -> AppendPipeline {
        let mut pipeline = AppendPipeline::new(
            IncrementalReader::default(),
            cache,
            FileStateTracker::new(Duration::ZERO),
        )
        .with_document_id(Some("doc-1".to_string()))
        .with_cache_file(self.cache_file.clone());
        pipeline.set_services(Some(Services {
            docs: Some(self.docs.clone()),
        }));
        pipeline
    }

    fn pipeline(&self) -> AppendPipeline {
        self.pipeline_with(LineCache::new(10_000, 7_000))
    }

    fn append(&self, text: &str) {
        use std::io::Write;
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.file)
            .unwrap();
        file.write_all(text.as_bytes()).unwrap();
    }

    async fn pass(&self, pipeline: &mut AppendPipeline) -> tailpost_watch::Result<PassOutcome> {
        pipeline.process_path(&self.file, self.sink.as_ref()).await
    }
}

fn last_size(pipeline: &AppendPipeline, path: &Path) -> u64 {
    pipeline.states().get(path).map(|s| s.last_size).unwrap_or(0)
}

fn body_lines(block: &str) -> Vec<&str> {
    block
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect()
}

#[tokio::test]
async fn hello_twice_appends_once() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();

    fx.append("Hello\n");
    let outcome = fx.pass(&mut pipeline).await.unwrap();
    assert_eq!(outcome, PassOutcome::Appended { lines: 1 });
    assert!(pipeline.cache().contains("Hello"));
    assert_eq!(last_size(&pipeline, &fx.file), 6);

    let appended = fx.docs.appended();
    assert_eq!(appended.len(), 1);
    assert!(appended[0].contains("# New update: "));
    assert_eq!(body_lines(&appended[0]), vec!["Hello"]);
    assert_eq!(fx.docs.calls()[0].document_id, "doc-1");

    fx.append("Hello\n");
    let outcome = fx.pass(&mut pipeline).await.unwrap();
    assert_eq!(outcome, PassOutcome::NothingNew { lines_seen: 1 });
    assert_eq!(last_size(&pipeline, &fx.file), 12);
    assert_eq!(fx.docs.attempts(), 1);
}

#[tokio::test]
async fn failed_append_changes_nothing_and_retries_everything() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();

    fx.append("one\ntwo\n");
    fx.pass(&mut pipeline).await.unwrap();
    let size_before = last_size(&pipeline, &fx.file);
    let cache_before = pipeline.cache().len();

    fx.append("three\nfour\nthree\n");
    fx.docs
        .fail_with(Some(AppendError::QuotaExceeded("rate limit".into())));

    let err = fx.pass(&mut pipeline).await.unwrap_err();
    assert!(matches!(err, Error::Append(AppendError::QuotaExceeded(_))));
    assert_eq!(last_size(&pipeline, &fx.file), size_before);
    assert_eq!(pipeline.cache().len(), cache_before);
    assert!(!pipeline.cache().contains("three"));
    assert!(fx.sink.contains("[quota]"));

    fx.docs.fail_with(None);
    let outcome = fx.pass(&mut pipeline).await.unwrap();
    assert_eq!(outcome, PassOutcome::Appended { lines: 2 });

    let appended = fx.docs.appended();
    assert_eq!(body_lines(appended.last().unwrap()), vec!["three", "four"]);
    assert_eq!(
        last_size(&pipeline, &fx.file),
        std::fs::metadata(&fx.file).unwrap().len()
    );
}

#[tokio::test]
async fn restart_with_persisted_cache_does_not_reappend() {
    let fx = Fixture::new();
    fx.append("alpha\nbeta\n");

    let mut first = fx.pipeline();
    assert_eq!(
        fx.pass(&mut first).await.unwrap(),
        PassOutcome::Appended { lines: 2 }
    );
    drop(first);

    // Fresh run: file state is gone, cache comes back from disk.
    let cache = LineCache::load(&fx.cache_file, &Default::default())
        .await
        .unwrap();
    let mut second = fx.pipeline_with(cache);
    assert_eq!(
        fx.pass(&mut second).await.unwrap(),
        PassOutcome::NothingNew { lines_seen: 2 }
    );
    assert_eq!(fx.docs.attempts(), 1);
}

#[tokio::test]
async fn truncated_file_is_read_from_start() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    pipeline.states_mut().set_last_size(&fx.file, 100);

    std::fs::write(&fx.file, "fresh start\n").unwrap();
    let outcome = fx.pass(&mut pipeline).await.unwrap();

    assert_eq!(outcome, PassOutcome::Appended { lines: 1 });
    assert_eq!(body_lines(&fx.docs.appended()[0]), vec!["fresh start"]);
    assert_eq!(last_size(&pipeline, &fx.file), 12);
    assert!(fx.sink.contains("truncated"));
}

#[tokio::test]
async fn rewrite_survives_failed_append_and_regrowth() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();

    fx.append("old line one\nold line two\n");
    fx.pass(&mut pipeline).await.unwrap();
    assert_eq!(last_size(&pipeline, &fx.file), 26);

    std::fs::write(&fx.file, "NEW-A\n").unwrap();
    fx.docs
        .fail_with(Some(AppendError::Network("connection reset".into())));
    let err = fx.pass(&mut pipeline).await.unwrap_err();
    assert!(matches!(err, Error::Append(AppendError::Network(_))));
    assert_eq!(last_size(&pipeline, &fx.file), 0);

    fx.append("padding that pushes the file past its old size\n");
    assert!(std::fs::metadata(&fx.file).unwrap().len() > 26);

    fx.docs.fail_with(None);
    let outcome = fx.pass(&mut pipeline).await.unwrap();
    assert_eq!(outcome, PassOutcome::Appended { lines: 2 });
    assert_eq!(
        body_lines(fx.docs.appended().last().unwrap()),
        vec!["NEW-A", "padding that pushes the file past its old size"]
    );
    assert!(pipeline.cache().contains("NEW-A"));
}

#[tokio::test]
async fn unchanged_file_makes_no_call() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();

    fx.append("x\n");
    fx.pass(&mut pipeline).await.unwrap();
    assert_eq!(
        fx.pass(&mut pipeline).await.unwrap(),
        PassOutcome::Unchanged
    );
    assert_eq!(fx.docs.attempts(), 1);
}

#[tokio::test]
async fn lines_are_deduplicated_across_files() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    let other = fx.file.with_file_name("other.txt");

    fx.append("shared\nmine\n");
    fx.pass(&mut pipeline).await.unwrap();

    std::fs::write(&other, "shared\ntheirs\n").unwrap();
    let outcome = pipeline
        .process_path(&other, fx.sink.as_ref())
        .await
        .unwrap();
    assert_eq!(outcome, PassOutcome::Appended { lines: 1 });
    assert_eq!(body_lines(fx.docs.appended().last().unwrap()), vec!["theirs"]);
}

#[tokio::test]
async fn degraded_mode_skips_without_committing() {
    let fx = Fixture::new();
    let mut pipeline = AppendPipeline::new(
        IncrementalReader::default(),
        LineCache::new(100, 70),
        FileStateTracker::new(Duration::ZERO),
    )
    .with_document_id(Some("doc-1".to_string()));

    fx.append("kept for later\n");
    let outcome = fx.pass(&mut pipeline).await.unwrap();
    assert_eq!(outcome, PassOutcome::Skipped { lines: 1 });
    assert!(pipeline.cache().is_empty());
    assert_eq!(last_size(&pipeline, &fx.file), 0);
    assert!(fx.sink.contains("Skipped 1 new line(s)"));

    // Once a service shows up the same content goes out.
    pipeline.set_services(Some(Services {
        docs: Some(fx.docs.clone()),
    }));
    assert_eq!(
        fx.pass(&mut pipeline).await.unwrap(),
        PassOutcome::Appended { lines: 1 }
    );
}

#[tokio::test]
async fn missing_document_id_skips() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline().with_document_id(Some(String::new()));
    assert!(!pipeline.can_append());

    fx.append("line\n");
    assert_eq!(
        fx.pass(&mut pipeline).await.unwrap(),
        PassOutcome::Skipped { lines: 1 }
    );
    assert_eq!(fx.docs.attempts(), 0);
}

#[tokio::test]
async fn vanished_file_drops_state() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();

    fx.append("before\n");
    fx.pass(&mut pipeline).await.unwrap();
    assert!(pipeline.states().get(&fx.file).is_some());

    std::fs::remove_file(&fx.file).unwrap();
    let err = fx.pass(&mut pipeline).await.unwrap_err();
    assert!(matches!(err, Error::Vanished(_)));
    assert!(pipeline.states().get(&fx.file).is_none());
}

#[tokio::test]
async fn undecodable_content_leaves_state_untouched() {
    let fx = Fixture::new();
    let mut pipeline = AppendPipeline::new(
        IncrementalReader::new(vec![encoding_rs::UTF_8]),
        LineCache::new(100, 70),
        FileStateTracker::new(Duration::ZERO),
    );

    std::fs::write(&fx.file, [0xC3u8, 0x28, b'\n']).unwrap();

    let err = fx.pass(&mut pipeline).await.unwrap_err();
    assert!(matches!(err, Error::Read(_)));
    assert_eq!(last_size(&pipeline, &fx.file), 0);
}

#[tokio::test]
async fn euc_kr_content_is_appended_as_text() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();

    let (bytes, _, _) = encoding_rs::EUC_KR.encode("안녕하세요\n반갑습니다\n");
    std::fs::write(&fx.file, &bytes).unwrap();

    assert_eq!(
        fx.pass(&mut pipeline).await.unwrap(),
        PassOutcome::Appended { lines: 2 }
    );
    assert_eq!(
        body_lines(&fx.docs.appended()[0]),
        vec!["안녕하세요", "반갑습니다"]
    );
    let state = pipeline.states().get(&fx.file).unwrap();
    assert_eq!(state.last_encoding, Some(encoding_rs::EUC_KR));
}

#[tokio::test]
async fn debounce_drops_rapid_second_pass() {
    let fx = Fixture::new();
    let mut pipeline = AppendPipeline::new(
        IncrementalReader::default(),
        LineCache::new(100, 70),
        FileStateTracker::new(Duration::from_secs(60)),
    )
    .with_document_id(Some("doc-1".to_string()));
    pipeline.set_services(Some(Services {
        docs: Some(fx.docs.clone()),
    }));

    fx.append("first\n");
    fx.pass(&mut pipeline).await.unwrap();
    fx.append("second\n");

    assert_eq!(
        fx.pass(&mut pipeline).await.unwrap(),
        PassOutcome::Debounced
    );
    assert_eq!(last_size(&pipeline, &fx.file), 6);
}

#[tokio::test]
async fn cache_is_persisted_after_each_append() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();

    fx.append("persist me\n");
    fx.pass(&mut pipeline).await.unwrap();

    let raw = std::fs::read_to_string(&fx.cache_file).unwrap();
    let lines: Vec<String> = serde_json::from_str(&raw).unwrap();
    assert_eq!(lines, vec!["persist me"]);
}
