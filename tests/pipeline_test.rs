use async_trait::async_trait;
use bhl_handwriting_analyzer::clients::{MetadataSource, RecognitionMode, RecognitionService};
use bhl_handwriting_analyzer::error::{ApiError, AppError, AppResult};
use bhl_handwriting_analyzer::models::{OcrPoll, OcrStatus};
use bhl_handwriting_analyzer::services::{
    FinderOutput, NameExtractor, NameFinder, OcrDriver, ReferenceFetcher,
};
use bhl_handwriting_analyzer::{
    cancel_pair, App, CancelToken, Config, FailurePolicy, OutputLayout, PageCtx, PageFlow,
    PageStage, PageState, PollMode,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::Instant;

const ITEM_ID: u64 = 5000;

// ========== 测试替身 ==========

#[derive(Default)]
struct FakeBhl {
    item_xml: String,
    page_xml: HashMap<u64, String>,
    broken_pages: Vec<u64>,
    page_calls: Arc<Mutex<Vec<u64>>>,
}

impl FakeBhl {
    fn with_pages(pages: &[u64]) -> Self {
        Self {
            item_xml: item_xml(pages),
            ..Default::default()
        }
    }

    fn names(mut self, page_id: u64, names: &[&str]) -> Self {
        self.page_xml.insert(page_id, page_xml(page_id, names));
        self
    }
}

#[async_trait]
impl MetadataSource for FakeBhl {
    async fn item_metadata(&self, _item_id: u64) -> AppResult<String> {
        Ok(self.item_xml.clone())
    }

    async fn page_metadata(&self, page_id: u64) -> AppResult<String> {
        Ok(self
            .page_xml
            .get(&page_id)
            .cloned()
            .unwrap_or_else(|| page_xml(page_id, &[])))
    }

    async fn page_text(&self, page_id: u64) -> AppResult<String> {
        self.page_calls.lock().unwrap().push(page_id);
        if self.broken_pages.contains(&page_id) {
            return Err(AppError::Api(ApiError::BadStatus {
                endpoint: "pagetext".to_string(),
                status: 500,
            }));
        }
        Ok(format!("printed text of page {}\n", page_id))
    }
}

/// 图片 URL 以 `/<page>` 结尾；表中没有的页面识别失败
#[derive(Default)]
struct FakeVision {
    lines: HashMap<u64, Vec<String>>,
    submitted: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl RecognitionService for FakeVision {
    async fn submit(&self, image_url: &str, mode: RecognitionMode) -> AppResult<String> {
        assert_eq!(mode, RecognitionMode::Handwritten);
        self.submitted.lock().unwrap().push(image_url.to_string());
        let page = image_url.rsplit('/').next().unwrap_or_default();
        Ok(format!("op-{}", page))
    }

    async fn poll(&self, operation_id: &str) -> AppResult<OcrPoll> {
        let page: u64 = operation_id.trim_start_matches("op-").parse().unwrap();
        Ok(match self.lines.get(&page) {
            Some(lines) => OcrPoll {
                status: OcrStatus::Succeeded,
                lines: lines.clone(),
            },
            None => OcrPoll {
                status: OcrStatus::Failed,
                lines: Vec::new(),
            },
        })
    }
}

/// 在识别文本中查找已知学名；`crash_first` 时第一次调用非正常退出且没有输出
#[derive(Default)]
struct FakeFinder {
    known: Vec<String>,
    crash_first: bool,
    calls: Arc<Mutex<Vec<PathBuf>>>,
    called_at: Arc<Mutex<Vec<Instant>>>,
}

#[async_trait]
impl NameFinder for FakeFinder {
    async fn find_names(&self, input: &Path) -> AppResult<FinderOutput> {
        self.called_at.lock().unwrap().push(Instant::now());
        let call_count = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(input.to_path_buf());
            calls.len()
        };
        if self.crash_first && call_count == 1 {
            return Ok(FinderOutput {
                stdout: String::new(),
                stderr: "panic: runtime error".to_string(),
                success: false,
            });
        }
        let text = std::fs::read_to_string(input).unwrap();
        let names: Vec<_> = self
            .known
            .iter()
            .filter(|name| text.contains(name.as_str()))
            .map(|name| serde_json::json!({ "name": name }))
            .collect();
        let doc = serde_json::json!({
            "metadata": { "total_names": names.len() },
            "names": names,
        });
        Ok(FinderOutput {
            stdout: doc.to_string(),
            stderr: String::new(),
            success: true,
        })
    }
}

fn item_xml(pages: &[u64]) -> String {
    let pages: String = pages
        .iter()
        .map(|id| format!("<Page><PageID>{}</PageID><ItemID>{}</ItemID></Page>", id, ITEM_ID))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><Response><Status>ok</Status><ErrorMessage /><Result><Item><ItemID>{}</ItemID><Pages>{}</Pages></Item></Result></Response>",
        ITEM_ID, pages
    )
}

fn page_xml(page_id: u64, names: &[&str]) -> String {
    let names: String = names
        .iter()
        .map(|n| format!("<Name><NameFound>{}</NameFound></Name>", n))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?><Response><Status>ok</Status><Result><Page><PageID>{}</PageID><Names>{}</Names></Page></Result></Response>",
        page_id, names
    )
}

fn test_config(dir: &TempDir) -> Config {
    Config {
        bhl_api_key: "key".to_string(),
        bhl_page_image_url: "https://img.test/pageimage/{page_id}".to_string(),
        output_folder: dir.path().display().to_string(),
        throttle_ms: 0,
        poll_mode: PollMode::Bounded,
        max_retry_times: 2,
        query_wait_ms: 0,
        ..Config::default()
    }
}

fn two_page_fixture() -> (FakeBhl, FakeVision, FakeFinder) {
    let bhl = FakeBhl::with_pages(&[101, 102]).names(101, &["Aus bus"]);
    let vision = FakeVision {
        lines: HashMap::from([(101, vec!["Aus bus found here".to_string()])]),
        ..Default::default()
    };
    let finder = FakeFinder {
        known: vec!["Aus bus".to_string()],
        ..Default::default()
    };
    (bhl, vision, finder)
}

fn app(config: Config, bhl: FakeBhl, vision: FakeVision, finder: FakeFinder) -> App {
    App::with_services(
        config,
        Box::new(bhl),
        Box::new(vision),
        Box::new(finder),
        CancelToken::never(),
    )
}

fn read(path: PathBuf) -> String {
    std::fs::read_to_string(path).unwrap()
}

// ========== 测试 ==========

#[tokio::test]
async fn test_item_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (bhl, vision, finder) = two_page_fixture();
    let finder_calls = finder.calls.clone();
    let submitted = vision.submitted.clone();

    let app = app(test_config(&dir), bhl, vision, finder);
    let report = app.run(ITEM_ID).await.unwrap();

    assert_eq!(report.pages_total, 2);
    assert_eq!(report.pages_done, 2);
    assert_eq!(report.pages_recognized, 1);
    assert!(report.failures.is_empty());
    assert_eq!(report.original_names, 1);
    assert_eq!(report.new_names, 1);

    let layout = app.layout();
    assert_eq!(read(layout.original_summary(ITEM_ID)), "PageID\tName\n101\tAus bus\n");
    assert_eq!(read(layout.new_summary(ITEM_ID)), "PageID\tName\n101\tAus bus\n");
    assert_eq!(read(layout.new_text(101)), "Aus bus found here\n");
    assert!(read(layout.original_text(102)).contains("page 102"));
    assert!(!layout.new_text(102).exists());
    assert!(!layout.new_names(102).exists());

    // 识别失败的页面不运行学名提取
    assert_eq!(*finder_calls.lock().unwrap(), vec![layout.new_text(101)]);
    assert_eq!(
        *submitted.lock().unwrap(),
        vec![
            "https://img.test/pageimage/101".to_string(),
            "https://img.test/pageimage/102".to_string()
        ]
    );
    assert_eq!(read(layout.failure_report(ITEM_ID)), "PageID\tStage\tReason\n");
}

#[tokio::test]
async fn test_page_state_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let layout = OutputLayout::new(dir.path());
    layout.ensure_dirs().await.unwrap();
    let (bhl, vision, finder) = two_page_fixture();

    let flow = PageFlow::new(
        ReferenceFetcher::new(&bhl, &layout, true),
        OcrDriver::new(&vision, config.poll_policy(), CancelToken::never()),
        NameExtractor::new(&finder, &layout, CancelToken::never(), true),
        &layout,
        &config,
        CancelToken::never(),
    );

    let ok = flow.run(&PageCtx::new(ITEM_ID, 101, 1, 2)).await;
    assert_eq!(
        ok.path,
        vec![
            PageState::Start,
            PageState::ReferenceFetched,
            PageState::Recognized,
            PageState::NamesExtracted,
            PageState::Done
        ]
    );

    let failed = flow.run(&PageCtx::new(ITEM_ID, 102, 2, 2)).await;
    assert_eq!(
        failed.path,
        vec![
            PageState::Start,
            PageState::ReferenceFetched,
            PageState::RecognitionFailed,
            PageState::NamesSkipped,
            PageState::Done
        ]
    );
    assert!(failed.is_done());
    assert!(failed.failure.is_none());
}

#[tokio::test]
async fn test_failed_page_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let (mut bhl, vision, finder) = two_page_fixture();
    bhl.broken_pages = vec![101];

    let app = app(test_config(&dir), bhl, vision, finder);
    let report = app.run(ITEM_ID).await.unwrap();

    assert_eq!(report.pages_done, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, 101);
    assert_eq!(report.failures[0].1.stage, PageStage::ReferenceFetch);

    let layout = app.layout();
    assert!(read(layout.failure_report(ITEM_ID)).contains("101\treference_fetch\t"));
    // 后续页面照常处理，汇总只包含有产物的页面
    assert!(layout.original_text(102).exists());
    assert_eq!(read(layout.original_summary(ITEM_ID)), "PageID\tName\n");
    assert_eq!(read(layout.new_summary(ITEM_ID)), "PageID\tName\n");
}

#[tokio::test]
async fn test_fail_fast_stops_run() {
    let dir = tempfile::tempdir().unwrap();
    let (mut bhl, vision, finder) = two_page_fixture();
    bhl.broken_pages = vec![101];
    let page_calls = bhl.page_calls.clone();
    let submitted = vision.submitted.clone();

    let mut config = test_config(&dir);
    config.failure_policy = FailurePolicy::FailFast;
    let app = app(config, bhl, vision, finder);

    match app.run(ITEM_ID).await {
        Err(AppError::PageFailed { page_id, stage, .. }) => {
            assert_eq!(page_id, 101);
            assert_eq!(stage, "reference_fetch");
        }
        other => panic!("unexpected result: {:?}", other.map(|r| r.pages_done)),
    }

    assert_eq!(*page_calls.lock().unwrap(), vec![101]);
    assert!(submitted.lock().unwrap().is_empty());
    assert!(!app.layout().original_summary(ITEM_ID).exists());
    assert!(!app.layout().new_summary(ITEM_ID).exists());
}

#[tokio::test]
async fn test_resume_skips_existing_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    layout.ensure_dirs().await.unwrap();
    std::fs::write(layout.original_text(101), "cached text").unwrap();
    std::fs::write(layout.original_names(101), page_xml(101, &["Cus dus"])).unwrap();
    std::fs::write(layout.new_text(101), "Cus dus\n").unwrap();
    std::fs::write(
        layout.new_names(101),
        r#"{"metadata":{"total_names":1},"names":[{"name":"Cus dus"}]}"#,
    )
    .unwrap();

    let bhl = FakeBhl::with_pages(&[101]);
    let page_calls = bhl.page_calls.clone();
    let vision = FakeVision::default();
    let submitted = vision.submitted.clone();
    let finder = FakeFinder::default();
    let finder_calls = finder.calls.clone();

    let app = app(test_config(&dir), bhl, vision, finder);
    let report = app.run(ITEM_ID).await.unwrap();

    assert_eq!(report.pages_done, 1);
    assert!(page_calls.lock().unwrap().is_empty());
    assert!(submitted.lock().unwrap().is_empty());
    assert!(finder_calls.lock().unwrap().is_empty());
    assert_eq!(read(layout.original_summary(ITEM_ID)), "PageID\tName\n101\tCus dus\n");
    assert_eq!(read(layout.new_summary(ITEM_ID)), "PageID\tName\n101\tCus dus\n");
}

#[tokio::test]
async fn test_resume_disabled_refetches() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    layout.ensure_dirs().await.unwrap();
    std::fs::write(layout.original_text(101), "stale").unwrap();
    std::fs::write(layout.original_names(101), page_xml(101, &[])).unwrap();

    let (bhl, vision, finder) = two_page_fixture();
    let mut config = test_config(&dir);
    config.resume = false;

    let app = app(config, bhl, vision, finder);
    app.run(ITEM_ID).await.unwrap();

    assert!(read(layout.original_text(101)).contains("page 101"));
    assert_eq!(read(layout.original_summary(ITEM_ID)), "PageID\tName\n101\tAus bus\n");
}

#[tokio::test]
async fn test_item_lookup_error_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let bhl = FakeBhl {
        item_xml: "<Response><Status>error</Status><ErrorMessage>Invalid API key</ErrorMessage></Response>".to_string(),
        ..Default::default()
    };
    let page_calls = bhl.page_calls.clone();

    let app = app(test_config(&dir), bhl, FakeVision::default(), FakeFinder::default());
    let err = app.run(ITEM_ID).await.unwrap_err();

    assert!(matches!(err, AppError::Api(ApiError::BadResponse { .. })));
    assert!(err.to_string().contains("Invalid API key"));
    assert!(page_calls.lock().unwrap().is_empty());
    assert!(!app.layout().original_summary(ITEM_ID).exists());
}

#[tokio::test]
async fn test_item_without_pages_writes_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(
        test_config(&dir),
        FakeBhl::with_pages(&[]),
        FakeVision::default(),
        FakeFinder::default(),
    );

    let report = app.run(ITEM_ID).await.unwrap();
    assert_eq!(report.pages_total, 0);
    assert_eq!(read(app.layout().original_summary(ITEM_ID)), "PageID\tName\n");
    assert_eq!(read(app.layout().new_summary(ITEM_ID)), "PageID\tName\n");
}

#[tokio::test]
async fn test_cancelled_run_writes_no_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, cancel) = cancel_pair();
    let (bhl, vision, finder) = two_page_fixture();
    let submitted = vision.submitted.clone();

    let app = App::with_services(
        test_config(&dir),
        Box::new(bhl),
        Box::new(vision),
        Box::new(finder),
        cancel,
    );
    handle.cancel();

    let err = app.run(ITEM_ID).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(submitted.lock().unwrap().is_empty());
    assert!(!app.layout().original_summary(ITEM_ID).exists());
}

#[tokio::test]
async fn test_crashed_name_finder_is_rerun_on_resume() {
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(Mutex::new(Vec::new()));
    let finder = |crash_first| FakeFinder {
        known: vec!["Aus bus".to_string()],
        crash_first,
        calls: calls.clone(),
        ..Default::default()
    };
    let (bhl, vision, _) = two_page_fixture();

    let first = app(test_config(&dir), bhl, vision, finder(true));
    let report = first.run(ITEM_ID).await.unwrap();
    assert_eq!(report.new_names, 0);
    assert_eq!(read(first.layout().new_names(101)), "");

    let (bhl, vision, _) = two_page_fixture();
    let second = app(test_config(&dir), bhl, vision, finder(true));
    let report = second.run(ITEM_ID).await.unwrap();

    assert_eq!(calls.lock().unwrap().len(), 2);
    assert_eq!(report.new_names, 1);
    assert_eq!(
        read(second.layout().new_summary(ITEM_ID)),
        "PageID\tName\n101\tAus bus\n"
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_throttle_keeps_recognized_text() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, cancel) = cancel_pair();
    let (bhl, vision, finder) = two_page_fixture();
    let finder_calls = finder.calls.clone();

    let mut config = test_config(&dir);
    config.throttle_ms = 500;
    let app = App::with_services(
        config,
        Box::new(bhl),
        Box::new(vision),
        Box::new(finder),
        cancel,
    );

    let (result, _) = tokio::join!(app.run(ITEM_ID), async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.cancel();
    });

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(read(app.layout().new_text(101)), "Aus bus found here\n");
    assert!(finder_calls.lock().unwrap().is_empty());
    assert!(!app.layout().new_summary(ITEM_ID).exists());
}

#[tokio::test(start_paused = true)]
async fn test_throttle_runs_between_recognition_and_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let bhl = FakeBhl::with_pages(&[101]).names(101, &["Aus bus"]);
    let (_, vision, finder) = two_page_fixture();
    let called_at = finder.called_at.clone();

    let mut config = test_config(&dir);
    config.throttle_ms = 10_000;
    let app = app(config, bhl, vision, finder);

    let started = Instant::now();
    app.run(ITEM_ID).await.unwrap();

    let called_at = called_at.lock().unwrap().clone();
    assert_eq!(called_at.len(), 1);
    assert_eq!(called_at[0] - started, Duration::from_millis(10_000));
}

#[tokio::test(start_paused = true)]
async fn test_resumed_recognition_is_not_throttled() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    layout.ensure_dirs().await.unwrap();
    std::fs::write(layout.original_text(101), "cached text").unwrap();
    std::fs::write(layout.original_names(101), page_xml(101, &["Aus bus"])).unwrap();
    std::fs::write(layout.new_text(101), "Aus bus found here\n").unwrap();

    let bhl = FakeBhl::with_pages(&[101]);
    let (_, vision, finder) = two_page_fixture();
    let submitted = vision.submitted.clone();
    let called_at = finder.called_at.clone();

    let mut config = test_config(&dir);
    config.throttle_ms = 10_000;
    let app = app(config, bhl, vision, finder);

    let started = Instant::now();
    app.run(ITEM_ID).await.unwrap();

    assert!(submitted.lock().unwrap().is_empty());
    let called_at = called_at.lock().unwrap().clone();
    assert_eq!(called_at.len(), 1);
    assert_eq!(called_at[0] - started, Duration::ZERO);
}
