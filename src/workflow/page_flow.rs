//! 页面处理流程 - 流程层
//!
//! 核心职责：定义"一页"的完整处理流程
//!
//! 状态顺序（严格线性，不回退）：
//!
//! ```text
//! Start → ReferenceFetched → Recognized | RecognitionFailed
//!       → NamesExtracted | NamesSkipped → Done
//! ```
//!
//! 每一步之间只通过磁盘产物传递数据。

use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::{artifact_exists, write_artifact, CancelToken, OutputLayout};
use crate::services::{ExtractionOutcome, FetchOutcome, NameExtractor, OcrDriver, ReferenceFetcher};
use crate::workflow::page_ctx::PageCtx;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 页面状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Start,
    ReferenceFetched,
    Recognized,
    RecognitionFailed,
    NamesExtracted,
    NamesSkipped,
    Done,
}

/// 可能失败的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStage {
    ReferenceFetch,
    Recognition,
    NameExtraction,
}

impl PageStage {
    pub fn as_str(self) -> &'static str {
        match self {
            PageStage::ReferenceFetch => "reference_fetch",
            PageStage::Recognition => "recognition",
            PageStage::NameExtraction => "name_extraction",
        }
    }
}

impl std::fmt::Display for PageStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 阶段失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: PageStage,
    pub reason: String,
}

/// 单页处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    /// 经过的状态（按顺序）
    pub path: Vec<PageState>,
    /// 未恢复的失败；为 None 时 path 以 Done 结尾
    pub failure: Option<StageFailure>,
    /// 是否因取消而中止
    pub cancelled: bool,
}

impl PageOutcome {
    fn new() -> Self {
        Self {
            path: vec![PageState::Start],
            failure: None,
            cancelled: false,
        }
    }

    fn advance(&mut self, state: PageState) {
        self.path.push(state);
    }

    fn fail(mut self, stage: PageStage, err: AppError) -> Self {
        self.cancelled = err.is_cancelled();
        self.failure = Some(StageFailure {
            stage,
            reason: err.to_string(),
        });
        self
    }

    pub fn state(&self) -> PageState {
        *self.path.last().unwrap_or(&PageState::Start)
    }

    pub fn is_done(&self) -> bool {
        self.state() == PageState::Done
    }

    pub fn recognized(&self) -> bool {
        self.path.contains(&PageState::Recognized)
    }

    pub fn names_extracted(&self) -> bool {
        self.path.contains(&PageState::NamesExtracted)
    }
}

/// 页面处理流程
///
/// - 编排单页的参考数据 → 识别 → 学名提取
/// - 不持有任何资源，只借用业务能力（services）
/// - 不处理多页，也不做汇总
pub struct PageFlow<'a> {
    fetcher: ReferenceFetcher<'a>,
    ocr: OcrDriver<'a>,
    extractor: NameExtractor<'a>,
    layout: &'a OutputLayout,
    config: &'a Config,
    throttle: Duration,
    cancel: CancelToken,
}

impl<'a> PageFlow<'a> {
    pub fn new(
        fetcher: ReferenceFetcher<'a>,
        ocr: OcrDriver<'a>,
        extractor: NameExtractor<'a>,
        layout: &'a OutputLayout,
        config: &'a Config,
        cancel: CancelToken,
    ) -> Self {
        Self {
            fetcher,
            ocr,
            extractor,
            layout,
            config,
            throttle: config.throttle(),
            cancel,
        }
    }

    pub async fn run(&self, ctx: &PageCtx) -> PageOutcome {
        let mut outcome = PageOutcome::new();

        // ========== 步骤 1: 参考数据 ==========
        match self.fetcher.fetch(ctx.page_id).await {
            Ok(FetchOutcome::Downloaded) => info!("{} ✓ 参考文本与学名已下载", ctx),
            Ok(FetchOutcome::AlreadyPresent) => info!("{} ↷ 参考数据已存在", ctx),
            Err(e) => {
                warn!("{} ❌ 参考数据获取失败: {}", ctx, e);
                return outcome.fail(PageStage::ReferenceFetch, e);
            }
        }
        outcome.advance(PageState::ReferenceFetched);

        if self.cancel.is_cancelled() {
            return outcome.fail(PageStage::Recognition, AppError::Cancelled);
        }

        // ========== 步骤 2: 手写识别 ==========
        match self.recognize(ctx).await {
            Ok(true) => outcome.advance(PageState::Recognized),
            Ok(false) => outcome.advance(PageState::RecognitionFailed),
            Err(e) => {
                warn!("{} ❌ 识别结果无法保存: {}", ctx, e);
                return outcome.fail(PageStage::Recognition, e);
            }
        }

        if self.cancel.is_cancelled() {
            return outcome.fail(PageStage::NameExtraction, AppError::Cancelled);
        }

        // ========== 步骤 3: 学名提取 ==========
        match self.extractor.extract(ctx.page_id).await {
            Ok(ExtractionOutcome::Extracted) => {
                info!("{} ✓ 学名提取完成", ctx);
                outcome.advance(PageState::NamesExtracted);
            }
            Ok(ExtractionOutcome::AlreadyPresent) => {
                info!("{} ↷ 学名结果已存在", ctx);
                outcome.advance(PageState::NamesExtracted);
            }
            Ok(ExtractionOutcome::Skipped) => {
                info!("{} 没有识别文本，跳过学名提取", ctx);
                outcome.advance(PageState::NamesSkipped);
            }
            Err(e) => {
                warn!("{} ❌ 学名提取失败: {}", ctx, e);
                return outcome.fail(PageStage::NameExtraction, e);
            }
        }

        outcome.advance(PageState::Done);
        outcome
    }

    /// 识别一页；返回是否得到了识别文本
    ///
    /// 识别失败不是错误，只有写盘失败和取消才返回 Err
    async fn recognize(&self, ctx: &PageCtx) -> Result<bool, AppError> {
        let text_path = self.layout.new_text(ctx.page_id);
        if self.config.resume && artifact_exists(&text_path).await {
            info!("{} ↷ 识别文本已存在", ctx);
            return Ok(true);
        }

        info!("{} 🔍 正在识别手写文本...", ctx);
        let image_url = self.config.page_image_url(ctx.page_id);
        let job = self.ocr.recognize(&image_url).await;

        // 识别文本先落盘，节流期间被取消也不会丢失
        let recognized = match job.recognized_text() {
            Some(text) => {
                write_artifact(&text_path, text.as_bytes()).await?;
                info!("{} ✓ 识别成功 (轮询 {} 次)", ctx, job.polls);
                true
            }
            None => {
                warn!(
                    "{} ⚠️ 识别未成功 (状态: {:?})，本页不生成识别文本",
                    ctx, job.status
                );
                false
            }
        };

        // 只要发出过识别请求就固定等待 throttle，与识别耗时无关
        debug!("{} 节流等待 {:?}", ctx, self.throttle);
        self.cancel.sleep(self.throttle).await?;

        Ok(recognized)
    }
}
