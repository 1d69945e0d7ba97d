//! 条目处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责一个条目的完整处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：创建 BHL / 识别服务客户端和 gnfinder 调用器
//! 2. **条目查询**：从元数据服务取得有序的页面列表
//! 3. **逐页处理**：严格按顺序，一页完成后再开始下一页
//! 4. **失败策略**：`isolate` 记录后继续，`fail_fast` 立即终止
//! 5. **结果汇总**：所有页面结束后生成两份 TSV 汇总和失败页记录
//! 6. **全局统计**：输出本次运行的统计信息

use crate::clients::{BhlClient, MetadataSource, RecognitionService, VisionClient};
use crate::config::{Config, FailurePolicy};
use crate::error::{ApiError, AppError, AppResult};
use crate::infrastructure::{CancelToken, OutputLayout};
use crate::models::{parse_page_ids, BhlResponseError, Item, ItemId, PageId};
use crate::orchestrator::page_processor;
use crate::services::{
    FailureWriter, GnfinderCli, NameExtractor, NameFinder, OcrDriver, ReferenceFetcher,
    ResultAggregator,
};
use crate::utils::logging;
use crate::workflow::{PageCtx, PageFlow, StageFailure};
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    layout: OutputLayout,
    metadata: Box<dyn MetadataSource>,
    recognizer: Box<dyn RecognitionService>,
    finder: Box<dyn NameFinder>,
    cancel: CancelToken,
}

/// 一次运行的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub item_id: ItemId,
    pub pages_total: usize,
    pub pages_done: usize,
    pub pages_recognized: usize,
    pub pages_with_names_extracted: usize,
    pub failures: Vec<(PageId, StageFailure)>,
    pub original_names: usize,
    pub new_names: usize,
}

impl App {
    /// 使用真实的外部服务初始化应用
    pub fn initialize(config: Config, cancel: CancelToken) -> AppResult<Self> {
        let metadata = Box::new(BhlClient::new(&config)?);
        let recognizer = Box::new(VisionClient::new(&config)?);
        let finder = Box::new(GnfinderCli::new(&config));
        Ok(Self::with_services(config, metadata, recognizer, finder, cancel))
    }

    /// 使用指定的服务实现创建应用
    pub fn with_services(
        config: Config,
        metadata: Box<dyn MetadataSource>,
        recognizer: Box<dyn RecognitionService>,
        finder: Box<dyn NameFinder>,
        cancel: CancelToken,
    ) -> Self {
        let layout = OutputLayout::new(&config.output_folder);
        Self {
            config,
            layout,
            metadata,
            recognizer,
            finder,
            cancel,
        }
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// 运行应用主逻辑：处理一个条目直到结束
    pub async fn run(&self, item_id: ItemId) -> AppResult<RunReport> {
        logging::log_startup(&self.config, item_id);

        self.layout.ensure_dirs().await?;

        // 获取条目的页面列表，失败则没有可处理的内容
        let item = self.load_item(item_id).await?;
        if item.page_ids.is_empty() {
            warn!("⚠️ {} 没有任何页面", item);
        } else {
            logging::log_pages_loaded(item_id, item.page_count());
        }

        let mut report = RunReport {
            item_id,
            pages_total: item.page_count(),
            ..Default::default()
        };

        self.process_pages(&item, &mut report).await?;

        // 所有页面结束后才开始汇总
        FailureWriter::new(self.layout.failure_report(item_id))
            .write(&report.failures)
            .await?;

        let aggregator = ResultAggregator::new(&self.layout);
        report.original_names = aggregator
            .write_original_summary(item_id, &item.page_ids)
            .await?
            .rows;
        report.new_names = aggregator
            .write_new_summary(item_id, &item.page_ids)
            .await?
            .rows;

        logging::print_final_stats(
            item_id,
            report.pages_done,
            report.failures.len(),
            report.pages_total,
            &[
                self.layout.original_summary(item_id).display().to_string(),
                self.layout.new_summary(item_id).display().to_string(),
            ],
        );
        Ok(report)
    }

    /// 查询条目元数据并解析页面 ID
    async fn load_item(&self, item_id: ItemId) -> AppResult<Item> {
        info!("\n📁 正在获取条目 {} 的页面列表...", item_id);
        let xml = self.metadata.item_metadata(item_id).await?;
        let page_ids = parse_page_ids(&xml).map_err(|e| match e {
            BhlResponseError::Status { status, message } => AppError::Api(ApiError::BadResponse {
                endpoint: "GetItemMetadata".to_string(),
                status,
                message,
            }),
            other => AppError::api_parse_failed("GetItemMetadata", other),
        })?;
        Ok(Item::new(item_id, page_ids))
    }

    /// 逐页执行流程
    async fn process_pages(&self, item: &Item, report: &mut RunReport) -> AppResult<()> {
        let policy = self.config.poll_policy();
        let flow = PageFlow::new(
            ReferenceFetcher::new(self.metadata.as_ref(), &self.layout, self.config.resume),
            OcrDriver::new(self.recognizer.as_ref(), policy, self.cancel.clone()),
            NameExtractor::new(
                self.finder.as_ref(),
                &self.layout,
                self.cancel.clone(),
                self.config.resume,
            ),
            &self.layout,
            &self.config,
            self.cancel.clone(),
        );

        for (index, &page_id) in item.page_ids.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            let ctx = PageCtx::new(item.item_id, page_id, index + 1, item.page_count());
            let outcome = page_processor::process_page(&flow, &ctx).await;

            if outcome.cancelled {
                return Err(AppError::Cancelled);
            }
            if outcome.recognized() {
                report.pages_recognized += 1;
            }
            if outcome.names_extracted() {
                report.pages_with_names_extracted += 1;
            }

            match outcome.failure {
                None => report.pages_done += 1,
                Some(failure) => match self.config.failure_policy {
                    FailurePolicy::FailFast => {
                        error!("{} 失败策略为 fail_fast，终止剩余页面", ctx);
                        return Err(AppError::PageFailed {
                            page_id,
                            stage: failure.stage.to_string(),
                            reason: failure.reason,
                        });
                    }
                    FailurePolicy::Isolate => report.failures.push((page_id, failure)),
                },
            }
        }

        Ok(())
    }
}
