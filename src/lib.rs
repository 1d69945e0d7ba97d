//! # BHL Handwriting Analyzer
//!
//! 对 BHL（Biodiversity Heritage Library）条目的每一页做手写文字识别，
//! 再用 gnfinder 从识别文本中提取学名，与 BHL 自带的学名结果并列汇总。
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有输出目录和取消令牌，只暴露能力
//! - `OutputLayout` - 唯一知道文件放在哪里的地方
//! - `clients/` - BHL 元数据服务、手写识别服务的 HTTP 客户端
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个页面
//! - `ReferenceFetcher` - 下载参考文本和参考学名
//! - `OcrDriver` - 提交识别任务并轮询结果
//! - `NameExtractor` - 调用 gnfinder 提取学名
//! - `ResultAggregator` / `FailureWriter` - 写汇总表和失败页记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一页"的完整处理流程
//! - `PageCtx` - 上下文封装（item_id + page_id + 序号）
//! - `PageFlow` - 流程编排（参考数据 → 识别 → 节流 → 学名提取）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/item_processor` - 条目处理器，管理资源和失败策略
//! - `orchestrator/page_processor` - 单页处理器
//!
//! ## 模块结构

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, FailurePolicy, PollMode, PollPolicy};
pub use error::{AppError, AppResult};
pub use infrastructure::{cancel_pair, CancelHandle, CancelToken, OutputLayout};
pub use models::{Item, ItemId, NameRecord, OcrJob, OcrStatus, PageId};
pub use orchestrator::{App, RunReport};
pub use workflow::{PageCtx, PageFlow, PageOutcome, PageStage, PageState, StageFailure};
