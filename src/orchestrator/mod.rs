//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责条目级别的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `item_processor` - 条目处理器
//! - 管理应用生命周期（初始化、运行）
//! - 获取条目的页面列表（Vec<PageId>）
//! - 逐页调度，执行失败策略
//! - 页面全部结束后汇总结果
//! - 输出全局统计信息
//!
//! ### `page_processor` - 单页处理器
//! - 调用 PageFlow 处理一页
//! - 输出单页的开始/结束日志
//!
//! ## 层次关系
//!
//! ```text
//! item_processor (处理 Vec<PageId>)
//!     ↓
//! page_processor (处理单个 PageId)
//!     ↓
//! workflow::PageFlow (参考数据 → 识别 → 学名提取)
//!     ↓
//! services (能力层：fetch / ocr / gnfinder / aggregate)
//!     ↓
//! clients + infrastructure (外部服务、输出目录、取消令牌)
//! ```

pub mod item_processor;
pub mod page_processor;

// 重新导出主要类型
pub use item_processor::{App, RunReport};
pub use page_processor::process_page;
