//! 单页处理器 - 编排层
//!
//! 包装一次 `PageFlow::run`，负责单页的开始/结束日志。
//! 失败策略由上层 `item_processor` 决定。

use crate::workflow::{PageCtx, PageFlow, PageOutcome};
use tracing::{error, info};

/// 处理单个页面
pub async fn process_page(flow: &PageFlow<'_>, ctx: &PageCtx) -> PageOutcome {
    log_page_start(ctx);

    let outcome = flow.run(ctx).await;

    match &outcome.failure {
        None => log_page_complete(ctx, &outcome),
        Some(failure) if outcome.cancelled => {
            info!("{} ⏹ 已取消 (阶段: {})", ctx, failure.stage);
        }
        Some(failure) => {
            error!(
                "{} ❌ 处理失败 (阶段: {}): {}",
                ctx, failure.stage, failure.reason
            );
        }
    }

    outcome
}

// ========== 日志辅助函数 ==========

fn log_page_start(ctx: &PageCtx) {
    info!("\n{} {}", ctx, "─".repeat(30));
    info!("{} 开始处理", ctx);
}

fn log_page_complete(ctx: &PageCtx, outcome: &PageOutcome) {
    info!(
        "{} ✅ 处理完成: 识别 {}, 学名提取 {}",
        ctx,
        if outcome.recognized() { "成功" } else { "失败" },
        if outcome.names_extracted() { "完成" } else { "跳过" }
    );
}
