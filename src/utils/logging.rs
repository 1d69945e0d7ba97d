/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use crate::config::{Config, PollPolicy};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// 初始化全局日志
///
/// `RUST_LOG` 优先；未设置时按 `verbose` 选择 debug 或 info。
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "bhl_handwriting_analyzer=debug,info"
    } else {
        "info"
    };

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 当前配置
/// - `item_id`: 待处理的条目 ID
pub fn log_startup(config: &Config, item_id: u64) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 条目 {}", item_id);
    match config.poll_policy() {
        PollPolicy::Bounded {
            max_attempts,
            interval,
        } => info!(
            "🔁 轮询方式: bounded (最多重试 {} 次, 间隔 {:?})",
            max_attempts, interval
        ),
        PollPolicy::UntilTerminal { interval, timeout } => info!(
            "🔁 轮询方式: until_terminal (间隔 {:?}, 超时 {:?})",
            interval, timeout
        ),
    }
    info!("⏱ 识别节流: {:?}", config.throttle());
    info!(
        "🧯 失败策略: {:?}, 断点续跑: {}",
        config.failure_policy, config.resume
    );
    info!("📂 输出目录: {}", config.output_folder);
    info!("{}", "=".repeat(60));
}

/// 记录页面列表加载信息
pub fn log_pages_loaded(item_id: u64, total: usize) {
    info!("✓ 条目 {} 共有 {} 个待处理的页面", item_id, total);
    info!("💡 逐页处理，一页完成后再开始下一页\n");
}

/// 打印最终统计信息
///
/// # 参数
/// - `item_id`: 条目 ID
/// - `done`: 完整走完流程的页数
/// - `failed`: 失败页数
/// - `total`: 页面总数
/// - `summary_paths`: 已写入的汇总文件
pub fn print_final_stats(
    item_id: u64,
    done: usize,
    failed: usize,
    total: usize,
    summary_paths: &[String],
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 条目 {} 处理完成统计", item_id);
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 完成: {}/{}", done, total);
    info!("❌ 失败: {}", failed);
    info!("{}", "=".repeat(60));
    for path in summary_paths {
        info!("汇总已保存至: {}", path);
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
