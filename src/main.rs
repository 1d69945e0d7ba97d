use anyhow::Result;
use bhl_handwriting_analyzer::cli::Cli;
use bhl_handwriting_analyzer::utils::logging;
use bhl_handwriting_analyzer::{cancel_pair, App, Config};
use clap::Parser;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    // Ctrl-C 触发取消
    let (handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("⏹ 收到中断信号，正在停止...");
            handle.cancel();
        }
    });

    // 初始化并运行应用
    let result = match App::initialize(config, cancel) {
        Ok(app) => app.run(cli.item_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => {
            println!("Analysis of item {} is complete.", cli.item_id);
            Ok(())
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    }
}
