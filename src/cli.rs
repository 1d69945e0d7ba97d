//! 命令行参数

use clap::Parser;

/// 对 BHL 条目的每一页做手写识别，并与 BHL 的学名结果对比
#[derive(Debug, Parser)]
#[command(name = "bhl-handwriting-analyzer", version, about)]
pub struct Cli {
    /// BHL 条目 ID
    pub item_id: u64,
}
