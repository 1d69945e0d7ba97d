//! 学名提取服务 - 业务能力层
//!
//! 只负责"对一页识别文本运行 gnfinder 并保存输出"能力。
//! 输出内容不在本层校验，交给汇总阶段处理。

use crate::config::{Config, INPUT_PLACEHOLDER};
use crate::error::{AppResult, ToolError};
use crate::infrastructure::{
    artifact_exists, read_artifact, write_artifact, CancelToken, OutputLayout,
};
use crate::models::{parse_finder_output, PageId};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// 外部工具的一次运行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinderOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

/// 学名查找能力
#[async_trait]
pub trait NameFinder: Send + Sync {
    /// 对本地文本文件运行查找，返回工具的标准输出
    async fn find_names(&self, input: &Path) -> AppResult<FinderOutput>;
}

/// gnfinder 命令行
pub struct GnfinderCli {
    program: String,
    args: Vec<String>,
}

impl GnfinderCli {
    pub fn new(config: &Config) -> Self {
        Self {
            program: config.gnfinder_path.clone(),
            args: config.gnfinder_args.clone(),
        }
    }

    fn args_for(&self, input: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(INPUT_PLACEHOLDER, &input))
            .collect()
    }
}

#[async_trait]
impl NameFinder for GnfinderCli {
    async fn find_names(&self, input: &Path) -> AppResult<FinderOutput> {
        let args = self.args_for(input);
        debug!("运行 {} {:?}", self.program, args);

        // 被取消时 future 会被丢弃，kill_on_drop 保证子进程随之结束
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::SpawnFailed {
                program: self.program.clone(),
                source,
            })?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| ToolError::WaitFailed {
                program: self.program.clone(),
                source,
            })?;

        Ok(FinderOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            success: output.status.success(),
        })
    }
}

/// 单页学名提取结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// 已运行工具并保存输出
    Extracted,
    /// 输出已存在，跳过
    AlreadyPresent,
    /// 识别文本不存在，未运行工具
    Skipped,
}

/// 学名提取服务
pub struct NameExtractor<'a> {
    finder: &'a dyn NameFinder,
    layout: &'a OutputLayout,
    cancel: CancelToken,
    resume: bool,
}

impl<'a> NameExtractor<'a> {
    pub fn new(
        finder: &'a dyn NameFinder,
        layout: &'a OutputLayout,
        cancel: CancelToken,
        resume: bool,
    ) -> Self {
        Self {
            finder,
            layout,
            cancel,
            resume,
        }
    }

    /// 对 `new/<page>.txt` 运行查找，输出原样写入 `new/<page>_names.json`
    pub async fn extract(&self, page_id: PageId) -> AppResult<ExtractionOutcome> {
        let input = self.layout.new_text(page_id);
        if !artifact_exists(&input).await {
            debug!("页 {} 没有识别文本，跳过学名提取", page_id);
            return Ok(ExtractionOutcome::Skipped);
        }

        let output_path = self.layout.new_names(page_id);
        if self.resume && self.has_finished_output(&output_path).await {
            debug!("页 {} 学名结果已存在，跳过", page_id);
            return Ok(ExtractionOutcome::AlreadyPresent);
        }

        let output = self.cancel.run(self.finder.find_names(&input)).await??;
        if !output.success {
            warn!(
                "页 {} gnfinder 非正常退出: {}",
                page_id,
                crate::utils::logging::truncate_text(output.stderr.trim(), 200)
            );
        }

        write_artifact(&output_path, output.stdout.as_bytes()).await?;
        Ok(ExtractionOutcome::Extracted)
    }

    /// 已有输出能被解析才算完成；空文件或残缺输出需要重跑
    async fn has_finished_output(&self, path: &Path) -> bool {
        match read_artifact(path).await {
            Ok(Some(content)) => parse_finder_output(&content).is_ok(),
            _ => false,
        }
    }
}
