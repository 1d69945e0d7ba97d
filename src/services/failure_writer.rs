//! 失败页记录服务 - 业务能力层
//!
//! 只负责"写 FailedPages<item>.tsv"能力，不关心流程

use crate::error::AppResult;
use crate::infrastructure::write_lines;
use crate::models::PageId;
use crate::workflow::StageFailure;
use std::path::PathBuf;
use tracing::debug;

/// 失败页记录服务
pub struct FailureWriter {
    report_path: PathBuf,
}

impl FailureWriter {
    pub fn new(report_path: impl Into<PathBuf>) -> Self {
        Self {
            report_path: report_path.into(),
        }
    }

    /// 写入失败页列表（覆盖），没有失败时只写表头
    pub async fn write(&self, failures: &[(PageId, StageFailure)]) -> AppResult<()> {
        debug!(
            "写入失败页记录: {} 条 → {}",
            failures.len(),
            self.report_path.display()
        );

        let mut lines = vec!["PageID\tStage\tReason".to_string()];
        lines.extend(failures.iter().map(|(page_id, failure)| {
            format!(
                "{}\t{}\t{}",
                page_id,
                failure.stage,
                failure.reason.replace(['\t', '\r', '\n'], " ")
            )
        }));

        write_lines(&self.report_path, &lines).await
    }
}
