//! 识别任务状态

use serde::Deserialize;

/// 识别任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum OcrStatus {
    #[serde(alias = "notStarted", alias = "notstarted")]
    NotStarted,
    #[serde(alias = "running")]
    Running,
    #[serde(alias = "succeeded")]
    Succeeded,
    #[serde(alias = "failed")]
    Failed,
}

impl OcrStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, OcrStatus::Succeeded | OcrStatus::Failed)
    }
}

/// 单次轮询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrPoll {
    pub status: OcrStatus,
    /// 按文档顺序排列的文本行，仅在成功时有意义
    pub lines: Vec<String>,
}

/// 一个进行中或已结束的识别任务
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrJob {
    pub operation_id: String,
    pub status: OcrStatus,
    /// 轮询次数（含首次查询）
    pub polls: u32,
    result: Option<Vec<String>>,
}

impl OcrJob {
    pub fn submitted(operation_id: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            status: OcrStatus::NotStarted,
            polls: 0,
            result: None,
        }
    }

    /// 提交或轮询过程中出错时的任务
    pub fn failed(operation_id: impl Into<String>) -> Self {
        Self {
            status: OcrStatus::Failed,
            ..Self::submitted(operation_id)
        }
    }

    /// 记录一次轮询结果，只有成功状态才保留文本
    pub fn apply(&mut self, poll: OcrPoll) {
        self.polls += 1;
        self.status = poll.status;
        self.result = (poll.status == OcrStatus::Succeeded).then_some(poll.lines);
    }

    pub fn mark_failed(&mut self) {
        self.status = OcrStatus::Failed;
        self.result = None;
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// 识别文本：每行一个换行符结尾；非成功状态返回 None
    pub fn recognized_text(&self) -> Option<String> {
        if self.status != OcrStatus::Succeeded {
            return None;
        }
        let lines = self.result.as_deref().unwrap_or_default();
        Some(lines.iter().map(|line| format!("{}\n", line)).collect())
    }
}
