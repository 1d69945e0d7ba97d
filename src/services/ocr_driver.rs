//! 识别任务驱动 - 业务能力层
//!
//! 提交页面图片、轮询任务直到终态或重试次数耗尽。
//! 本层的所有错误都会被转换成 `Failed` 状态，永远不会向上抛出。

use crate::clients::{RecognitionMode, RecognitionService};
use crate::config::PollPolicy;
use crate::error::AppResult;
use crate::infrastructure::CancelToken;
use crate::models::OcrJob;
use tracing::{debug, warn};

/// 识别任务驱动
pub struct OcrDriver<'a> {
    service: &'a dyn RecognitionService,
    policy: PollPolicy,
    cancel: CancelToken,
}

impl<'a> OcrDriver<'a> {
    pub fn new(service: &'a dyn RecognitionService, policy: PollPolicy, cancel: CancelToken) -> Self {
        Self {
            service,
            policy,
            cancel,
        }
    }

    /// 对一张手写页面做识别
    ///
    /// 返回的任务只有在 `Succeeded` 时才带有文本
    pub async fn recognize(&self, image_url: &str) -> OcrJob {
        let operation_id = match self
            .cancel
            .run(self.service.submit(image_url, RecognitionMode::Handwritten))
            .await
            .and_then(|r| r)
        {
            Ok(id) => id,
            Err(e) => {
                warn!("提交识别任务失败: {}", e);
                return OcrJob::failed(String::new());
            }
        };

        let mut job = OcrJob::submitted(operation_id);
        debug!("识别任务已提交: {}", job.operation_id);

        let polled = match self.policy {
            PollPolicy::Bounded {
                max_attempts,
                interval,
            } => self.poll_bounded(&mut job, max_attempts, interval).await,
            PollPolicy::UntilTerminal { interval, timeout } => {
                let outcome =
                    tokio::time::timeout(timeout, self.poll_until_terminal(&mut job, interval))
                        .await;
                match outcome {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            "识别任务 {} 在 {:?} 内未结束，按失败处理",
                            job.operation_id, timeout
                        );
                        job.mark_failed();
                        Ok(())
                    }
                }
            }
        };

        if let Err(e) = polled {
            warn!("轮询识别任务 {} 失败: {}", job.operation_id, e);
            job.mark_failed();
        } else if !job.is_terminal() {
            warn!(
                "识别任务 {} 已轮询 {} 次仍未结束 (状态: {:?})",
                job.operation_id, job.polls, job.status
            );
        }

        job
    }

    async fn poll_once(&self, job: &mut OcrJob) -> AppResult<()> {
        let poll = self
            .cancel
            .run(self.service.poll(&job.operation_id))
            .await??;
        job.apply(poll);
        debug!("识别任务 {} 状态: {:?}", job.operation_id, job.status);
        Ok(())
    }

    /// 首次查询后最多再重试 `max_attempts` 次
    async fn poll_bounded(
        &self,
        job: &mut OcrJob,
        max_attempts: u32,
        interval: std::time::Duration,
    ) -> AppResult<()> {
        self.poll_once(job).await?;

        for attempt in 1..=max_attempts {
            if job.is_terminal() {
                break;
            }
            debug!(
                "识别任务 {} 未完成，等待后重试 ({}/{})",
                job.operation_id, attempt, max_attempts
            );
            self.cancel.sleep(interval).await?;
            self.poll_once(job).await?;
        }

        Ok(())
    }

    /// 轮询直到终态，由调用方负责超时
    async fn poll_until_terminal(
        &self,
        job: &mut OcrJob,
        interval: std::time::Duration,
    ) -> AppResult<()> {
        self.poll_once(job).await?;
        while !job.is_terminal() {
            self.cancel.sleep(interval).await?;
            self.poll_once(job).await?;
            if interval.is_zero() {
                tokio::task::yield_now().await;
            }
        }
        Ok(())
    }
}
