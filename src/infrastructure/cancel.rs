//! 取消令牌
//!
//! 由 Ctrl-C 触发；所有等待点（轮询间隔、节流、子进程）都可被取消

use crate::error::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;

/// 触发取消的一端
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// 监听取消的一端，可以随意 clone
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

/// 创建一对取消句柄
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    /// 永远不会被取消的令牌
    pub fn never() -> Self {
        let (_handle, token) = cancel_pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待取消信号；发送端已释放且未取消时永远挂起
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// 在取消前完成 future，否则返回 `AppError::Cancelled`
    pub async fn run<F: Future>(&self, fut: F) -> AppResult<F::Output> {
        if self.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        tokio::select! {
            output = fut => Ok(output),
            _ = self.cancelled() => Err(AppError::Cancelled),
        }
    }

    /// 可取消的 sleep
    pub async fn sleep(&self, duration: Duration) -> AppResult<()> {
        if duration.is_zero() {
            return if self.is_cancelled() {
                Err(AppError::Cancelled)
            } else {
                Ok(())
            };
        }
        self.run(tokio::time::sleep(duration)).await
    }
}
