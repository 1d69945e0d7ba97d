//! 参考数据获取服务 - 业务能力层
//!
//! 只负责"取回一页的参考文本和参考学名"能力，不关心流程。
//! 网络或写盘错误不在本层处理，直接返回给编排层。

use crate::clients::MetadataSource;
use crate::error::AppResult;
use crate::infrastructure::{artifact_exists, write_artifact, OutputLayout};
use crate::models::PageId;
use tracing::debug;

/// 单页参考数据的获取结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 从 BHL 下载并写入
    Downloaded,
    /// 产物已存在，跳过
    AlreadyPresent,
}

/// 参考数据获取服务
pub struct ReferenceFetcher<'a> {
    source: &'a dyn MetadataSource,
    layout: &'a OutputLayout,
    resume: bool,
}

impl<'a> ReferenceFetcher<'a> {
    pub fn new(source: &'a dyn MetadataSource, layout: &'a OutputLayout, resume: bool) -> Self {
        Self {
            source,
            layout,
            resume,
        }
    }

    /// 获取并写入 `original/<page>.txt` 与 `original/<page>_names.xml`
    pub async fn fetch(&self, page_id: PageId) -> AppResult<FetchOutcome> {
        let text_path = self.layout.original_text(page_id);
        let names_path = self.layout.original_names(page_id);

        if self.resume && artifact_exists(&text_path).await && artifact_exists(&names_path).await
        {
            debug!("页 {} 参考数据已存在，跳过下载", page_id);
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let page_text = self.source.page_text(page_id).await?;
        write_artifact(&text_path, page_text.as_bytes()).await?;

        let page_metadata = self.source.page_metadata(page_id).await?;
        write_artifact(&names_path, page_metadata.as_bytes()).await?;

        Ok(FetchOutcome::Downloaded)
    }
}
