/// BHL API 客户端
///
/// 封装所有与 BHL (Biodiversity Heritage Library) API v3 相关的调用逻辑
use crate::config::{fill_page_id, Config};
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{ItemId, PageId};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// 元数据服务能力
///
/// 返回原始响应文本，解析交给调用方
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// 条目元数据（含页面列表，XML）
    async fn item_metadata(&self, item_id: ItemId) -> AppResult<String>;

    /// 页面元数据（含学名，XML）
    async fn page_metadata(&self, page_id: PageId) -> AppResult<String>;

    /// 页面参考文本
    async fn page_text(&self, page_id: PageId) -> AppResult<String>;
}

/// BHL API 客户端
pub struct BhlClient {
    http: Client,
    api_base_url: String,
    api_key: String,
    page_text_url: String,
}

impl BhlClient {
    /// 创建新的 BHL 客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::api_request_failed("BHL client", e))?;

        Ok(Self {
            http,
            api_base_url: config.bhl_api_base_url.clone(),
            api_key: config.bhl_api_key.clone(),
            page_text_url: config.bhl_page_text_url.clone(),
        })
    }

    fn item_metadata_query(&self, item_id: ItemId) -> Vec<(&'static str, String)> {
        vec![
            ("op", "GetItemMetadata".to_string()),
            ("id", item_id.to_string()),
            ("pages", "t".to_string()),
            ("ocr", "f".to_string()),
            ("parts", "f".to_string()),
            ("format", "xml".to_string()),
            ("apikey", self.api_key.clone()),
        ]
    }

    fn page_metadata_query(&self, page_id: PageId) -> Vec<(&'static str, String)> {
        vec![
            ("op", "GetPageMetadata".to_string()),
            ("pageid", page_id.to_string()),
            ("ocr", "f".to_string()),
            ("names", "t".to_string()),
            ("format", "xml".to_string()),
            ("apikey", self.api_key.clone()),
        ]
    }

    /// 发送 GET 请求并返回 UTF-8 文本
    ///
    /// `endpoint` 只用于错误信息，避免把 apikey 写进日志
    async fn get_text(
        &self,
        endpoint: &str,
        url: &str,
        query: &[(&'static str, String)],
    ) -> AppResult<String> {
        debug!("请求 {} ", endpoint);

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        // reqwest 按 Content-Type 中的 charset 解码，统一得到 UTF-8 字符串
        response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(endpoint, e.without_url()))
    }
}

#[async_trait]
impl MetadataSource for BhlClient {
    async fn item_metadata(&self, item_id: ItemId) -> AppResult<String> {
        let query = self.item_metadata_query(item_id);
        self.get_text("GetItemMetadata", &self.api_base_url, &query)
            .await
    }

    async fn page_metadata(&self, page_id: PageId) -> AppResult<String> {
        let query = self.page_metadata_query(page_id);
        self.get_text("GetPageMetadata", &self.api_base_url, &query)
            .await
    }

    async fn page_text(&self, page_id: PageId) -> AppResult<String> {
        let url = fill_page_id(&self.page_text_url, page_id);
        self.get_text("PageText", &url, &[]).await
    }
}
