//! BHL API v3 XML 响应解析
//!
//! 只解析需要的字段：条目的页面 ID 列表、页面的 NameFound 列表

use super::item::PageId;
use quick_xml::DeError;
use serde::Deserialize;

/// 响应解析错误
#[derive(Debug, thiserror::Error)]
pub enum BhlResponseError {
    #[error("XML解析失败: {0}")]
    Xml(#[from] DeError),
    #[error("API返回状态 {status}: {message:?}")]
    Status {
        status: String,
        message: Option<String>,
    },
    #[error("响应中缺少 Result 节点")]
    MissingResult,
}

#[derive(Debug, Deserialize)]
struct Response<T> {
    #[serde(rename = "Status", default)]
    status: Option<String>,
    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<String>,
    #[serde(rename = "Result")]
    result: Option<T>,
}

impl<T> Response<T> {
    fn into_result(self) -> Result<T, BhlResponseError> {
        if let Some(status) = self.status.as_deref().map(str::trim) {
            if !status.is_empty() && !status.eq_ignore_ascii_case("ok") {
                return Err(BhlResponseError::Status {
                    status: status.to_string(),
                    message: self.error_message.filter(|m| !m.trim().is_empty()),
                });
            }
        }
        self.result.ok_or(BhlResponseError::MissingResult)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ItemResult {
    #[serde(rename = "Item", default)]
    items: Vec<ItemNode>,
}

#[derive(Debug, Deserialize)]
struct ItemNode {
    #[serde(rename = "Pages", default)]
    pages: Option<PagesNode>,
}

#[derive(Debug, Default, Deserialize)]
struct PagesNode {
    #[serde(rename = "Page", default)]
    pages: Vec<PageRefNode>,
}

#[derive(Debug, Deserialize)]
struct PageRefNode {
    #[serde(rename = "PageID")]
    page_id: PageId,
}

#[derive(Debug, Default, Deserialize)]
struct PageResult {
    #[serde(rename = "Page", default)]
    page: Option<PageNode>,
}

#[derive(Debug, Deserialize)]
struct PageNode {
    #[serde(rename = "Names", default)]
    names: Option<NamesNode>,
}

#[derive(Debug, Default, Deserialize)]
struct NamesNode {
    #[serde(rename = "Name", default)]
    names: Vec<NameNode>,
}

#[derive(Debug, Deserialize)]
struct NameNode {
    #[serde(rename = "NameFound", default)]
    name_found: Option<String>,
}

/// 从 GetItemMetadata 响应中提取页面 ID（保持响应顺序）
pub fn parse_page_ids(xml: &str) -> Result<Vec<PageId>, BhlResponseError> {
    let response: Response<ItemResult> = quick_xml::de::from_str(xml)?;
    let result = response.into_result()?;
    Ok(result
        .items
        .into_iter()
        .flat_map(|item| item.pages.unwrap_or_default().pages)
        .map(|page| page.page_id)
        .collect())
}

/// 从 GetPageMetadata 响应中提取 NameFound（保持响应顺序）
pub fn parse_reference_names(xml: &str) -> Result<Vec<String>, BhlResponseError> {
    let response: Response<PageResult> = quick_xml::de::from_str(xml)?;
    let result = response.into_result()?;
    Ok(result
        .page
        .and_then(|page| page.names)
        .unwrap_or_default()
        .names
        .into_iter()
        .filter_map(|name| name.name_found)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}
