/// 识别服务客户端
///
/// 封装 Computer Vision v2.0 Recognize Text 接口：提交图片 URL，得到异步任务，按任务 ID 查询结果
use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::models::{OcrPoll, OcrStatus};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION_HEADER: &str = "Operation-Location";

/// 识别模式（本工具只识别手写页面）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionMode {
    Handwritten,
}

impl RecognitionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RecognitionMode::Handwritten => "Handwritten",
        }
    }
}

/// 异步文字识别能力
#[async_trait]
pub trait RecognitionService: Send + Sync {
    /// 提交图片，返回任务 ID
    async fn submit(&self, image_url: &str, mode: RecognitionMode) -> AppResult<String>;

    /// 查询任务状态
    async fn poll(&self, operation_id: &str) -> AppResult<OcrPoll>;
}

/// Computer Vision 客户端
pub struct VisionClient {
    http: Client,
    endpoint: String,
    subscription_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextOperationResult {
    status: OcrStatus,
    #[serde(default)]
    recognition_result: Option<RecognitionResult>,
}

#[derive(Debug, Default, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    lines: Option<Vec<Line>>,
}

#[derive(Debug, Deserialize)]
struct Line {
    #[serde(default)]
    text: String,
}

impl VisionClient {
    /// 创建新的识别服务客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AppError::api_request_failed("recognizeText", e))?;

        Ok(Self {
            http,
            endpoint: config.vision_endpoint.trim_end_matches('/').to_string(),
            subscription_key: config.vision_subscription_key.clone(),
        })
    }

    fn recognize_url(&self) -> String {
        format!("{}/vision/v2.0/recognizeText", self.endpoint)
    }

    fn operation_url(&self, operation_id: &str) -> String {
        format!("{}/vision/v2.0/textOperations/{}", self.endpoint, operation_id)
    }
}

/// 从 Operation-Location 中取出任务 ID（最后一个路径段）
pub fn operation_id_from_location(location: &str) -> Option<&str> {
    let trimmed = location.trim().trim_end_matches('/');
    let id = trimmed.rsplit('/').next()?;
    let id = id.split('?').next().unwrap_or(id);
    (!id.is_empty()).then_some(id)
}

fn parse_operation_result(body: &str) -> AppResult<OcrPoll> {
    let result: TextOperationResult = serde_json::from_str(body)
        .map_err(|e| AppError::api_parse_failed("textOperations", e))?;

    let lines = result
        .recognition_result
        .and_then(|r| r.lines)
        .unwrap_or_default()
        .into_iter()
        .map(|line| line.text)
        .collect();

    Ok(OcrPoll {
        status: result.status,
        lines,
    })
}

#[async_trait]
impl RecognitionService for VisionClient {
    async fn submit(&self, image_url: &str, mode: RecognitionMode) -> AppResult<String> {
        debug!("提交识别任务: {} (mode={})", image_url, mode.as_str());

        let response = self
            .http
            .post(self.recognize_url())
            .query(&[("mode", mode.as_str())])
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .json(&json!({ "url": image_url }))
            .send()
            .await
            .map_err(|e| AppError::api_request_failed("recognizeText", e))?;

        let status = response.status();
        if status != StatusCode::ACCEPTED && !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: "recognizeText".to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let location = response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::MissingHeader {
                endpoint: "recognizeText".to_string(),
                header: OPERATION_LOCATION_HEADER.to_string(),
            })?;

        let operation_id = operation_id_from_location(location).ok_or_else(|| {
            AppError::api_parse_failed("recognizeText", format!("无效的 {}: {}", OPERATION_LOCATION_HEADER, location))
        })?;

        Ok(operation_id.to_string())
    }

    async fn poll(&self, operation_id: &str) -> AppResult<OcrPoll> {
        let response = self
            .http
            .get(self.operation_url(operation_id))
            .header(SUBSCRIPTION_KEY_HEADER, &self.subscription_key)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed("textOperations", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::BadStatus {
                endpoint: "textOperations".to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed("textOperations", e))?;

        parse_operation_result(&body)
    }
}
