use crate::error::{AppResult, ConfigError};
use serde::de::value::StrDeserializer;
use serde::de::IntoDeserializer;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// URL 模板中的页码占位符
pub const PAGE_ID_PLACEHOLDER: &str = "{page_id}";

/// gnfinder 参数中的输入文件占位符
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// 识别任务的轮询方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollMode {
    /// 有限次数重试
    Bounded,
    /// 轮询直到终态（受 poll_timeout 限制）
    UntilTerminal,
}

/// 单页失败后的处理策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// 记录失败并继续处理下一页
    Isolate,
    /// 第一页失败即终止整个运行
    FailFast,
}

/// 由配置推导出的轮询策略
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollPolicy {
    Bounded { max_attempts: u32, interval: Duration },
    UntilTerminal { interval: Duration, timeout: Duration },
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- BHL API 配置 ---
    pub bhl_api_key: String,
    pub bhl_api_base_url: String,
    /// 页面文本地址模板，`{page_id}` 为占位符
    pub bhl_page_text_url: String,
    /// 页面图片地址模板，`{page_id}` 为占位符
    pub bhl_page_image_url: String,
    // --- 识别服务配置 ---
    pub vision_endpoint: String,
    pub vision_subscription_key: String,
    // --- gnfinder 配置 ---
    pub gnfinder_path: String,
    /// `{input}` 会被替换为识别文本路径
    pub gnfinder_args: Vec<String>,
    /// 输出根目录
    pub output_folder: String,
    /// 每次识别请求之后的等待时间（毫秒）
    pub throttle_ms: u64,
    pub poll_mode: PollMode,
    /// bounded 模式下的最大重试次数
    pub max_retry_times: u32,
    /// 两次轮询之间的等待（毫秒）
    pub query_wait_ms: u64,
    /// until_terminal 模式下的总超时（毫秒）
    pub poll_timeout_ms: u64,
    /// 单个 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    pub failure_policy: FailurePolicy,
    /// 已存在的产物不再重新生成
    pub resume: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bhl_api_key: String::new(),
            bhl_api_base_url: "https://www.biodiversitylibrary.org/api3".to_string(),
            bhl_page_text_url: "https://www.biodiversitylibrary.org/pagetext/{page_id}".to_string(),
            bhl_page_image_url: "https://www.biodiversitylibrary.org/pageimage/{page_id}"
                .to_string(),
            vision_endpoint: String::new(),
            vision_subscription_key: String::new(),
            gnfinder_path: "gnfinder".to_string(),
            gnfinder_args: ["find", INPUT_PLACEHOLDER, "-c", "-l", "eng"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_folder: "output".to_string(),
            throttle_ms: 10_000,
            poll_mode: PollMode::Bounded,
            max_retry_times: 3,
            query_wait_ms: 3_000,
            poll_timeout_ms: 300_000,
            request_timeout_secs: 60,
            failure_policy: FailurePolicy::Isolate,
            resume: true,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载配置：配置文件（可选）→ 环境变量覆盖 → 校验
    pub fn load() -> AppResult<Self> {
        let path = config_file_path();
        let config = Self::from_file(&path)?.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 读取 TOML 配置文件，文件不存在时使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml_str(&content).map_err(|source| {
            ConfigError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            }
            .into()
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用环境变量覆盖当前配置
    pub fn with_env_overrides(self) -> AppResult<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(self, lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        Ok(Self {
            bhl_api_key: lookup("BHL_API_KEY").unwrap_or(self.bhl_api_key),
            bhl_api_base_url: lookup("BHL_API_BASE_URL").unwrap_or(self.bhl_api_base_url),
            bhl_page_text_url: lookup("BHL_PAGE_TEXT_URL").unwrap_or(self.bhl_page_text_url),
            bhl_page_image_url: lookup("BHL_PAGE_IMAGE_URL").unwrap_or(self.bhl_page_image_url),
            vision_endpoint: lookup("VISION_ENDPOINT").unwrap_or(self.vision_endpoint),
            vision_subscription_key: lookup("VISION_SUBSCRIPTION_KEY")
                .unwrap_or(self.vision_subscription_key),
            gnfinder_path: lookup("GNFINDER_PATH").unwrap_or(self.gnfinder_path),
            gnfinder_args: self.gnfinder_args,
            output_folder: lookup("OUTPUT_FOLDER").unwrap_or(self.output_folder),
            throttle_ms: parse_var(&lookup, "THROTTLE_MS", "u64")?.unwrap_or(self.throttle_ms),
            poll_mode: match lookup("POLL_MODE") {
                Some(v) => parse_enum(&v, "POLL_MODE")?,
                None => self.poll_mode,
            },
            max_retry_times: parse_var(&lookup, "MAX_RETRY_TIMES", "u32")?
                .unwrap_or(self.max_retry_times),
            query_wait_ms: parse_var(&lookup, "QUERY_WAIT_MS", "u64")?
                .unwrap_or(self.query_wait_ms),
            poll_timeout_ms: parse_var(&lookup, "POLL_TIMEOUT_MS", "u64")?
                .unwrap_or(self.poll_timeout_ms),
            request_timeout_secs: parse_var(&lookup, "REQUEST_TIMEOUT_SECS", "u64")?
                .unwrap_or(self.request_timeout_secs),
            failure_policy: match lookup("FAILURE_POLICY") {
                Some(v) => parse_enum(&v, "FAILURE_POLICY")?,
                None => self.failure_policy,
            },
            resume: parse_var(&lookup, "RESUME", "bool")?.unwrap_or(self.resume),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING", "bool")?
                .unwrap_or(self.verbose_logging),
        })
    }

    /// 校验必填项和 URL 模板
    pub fn validate(&self) -> AppResult<()> {
        let required = [
            ("bhl_api_key", &self.bhl_api_key),
            ("bhl_api_base_url", &self.bhl_api_base_url),
            ("vision_endpoint", &self.vision_endpoint),
            ("vision_subscription_key", &self.vision_subscription_key),
            ("gnfinder_path", &self.gnfinder_path),
            ("output_folder", &self.output_folder),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingValue {
                    key: key.to_string(),
                }
                .into());
            }
        }

        for (key, template) in [
            ("bhl_page_text_url", &self.bhl_page_text_url),
            ("bhl_page_image_url", &self.bhl_page_image_url),
        ] {
            if !template.contains(PAGE_ID_PLACEHOLDER) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: format!("缺少占位符 {}", PAGE_ID_PLACEHOLDER),
                }
                .into());
            }
        }

        if !self.gnfinder_args.iter().any(|a| a.contains(INPUT_PLACEHOLDER)) {
            return Err(ConfigError::InvalidValue {
                key: "gnfinder_args".to_string(),
                reason: format!("缺少占位符 {}", INPUT_PLACEHOLDER),
            }
            .into());
        }

        Ok(())
    }

    pub fn page_text_url(&self, page_id: u64) -> String {
        fill_page_id(&self.bhl_page_text_url, page_id)
    }

    pub fn page_image_url(&self, page_id: u64) -> String {
        fill_page_id(&self.bhl_page_image_url, page_id)
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        let interval = Duration::from_millis(self.query_wait_ms);
        match self.poll_mode {
            PollMode::Bounded => PollPolicy::Bounded {
                max_attempts: self.max_retry_times,
                interval,
            },
            PollMode::UntilTerminal => PollPolicy::UntilTerminal {
                interval,
                timeout: Duration::from_millis(self.poll_timeout_ms),
            },
        }
    }
}

/// 用页面 ID 替换 URL 模板中的 `{page_id}`
pub fn fill_page_id(template: &str, page_id: u64) -> String {
    template.replace(PAGE_ID_PLACEHOLDER, &page_id.to_string())
}

/// 配置文件路径：BHL_CONFIG_FILE > appsettings.<APP_ENV>.toml > appsettings.toml
fn config_file_path() -> PathBuf {
    if let Ok(path) = std::env::var("BHL_CONFIG_FILE") {
        return PathBuf::from(path);
    }
    match std::env::var("APP_ENV") {
        Ok(env) if !env.trim().is_empty() => PathBuf::from(format!("appsettings.{}.toml", env)),
        _ => PathBuf::from("appsettings.toml"),
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    expected_type: &str,
) -> AppResult<Option<T>> {
    match lookup(var_name) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| {
            ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }
            .into()
        }),
    }
}

fn parse_enum<T: serde::de::DeserializeOwned>(value: &str, var_name: &str) -> AppResult<T> {
    let de: StrDeserializer<'_, serde::de::value::Error> = value.trim().into_deserializer();
    T::deserialize(de).map_err(|_| {
        ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: "enum".to_string(),
        }
        .into()
    })
}
