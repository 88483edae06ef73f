use crate::error::QuotaError;
use base64::Engine;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::value::{Dict, Value};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:9000";
const DEFAULT_CONFIG_FILE: &str = "tekton.toml";
const DEFAULT_USER_AGENT: &str = concat!("tekton-quota-client/", env!("CARGO_PKG_VERSION"));

const ENV_KEYS: [&str; 6] = [
    "TEKTON_BASE_URL",
    "TEKTON_AUTH_TOKEN",
    "TEKTON_TIMEOUT",
    "TEKTON_PROXY",
    "TEKTON_USER_AGENT",
    "DEBUG",
];

/// Tekton 配额服务的客户端配置。
///
/// 构造后不再变化：`QuotaClient::new` 读取一次，之后不做热更新。
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub auth_token: String,

    /// 0 表示沿用 HTTP 传输层默认值（不设超时）。
    pub timeout_ms: u64,
    pub proxy: String,
    pub user_agent: String,

    pub debug: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(alias = "TEKTON_BASE_URL")]
    tekton_base_url: Option<String>,
    #[serde(alias = "TEKTON_AUTH_TOKEN")]
    tekton_auth_token: Option<String>,

    #[serde(alias = "TEKTON_TIMEOUT")]
    tekton_timeout: Option<u64>,
    #[serde(alias = "TEKTON_PROXY")]
    tekton_proxy: Option<String>,
    #[serde(alias = "TEKTON_USER_AGENT")]
    tekton_user_agent: Option<String>,

    #[serde(alias = "DEBUG")]
    debug: Option<String>,
}

impl Config {
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            auth_token: auth_token.into(),
            timeout_ms: 0,
            proxy: String::new(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            debug: "off".to_string(),
        }
    }

    /// 按 默认值 < TOML 文件 < .env < 进程环境变量 的顺序加载配置。
    ///
    /// 任一字段无法解析（例如 `TEKTON_TIMEOUT=30s`）都直接报错，不会回退到默认值。
    pub fn load() -> Result<Self, QuotaError> {
        let dotenv = read_dotenv();

        let file = std::env::var("TEKTON_CONFIG")
            .ok()
            .or_else(|| dotenv.get("TEKTON_CONFIG").cloned())
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

        let raw = Figment::new()
            .merge(Toml::file(file))
            .merge(Serialized::defaults(dotenv_layer(&dotenv)))
            .merge(Env::raw().only(&ENV_KEYS))
            .extract::<RawConfig>()
            .map_err(|e| QuotaError::config(format!("解析 Tekton 配置失败: {e}")))?;

        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let base_url = raw
            .tekton_base_url
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Self {
            base_url: normalize_base_url(&base_url),
            auth_token: raw.tekton_auth_token.unwrap_or_default(),
            timeout_ms: raw.tekton_timeout.unwrap_or(0),
            proxy: raw.tekton_proxy.unwrap_or_default(),
            user_agent: raw
                .tekton_user_agent
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            debug: raw.debug.unwrap_or_else(|| "off".to_string()),
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = proxy.into();
        self
    }

    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = debug.into();
        self
    }

    /// `Authorization` 头的值：原始 token（不去空白）的标准 Base64 编码，不带 Bearer 前缀。
    pub fn auth_header(&self) -> Result<String, QuotaError> {
        if self.auth_token.trim().is_empty() {
            return Err(QuotaError::config("缺少 TEKTON_AUTH_TOKEN"));
        }
        Ok(base64::engine::general_purpose::STANDARD.encode(self.auth_token.as_bytes()))
    }

    pub fn log_level(&self) -> crate::logging::LogLevel {
        crate::logging::LogLevel::parse(&self.debug)
    }
}

fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

/// 读取 .env 的全部键值；不写回进程环境。
fn read_dotenv() -> BTreeMap<String, String> {
    find_dotenv_path()
        .and_then(|path| std::fs::read_to_string(path).ok())
        .map(|content| content.lines().filter_map(parse_dotenv_line).collect())
        .unwrap_or_default()
}

/// 只保留配置关心的键，键名转成与 `Env::raw()` 一致的小写形式。
fn dotenv_layer(dotenv: &BTreeMap<String, String>) -> Dict {
    dotenv
        .iter()
        .filter(|(key, _)| ENV_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key)))
        .map(|(key, value)| {
            let parsed = value
                .parse::<Value>()
                .unwrap_or_else(|_| Value::from(value.clone()));
            (key.to_lowercase(), parsed)
        })
        .collect()
}

fn find_dotenv_path() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    for dir in cwd.ancestors() {
        let candidate = dir.join(".env");
        if candidate.is_file() {
            return Some(candidate);
        }
        // 不越过项目根目录。
        if dir.join("Cargo.toml").is_file() || dir.join(".git").is_dir() {
            return None;
        }
    }
    None
}

fn parse_dotenv_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let line = line.strip_prefix("export ").map_or(line, str::trim_start);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    let value = value.trim();
    let value = unquote(value).unwrap_or_else(|| strip_comment(value));
    Some((key.to_string(), value.to_string()))
}

fn unquote(value: &str) -> Option<&str> {
    ['"', '\'']
        .into_iter()
        .find_map(|q| value.strip_prefix(q)?.strip_suffix(q))
}

/// `#` 位于行首或紧跟空白时才算注释，`a#b` 保持原样。
fn strip_comment(value: &str) -> &str {
    let cut = value
        .match_indices('#')
        .map(|(i, _)| i)
        .find(|&i| i == 0 || value[..i].ends_with([' ', '\t']));
    cut.map_or(value, |i| &value[..i]).trim_end()
}
