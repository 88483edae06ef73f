use reqwest::header::HeaderMap;
use sonic_rs::prelude::*;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// 请求/响应详细日志等级（由 DEBUG 控制）：
/// - off：只输出每次操作的一行摘要
/// - low：额外输出格式化后的请求/响应（JSON 美化、超长截断、Authorization 脱敏）
/// - high：额外输出原始请求/响应（不格式化；Authorization 仍脱敏）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Off = 0,
    Low = 1,
    High = 2,
}

impl LogLevel {
    pub fn parse(debug: &str) -> Self {
        match debug.trim().to_lowercase().as_str() {
            "low" | "medium" | "on" => Self::Low,
            "high" | "all" | "raw" => Self::High,
            _ => Self::Off,
        }
    }

    pub fn enabled(self) -> bool {
        self >= Self::Low
    }

    pub fn raw_enabled(self) -> bool {
        self >= Self::High
    }
}

/// 初始化 tracing 订阅者。依赖库默认 warn，本 crate 至少 info；已有订阅者时静默跳过。
pub fn init_tracing() {
    let env = std::env::var("RUST_LOG").unwrap_or_default();
    let env = env.trim();
    let filter = if env.is_empty() {
        EnvFilter::new("warn,tekton_quota_client=info")
    } else if env.contains("tekton_quota_client") {
        EnvFilter::new(env)
    } else {
        EnvFilter::new(format!("{env},tekton_quota_client=info"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .try_init();
}

pub fn format_duration_ms(d: Duration) -> i64 {
    d.as_millis().min(i64::MAX as u128) as i64
}

pub fn request(method: &str, url: &str, headers: &HeaderMap, body: &[u8]) {
    tracing::info!(
        "\n====================== Tekton 请求 ======================\n[请求] {method} {url}\n[请求头]\n{}\n{}\n==========================================================",
        format_headers(headers),
        format_body_bytes(body)
    );
}

pub fn request_raw(method: &str, url: &str, headers: &HeaderMap, body: &[u8]) {
    tracing::info!(
        "\n=================== Tekton 请求（RAW） ===================\n[请求] {method} {url}\n[请求头]\n{}\n[请求体]\n{}\n=========================================================",
        format_headers_raw(headers),
        format_bytes_raw(body),
    );
}

pub fn response(status: u16, duration: Duration, body: &[u8]) {
    tracing::info!(
        "\n====================== Tekton 响应 ======================\n[响应] {} {}ms\n{}\n==========================================================",
        status,
        format_duration_ms(duration),
        format_body_bytes(body)
    );
}

pub fn response_raw(status: u16, duration: Duration, body: &[u8]) {
    tracing::info!(
        "\n=================== Tekton 响应（RAW） ===================\n[响应] {} {}ms\n{}\n=========================================================",
        status,
        format_duration_ms(duration),
        format_bytes_raw(body),
    );
}

fn is_sensitive_header(name: &str) -> bool {
    name.eq_ignore_ascii_case("authorization") || name.eq_ignore_ascii_case("proxy-authorization")
}

fn format_headers(headers: &HeaderMap) -> String {
    let mut obj = sonic_rs::Object::new();

    for (name, value) in headers.iter() {
        let key = name.as_str();
        let v = if is_sensitive_header(key) {
            sonic_rs::Value::from("***")
        } else {
            match value.to_str() {
                Ok(s) => sonic_rs::Value::from(s),
                Err(_) => sonic_rs::Value::from("<binary>"),
            }
        };

        // 同名多值统一用数组输出。
        if let Some(existing) = obj.get(&key).and_then(|v| v.as_array()) {
            let mut arr = existing.to_vec();
            arr.push(v);
            obj.insert(key, arr);
        } else {
            obj.insert(key, vec![v]);
        }
    }

    format_body_value(&obj.into_value())
}

fn format_headers_raw(headers: &HeaderMap) -> String {
    let mut out = String::new();
    for (name, value) in headers.iter() {
        let key = name.as_str();
        let val = if is_sensitive_header(key) {
            "***"
        } else {
            value.to_str().unwrap_or("<non-utf8>")
        };
        out.push_str(key);
        out.push_str(": ");
        out.push_str(val);
        out.push('\n');
    }
    out
}

fn format_body_value(v: &sonic_rs::Value) -> String {
    match sonic_rs::to_string_pretty(v) {
        Ok(s) => s,
        Err(_) => v.to_string(),
    }
}

fn format_body_bytes(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }

    const MAX_PARSE_BYTES: usize = 256 * 1024;
    const HEAD_TAIL: usize = 4 * 1024;

    if bytes.len() > MAX_PARSE_BYTES {
        let head = &bytes[..HEAD_TAIL];
        let tail = &bytes[bytes.len() - HEAD_TAIL..];
        return format!(
            "(body too large: {} bytes, showing head/tail)\n--- head ---\n{}\n--- tail ---\n{}",
            bytes.len(),
            String::from_utf8_lossy(head),
            String::from_utf8_lossy(tail)
        );
    }

    match sonic_rs::from_slice::<sonic_rs::Value>(bytes) {
        Ok(v) => format_body_value(&v),
        Err(_) => truncate_text_for_log(&String::from_utf8_lossy(bytes)),
    }
}

fn format_bytes_raw(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn truncate_text_for_log(s: &str) -> String {
    const MAX_CHARS: usize = 8 * 1024;
    if s.chars().count() <= MAX_CHARS {
        return s.to_string();
    }
    let mut out: String = s.chars().take(MAX_CHARS).collect();
    out.push_str("...[TRUNCATED]");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};

    fn headers() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_static("c2VjcmV0"));
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("off"), LogLevel::Off);
        assert_eq!(LogLevel::parse(""), LogLevel::Off);
        assert_eq!(LogLevel::parse("bogus"), LogLevel::Off);
        assert_eq!(LogLevel::parse(" LOW "), LogLevel::Low);
        assert_eq!(LogLevel::parse("medium"), LogLevel::Low);
        assert_eq!(LogLevel::parse("HIGH"), LogLevel::High);
        assert_eq!(LogLevel::parse("raw"), LogLevel::High);

        assert!(!LogLevel::Off.enabled());
        assert!(LogLevel::Low.enabled());
        assert!(!LogLevel::Low.raw_enabled());
        assert!(LogLevel::High.raw_enabled());
    }

    #[test]
    fn headers_are_redacted_in_both_formats() {
        let formatted = format_headers(&headers());
        assert!(!formatted.contains("c2VjcmV0"));
        assert!(formatted.contains("***"));
        assert!(formatted.contains("application/json"));

        let raw = format_headers_raw(&headers());
        assert!(!raw.contains("c2VjcmV0"));
        assert!(raw.contains("authorization: ***"));
        assert!(raw.contains("content-type: application/json"));
    }

    #[test]
    fn body_formatting_handles_json_text_and_oversize() {
        assert_eq!(format_body_bytes(b""), "");
        assert!(format_body_bytes(br#"{"cpu":4}"#).contains("\"cpu\": 4"));
        assert_eq!(format_body_bytes(b"not json"), "not json");

        let big = vec![b'x'; 300 * 1024];
        let out = format_body_bytes(&big);
        assert!(out.starts_with("(body too large: 307200 bytes"));
    }

    #[test]
    fn truncate_text_for_log_caps_length() {
        let long = "a".repeat(9 * 1024);
        let out = truncate_text_for_log(&long);
        assert!(out.ends_with("...[TRUNCATED]"));
        assert_eq!(out.chars().count(), 8 * 1024 + "...[TRUNCATED]".len());
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
    }
}
