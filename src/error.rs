use crate::quota::Operation;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuotaError {
    /// 远端返回 >= 300 且非 404 的状态码。
    #[error(
        "Tekton {action}失败 {status}: {body}（{target}）",
        action = .operation.action()
    )]
    RemoteOperationFailed {
        operation: Operation,
        status: u16,
        body: String,
        /// 预留 ID；release 时为 entity。
        target: String,
    },

    #[error("配置错误: {0}")]
    Config(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] sonic_rs::Error),
}

impl QuotaError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteOperationFailed { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match self {
            Self::RemoteOperationFailed { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn is_remote_failure(&self) -> bool {
        matches!(self, Self::RemoteOperationFailed { .. })
    }
}
