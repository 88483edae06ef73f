use std::collections::HashMap;
use std::fmt;

/// 资源类型 -> 数量（例如 CPU 核数、内存单位）。原样透传，本地不校验。
pub type QuotaMap = HashMap<String, i64>;

/// 订阅 ID -> 该订阅需要的配额。仅 reserve 使用。
pub type SubscriptionQuotaMap = HashMap<String, QuotaMap>;

/// 远端预留记录的 ID：`<deploymentId>:<subscriptionId>`。
///
/// 按需计算，不在本地保存。分隔符不做转义：subscription ID 自身含 `:` 时，
/// 远端按 `:` 切分会得到歧义结果。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReservationId(String);

impl ReservationId {
    pub fn compose(deployment_id: i64, subscription_id: &str) -> Self {
        Self(format!("{deployment_id}:{subscription_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn compose_reservation_id(deployment_id: i64, subscription_id: &str) -> ReservationId {
    ReservationId::compose(deployment_id, subscription_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Reserve,
    Commit,
    Rollback,
    Release,
    Delete,
}

impl Operation {
    /// 用于日志和错误信息的动作描述。
    pub fn action(self) -> &'static str {
        match self {
            Self::Reserve => "预留配额",
            Self::Commit => "提交预留",
            Self::Rollback => "回滚预留",
            Self::Release => "释放资源",
            Self::Delete => "删除预留",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_reservation_id_joins_with_colon() {
        for (dep, sub, want) in [
            (42, "sub-1", "42:sub-1"),
            (0, "", "0:"),
            (-7, "abc", "-7:abc"),
            (i64::MAX, "x", "9223372036854775807:x"),
        ] {
            let id = compose_reservation_id(dep, sub);
            assert_eq!(id.as_str(), want);
            assert_eq!(id.to_string(), want);
            assert_eq!(id, compose_reservation_id(dep, sub));
        }
    }

    #[test]
    fn compose_reservation_id_does_not_escape_separator() {
        let id = compose_reservation_id(1, "2:3");
        assert_eq!(id.as_str(), "1:2:3");
        assert_eq!(compose_reservation_id(1, "a/b c").as_str(), "1:a/b c");
    }
}
