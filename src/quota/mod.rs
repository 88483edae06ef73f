//! Tekton 配额预留客户端。
//!
//! 五个操作（reserve / commit / rollback / release / delete）各自对应一次或多次
//! JSON-over-HTTP 调用，统一按状态码分类结果：< 300 成功，404 容忍，其余报错。

mod classify;
mod client;
mod endpoint;
mod types;

pub use classify::{Classification, classify};
pub use client::QuotaClient;
pub use endpoint::Endpoint;
pub use types::{
    Operation, QuotaMap, ReservationId, SubscriptionQuotaMap, compose_reservation_id,
};
