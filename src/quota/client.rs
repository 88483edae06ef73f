use crate::config::Config;
use crate::error::QuotaError;
use crate::logging::{self, LogLevel};
use crate::quota::classify::{Classification, classify};
use crate::quota::endpoint::Endpoint;
use crate::quota::types::{Operation, QuotaMap, ReservationId, SubscriptionQuotaMap};
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// Tekton 配额服务客户端。
///
/// 持有一个复用的 `reqwest::Client`；Clone 开销很小，可在多个调用方之间共享。
/// 每个操作都是顺序执行的一次或多次请求，不重试；多订阅操作遇到第一个失败即停止，
/// 已经成功的远端预留不会回滚。
#[derive(Debug, Clone)]
pub struct QuotaClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    auth_header: HeaderValue,
    user_agent: HeaderValue,
    log_level: LogLevel,
}

struct Exchange {
    status: u16,
    body: String,
}

impl QuotaClient {
    pub fn new(cfg: &Config) -> Result<Self, QuotaError> {
        let endpoint = Endpoint::new(&cfg.base_url)?;

        let mut auth_header = HeaderValue::from_str(&cfg.auth_header()?)
            .map_err(|e| QuotaError::config(format!("无效的 Authorization 头: {e}")))?;
        auth_header.set_sensitive(true);
        let user_agent = HeaderValue::from_str(&cfg.user_agent)
            .unwrap_or(HeaderValue::from_static("tekton-quota-client"));

        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .http1_only();

        if cfg.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(cfg.timeout_ms));
        }

        let proxy = cfg.proxy.trim();
        if !proxy.is_empty() {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| QuotaError::config(format!("无效的代理地址 {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint,
            auth_header,
            user_agent,
            log_level: cfg.log_level(),
        })
    }

    /// 为 deployment 下的每个订阅各发一次预留请求。
    ///
    /// 订阅之间互相独立、顺序不定；`quota_needed` 为空时不发请求。
    pub async fn reserve_quota(
        &self,
        quota_needed: &SubscriptionQuotaMap,
        deployment_id: i64,
        entity: &str,
        created_by: &str,
    ) -> Result<(), QuotaError> {
        for (subscription_id, reservation) in quota_needed {
            let reservation_id = ReservationId::compose(deployment_id, subscription_id);
            let url = self.endpoint.reservation_url(
                subscription_id,
                entity,
                &reservation_id,
                created_by,
            )?;

            let resp = self
                .send(Method::POST, url.to_string(), Some(reservation))
                .await?;
            tracing::info!(
                "预留配额 reservationId={reservation_id} 资源={reservation:?} Tekton 响应={} code={}",
                resp.body,
                resp.status
            );

            check(Operation::Reserve, resp, reservation_id.as_str())?;
        }
        Ok(())
    }

    /// 提交预留，返回远端状态码（404 视为成功并原样返回）。
    pub async fn commit_reservation(
        &self,
        resource_numbers: &QuotaMap,
        deployment_id: i64,
        subscription_id: &str,
    ) -> Result<u16, QuotaError> {
        let reservation_id = ReservationId::compose(deployment_id, subscription_id);
        let url = self.endpoint.commit_url(&reservation_id);

        let resp = self.send(Method::POST, url, Some(resource_numbers)).await?;
        tracing::info!(
            "提交预留 reservationId={reservation_id} 资源={resource_numbers:?} Tekton 响应={} code={}",
            resp.body,
            resp.status
        );

        check(Operation::Commit, resp, reservation_id.as_str())
    }

    pub async fn rollback_reservation(
        &self,
        resource_numbers: &QuotaMap,
        deployment_id: i64,
        subscription_id: &str,
    ) -> Result<u16, QuotaError> {
        let reservation_id = ReservationId::compose(deployment_id, subscription_id);
        let url = self.endpoint.rollback_url(&reservation_id);

        let resp = self.send(Method::POST, url, Some(resource_numbers)).await?;
        tracing::info!(
            "回滚预留 reservationId={reservation_id} 资源={resource_numbers:?} Tekton 响应={} code={}",
            resp.body,
            resp.status
        );

        check(Operation::Rollback, resp, reservation_id.as_str())
    }

    /// 按 subscription + entity 释放资源（不经过预留 ID）。
    pub async fn release_resources(
        &self,
        entity: &str,
        subscription_id: &str,
        resource_numbers: &QuotaMap,
    ) -> Result<u16, QuotaError> {
        let url = self.endpoint.release_url(subscription_id, entity);

        let resp = self.send(Method::POST, url, Some(resource_numbers)).await?;
        tracing::info!(
            "释放资源 entity={entity} 资源={resource_numbers:?} Tekton 响应={} code={}",
            resp.body,
            resp.status
        );

        check(Operation::Release, resp, entity)
    }

    pub async fn delete_reservations(
        &self,
        deployment_id: i64,
        subscription_ids: &HashSet<String>,
    ) -> Result<(), QuotaError> {
        for subscription_id in subscription_ids {
            let reservation_id = ReservationId::compose(deployment_id, subscription_id);
            let url = self.endpoint.delete_url(&reservation_id);

            let resp = self.send(Method::DELETE, url, None).await?;
            tracing::info!(
                "删除预留 reservationId={reservation_id} Tekton 响应={} code={}",
                resp.body,
                resp.status
            );

            check(Operation::Delete, resp, reservation_id.as_str())?;
        }
        Ok(())
    }

    fn build_headers(&self) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h.insert(AUTHORIZATION, self.auth_header.clone());
        h.insert(USER_AGENT, self.user_agent.clone());
        h
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        payload: Option<&QuotaMap>,
    ) -> Result<Exchange, QuotaError> {
        let body = match payload {
            Some(p) => sonic_rs::to_vec(p)?,
            None => Vec::new(),
        };
        let headers = self.build_headers();

        if self.log_level.raw_enabled() {
            logging::request_raw(method.as_str(), &url, &headers, &body);
        } else if self.log_level.enabled() {
            logging::request(method.as_str(), &url, &headers, &body);
        }

        let start = Instant::now();
        let mut req = self.http.request(method, url).headers(headers);
        if payload.is_some() {
            req = req.body(body);
        }
        let resp = req.send().await?;

        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;
        if self.log_level.raw_enabled() {
            logging::response_raw(status, start.elapsed(), &bytes);
        } else if self.log_level.enabled() {
            logging::response(status, start.elapsed(), &bytes);
        }

        Ok(Exchange {
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

fn check(operation: Operation, resp: Exchange, target: &str) -> Result<u16, QuotaError> {
    match classify(resp.status) {
        Classification::Success => Ok(resp.status),
        Classification::NotFound => {
            tracing::debug!("{} {target}: Tekton 返回 404，视为无需处理", operation.action());
            Ok(resp.status)
        }
        Classification::Failure => Err(QuotaError::RemoteOperationFailed {
            operation,
            status: resp.status,
            body: resp.body,
            target: target.to_string(),
        }),
    }
}
