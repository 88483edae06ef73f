use crate::error::QuotaError;
use crate::quota::types::ReservationId;
use reqwest::Url;

/// Tekton 配额接口的 URL 构造。路径参数原样拼接，不做转义。
#[derive(Debug, Clone)]
pub struct Endpoint {
    base_url: String,
}

impl Endpoint {
    pub fn new(base_url: &str) -> Result<Self, QuotaError> {
        let base_url = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(base_url)
            .map_err(|e| QuotaError::config(format!("无效的 Tekton 地址 {base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(QuotaError::config(format!(
                "Tekton 地址仅支持 http/https: {base_url}"
            )));
        }
        Ok(Self {
            base_url: base_url.to_string(),
        })
    }

    pub fn reservation_url(
        &self,
        subscription_id: &str,
        entity: &str,
        reservation_id: &ReservationId,
        created_by: &str,
    ) -> Result<Url, QuotaError> {
        let raw = format!("{}/api/v1/quota/reservation", self.base_url);
        let mut url = Url::parse(&raw)
            .map_err(|e| QuotaError::config(format!("无效的预留地址 {raw}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("subscription", subscription_id)
            .append_pair("entity", entity)
            .append_pair("reservationId", reservation_id.as_str())
            .append_pair("createdBy", created_by);
        Ok(url)
    }

    pub fn commit_url(&self, reservation_id: &ReservationId) -> String {
        format!(
            "{}/api/v1/quota/reservation/{}/commit",
            self.base_url, reservation_id
        )
    }

    pub fn rollback_url(&self, reservation_id: &ReservationId) -> String {
        format!(
            "{}/api/v1/quota/reservation/{}/rollback",
            self.base_url, reservation_id
        )
    }

    pub fn release_url(&self, subscription_id: &str, entity: &str) -> String {
        format!(
            "{}/api/v1/quota/release/{}/{}",
            self.base_url, subscription_id, entity
        )
    }

    pub fn delete_url(&self, reservation_id: &ReservationId) -> String {
        format!(
            "{}/api/v1/quota/reservation/{}",
            self.base_url, reservation_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint::new("http://localhost:9000/").unwrap()
    }

    #[test]
    fn new_rejects_invalid_base_url() {
        assert!(matches!(
            Endpoint::new("not a url"),
            Err(QuotaError::Config(_))
        ));
        assert!(matches!(
            Endpoint::new("ftp://tekton"),
            Err(QuotaError::Config(_))
        ));
        assert_eq!(
            endpoint().delete_url(&ReservationId::compose(1, "s")),
            "http://localhost:9000/api/v1/quota/reservation/1:s"
        );
    }

    #[test]
    fn reservation_url_carries_query_params() {
        let id = ReservationId::compose(42, "sub-1");
        let url = endpoint()
            .reservation_url("sub-1", "org/assembly", &id, "alice")
            .unwrap();

        assert_eq!(url.path(), "/api/v1/quota/reservation");
        // 查询参数按 form-urlencoded 编码，`:` 和 `/` 都会被转义。
        assert_eq!(
            url.query(),
            Some("subscription=sub-1&entity=org%2Fassembly&reservationId=42%3Asub-1&createdBy=alice")
        );
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("subscription".to_string(), "sub-1".to_string()),
                ("entity".to_string(), "org/assembly".to_string()),
                ("reservationId".to_string(), "42:sub-1".to_string()),
                ("createdBy".to_string(), "alice".to_string()),
            ]
        );
    }

    #[test]
    fn path_urls_embed_identifiers_verbatim() {
        let ep = endpoint();
        let id = ReservationId::compose(7, "s");
        assert_eq!(
            ep.commit_url(&id),
            "http://localhost:9000/api/v1/quota/reservation/7:s/commit"
        );
        assert_eq!(
            ep.rollback_url(&id),
            "http://localhost:9000/api/v1/quota/reservation/7:s/rollback"
        );
        assert_eq!(
            ep.delete_url(&id),
            "http://localhost:9000/api/v1/quota/reservation/7:s"
        );
        assert_eq!(
            ep.release_url("s", "org"),
            "http://localhost:9000/api/v1/quota/release/s/org"
        );
    }
}
