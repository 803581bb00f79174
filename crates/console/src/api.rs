//! Permission lookups against the KitchenHub API.

use async_trait::async_trait;
use tracing::debug;

use kitchenhub_auth::IdentityId;
use kitchenhub_session::{FetchError, PermissionResponse, PermissionSource};

/// `GET {api_url}/identities/{id}/permissions`, optionally with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpPermissionSource {
    client: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl HttpPermissionSource {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::new(api_url)
        }
    }

    pub fn permissions_url(&self, id: &IdentityId) -> String {
        format!(
            "{}/identities/{}/permissions",
            self.api_url,
            urlencoding::encode(id.as_str())
        )
    }
}

#[async_trait]
impl PermissionSource for HttpPermissionSource {
    async fn fetch_permissions(&self, id: &IdentityId) -> Result<PermissionResponse, FetchError> {
        let url = self.permissions_url(id);
        debug!(%url, "requesting permissions");

        let mut req = self.client.get(&url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| FetchError::network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::status(
                status.as_u16(),
                resp.text().await.unwrap_or_default(),
            ));
        }

        resp.json::<PermissionResponse>()
            .await
            .map_err(|e| FetchError::decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_is_built_from_trimmed_base_and_encoded_id() {
        let source = HttpPermissionSource::new("http://api.local/v1/");
        assert_eq!(
            source.permissions_url(&IdentityId::new("chef 1")),
            "http://api.local/v1/identities/chef%201/permissions"
        );
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        // Bind then release a port so nothing is listening on it.
        let addr = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let source = HttpPermissionSource::new(format!("http://{addr}"));
        let err = source
            .fetch_permissions(&IdentityId::new("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }));
    }
}
