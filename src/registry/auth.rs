//! Login handshake against the target registry
//!
//! The registry's `/v2/` endpoint is probed first. A `Bearer` challenge is
//! answered by requesting a token from the challenge realm with basic
//! credentials; a `Basic` challenge by repeating the probe with them. Either
//! way a 401/403 means the credentials were rejected.

use crate::config::AuthConfig;
use crate::error::{MirrorError, Result};
use crate::logging::Logger;
use crate::mirror::reference::registry_host;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use url::Url;

/// Endpoint serving the Docker Hub v2 API
pub const DOCKER_HUB_ENDPOINT: &str = "https://registry-1.docker.io";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    Bearer {
        realm: String,
        service: Option<String>,
        scope: Option<String>,
    },
    Basic,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

#[derive(Debug)]
pub struct RegistryAuth {
    client: Client,
    endpoint: Url,
}

impl RegistryAuth {
    pub fn new(registry_address: &str, skip_tls: bool) -> Result<Self> {
        let client = if skip_tls {
            Client::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
        } else {
            Client::builder().build()
        }
        .map_err(|e| MirrorError::Login(format!("Failed to create auth client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: registry_endpoint(registry_address)?,
        })
    }

    pub async fn login(&self, auth: &AuthConfig, logger: &Logger) -> Result<()> {
        logger.detail(&format!("Probing {}", self.probe_url()?));

        let response = self
            .client
            .get(self.probe_url()?)
            .send()
            .await
            .map_err(|e| MirrorError::Login(format!("registry unreachable: {}", e)))?;

        let status = response.status();
        tracing::debug!(%status, "registry probe answered");

        if status.is_success() {
            logger.info("Registry does not require authentication");
            return Ok(());
        }
        if status != StatusCode::UNAUTHORIZED {
            return Err(MirrorError::Login(format!(
                "unexpected status {} from {}",
                status,
                self.probe_url()?
            )));
        }

        let header = response
            .headers()
            .get(reqwest::header::WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                MirrorError::Login("registry sent 401 without an authentication challenge".into())
            })?;

        match parse_challenge(header) {
            Some(Challenge::Bearer {
                realm,
                service,
                scope,
            }) => {
                logger.detail(&format!("Bearer challenge from {}", realm));
                self.request_token(&realm, service.as_deref(), scope.as_deref(), auth)
                    .await
            }
            Some(Challenge::Basic) => self.basic_probe(auth).await,
            None => Err(MirrorError::Login(format!(
                "unsupported authentication challenge: {}",
                header
            ))),
        }
    }

    fn probe_url(&self) -> Result<Url> {
        self.endpoint
            .join("/v2/")
            .map_err(|e| MirrorError::Login(format!("invalid registry address: {}", e)))
    }

    async fn request_token(
        &self,
        realm: &str,
        service: Option<&str>,
        scope: Option<&str>,
        auth: &AuthConfig,
    ) -> Result<()> {
        let mut url = Url::parse(realm)
            .map_err(|e| MirrorError::Login(format!("invalid token realm {}: {}", realm, e)))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(service) = service {
                query.append_pair("service", service);
            }
            if let Some(scope) = scope {
                query.append_pair("scope", scope);
            }
        }

        let response = self
            .client
            .get(url)
            .basic_auth(&auth.username, Some(&auth.password))
            .send()
            .await
            .map_err(|e| MirrorError::Login(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejected(status));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| MirrorError::Login(format!("Failed to parse token response: {}", e)))?;
        if token.token.or(token.access_token).is_none() {
            return Err(MirrorError::Login("token response carried no token".into()));
        }
        Ok(())
    }

    async fn basic_probe(&self, auth: &AuthConfig) -> Result<()> {
        let response = self
            .client
            .get(self.probe_url()?)
            .basic_auth(&auth.username, Some(&auth.password))
            .send()
            .await
            .map_err(|e| MirrorError::Login(format!("registry unreachable: {}", e)))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            status => Err(rejected(status)),
        }
    }
}

fn rejected(status: StatusCode) -> MirrorError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            MirrorError::Login(format!("credentials rejected ({})", status))
        }
        _ => MirrorError::Login(format!("Authentication failed with status: {}", status)),
    }
}

/// Base URL of the registry API for a configured address
pub fn registry_endpoint(address: &str) -> Result<Url> {
    let Some(host) = registry_host(address) else {
        return Url::parse(DOCKER_HUB_ENDPOINT)
            .map_err(|e| MirrorError::Config(format!("invalid registry address: {}", e)));
    };

    let scheme = if address.trim().starts_with("http://") {
        "http"
    } else {
        "https"
    };
    Url::parse(&format!("{}://{}/", scheme, host))
        .map_err(|e| MirrorError::Config(format!("invalid registry address {}: {}", address, e)))
}

/// Parse a `WWW-Authenticate` header value
pub fn parse_challenge(header: &str) -> Option<Challenge> {
    let header = header.trim();
    let (scheme, params) = header.split_once(' ').unwrap_or((header, ""));

    if scheme.eq_ignore_ascii_case("basic") {
        return Some(Challenge::Basic);
    }
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let mut values = HashMap::new();
    for param in split_params(params) {
        if let Some((key, value)) = param.split_once('=') {
            values.insert(
                key.trim().to_ascii_lowercase(),
                value.trim().trim_matches('"').to_string(),
            );
        }
    }

    Some(Challenge::Bearer {
        realm: values.remove("realm")?,
        service: values.remove("service"),
        scope: values.remove("scope"),
    })
}

// Scopes like `repository:a:pull,push` contain commas inside quotes
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in params.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    // Local registry answering `/v2/` with a Basic challenge unless the
    // request carries the `expected` credentials
    async fn basic_registry(expected: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let n = socket.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                let request = String::from_utf8_lossy(&request).to_ascii_lowercase();
                let authorized = request.contains(&format!(
                    "authorization: basic {}",
                    expected.to_ascii_lowercase()
                ));
                let response = if authorized {
                    "HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                } else {
                    "HTTP/1.1 401 Unauthorized\r\nwww-authenticate: Basic realm=\"test\"\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                };
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{}", address)
    }

    #[test]
    fn test_rejected_credentials_message() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = rejected(status);
            assert!(matches!(err, MirrorError::Login(_)));
            assert!(
                err.to_string()
                    .starts_with("docker login failed: credentials rejected")
            );
        }

        let err = rejected(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(err, MirrorError::Login(_)));
        assert!(err.to_string().contains("Authentication failed with status: 500"));
    }

    #[tokio::test]
    async fn test_basic_challenge_retries_with_credentials() {
        // base64 of `ci:s3cret`
        let address = basic_registry("Y2k6czNjcmV0").await;
        let auth = RegistryAuth::new(&address, false).unwrap();
        let logger = Logger::new_quiet();

        auth.login(&AuthConfig::new("ci".into(), "s3cret".into()), &logger)
            .await
            .unwrap();

        let err = auth
            .login(&AuthConfig::new("ci".into(), "wrong".into()), &logger)
            .await
            .unwrap_err();
        assert!(
            err.to_string()
                .starts_with("docker login failed: credentials rejected (401")
        );
    }

    #[test]
    fn test_parse_bearer_challenge() {
        let challenge = parse_challenge(
            r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/nginx:pull,push""#,
        )
        .unwrap();
        assert_eq!(
            challenge,
            Challenge::Bearer {
                realm: "https://auth.docker.io/token".to_string(),
                service: Some("registry.docker.io".to_string()),
                scope: Some("repository:library/nginx:pull,push".to_string()),
            }
        );
    }

    #[test]
    fn test_parse_basic_challenge() {
        assert_eq!(
            parse_challenge(r#"Basic realm="Registry Realm""#),
            Some(Challenge::Basic)
        );
    }

    #[test]
    fn test_parse_rejects_unknown_or_incomplete() {
        assert_eq!(parse_challenge("Negotiate abc"), None);
        assert_eq!(parse_challenge(r#"Bearer service="x""#), None);
    }

    #[test]
    fn test_registry_endpoint() {
        assert_eq!(
            registry_endpoint("").unwrap().as_str(),
            "https://registry-1.docker.io/"
        );
        assert_eq!(
            registry_endpoint("index.docker.io").unwrap().as_str(),
            "https://registry-1.docker.io/"
        );
        assert_eq!(
            registry_endpoint("registry.example.com").unwrap().as_str(),
            "https://registry.example.com/"
        );
        assert_eq!(
            registry_endpoint("http://localhost:5000/").unwrap().as_str(),
            "http://localhost:5000/"
        );
    }
}
