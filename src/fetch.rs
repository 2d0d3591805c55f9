//! Article page fetching
//!
//! Retrieves article HTML for the extractor. Only `http`/`https` URLs are
//! followed, and hosts resolving to loopback, private or link-local ranges are
//! refused unless address blocking is turned off. Redirects are followed by
//! hand so every hop passes the same checks.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::LOCATION;
use url::Url;

use crate::config::FetchConfig;
use crate::ports::ArticleSource;
use crate::{Error, Result};

/// Maximum redirects followed per request
const MAX_REDIRECTS: usize = 10;

/// Fetches article pages over HTTP
pub struct ArticleFetcher {
    client: reqwest::Client,
    block_private_addresses: bool,
    trusted_hosts: Vec<String>,
}

impl ArticleFetcher {
    /// Create a fetcher from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: &FetchConfig) -> Result<Self> {
        Ok(Self::with_options(config.timeout, config.block_private_addresses)?
            .with_trusted_hosts(config.trusted_hosts.clone()))
    }

    /// Create a fetcher with an explicit timeout and blocking policy
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn with_options(timeout: Duration, block_private_addresses: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("Herald/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            block_private_addresses,
            trusted_hosts: Vec::new(),
        })
    }

    /// Exempt hosts from address blocking
    #[must_use]
    pub fn with_trusted_hosts(mut self, hosts: Vec<String>) -> Self {
        self.trusted_hosts = hosts.into_iter().map(|h| h.to_ascii_lowercase()).collect();
        self
    }

    /// Validate a URL before fetching it
    ///
    /// # Errors
    ///
    /// Returns error if the URL is malformed, not http(s), has no host, or
    /// resolves to a blocked address
    pub async fn validate(&self, raw: &str) -> Result<Url> {
        let url = Url::parse(raw).map_err(|e| Error::Fetch(format!("invalid URL {raw:?}: {e}")))?;
        self.check(url).await
    }

    async fn check(&self, url: Url) -> Result<Url> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Fetch(format!(
                "unsupported scheme {:?}, only http and https are allowed",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| Error::Fetch(format!("URL has no host: {url}")))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');

        if self.block_private_addresses && !self.is_trusted(host) {
            let port = url.port_or_known_default().unwrap_or(80);
            let addrs = tokio::net::lookup_host((host, port))
                .await
                .map_err(|e| Error::Fetch(format!("failed to resolve {host}: {e}")))?;

            for addr in addrs {
                if is_blocked_address(addr.ip()) {
                    return Err(Error::Fetch(format!(
                        "refusing {host}: resolves to non-public address {}",
                        addr.ip()
                    )));
                }
            }
        }

        Ok(url)
    }

    fn is_trusted(&self, host: &str) -> bool {
        self.trusted_hosts.iter().any(|t| t.eq_ignore_ascii_case(host))
    }

    /// Request `url`, validating each redirect hop before following it
    async fn get_following_redirects(&self, mut url: Url) -> Result<(Url, reqwest::Response)> {
        for _ in 0..=MAX_REDIRECTS {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| Error::Fetch(format!("request failed: {e}")))?;

            if !response.status().is_redirection() {
                return Ok((url, response));
            }

            let Some(location) = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
            else {
                return Ok((url, response));
            };

            let next = url
                .join(location)
                .map_err(|e| Error::Fetch(format!("invalid redirect {location:?}: {e}")))?;
            tracing::debug!(from = %url, to = %next, "following redirect");
            url = self.check(next).await?;
        }

        Err(Error::Fetch(format!("too many redirects (more than {MAX_REDIRECTS})")))
    }
}

#[async_trait]
impl ArticleSource for ArticleFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let url = self.validate(url).await?;
        tracing::debug!(url = %url, "fetching article");

        let (url, response) = self.get_following_redirects(url).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{url} returned {status}")));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::Fetch(format!("failed to read body: {e}")))?;

        tracing::info!(url = %url, bytes = html.len(), "article fetched");
        Ok(html)
    }
}

impl std::fmt::Debug for ArticleFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticleFetcher")
            .field("block_private_addresses", &self.block_private_addresses)
            .field("trusted_hosts", &self.trusted_hosts)
            .finish_non_exhaustive()
    }
}

/// Whether an address is loopback, private, link-local or unspecified
#[must_use]
pub fn is_blocked_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map_or_else(|| is_blocked_v6(v6), is_blocked_v4),
    }
}

fn is_blocked_v4(ip: Ipv4Addr) -> bool {
    // 0.0.0.0/8 is "this network"
    ip.octets()[0] == 0 || ip.is_loopback() || ip.is_private() || ip.is_link_local()
}

fn is_blocked_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        // fc00::/7 unique local
        || first & 0xfe00 == 0xfc00
        // fe80::/10 link-local
        || first & 0xffc0 == 0xfe80
}
