//! Shared HTTP plumbing: client construction, page fetching and SSRF checks.

use std::net::IpAddr;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use tracing::debug;
use url::Url;

use articlesmith_shared::{ArticleSmithError, Result};

/// User-Agent for fetching competitor pages.
pub(crate) const USER_AGENT: &str = concat!("ArticleSmith/", env!("CARGO_PKG_VERSION"));

/// Some blog hosts serve an empty shell to non-browser agents, so listing
/// requests present themselves as a desktop browser.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

const MAX_REDIRECTS: usize = 5;

/// Build a client for short page fetches. With `guard_redirects`, every
/// redirect hop is checked with [`is_ssrf_target`] before it is followed.
pub(crate) fn build_client(
    user_agent: &str,
    timeout_secs: u64,
    browser: bool,
    guard_redirects: bool,
) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .redirect(redirect_policy(guard_redirects))
        .timeout(Duration::from_secs(timeout_secs));

    if browser {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        builder = builder.default_headers(headers);
    }

    builder
        .build()
        .map_err(|e| ArticleSmithError::Network(format!("failed to build HTTP client: {e}")))
}

fn redirect_policy(guard_redirects: bool) -> Policy {
    if !guard_redirects {
        return Policy::limited(MAX_REDIRECTS);
    }
    Policy::custom(|attempt| {
        if attempt.previous().len() >= MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        if is_ssrf_target(attempt.url()) {
            let target = attempt.url().to_string();
            return attempt.error(format!("SSRF protection: redirect to {target} blocked"));
        }
        attempt.follow()
    })
}

/// GET `url` and return the body of a 2xx response.
pub(crate) async fn fetch_html(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching page");

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| ArticleSmithError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ArticleSmithError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| ArticleSmithError::Network(format!("{url}: body read failed: {e}")))
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
pub fn is_ssrf_target(url: &Url) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    match url.host() {
        Some(url::Host::Ipv4(v4)) => is_private_ip(&IpAddr::V4(v4)),
        Some(url::Host::Ipv6(v6)) => is_private_ip(&IpAddr::V6(v6)),
        Some(url::Host::Domain(host)) => {
            host == "localhost" || host.ends_with(".local") || host.ends_with(".internal")
        }
        None => true,
    }
}

/// Check if an IP is in a private/reserved range.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                // 100.64.0.0/10 (Carrier-grade NAT)
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                // fe80::/10 link local
                || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}
