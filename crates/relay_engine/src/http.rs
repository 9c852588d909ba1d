use std::time::Duration;

use futures_util::StreamExt;
use relay_core::SessionPolicy;
use relay_logging::{relay_debug, relay_warn};
use reqwest::header::{self, HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode, Url};

use crate::{decode_body, FailureKind, RelayError, TransportError};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

#[derive(Debug, Clone)]
pub struct PortalSettings {
    /// Portal origin, e.g. `https://www.ivasms.com`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Timeout for the lightweight session validity probe.
    pub probe_timeout: Duration,
    pub max_bytes: u64,
    pub session: SessionPolicy,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.ivasms.com".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
            max_bytes: 5 * 1024 * 1024,
            session: SessionPolicy::default(),
        }
    }
}

impl PortalSettings {
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, TransportError> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(path))
            .map_err(|err| TransportError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    fn origin(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }
}

/// A fresh client with its own cookie jar; one per portal session.
pub(crate) fn build_client(settings: &PortalSettings) -> Result<reqwest::Client, TransportError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-GB,en;q=0.9"),
    );

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .cookie_store(true)
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|err| TransportError::new(FailureKind::Network, err.to_string()))
}

/// Headers the portal expects on its in-page XHR calls.
pub(crate) fn xhr(
    builder: RequestBuilder,
    settings: &PortalSettings,
    referer_path: &str,
) -> RequestBuilder {
    let origin = settings.origin();
    builder
        .header("X-Requested-With", "XMLHttpRequest")
        .header(header::ORIGIN, origin.as_str())
        .header(header::REFERER, format!("{origin}{referer_path}"))
}

pub(crate) fn is_login_url(url: &Url) -> bool {
    url.path().trim_end_matches('/').ends_with("/login")
}

/// Sends a request made on behalf of an authenticated session.
///
/// Landing on the login page or a 401 means the portal dropped the session.
pub(crate) async fn send_authenticated(
    builder: RequestBuilder,
    max_bytes: u64,
) -> Result<String, RelayError> {
    let response = builder.send().await.map_err(map_reqwest_error)?;
    if response.status() == StatusCode::UNAUTHORIZED || is_login_url(response.url()) {
        return Err(RelayError::Authentication("session rejected by portal".into()));
    }
    Ok(read_page(response, max_bytes).await?.body)
}

pub(crate) struct Page {
    pub final_url: Url,
    pub body: String,
}

/// Reads a successful response body, capped at `max_bytes` and decoded to UTF-8.
pub(crate) async fn read_page(response: Response, max_bytes: u64) -> Result<Page, TransportError> {
    let status = response.status();
    if !status.is_success() {
        return Err(TransportError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }

    if let Some(content_len) = response.content_length() {
        if content_len > max_bytes {
            return Err(TransportError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(content_len),
                },
                "response too large",
            ));
        }
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        let next_len = bytes.len() as u64 + chunk.len() as u64;
        if next_len > max_bytes {
            return Err(TransportError::new(
                FailureKind::TooLarge {
                    max_bytes,
                    actual: Some(next_len),
                },
                "response too large",
            ));
        }
        bytes.extend_from_slice(&chunk);
    }

    let decoded = decode_body(&bytes, content_type.as_deref());
    if decoded.lossy {
        relay_warn!(
            "Invalid {} bytes in {} replaced with U+FFFD",
            decoded.encoding.name(),
            final_url
        );
    } else if decoded.encoding != encoding_rs::UTF_8 {
        relay_debug!(
            "Decoded {} as {} ({:?})",
            final_url,
            decoded.encoding.name(),
            decoded.charset
        );
    }
    Ok(Page {
        final_url,
        body: decoded.text,
    })
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::new(FailureKind::Timeout, err.to_string());
    }
    TransportError::new(FailureKind::Network, err.to_string())
}
