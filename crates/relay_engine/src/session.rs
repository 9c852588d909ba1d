use std::fmt;
use std::time::{Duration, Instant};

use relay_core::{ReauthGate, SessionLifecycle, SessionPhase};
use relay_logging::{relay_debug, relay_info, relay_warn};
use reqwest::StatusCode;
use tokio_util::sync::CancellationToken;

use crate::http::{build_client, is_login_url, map_reqwest_error, read_page, send_authenticated};
use crate::parse::{extract_csrf_meta, extract_login_token};
use crate::{PortalSettings, RelayError};

const LOGIN_PATH: &str = "/login";
const PROBE_PATH: &str = "/portal";
const TOKEN_PAGE_PATH: &str = "/portal/sms/received";

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated portal session: cookie jar plus the current anti-forgery token.
///
/// Only [`SessionManager`] creates or renews one; everything else borrows it.
#[derive(Debug)]
pub struct Session {
    client: reqwest::Client,
    csrf_token: String,
    established_at: Instant,
}

impl Session {
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    pub fn age(&self) -> Duration {
        self.established_at.elapsed()
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Owns the lifecycle of the one portal session the relay uses.
pub struct SessionManager {
    settings: PortalSettings,
    credentials: Credentials,
    lifecycle: SessionLifecycle,
    gate: ReauthGate,
    current: Option<Session>,
    shutdown: CancellationToken,
}

impl SessionManager {
    pub fn new(settings: PortalSettings, credentials: Credentials) -> Self {
        Self {
            lifecycle: SessionLifecycle::new(settings.session),
            gate: ReauthGate::new(settings.session.reauth_cooldown),
            settings,
            credentials,
            current: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Lets a pending login cool-down end early on shutdown.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.lifecycle.phase()
    }

    /// Returns a usable session, replacing the current one when it is
    /// missing, expired or rejected by the validity probe.
    pub async fn ensure(&mut self) -> Result<&Session, RelayError> {
        if let Some(session) = self.current.take() {
            match self.lifecycle.check_expiry(Instant::now()) {
                SessionPhase::Authenticated => {
                    if self.validate(&session).await {
                        return Ok(self.current.insert(session));
                    }
                    relay_info!("Session invalid. Re-authenticating...");
                    self.lifecycle.invalidate();
                }
                SessionPhase::Expired => {
                    relay_info!(
                        "Session expired after {:?}. Re-authenticating...",
                        session.age()
                    );
                }
                phase => relay_debug!("Dropping session in phase {:?}", phase),
            }
            self.lifecycle.reset();
        }

        let session = self.acquire().await?;
        Ok(self.current.insert(session))
    }

    /// Forgets the current session; the next [`ensure`](Self::ensure) logs in again.
    pub fn discard(&mut self) {
        if self.current.take().is_some() {
            relay_info!("Discarding portal session");
        }
        self.lifecycle.reset();
    }

    /// Full login handshake. Successive calls are spaced by the re-auth cool-down.
    pub async fn acquire(&mut self) -> Result<Session, RelayError> {
        let wait = self.gate.remaining(Instant::now());
        if !wait.is_zero() {
            relay_info!("Waiting {:.2}s before re-authenticating", wait.as_secs_f64());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = self.shutdown.cancelled() => {
                    return Err(RelayError::Authentication("shutdown during login cool-down".into()));
                }
            }
        }
        self.gate.record_attempt(Instant::now());

        let client = build_client(&self.settings)?;
        let login_url = self.settings.endpoint(LOGIN_PATH)?;

        relay_info!("Fetching login page");
        let response = client
            .get(login_url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let page = read_page(response, self.settings.max_bytes).await?;
        let login_token = extract_login_token(&page.body)
            .ok_or_else(|| RelayError::Authentication("login token not found".into()))?;

        relay_info!("Submitting credentials for {}", self.credentials.email);
        let form = [
            ("_token", login_token.as_str()),
            ("email", self.credentials.email.as_str()),
            ("password", self.credentials.password.as_str()),
            ("remember", "on"),
            ("g-recaptcha-response", ""),
            ("submit", "Login"),
        ];
        let response = client
            .post(login_url.clone())
            .header(reqwest::header::REFERER, login_url.as_str())
            .form(&form)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let page = read_page(response, self.settings.max_bytes).await?;
        if is_login_url(&page.final_url) {
            return Err(RelayError::Authentication(
                "credentials rejected, redirected back to login".into(),
            ));
        }

        let mut session = Session {
            client,
            csrf_token: String::new(),
            established_at: Instant::now(),
        };
        self.refresh_token(&mut session).await?;
        self.lifecycle.established(session.established_at);
        relay_info!("Logged in to portal");
        Ok(session)
    }

    /// Lightweight authenticated probe. A failed probe is a normal signal.
    pub async fn validate(&self, session: &Session) -> bool {
        let url = match self.settings.endpoint(PROBE_PATH) {
            Ok(url) => url,
            Err(err) => {
                relay_warn!("Session validation check failed: {}", err);
                return false;
            }
        };
        match session
            .client()
            .get(url)
            .timeout(self.settings.probe_timeout)
            .send()
            .await
        {
            Ok(response) => {
                response.status() != StatusCode::UNAUTHORIZED && !is_login_url(response.url())
            }
            Err(err) => {
                relay_warn!("Session validation check failed: {}", err);
                false
            }
        }
    }

    /// Re-reads the anti-forgery token from an authenticated page into `session`.
    pub async fn refresh_token(&self, session: &mut Session) -> Result<String, RelayError> {
        let url = self.settings.endpoint(TOKEN_PAGE_PATH)?;
        let body = send_authenticated(session.client().get(url), self.settings.max_bytes).await?;
        let token = extract_csrf_meta(&body)
            .ok_or_else(|| RelayError::Authentication("csrf token not found".into()))?;
        session.csrf_token = token.clone();
        Ok(token)
    }
}
