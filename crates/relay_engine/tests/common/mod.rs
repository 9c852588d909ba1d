#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;
use relay_core::{Message, SessionPolicy};
use relay_engine::{
    Credentials, Notifier, NotifyError, Outbox, Portal, PortalSettings, Reconciler, ReportWindow,
    SessionManager, SnapshotStore,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LOGIN_TOKEN: &str = "login-token-1";
pub const CSRF_TOKEN: &str = "csrf-token-1";

pub fn init_logging() {
    relay_logging::initialize_for_tests();
}

pub fn html(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html; charset=utf-8")
}

pub fn redirect(to: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("Location", to)
}

pub fn login_page() -> String {
    format!(
        r#"<html><body><form method="POST" action="/login">
        <input type="hidden" name="_token" value="{LOGIN_TOKEN}">
        <input name="email"><input name="password" type="password">
        </form></body></html>"#
    )
}

pub fn received_page() -> String {
    format!(
        r#"<html><head><meta name="csrf-token" content="{CSRF_TOKEN}"></head>
        <body><h1>Received SMS</h1></body></html>"#
    )
}

/// Summary cards for `(range_name, count)` pairs.
pub fn summaries_html(ranges: &[(&str, u64)]) -> String {
    let cards: String = ranges
        .iter()
        .map(|(name, count)| {
            format!(
                r#"<div class="card card-body mb-1 pointer" onclick="getDetials('{name}-id')">
                  <div class="row">
                    <div class="col-sm-4"><h6>{name}</h6></div>
                    <div class="col-3 col-sm-2"><p>{count}</p></div>
                    <div class="col-3 col-sm-2"><p>{count}</p></div>
                    <div class="col-3 col-sm-2"><p>0</p></div>
                    <div class="col-3 col-sm-2"><p><span class="currency_cdr">0.01</span> USD</p></div>
                  </div>
                </div>"#
            )
        })
        .collect();
    format!(r#"<div id="accordion">{cards}</div>"#)
}

pub fn no_data_html() -> String {
    r#"<div class="text-center"><p id="messageFlash">You do not have any SMS</p></div>"#
        .to_string()
}

pub fn numbers_html(numbers: &[&str]) -> String {
    numbers
        .iter()
        .map(|number| {
            format!(
                r#"<div class="card card-body border-bottom bg-100 p-2 rounded-0">
                  <div class="col-sm-4 border-bottom" onclick="getDetialsNumber('{number}','{number}-id')">{number}</div>
                </div>"#
            )
        })
        .collect()
}

pub fn message_html(body: &str) -> String {
    format!(
        r#"<div class="row">
          <div class="col-9 col-sm-6 text-center text-sm-start"><p>{body}</p></div>
          <div class="col-3 col-sm-2 text-center text-sm-start"><span class="currency_cdr">0.02</span></div>
        </div>"#
    )
}

/// A wiremock server speaking the portal's login and statistics endpoints.
pub struct MockPortal {
    pub server: MockServer,
}

impl MockPortal {
    /// Login succeeds and the session probe reports a live session.
    pub async fn start() -> Self {
        Self::start_with_probe(html("<html>dashboard</html>")).await
    }

    /// Login succeeds and the session probe answers with `probe`.
    pub async fn start_with_probe(probe: ResponseTemplate) -> Self {
        let portal = Self {
            server: MockServer::start().await,
        };
        portal.mount_login().await;
        portal.mount_probe(probe).await;
        portal
    }

    /// Login page, credential post landing on `/portal/home`, and the token page.
    pub async fn mount_login(&self) {
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(html(login_page()))
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .respond_with(redirect("/portal/home"))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/portal/home"))
            .respond_with(html("<html>welcome</html>"))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/portal/sms/received"))
            .respond_with(html(received_page()))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_probe(&self, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/portal"))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_summaries(&self, body: String) {
        Mock::given(method("POST"))
            .and(path("/portal/sms/received/getsms"))
            .respond_with(html(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_numbers(&self, range_name: &str, numbers: &[&str]) {
        Mock::given(method("POST"))
            .and(path("/portal/sms/received/getsms/number"))
            .and(body_string_contains(format!("range={range_name}")))
            .respond_with(html(numbers_html(numbers)))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_message(&self, number: &str, body: &str) {
        Mock::given(method("POST"))
            .and(path("/portal/sms/received/getsms/number/sms"))
            .and(body_string_contains(format!("Number={number}&")))
            .respond_with(html(message_html(body)))
            .mount(&self.server)
            .await;
    }

    pub fn settings(&self) -> PortalSettings {
        PortalSettings {
            base_url: self.server.uri(),
            request_timeout: Duration::from_secs(5),
            session: SessionPolicy {
                max_age: Duration::from_secs(2 * 60 * 60),
                reauth_cooldown: Duration::ZERO,
            },
            ..PortalSettings::default()
        }
    }

    pub fn session_manager(&self) -> SessionManager {
        SessionManager::new(self.settings(), credentials())
    }

    /// `(method, path)` of every request received so far, in arrival order.
    pub async fn request_log(&self) -> Vec<(String, String)> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|request| (request.method.to_string(), request.url.path().to_string()))
            .collect()
    }

    pub async fn count(&self, verb: &str, route: &str) -> usize {
        self.request_log()
            .await
            .iter()
            .filter(|(m, p)| m == verb && p == route)
            .count()
    }

    pub fn reconciler(
        &self,
        store: SnapshotStore,
        notifier: RecordingNotifier,
    ) -> Reconciler<RecordingNotifier> {
        Reconciler::new(
            Portal::new(self.settings()),
            self.session_manager(),
            store,
            Outbox::new(notifier),
        )
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        email: "ops@example.com".to_string(),
        password: "hunter2".to_string(),
    }
}

pub fn window() -> ReportWindow {
    ReportWindow::starting(NaiveDate::from_ymd_opt(2025, 8, 9).unwrap())
}

/// Notifier that records every message and optionally fails.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Message>>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    pub fn numbers(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.number).collect()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &Message) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.failing {
            return Err(NotifyError::Rejected("sink offline".to_string()));
        }
        Ok(())
    }
}
