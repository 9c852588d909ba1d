use chrono::{Days, Local, NaiveDate};
use relay_core::{MessageDetail, Number, Range};
use relay_logging::relay_debug;
use reqwest::multipart;

use crate::http::{send_authenticated, xhr};
use crate::parse::{parse_message, parse_numbers, parse_range_summaries};
use crate::{PortalSettings, RelayError, Session};

const RECEIVED_PATH: &str = "/portal/sms/received";
const SUMMARIES_PATH: &str = "/portal/sms/received/getsms";
const NUMBERS_PATH: &str = "/portal/sms/received/getsms/number";
const MESSAGE_PATH: &str = "/portal/sms/received/getsms/number/sms";

/// The reporting window `[from, to)` sent with every statistics request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl ReportWindow {
    /// One day starting at `from`.
    pub fn starting(from: NaiveDate) -> Self {
        Self {
            from,
            to: from.checked_add_days(Days::new(1)).unwrap_or(from),
        }
    }

    /// `[today, today + 1)` in local time. Recomputed every cycle.
    pub fn today() -> Self {
        Self::starting(Local::now().date_naive())
    }

    pub fn from_param(&self) -> String {
        self.from.format("%m/%d/%Y").to_string()
    }

    pub fn to_param(&self) -> String {
        self.to.format("%m/%d/%Y").to_string()
    }
}

/// Read-only statistics requests against the portal, each on a borrowed session.
#[derive(Debug, Clone)]
pub struct Portal {
    settings: PortalSettings,
}

impl Portal {
    pub fn new(settings: PortalSettings) -> Self {
        Self { settings }
    }

    pub async fn fetch_range_summaries(
        &self,
        session: &Session,
        window: &ReportWindow,
    ) -> Result<Vec<Range>, RelayError> {
        relay_debug!(
            "Fetching range summaries for {} to {}",
            window.from_param(),
            window.to_param()
        );
        let form = multipart::Form::new()
            .text("from", window.from_param())
            .text("to", window.to_param())
            .text("_token", session.csrf_token().to_string());
        let request = session
            .client()
            .post(self.settings.endpoint(SUMMARIES_PATH)?)
            .multipart(form);
        let body = send_authenticated(
            xhr(request, &self.settings, RECEIVED_PATH),
            self.settings.max_bytes,
        )
        .await?;
        Ok(parse_range_summaries(&body)?)
    }

    pub async fn fetch_numbers(
        &self,
        session: &Session,
        window: &ReportWindow,
        range_name: &str,
    ) -> Result<Vec<Number>, RelayError> {
        let to = window.to_param();
        let form = [
            ("_token", session.csrf_token()),
            ("start", ""),
            ("end", to.as_str()),
            ("range", range_name),
        ];
        let request = session
            .client()
            .post(self.settings.endpoint(NUMBERS_PATH)?)
            .form(&form);
        let body = send_authenticated(
            xhr(request, &self.settings, RECEIVED_PATH),
            self.settings.max_bytes,
        )
        .await?;
        Ok(parse_numbers(&body)?)
    }

    pub async fn fetch_message(
        &self,
        session: &Session,
        window: &ReportWindow,
        number: &Number,
        range_name: &str,
    ) -> Result<MessageDetail, RelayError> {
        let to = window.to_param();
        let form = [
            ("_token", session.csrf_token()),
            ("start", ""),
            ("end", to.as_str()),
            ("Number", number.number.as_str()),
            ("Range", range_name),
        ];
        let request = session
            .client()
            .post(self.settings.endpoint(MESSAGE_PATH)?)
            .form(&form);
        let body = send_authenticated(
            xhr(request, &self.settings, RECEIVED_PATH),
            self.settings.max_bytes,
        )
        .await?;
        Ok(parse_message(&body)?)
    }
}
