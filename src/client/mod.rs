//! HTTP client for the source's XML interface.
//!
//! One shared `reqwest::Client` behind the configuration. Transport and HTTP
//! failures are retried with exponential backoff; a logical rejection
//! (STATUS≠1) is final and never retried.

pub mod envelope;

use chrono::NaiveDate;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::config::Config;
use crate::parsers::xml::sanitize_xml;
pub use envelope::MasterKind;

const MAX_ATTEMPTS: u32 = 5;
const BACKOFF_MIN_SECS: u64 = 1;
const BACKOFF_MAX_SECS: u64 = 30;

/// Failure kinds at the source boundary.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure: connection refused, DNS, timeout. Transient;
    /// retried, and worth retrying later if it persists.
    #[error("cannot reach the source at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The source answered with a non-2xx HTTP status.
    #[error("source returned HTTP {status}")]
    Protocol { status: u16 },

    /// The source processed the request and rejected it (STATUS≠1).
    /// Check the request parameters or company name; retrying will not help.
    #[error("source rejected the request (STATUS={status}): {}", .message.as_deref().unwrap_or("no detail"))]
    Logical {
        status: String,
        message: Option<String>,
    },

    /// The response body was not well-formed XML.
    #[error("invalid XML from the source: {0}")]
    InvalidXml(String),
}

impl ClientError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Unreachable { .. } | ClientError::Protocol { .. }
        )
    }
}

/// Client for the source endpoint. Cheap to clone is not needed; the driver
/// holds exactly one for the life of a run.
pub struct TallyClient {
    http: reqwest::Client,
    base_url: String,
    company: String,
    voucher_timeout: Duration,
    master_timeout: Duration,
}

impl TallyClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Unreachable {
                url: config.tally_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(TallyClient {
            http,
            base_url: config.tally_url.clone(),
            company: config.tally_company.clone(),
            voucher_timeout: Duration::from_secs(config.voucher_timeout_secs),
            master_timeout: Duration::from_secs(config.master_timeout_secs),
        })
    }

    pub fn company(&self) -> &str {
        &self.company
    }

    /// Fetch the voucher register for a date window. Returns the raw
    /// response text, which may legitimately contain no vouchers.
    pub async fn fetch_vouchers(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<String, ClientError> {
        let body = envelope::voucher_register(from, to, &self.company);
        self.post_xml(&body, self.voucher_timeout).await
    }

    /// Fetch a master export. Master exports are large, hence the longer
    /// timeout.
    pub async fn fetch_masters(&self, kind: MasterKind) -> Result<String, ClientError> {
        let body = envelope::master_export(kind, &self.company);
        self.post_xml(&body, self.master_timeout).await
    }

    /// POST an envelope and return the validated response text.
    ///
    /// Retries transport and HTTP failures up to five attempts with
    /// exponential backoff (1s doubling, capped at 30s).
    pub async fn post_xml(&self, body: &str, timeout: Duration) -> Result<String, ClientError> {
        let mut backoff = BACKOFF_MIN_SECS;
        let mut attempt = 1;

        loop {
            match self.post_once(body, timeout).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    warn!(attempt, error = %err, "source request failed, retrying in {backoff}s");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(BACKOFF_MAX_SECS);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn post_once(&self, body: &str, timeout: Duration) -> Result<String, ClientError> {
        let response = self
            .http
            .post(&self.base_url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("Accept", "text/xml")
            .header("User-Agent", concat!("tally-rs/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| ClientError::Unreachable {
                url: self.base_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Protocol {
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Unreachable {
                url: self.base_url.clone(),
                reason: e.to_string(),
            })?;

        ensure_status_ok(&text)?;
        Ok(text)
    }
}

/// Validate a response envelope.
///
/// STATUS is usually "1" on success. Absent STATUS is accepted (older source
/// builds omit it); present-and-not-"1" is a logical rejection carrying
/// whatever LINEERROR/ERROR text the source attached. An empty DATA section
/// with STATUS=1 is fine: the caller treats it as "no rows".
pub fn ensure_status_ok(xml_text: &str) -> Result<(), ClientError> {
    let clean = sanitize_xml(xml_text);
    let mut reader = Reader::from_str(&clean);

    let mut current: Option<String> = None;
    let mut status: Option<String> = None;
    let mut line_error: Option<String> = None;
    let mut error: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                current = Some(String::from_utf8_lossy(e.name().as_ref()).into_owned());
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| ClientError::InvalidXml(e.to_string()))?
                    .trim()
                    .to_string();
                if text.is_empty() {
                    continue;
                }
                match current.as_deref() {
                    Some("STATUS") if status.is_none() => status = Some(text),
                    Some("LINEERROR") if line_error.is_none() => line_error = Some(text),
                    Some("ERROR") if error.is_none() => error = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(ClientError::InvalidXml(e.to_string())),
            Ok(_) => {}
        }
    }

    match status {
        Some(s) if s != "1" => Err(ClientError::Logical {
            status: s,
            message: line_error.or(error),
        }),
        _ => Ok(()),
    }
}
