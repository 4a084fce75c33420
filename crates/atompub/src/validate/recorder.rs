use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use http::header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, ETAG, LAST_MODIFIED};
use http::{HeaderMap, StatusCode};
use strum::Display;
use thiserror::Error;

use crate::events::{Event, EventBus, FilterError, HookError, Phase};
use crate::xml;

/// Raised by a check when the running test cannot go on.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("the test cannot continue")]
pub struct StopTest;

/// How a [`Finding`] bears on the server under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Severity {
    /// A violation of Atom, AtomPub or HTTP.
    Error,
    /// Legal behavior that hurts interoperability or performance.
    Warning,
    Info,
    Success,
    /// A transcript of one side of an exchange.
    Log,
}

/// The protocol requirement a [`Finding`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Check {
    EntriesOrderedByAtomEdited,
    #[strum(serialize = "CREATE_RETURNS_201")]
    CreateReturns201,
    CreateReturnsLocation,
    CreateContentLocation,
    CreateReturnsEntry,
    CreateAppearCollection,
    PutStatusCode,
    GetStatusCode,
    DeleteStatusCode,
    SlugHeader,
    EntryLinkEdit,
    MediaEntryLinkEdit,
    HttpEtag,
    HttpLastModified,
    HttpContentEncoding,
    WellFormedXml,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub check: Option<Check>,
    pub detail: String,
}

/// The findings of one named test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestReport {
    pub name: String,
    pub description: String,
    pub findings: Vec<Finding>,
}

/// Collects the findings of a validation run, grouped by test.
///
/// Once [attached](Recorder::attach) to an [`EventBus`], every exchange is logged and the
/// responses to retrievals and creations are checked as they arrive.
#[derive(Debug, Default)]
pub struct Recorder {
    tests: Mutex<Vec<TestReport>>,
}

impl Recorder {
    /// Register the exchange log and the response checks on `bus`.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> Result<(), FilterError> {
        let this = self.clone();
        bus.register("ANY", move |headers, body, event| {
            this.log_exchange(headers, body, event);
            Ok(())
        })?;

        let this = self.clone();
        bus.register("POST_CREATE", move |headers, body, event| {
            this.check_well_formed(headers, body, event);
            Ok(())
        })?;

        let this = self.clone();
        bus.register("POST_GET", move |headers, _, event| {
            this.check_retrieval(headers, event)
        })
    }

    /// Start a new test; later findings belong to it.
    pub fn begin_test(&self, name: &str, description: &str) {
        tracing::info!(test = name, "{description}");
        self.lock().push(TestReport {
            name: name.to_owned(),
            description: description.to_owned(),
            findings: Vec::new(),
        });
    }

    pub fn error(&self, check: Check, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::error!(%check, "{detail}");
        self.push(Severity::Error, Some(check), detail);
    }

    pub fn warning(&self, check: Check, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::warn!(%check, "{detail}");
        self.push(Severity::Warning, Some(check), detail);
    }

    pub fn info(&self, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::info!("{detail}");
        self.push(Severity::Info, None, detail);
    }

    pub fn success(&self, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::info!(success = true, "{detail}");
        self.push(Severity::Success, None, detail);
    }

    pub fn log(&self, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::trace!("{detail}");
        self.push(Severity::Log, None, detail);
    }

    /// Every test run so far, in order.
    pub fn tests(&self) -> Vec<TestReport> {
        self.lock().clone()
    }

    /// Every finding so far, across tests.
    pub fn findings(&self) -> Vec<Finding> {
        self.lock()
            .iter()
            .flat_map(|test| test.findings.iter().cloned())
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        self.any(Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.any(Severity::Warning)
    }

    /// `2` when anything failed, `1` when there were only warnings, `0` otherwise.
    pub fn status(&self) -> u8 {
        if self.has_errors() {
            2
        } else if self.has_warnings() {
            1
        } else {
            0
        }
    }

    fn any(&self, severity: Severity) -> bool {
        self.lock()
            .iter()
            .flat_map(|test| &test.findings)
            .any(|finding| finding.severity == severity)
    }

    fn push(&self, severity: Severity, check: Option<Check>, detail: String) {
        let mut tests = self.lock();
        if tests.is_empty() {
            tests.push(TestReport::default());
        }
        if let Some(test) = tests.last_mut() {
            test.findings.push(Finding {
                severity,
                check,
                detail,
            });
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TestReport>> {
        self.tests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log_exchange(&self, headers: &HeaderMap, body: &[u8], event: &Event) {
        let direction = match event.phase {
            Phase::Pre => "Request",
            Phase::Post => "Response",
        };
        let mut transcript = format!("{direction}: {event}\n");
        for (name, value) in headers {
            let value = if value.is_sensitive() {
                "<redacted>"
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            transcript.push_str(&format!("{name}: {value}\n"));
        }
        if !body.is_empty() {
            transcript.push('\n');
            transcript.push_str(&describe_body(headers, body));
        }
        self.log(transcript);
    }

    fn check_well_formed(&self, headers: &HeaderMap, body: &[u8], event: &Event) {
        let created = matches!(event.status, Some(StatusCode::OK | StatusCode::CREATED));
        if !created || body.is_empty() || !is_xml(headers) {
            return;
        }
        if let Err(e) = xml::parse(body) {
            self.error(Check::WellFormedXml, format!("Not well-formed XML: {e}"));
        }
    }

    /// Retrievals must succeed, and should be cacheable.
    fn check_retrieval(&self, headers: &HeaderMap, event: &Event) -> Result<(), HookError> {
        if event.status != Some(StatusCode::OK) {
            let status = event.status.map(|s| s.as_u16()).unwrap_or_default();
            self.error(
                Check::GetStatusCode,
                format!(
                    "Could not successfully retrieve the document. Got a status code of: {status}"
                ),
            );
            return Err(Box::new(StopTest));
        }

        if !headers.contains_key(ETAG) {
            self.warning(Check::HttpEtag, "No ETag: header was sent with the response.");
            if !headers.contains_key(LAST_MODIFIED) {
                self.warning(
                    Check::HttpLastModified,
                    "No Last-Modified: header was sent with the response.",
                );
            }
        }

        let length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_default();
        if length > 0 && !headers.contains_key(CONTENT_ENCODING) {
            self.warning(
                Check::HttpContentEncoding,
                "No Content-Encoding: header was sent with the response indicating that a \
                 compressed entity body was not returned.",
            );
        }
        Ok(())
    }
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

fn is_xml(headers: &HeaderMap) -> bool {
    let essence = content_type(headers)
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    essence.ends_with("+xml") || essence.ends_with("/xml")
}

fn describe_body(headers: &HeaderMap, body: &[u8]) -> String {
    let kind = content_type(headers);
    if is_xml(headers) || kind.starts_with("text/") || kind.contains("charset") {
        String::from_utf8_lossy(body).into_owned()
    } else {
        format!("<{} bytes of {}>", body.len(), if kind.is_empty() { "data" } else { kind })
    }
}

/// The plain text report: every test with its errors, warnings and successes.
impl fmt::Display for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for test in self.lock().iter() {
            writeln!(f, "{}: {}", test.name, test.description)?;
            let shown = test
                .findings
                .iter()
                .filter(|finding| !matches!(finding.severity, Severity::Log | Severity::Info));
            for finding in shown {
                match finding.check {
                    Some(check) => {
                        writeln!(f, "  {}:{} {}", finding.severity, check, finding.detail)?
                    }
                    None => writeln!(f, "  {}: {}", finding.severity, finding.detail)?,
                }
            }
        }
        Ok(())
    }
}
