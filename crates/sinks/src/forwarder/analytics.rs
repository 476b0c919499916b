//! Analytics destination (Umami-compatible send API)
//!
//! Every event is its own `POST {endpoint}/api/send` with body
//! `{"type": "event" | "identify", "payload": {"website": ..., ...}}`.

use serde::Serialize;
use serde_json::Value;
use tally_protocol::Properties;

use super::{ForwarderError, HttpDestination, HttpForwarder};

/// Forwarder for the Analytics API
pub type AnalyticsForwarder = HttpForwarder<Analytics>;

/// Analytics destination
#[derive(Debug, Clone)]
pub struct Analytics {
    website_id: String,
}

impl Analytics {
    /// Create a destination for the given website
    pub fn new(website_id: impl Into<String>) -> Self {
        Self {
            website_id: website_id.into(),
        }
    }
}

/// Envelope type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsEventKind {
    Event,
    Identify,
}

/// One Analytics request
///
/// Unset fields are left out of the payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsEvent {
    pub kind: Option<AnalyticsEventKind>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
    pub referrer: Option<String>,
    pub hostname: Option<String>,
    pub language: Option<String>,
    pub screen: Option<String>,
    pub session: Option<String>,
    pub data: Option<Properties>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

impl AnalyticsEvent {
    /// Page view
    pub fn page_view(
        url: &str,
        title: &str,
        referrer: &str,
        hostname: &str,
        language: &str,
        screen: &str,
    ) -> Self {
        Self {
            kind: Some(AnalyticsEventKind::Event),
            url: Some(url.to_string()),
            title: non_empty(title),
            referrer: non_empty(referrer),
            hostname: non_empty(hostname),
            language: non_empty(language),
            screen: non_empty(screen),
            ..Self::default()
        }
    }

    /// Named custom event
    pub fn custom(name: impl Into<String>, data: Properties) -> Self {
        Self {
            kind: Some(AnalyticsEventKind::Event),
            name: Some(name.into()),
            data: Some(data),
            ..Self::default()
        }
    }

    /// Commerce event; `extra` is merged over `order_id` and `total`
    pub fn commerce(name: impl Into<String>, order_id: &str, total: f64, extra: Properties) -> Self {
        let mut data = Properties::new();
        data.insert("order_id".into(), Value::from(order_id));
        data.insert("total".into(), Value::from(total));
        data.extend(extra);
        Self::custom(name, data)
    }

    /// Attach data to a session
    pub fn identify(session: impl Into<String>, data: Properties) -> Self {
        Self {
            kind: Some(AnalyticsEventKind::Identify),
            session: Some(session.into()),
            data: Some(data),
            ..Self::default()
        }
    }

    /// Set the page URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    #[serde(rename = "type")]
    kind: AnalyticsEventKind,
    payload: Payload<'a>,
}

#[derive(Serialize)]
struct Payload<'a> {
    website: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    referrer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hostname: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    screen: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Properties>,
}

impl HttpDestination for Analytics {
    type Event = AnalyticsEvent;

    fn name(&self) -> &'static str {
        "analytics"
    }

    fn path(&self) -> &'static str {
        "/api/send"
    }

    fn encode(&self, events: &[AnalyticsEvent]) -> Result<Vec<Vec<u8>>, ForwarderError> {
        events
            .iter()
            .map(|event| {
                let envelope = Envelope {
                    kind: event.kind.unwrap_or(AnalyticsEventKind::Event),
                    payload: Payload {
                        website: &self.website_id,
                        name: event.name.as_deref(),
                        url: event.url.as_deref(),
                        title: event.title.as_deref(),
                        referrer: event.referrer.as_deref(),
                        hostname: event.hostname.as_deref(),
                        language: event.language.as_deref(),
                        screen: event.screen.as_deref(),
                        session: event.session.as_deref(),
                        data: event.data.as_ref(),
                    },
                };
                serde_json::to_vec(&envelope).map_err(|e| ForwarderError::encode("analytics event", e))
            })
            .collect()
    }
}
