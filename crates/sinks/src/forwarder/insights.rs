//! Insights destination (PostHog-compatible capture API)
//!
//! A flush is one `POST {endpoint}/batch/` whose body is a JSON array of
//! captures, each carrying the project API key.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tally_protocol::{DEFAULT_LIB, EventName, LIB_METHOD, Properties, into_properties};

use super::{ForwarderConfig, ForwarderError, HttpDestination, HttpForwarder};

/// Default events per flush
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default flush interval
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Forwarder for the Insights API
pub type InsightsForwarder = HttpForwarder<Insights>;

/// Insights destination
#[derive(Debug, Clone)]
pub struct Insights {
    api_key: String,
}

impl Insights {
    /// Create a destination for the given project API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

impl ForwarderConfig {
    /// Config with the Insights defaults (100 / 30s / 10s, async)
    pub fn insights(endpoint: impl Into<String>) -> Self {
        Self::new(endpoint)
            .with_batch_size(DEFAULT_BATCH_SIZE)
            .with_flush_interval(DEFAULT_FLUSH_INTERVAL)
            .with_timeout(DEFAULT_TIMEOUT)
    }
}

#[derive(Serialize)]
struct CaptureBody<'a> {
    api_key: &'a str,
    event: &'a str,
    distinct_id: &'a str,
    properties: &'a Properties,
    timestamp: String,
    sent_at: String,
}

fn rfc3339(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl HttpDestination for Insights {
    type Event = Capture;

    fn name(&self) -> &'static str {
        "insights"
    }

    fn path(&self) -> &'static str {
        "/batch/"
    }

    fn encode(&self, events: &[Capture]) -> Result<Vec<Vec<u8>>, ForwarderError> {
        let batch: Vec<CaptureBody<'_>> = events
            .iter()
            .map(|c| CaptureBody {
                api_key: &self.api_key,
                event: &c.event,
                distinct_id: &c.distinct_id,
                properties: &c.properties,
                timestamp: rfc3339(&c.timestamp),
                sent_at: rfc3339(&c.sent_at),
            })
            .collect();

        let body = serde_json::to_vec(&batch).map_err(|e| ForwarderError::encode("captures", e))?;
        Ok(vec![body])
    }
}

// =============================================================================
// Captures
// =============================================================================

/// One captured event
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub event: String,
    pub distinct_id: String,
    pub properties: Properties,
    pub timestamp: DateTime<Utc>,
    pub sent_at: DateTime<Utc>,
}

impl Capture {
    /// Capture an event now
    pub fn new(
        distinct_id: impl Into<String>,
        event: impl Into<String>,
        properties: Properties,
    ) -> Self {
        let now = Utc::now();
        Self {
            event: event.into(),
            distinct_id: distinct_id.into(),
            properties,
            timestamp: now,
            sent_at: now,
        }
    }

    /// Commerce order event with library markers
    pub fn order(
        distinct_id: impl Into<String>,
        event: EventName,
        order_id: &str,
        total: f64,
        items: Vec<Value>,
    ) -> Self {
        let item_count = items.len();
        Self::new(
            distinct_id,
            event,
            into_properties(json!({
                "order_id": order_id,
                "total": total,
                "items": items,
                "item_count": item_count,
                "$lib": DEFAULT_LIB,
                "$lib_method": LIB_METHOD,
            })),
        )
    }

    /// Page view
    pub fn page_view(distinct_id: impl Into<String>, url: &str, title: &str, referrer: &str) -> Self {
        Self::new(
            distinct_id,
            EventName::PageView,
            into_properties(json!({
                "$current_url": url,
                "title": title,
                "$referrer": referrer,
                "$lib": DEFAULT_LIB,
            })),
        )
    }

    /// Set person properties
    pub fn identify(distinct_id: impl Into<String>, set: Properties) -> Self {
        let mut properties = Properties::new();
        properties.insert("$set".into(), Value::Object(set));
        Self::new(distinct_id, EventName::Identify, properties)
    }

    /// Set group properties; the group gets its own `$<type>_<key>` identity
    pub fn group_identify(group_type: &str, group_key: &str, set: Properties) -> Self {
        let distinct_id = format!("${group_type}_{group_key}");
        Self::new(
            distinct_id.clone(),
            EventName::GroupIdentify,
            into_properties(json!({
                "$group_type": group_type,
                "$group_key": group_key,
                "$group_set": set,
                "distinct_id": distinct_id,
                "$process_person_profile": false,
            })),
        )
    }
}
