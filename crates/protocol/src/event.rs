//! The canonical wide event record
//!
//! `RawEvent` is the single shape written to the primary store. Every field
//! except the identity pair is optional on the wire: empty strings, empty maps
//! and zero numerics are omitted from JSON and take column defaults in storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::schema::EventName;
use crate::DEFAULT_LIB;

/// Free-form JSON properties attached to an event
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Take the map out of a JSON object; anything else yields no properties
pub fn into_properties(value: serde_json::Value) -> Properties {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Properties::new(),
    }
}

#[inline]
fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

#[inline]
fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

/// Unified event record written to the primary store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    // Core identifiers
    /// User (or anonymous session) identifier
    pub distinct_id: String,
    /// Event name, usually one of `EventName`
    pub event: String,

    // Tenant
    /// Organization scoping the event (never validated here)
    pub organization_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub project_id: String,

    // Session
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub visit_id: String,

    // Properties
    #[serde(skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
    #[serde(skip_serializing_if = "Properties::is_empty")]
    pub person_properties: Properties,

    // Group
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub group_key: String,
    #[serde(skip_serializing_if = "Properties::is_empty")]
    pub group_properties: Properties,

    // Web analytics
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url_path: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub referrer: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub referrer_domain: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,

    // Device
    #[serde(skip_serializing_if = "String::is_empty")]
    pub browser: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub browser_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub os: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub os_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub device_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub screen: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub language: String,

    // Geo
    #[serde(skip_serializing_if = "String::is_empty")]
    pub country: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub city: String,

    // UTM
    #[serde(skip_serializing_if = "String::is_empty")]
    pub utm_source: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub utm_medium: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub utm_campaign: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub utm_content: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub utm_term: String,

    // Click IDs
    #[serde(skip_serializing_if = "String::is_empty")]
    pub gclid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub fbclid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub msclkid: String,

    // Request
    #[serde(skip_serializing_if = "String::is_empty")]
    pub ip: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user_agent: String,

    // Commerce
    #[serde(skip_serializing_if = "String::is_empty")]
    pub order_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub product_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cart_id: String,
    /// Revenue in the order currency; negative for refunds
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub revenue: f64,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub quantity: u32,

    // Structured page data (JSON-LD)
    #[serde(rename = "@context", skip_serializing_if = "String::is_empty")]
    pub ast_context: String,
    #[serde(rename = "@type", skip_serializing_if = "String::is_empty")]
    pub ast_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub page_title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub page_description: String,
    /// Page kind (hero, block, cta, ...)
    #[serde(skip_serializing_if = "String::is_empty")]
    pub page_type: String,

    // Element interaction
    #[serde(skip_serializing_if = "String::is_empty")]
    pub element_id: String,
    /// button, link, form, section
    #[serde(skip_serializing_if = "String::is_empty")]
    pub element_type: String,
    /// CSS selector
    #[serde(skip_serializing_if = "String::is_empty")]
    pub element_selector: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub element_text: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub element_href: String,

    // Sections
    #[serde(skip_serializing_if = "String::is_empty")]
    pub section_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub section_type: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub section_id: String,

    // Component hierarchy
    /// e.g. "header/nav/menu/item"
    #[serde(skip_serializing_if = "String::is_empty")]
    pub component_path: String,
    /// JSON blob of component props
    #[serde(skip_serializing_if = "String::is_empty")]
    pub component_data: String,

    // AI usage
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model_provider: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub model_name: String,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub token_count: u32,
    #[serde(skip_serializing_if = "is_zero_f64")]
    pub token_price: f64,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub prompt_tokens: u32,
    #[serde(skip_serializing_if = "is_zero_u32")]
    pub output_tokens: u32,

    // Timestamps
    /// When the event happened (defaults to write time)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// When the event was handed to a writer (defaults to write time)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,

    // Library
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lib: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub lib_version: String,
}

impl RawEvent {
    /// Create an event with the identity pair set and everything else empty
    pub fn new(distinct_id: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            distinct_id: distinct_id.into(),
            event: event.into(),
            ..Default::default()
        }
    }

    /// Create an event for one of the standard names
    pub fn named(distinct_id: impl Into<String>, name: EventName) -> Self {
        Self::new(distinct_id, name)
    }

    /// Set the organization
    #[must_use]
    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = organization_id.into();
        self
    }

    /// Set the event timestamp
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Insert a single property
    #[must_use]
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Fill in write-time defaults
    ///
    /// Unset `timestamp` and `sent_at` become `now`; an empty `lib` becomes
    /// [`DEFAULT_LIB`]. Fields already set are left alone.
    pub fn apply_defaults(&mut self, now: DateTime<Utc>) {
        if self.timestamp.is_none() {
            self.timestamp = Some(now);
        }
        if self.sent_at.is_none() {
            self.sent_at = Some(now);
        }
        if self.lib.is_empty() {
            self.lib = DEFAULT_LIB.to_string();
        }
    }

    /// Parse the event name against the standard table
    pub fn event_name(&self) -> Option<EventName> {
        self.event.parse().ok()
    }

    /// Encode to a JSON string
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::encode("event", e))
    }

    /// Decode from a JSON string (one line of a JSON-lines stream)
    pub fn from_json(s: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(s).map_err(ProtocolError::Decode)
    }
}
