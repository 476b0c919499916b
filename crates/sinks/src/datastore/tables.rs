//! Row type for the wide events table
//!
//! `event_id` and `_partition_date` are omitted and take their column
//! defaults (`generateUUIDv4()` and `toDate(timestamp)`).

use chrono::{DateTime, Utc};
use clickhouse::Row;
use serde::Serialize;
use tally_protocol::{Properties, RawEvent};

use super::error::StoreError;

/// Scale of the `revenue` column (Decimal64(4))
pub const REVENUE_SCALE: u32 = 4;

/// Scale of the `token_price` column (Decimal64(6))
pub const TOKEN_PRICE_SCALE: u32 = 6;

/// Convert a float to a scaled Decimal64 integer
///
/// NaN, infinities and values that do not fit in an `i64` once scaled are
/// rejected rather than clamped.
pub fn to_decimal(field: &'static str, value: f64, scale: u32) -> Result<i64, StoreError> {
    let scaled = (value * 10f64.powi(scale as i32)).round();
    // i64::MAX is not exactly representable; 2^63 is the first value out of range
    if !scaled.is_finite() || scaled >= 9_223_372_036_854_775_808.0 || scaled < i64::MIN as f64 {
        return Err(StoreError::Decimal { field, value });
    }
    Ok(scaled as i64)
}

fn encode_properties(field: &'static str, props: &Properties) -> Result<String, StoreError> {
    if props.is_empty() {
        return Ok("{}".to_string());
    }
    serde_json::to_string(props).map_err(|source| StoreError::Encode { field, source })
}

/// One row of `commerce.events`
///
/// Timestamps are milliseconds since epoch (DateTime64(3)); decimals are
/// pre-scaled integers.
#[derive(Debug, Clone, PartialEq, Row, Serialize)]
pub struct EventRow {
    pub distinct_id: String,
    pub event: String,

    pub timestamp: i64,
    pub sent_at: i64,
    pub created_at: i64,

    pub organization_id: String,
    pub project_id: String,

    pub session_id: String,
    pub visit_id: String,

    /// JSON object string
    pub properties: String,
    /// JSON object string
    pub person_properties: String,

    pub group_type: String,
    pub group_key: String,
    /// JSON object string
    pub group_properties: String,

    pub url: String,
    pub url_path: String,
    pub referrer: String,
    pub referrer_domain: String,
    pub hostname: String,

    pub browser: String,
    pub browser_version: String,
    pub os: String,
    pub os_version: String,
    pub device: String,
    pub device_type: String,
    pub screen: String,
    pub language: String,

    pub country: String,
    pub region: String,
    pub city: String,

    pub utm_source: String,
    pub utm_medium: String,
    pub utm_campaign: String,
    pub utm_content: String,
    pub utm_term: String,

    pub gclid: String,
    pub fbclid: String,
    pub msclkid: String,

    pub ip: String,
    pub user_agent: String,

    pub order_id: String,
    pub product_id: String,
    pub cart_id: String,
    /// Decimal64(4)
    pub revenue: i64,
    pub quantity: u32,

    pub ast_context: String,
    pub ast_type: String,
    pub page_title: String,
    pub page_description: String,
    pub page_type: String,

    pub element_id: String,
    pub element_type: String,
    pub element_selector: String,
    pub element_text: String,
    pub element_href: String,

    pub section_name: String,
    pub section_type: String,
    pub section_id: String,

    pub component_path: String,
    pub component_data: String,

    pub model_provider: String,
    pub model_name: String,
    pub token_count: u32,
    /// Decimal64(6)
    pub token_price: i64,
    pub prompt_tokens: u32,
    pub output_tokens: u32,

    pub lib: String,
    pub lib_version: String,
}

impl EventRow {
    /// Build a row from an event
    ///
    /// `created_at` is the write time; it also stands in for an unset
    /// `timestamp` or `sent_at`.
    pub fn from_event(event: &RawEvent, created_at: DateTime<Utc>) -> Result<Self, StoreError> {
        let created_ms = created_at.timestamp_millis();
        let millis = |t: Option<DateTime<Utc>>| t.map_or(created_ms, |t| t.timestamp_millis());

        Ok(Self {
            distinct_id: event.distinct_id.clone(),
            event: event.event.clone(),

            timestamp: millis(event.timestamp),
            sent_at: millis(event.sent_at),
            created_at: created_ms,

            organization_id: event.organization_id.clone(),
            project_id: event.project_id.clone(),

            session_id: event.session_id.clone(),
            visit_id: event.visit_id.clone(),

            properties: encode_properties("properties", &event.properties)?,
            person_properties: encode_properties("person_properties", &event.person_properties)?,

            group_type: event.group_type.clone(),
            group_key: event.group_key.clone(),
            group_properties: encode_properties("group_properties", &event.group_properties)?,

            url: event.url.clone(),
            url_path: event.url_path.clone(),
            referrer: event.referrer.clone(),
            referrer_domain: event.referrer_domain.clone(),
            hostname: event.hostname.clone(),

            browser: event.browser.clone(),
            browser_version: event.browser_version.clone(),
            os: event.os.clone(),
            os_version: event.os_version.clone(),
            device: event.device.clone(),
            device_type: event.device_type.clone(),
            screen: event.screen.clone(),
            language: event.language.clone(),

            country: event.country.clone(),
            region: event.region.clone(),
            city: event.city.clone(),

            utm_source: event.utm_source.clone(),
            utm_medium: event.utm_medium.clone(),
            utm_campaign: event.utm_campaign.clone(),
            utm_content: event.utm_content.clone(),
            utm_term: event.utm_term.clone(),

            gclid: event.gclid.clone(),
            fbclid: event.fbclid.clone(),
            msclkid: event.msclkid.clone(),

            ip: event.ip.clone(),
            user_agent: event.user_agent.clone(),

            order_id: event.order_id.clone(),
            product_id: event.product_id.clone(),
            cart_id: event.cart_id.clone(),
            revenue: to_decimal("revenue", event.revenue, REVENUE_SCALE)?,
            quantity: event.quantity,

            ast_context: event.ast_context.clone(),
            ast_type: event.ast_type.clone(),
            page_title: event.page_title.clone(),
            page_description: event.page_description.clone(),
            page_type: event.page_type.clone(),

            element_id: event.element_id.clone(),
            element_type: event.element_type.clone(),
            element_selector: event.element_selector.clone(),
            element_text: event.element_text.clone(),
            element_href: event.element_href.clone(),

            section_name: event.section_name.clone(),
            section_type: event.section_type.clone(),
            section_id: event.section_id.clone(),

            component_path: event.component_path.clone(),
            component_data: event.component_data.clone(),

            model_provider: event.model_provider.clone(),
            model_name: event.model_name.clone(),
            token_count: event.token_count,
            token_price: to_decimal("token_price", event.token_price, TOKEN_PRICE_SCALE)?,
            prompt_tokens: event.prompt_tokens,
            output_tokens: event.output_tokens,

            lib: event.lib.clone(),
            lib_version: event.lib_version.clone(),
        })
    }
}
