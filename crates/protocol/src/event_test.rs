//! Tests for RawEvent

use chrono::{TimeZone, Utc};

use crate::event::{RawEvent, into_properties};
use crate::schema::EventName;
use crate::DEFAULT_LIB;

// =============================================================================
// Defaults
// =============================================================================

#[test]
fn test_apply_defaults_fills_unset_fields() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut event = RawEvent::new("u1", "custom");

    event.apply_defaults(now);

    assert_eq!(event.timestamp, Some(now));
    assert_eq!(event.sent_at, Some(now));
    assert_eq!(event.lib, DEFAULT_LIB);
}

#[test]
fn test_apply_defaults_keeps_existing_values() {
    let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut event = RawEvent::new("u1", "custom").with_timestamp(earlier);
    event.lib = "storefront-js".into();

    event.apply_defaults(now);

    assert_eq!(event.timestamp, Some(earlier));
    assert_eq!(event.sent_at, Some(now));
    assert_eq!(event.lib, "storefront-js");
}

// =============================================================================
// Builders
// =============================================================================

#[test]
fn test_named_uses_wire_string() {
    let event = RawEvent::named("u1", EventName::OrderCompleted);
    assert_eq!(event.event, "order_completed");
    assert_eq!(event.event_name(), Some(EventName::OrderCompleted));
}

#[test]
fn test_event_name_custom() {
    let event = RawEvent::new("u1", "my_custom_event");
    assert_eq!(event.event_name(), None);
}

#[test]
fn test_with_property_and_organization() {
    let event = RawEvent::new("u1", "x")
        .with_organization("org1")
        .with_property("plan", "pro")
        .with_property("seats", 3);

    assert_eq!(event.organization_id, "org1");
    assert_eq!(event.properties["plan"], "pro");
    assert_eq!(event.properties["seats"], 3);
}

// =============================================================================
// JSON
// =============================================================================

#[test]
fn test_json_omits_empty_fields() {
    let json = RawEvent::new("u1", "x").to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let obj = value.as_object().unwrap();

    assert_eq!(obj["distinct_id"], "u1");
    assert_eq!(obj["event"], "x");
    assert!(obj.contains_key("organization_id"));
    assert!(!obj.contains_key("url"));
    assert!(!obj.contains_key("revenue"));
    assert!(!obj.contains_key("properties"));
    assert!(!obj.contains_key("timestamp"));
}

#[test]
fn test_json_structured_data_keys() {
    let mut event = RawEvent::new("u1", "section_viewed");
    event.ast_context = "https://schema.org".into();
    event.ast_type = "WebPage".into();

    let json = event.to_json().unwrap();
    assert!(json.contains(r#""@context":"https://schema.org""#));
    assert!(json.contains(r#""@type":"WebPage""#));
}

#[test]
fn test_from_json_line() {
    let line = r#"{"distinct_id":"u7","event":"$pageview","organization_id":"org","url":"https://shop.example.com/a","revenue":1.5,"timestamp":"2024-05-01T12:00:00Z"}"#;
    let event = RawEvent::from_json(line).unwrap();

    assert_eq!(event.distinct_id, "u7");
    assert_eq!(event.event_name(), Some(EventName::PageView));
    assert_eq!(event.url, "https://shop.example.com/a");
    assert_eq!(event.revenue, 1.5);
    assert_eq!(
        event.timestamp,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    );
}

#[test]
fn test_from_json_invalid() {
    assert!(RawEvent::from_json("not json").is_err());
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_into_properties() {
    let props = into_properties(serde_json::json!({"order_id": "o1", "total": 5}));
    assert_eq!(props.len(), 2);
    assert_eq!(props["order_id"], "o1");

    assert!(into_properties(serde_json::json!(["not", "an", "object"])).is_empty());
    assert!(into_properties(serde_json::Value::Null).is_empty());
}
