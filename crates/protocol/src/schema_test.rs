//! Tests for the standard event name table

use std::collections::HashSet;
use std::str::FromStr;

use crate::schema::EventName;

#[test]
fn test_wire_strings() {
    assert_eq!(EventName::PageView.as_str(), "$pageview");
    assert_eq!(EventName::OrderCompleted.as_str(), "order_completed");
    assert_eq!(EventName::OrderRefunded.as_str(), "order_refunded");
    assert_eq!(EventName::SignedUp.as_str(), "signed_up");
    assert_eq!(EventName::ButtonClick.as_str(), "button_clicked");
    assert_eq!(EventName::AiCompletion.as_str(), "ai.completion");
    assert_eq!(EventName::Exception.as_str(), "$exception");
}

#[test]
fn test_all_names_unique() {
    let names: HashSet<&str> = EventName::ALL.iter().map(|n| n.as_str()).collect();
    assert_eq!(names.len(), EventName::ALL.len());
}

#[test]
fn test_from_str_every_name() {
    for name in EventName::ALL {
        assert_eq!(EventName::from_str(name.as_str()).unwrap(), name);
    }
}

#[test]
fn test_from_str_unknown() {
    let err = EventName::from_str("order_shipped").unwrap_err();
    assert!(err.to_string().contains("order_shipped"));
}

#[test]
fn test_display_matches_as_str() {
    assert_eq!(EventName::ProductAdded.to_string(), "product_added");
}

#[test]
fn test_is_commerce() {
    assert!(EventName::OrderCompleted.is_commerce());
    assert!(EventName::ProductViewed.is_commerce());
    assert!(!EventName::PageView.is_commerce());
    assert!(!EventName::SignedUp.is_commerce());
}
