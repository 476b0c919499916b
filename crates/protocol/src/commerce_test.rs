//! Tests for commerce input types

use crate::commerce::{Order, OrderItem, PageView};

fn order_with_items(quantities: &[u32]) -> Order {
    Order {
        id: "o1".into(),
        user_id: "u1".into(),
        items: quantities
            .iter()
            .enumerate()
            .map(|(i, q)| OrderItem {
                product_id: format!("p{}", i),
                quantity: *q,
                price: 9.99,
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

#[test]
fn test_total_quantity() {
    assert_eq!(order_with_items(&[2, 3, 1]).total_quantity(), 6);
}

#[test]
fn test_total_quantity_saturates() {
    assert_eq!(order_with_items(&[u32::MAX, 1]).total_quantity(), u32::MAX);
    assert_eq!(order_with_items(&[u32::MAX - 1, 1, 0]).total_quantity(), u32::MAX);
}

#[test]
fn test_total_quantity_empty() {
    assert_eq!(order_with_items(&[]).total_quantity(), 0);
}

#[test]
fn test_item_values_shape() {
    let order = order_with_items(&[2]);
    let values = order.item_values();

    assert_eq!(values.len(), 1);
    assert_eq!(values[0]["product_id"], "p0");
    assert_eq!(values[0]["quantity"], 2);
    assert_eq!(values[0]["price"], 9.99);
    assert_eq!(values[0]["sku"], "");
}

#[test]
fn test_page_view_distinct_id_prefers_user() {
    let pv = PageView {
        user_id: "u1".into(),
        session_id: "s1".into(),
        ..Default::default()
    };
    assert_eq!(pv.distinct_id(), "u1");
}

#[test]
fn test_page_view_distinct_id_falls_back_to_session() {
    let pv = PageView {
        session_id: "s1".into(),
        ..Default::default()
    };
    assert_eq!(pv.distinct_id(), "s1");
}

#[test]
fn test_order_deserialize_partial() {
    let order: Order = serde_json::from_str(r#"{"id": "o9", "total": 5.5}"#).unwrap();
    assert_eq!(order.id, "o9");
    assert_eq!(order.total, 5.5);
    assert!(order.items.is_empty());
}
