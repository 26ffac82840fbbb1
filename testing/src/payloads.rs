//! JSON envelope builders shaped like the production dataLayer payloads.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity

use chrono::Utc;
use retailstream_core::source::RawMessage;

/// Wrap a JSON envelope as a raw message.
#[must_use]
pub fn message(id: u64, payload: &serde_json::Value) -> RawMessage {
    RawMessage::new(
        id.to_string(),
        Utc::now(),
        serde_json::to_vec(payload).unwrap(),
    )
}

/// A message whose payload is not JSON at all.
#[must_use]
pub fn garbage_message(id: u64) -> RawMessage {
    RawMessage::new(id.to_string(), Utc::now(), b"not json at all".to_vec())
}

/// A `view_item` envelope with a single fully-populated line item.
#[must_use]
pub fn view_message(id: u64, user_id: &str) -> RawMessage {
    view_message_with_items(
        id,
        user_id,
        serde_json::json!([{
            "item_name": "Classic Koi Tee",
            "item_id": "SKU-114",
            "price": "19.99",
            "item_brand": "Koi",
            "item_category": "Apparel",
            "item_category_2": "Tops",
            "item_category_3": "Tees",
            "item_category_4": "Crew",
            "item_variant": "Black",
            "item_list_name": "New Arrivals",
            "item_list_id": "list-7",
            "quantity": "1"
        }]),
    )
}

/// A `view_item` envelope with caller-supplied items (possibly empty).
#[must_use]
pub fn view_message_with_items(id: u64, user_id: &str, items: serde_json::Value) -> RawMessage {
    message(
        id,
        &serde_json::json!({
            "event_datetime": "2024-11-05 14:44:12",
            "event": "view_item",
            "user_id": user_id,
            "client_id": format!("CID-{user_id}"),
            "page": "/product/114",
            "page_previous": "/category/tees",
            "ecommerce": { "items": items }
        }),
    )
}

/// An `add_to_cart` envelope.
#[must_use]
pub fn cart_message(id: u64, user_id: &str) -> RawMessage {
    message(
        id,
        &serde_json::json!({
            "event_datetime": "2024-11-05 14:45:02",
            "event": "add_to_cart",
            "user_id": user_id,
            "client_id": format!("CID-{user_id}"),
            "page": "/product/114",
            "page_previous": "/product/114",
            "ecommerce": {
                "items": [{ "item_id": "SKU-114", "quantity": "1" }]
            }
        }),
    )
}

/// A `purchase` envelope with a numeric value.
#[must_use]
pub fn purchase_message(id: u64, user_id: &str, value: f64) -> RawMessage {
    purchase_message_with_value(id, user_id, &serde_json::json!(value))
}

/// A `purchase` envelope with an arbitrary raw value (for malformed cases).
#[must_use]
pub fn purchase_message_with_value(
    id: u64,
    user_id: &str,
    value: &serde_json::Value,
) -> RawMessage {
    message(
        id,
        &serde_json::json!({
            "event_datetime": "2024-11-05 14:46:40",
            "event": "purchase",
            "user_id": user_id,
            "client_id": format!("CID-{user_id}"),
            "page": "/checkout/complete",
            "page_previous": "/checkout",
            "ecommerce": { "purchase": { "value": value } }
        }),
    )
}
