//! Decoded event envelope and kind classification.
//!
//! Events arrive as JSON envelopes produced by the site's dataLayer. The
//! envelope always carries the flat interaction fields; the nested
//! `ecommerce` payload holds line items for views and a purchase payload
//! for purchases. Fields the producer emits as numbers (price, quantity)
//! are accepted as either JSON strings or numbers and carried as text;
//! the destination schema treats them as text, so no coercion happens here.
//!
//! # Classification
//!
//! The `event` field is the kind discriminant. Classification is total and
//! side-effect-free: an event matching none of the recognized kinds is
//! simply excluded from every downstream branch.
//!
//! ```
//! use retailstream_core::event::{Event, EventKind};
//!
//! let payload = serde_json::json!({
//!     "event_datetime": "2024-11-05 14:44:12",
//!     "event": "purchase",
//!     "user_id": "UID00003",
//!     "client_id": "CID-9",
//!     "page": "/checkout",
//!     "page_previous": "/basket",
//!     "ecommerce": { "purchase": { "value": 42.5 } }
//! });
//! let event: Event = serde_json::from_value(payload).unwrap();
//! assert_eq!(event.kind(), Some(EventKind::Purchase));
//! assert!(event.is_purchase());
//! assert!(!event.is_item_view());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminant value for item view events.
pub const EVENT_ITEM_VIEW: &str = "view_item";
/// Discriminant value for add-to-cart events.
pub const EVENT_ADD_TO_CART: &str = "add_to_cart";
/// Discriminant value for purchase events.
pub const EVENT_PURCHASE: &str = "purchase";

/// Recognized event kinds.
///
/// `AddToCart` is classified but not consumed by any destination today; it
/// is a reserved extension point for a future cart sink, not dead code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A product detail view (`view_item`).
    ItemView,
    /// An add-to-cart interaction (`add_to_cart`).
    AddToCart,
    /// A completed purchase (`purchase`).
    Purchase,
}

impl EventKind {
    /// The discriminant string this kind matches.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ItemView => EVENT_ITEM_VIEW,
            Self::AddToCart => EVENT_ADD_TO_CART,
            Self::Purchase => EVENT_PURCHASE,
        }
    }
}

/// A decoded e-commerce interaction event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    /// When the interaction happened, producer-reported.
    #[serde(deserialize_with = "de::event_datetime")]
    pub event_datetime: DateTime<Utc>,
    /// Kind discriminant (`view_item`, `add_to_cart`, `purchase`, ...).
    pub event: String,
    /// Site user identifier; the aggregation key.
    pub user_id: String,
    /// Browser client identifier.
    pub client_id: String,
    /// Page the interaction happened on.
    pub page: String,
    /// Page the user came from.
    pub page_previous: String,
    /// Nested commerce payload; absent sections default to empty.
    #[serde(default)]
    pub ecommerce: Ecommerce,
}

impl Event {
    /// Classify this event, or `None` when the kind is unrecognized.
    #[must_use]
    pub fn kind(&self) -> Option<EventKind> {
        match self.event.as_str() {
            EVENT_ITEM_VIEW => Some(EventKind::ItemView),
            EVENT_ADD_TO_CART => Some(EventKind::AddToCart),
            EVENT_PURCHASE => Some(EventKind::Purchase),
            _ => None,
        }
    }

    /// Whether this event is a product detail view.
    #[must_use]
    pub fn is_item_view(&self) -> bool {
        self.event == EVENT_ITEM_VIEW
    }

    /// Whether this event is an add-to-cart interaction.
    #[must_use]
    pub fn is_add_to_cart(&self) -> bool {
        self.event == EVENT_ADD_TO_CART
    }

    /// Whether this event is a completed purchase.
    #[must_use]
    pub fn is_purchase(&self) -> bool {
        self.event == EVENT_PURCHASE
    }
}

/// Nested commerce payload.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ecommerce {
    /// Line items, populated for views and cart interactions.
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// Purchase payload, populated for purchases.
    #[serde(default)]
    pub purchase: Option<PurchasePayload>,
}

/// One line item of the nested item list.
///
/// Every field is optional; projection carries nulls for whatever the
/// producer left out rather than failing the record.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LineItem {
    /// Product display name.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub item_name: Option<String>,
    /// Product identifier.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub item_id: Option<String>,
    /// Unit price, carried as text.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub price: Option<String>,
    /// Brand name.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub item_brand: Option<String>,
    /// Primary category.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub item_category: Option<String>,
    /// Second-level category.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub item_category_2: Option<String>,
    /// Third-level category.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub item_category_3: Option<String>,
    /// Fourth-level category.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub item_category_4: Option<String>,
    /// Product variant.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub item_variant: Option<String>,
    /// Name of the list the item was presented in.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub item_list_name: Option<String>,
    /// Identifier of the list the item was presented in.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub item_list_id: Option<String>,
    /// Quantity, carried as text.
    #[serde(default, deserialize_with = "de::lenient_text")]
    pub quantity: Option<String>,
}

/// Purchase payload of a purchase event.
///
/// The value stays a raw JSON value here: a non-numeric value must fail
/// that single contribution inside the aggregation engine (as a
/// [`ValueParseError`](crate::error::ValueParseError)), never the decode.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PurchasePayload {
    /// Monetary value of the purchase, parsed downstream.
    #[serde(default)]
    pub value: serde_json::Value,
}

pub(crate) mod de {
    //! Serde helpers for the producer's envelope quirks.

    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    /// Parse an event timestamp from either RFC 3339 or the dataLayer's
    /// `YYYY-MM-DD HH:MM:SS` form (assumed UTC).
    pub(crate) fn event_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_event_datetime(&raw).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_event_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .map(|naive| naive.and_utc())
            .map_err(|_| format!("unrecognized event_datetime: {raw}"))
    }

    /// Accept a JSON string or scalar and carry it as text.
    ///
    /// The producer emits price and quantity as numbers in some surfaces
    /// and strings in others; the destination columns are text either way.
    pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(text)) => Some(text),
            Some(other) => Some(other.to_string()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn event_with_kind(kind: &str) -> Event {
        serde_json::from_value(serde_json::json!({
            "event_datetime": "2024-11-05 14:44:12",
            "event": kind,
            "user_id": "UID00001",
            "client_id": "CID-1",
            "page": "/product/1",
            "page_previous": "/home",
        }))
        .unwrap()
    }

    #[test]
    fn predicates_are_independent() {
        let view = event_with_kind("view_item");
        assert!(view.is_item_view());
        assert!(!view.is_add_to_cart());
        assert!(!view.is_purchase());

        let cart = event_with_kind("add_to_cart");
        assert!(cart.is_add_to_cart());
        assert!(!cart.is_item_view());
        assert!(!cart.is_purchase());

        let purchase = event_with_kind("purchase");
        assert!(purchase.is_purchase());
        assert!(!purchase.is_item_view());
        assert!(!purchase.is_add_to_cart());
    }

    #[test]
    fn unrecognized_kind_classifies_as_none() {
        let scroll = event_with_kind("scroll_depth");
        assert_eq!(scroll.kind(), None);
        assert!(!scroll.is_item_view());
        assert!(!scroll.is_add_to_cart());
        assert!(!scroll.is_purchase());
    }

    #[test]
    fn kind_round_trips_discriminant() {
        for kind in [EventKind::ItemView, EventKind::AddToCart, EventKind::Purchase] {
            assert_eq!(event_with_kind(kind.as_str()).kind(), Some(kind));
        }
    }

    #[test]
    fn datetime_accepts_datalayer_and_rfc3339_forms() {
        let plain = de::parse_event_datetime("2024-11-05 14:44:12").unwrap();
        let rfc = de::parse_event_datetime("2024-11-05T14:44:12Z").unwrap();
        assert_eq!(plain, rfc);

        assert!(de::parse_event_datetime("05/11/2024").is_err());
    }

    #[test]
    fn numeric_item_fields_are_carried_as_text() {
        let item: LineItem = serde_json::from_value(serde_json::json!({
            "item_name": "Classic Koi Tee",
            "item_id": "SKU-114",
            "price": 19.99,
            "quantity": 2,
        }))
        .unwrap();

        assert_eq!(item.price.as_deref(), Some("19.99"));
        assert_eq!(item.quantity.as_deref(), Some("2"));
        assert_eq!(item.item_brand, None);
    }

    #[test]
    fn missing_ecommerce_section_defaults_to_empty() {
        let event = event_with_kind("view_item");
        assert!(event.ecommerce.items.is_empty());
        assert!(event.ecommerce.purchase.is_none());
    }

    proptest::proptest! {
        /// Whatever scalar the producer emits for price/quantity, the
        /// lenient decode carries it as text instead of failing the event.
        #[test]
        fn numeric_scalars_never_fail_lenient_decode(price in proptest::num::f64::NORMAL, quantity in 0u32..1000) {
            let item: LineItem = serde_json::from_value(serde_json::json!({
                "price": price,
                "quantity": quantity,
            }))
            .unwrap();
            proptest::prop_assert!(item.price.is_some());
            let quantity_str = quantity.to_string();
            proptest::prop_assert_eq!(item.quantity.as_deref(), Some(quantity_str.as_str()));
        }
    }

    #[test]
    fn purchase_value_survives_as_raw_json() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "event_datetime": "2024-11-05 14:44:12",
            "event": "purchase",
            "user_id": "UID00002",
            "client_id": "CID-2",
            "page": "/checkout",
            "page_previous": "/basket",
            "ecommerce": { "purchase": { "value": "not-a-number" } }
        }))
        .unwrap();

        let purchase = event.ecommerce.purchase.unwrap();
        assert_eq!(purchase.value, serde_json::json!("not-a-number"));
    }
}
