//! Output records: the flat view row and the per-user purchase aggregate.

use crate::error::ExtractError;
use crate::event::Event;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flat projection of a `view_item` event: one row per event.
///
/// Extraction is positional: only `items[0]` of the nested item list is
/// read. Item fields the producer left out are carried as nulls; a missing
/// field never fails the record. All item fields pass through as text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewRecord {
    /// When the view happened.
    pub event_datetime: DateTime<Utc>,
    /// Kind discriminant, restated for the destination table.
    pub event: String,
    /// Site user identifier.
    pub user_id: String,
    /// Browser client identifier.
    pub client_id: String,
    /// Page the view happened on.
    pub page: String,
    /// Page the user came from.
    pub page_previous: String,
    /// Product display name.
    pub item_name: Option<String>,
    /// Product identifier.
    pub item_id: Option<String>,
    /// Unit price, as text.
    pub price: Option<String>,
    /// Brand name.
    pub item_brand: Option<String>,
    /// Primary category.
    pub item_category: Option<String>,
    /// Second-level category.
    pub item_category_2: Option<String>,
    /// Third-level category.
    pub item_category_3: Option<String>,
    /// Fourth-level category.
    pub item_category_4: Option<String>,
    /// Product variant.
    pub item_variant: Option<String>,
    /// Name of the list the item was presented in.
    pub item_list_name: Option<String>,
    /// Identifier of the list the item was presented in.
    pub item_list_id: Option<String>,
    /// Quantity, as text.
    pub quantity: Option<String>,
}

impl ViewRecord {
    /// Project a view event into a flat record.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::EmptyItems`] when the item list is empty;
    /// no index-0 item exists. The caller drops the single record and keeps
    /// the stream alive.
    pub fn project(event: &Event) -> Result<Self, ExtractError> {
        let item = event
            .ecommerce
            .items
            .first()
            .ok_or_else(|| ExtractError::EmptyItems {
                user_id: event.user_id.clone(),
            })?;

        Ok(Self {
            event_datetime: event.event_datetime,
            event: event.event.clone(),
            user_id: event.user_id.clone(),
            client_id: event.client_id.clone(),
            page: event.page.clone(),
            page_previous: event.page_previous.clone(),
            item_name: item.item_name.clone(),
            item_id: item.item_id.clone(),
            price: item.price.clone(),
            item_brand: item.item_brand.clone(),
            item_category: item.item_category.clone(),
            item_category_2: item.item_category_2.clone(),
            item_category_3: item.item_category_3.clone(),
            item_category_4: item.item_category_4.clone(),
            item_variant: item.item_variant.clone(),
            item_list_name: item.item_list_name.clone(),
            item_list_id: item.item_list_id.clone(),
            quantity: item.quantity.clone(),
        })
    }
}

/// A per-user running purchase total, as emitted in engine snapshots.
///
/// In accumulating mode `summed_value` is monotonically non-decreasing for
/// a key across firings while the process lives: each snapshot restates
/// the full cumulative total, never a delta. The engine exclusively owns
/// the backing state; this type is only ever an emitted observation of it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseAggregate {
    /// The aggregation key.
    pub user_id: String,
    /// Cumulative purchase value for the key since window start.
    pub summed_value: f64,
}

impl PurchaseAggregate {
    /// Create an aggregate row.
    #[must_use]
    pub const fn new(user_id: String, summed_value: f64) -> Self {
        Self {
            user_id,
            summed_value,
        }
    }
}
