//! Wire types for the marketplace Data Service.
//!
//! Every endpoint gets an explicit response envelope; payloads are parsed
//! into these types at the boundary and invalid shapes are rejected there,
//! never passed through as loose JSON.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use segundo_lote_core::{Balance, CategoryId, EventId, LocationId, OrderId, TicketStatus};

/// A listed event with resale inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub date: DateTime<Utc>,
    pub location: String,
    pub price: Decimal,
    pub category: String,
    pub city: String,
    /// Tickets still listed. The one field the gateway may patch locally
    /// after a purchase, until the next refresh reconciles with the server.
    pub ticket_count: u32,
}

/// A buyer or seller order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub event_id: EventId,
    pub status: TicketStatus,
    pub price: Decimal,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An event category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A venue/location entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub city: String,
}

// =============================================================================
// Response envelopes, one per endpoint
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ListEventsResponse {
    pub events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
pub struct ListCategoriesResponse {
    pub categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
pub struct ListLocationsResponse {
    pub locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersResponse {
    pub orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceResponse {
    pub balance: Balance,
}
