use crate::entities::{OrderStatus, order_entity, ticket_type_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventResponse, TransferResponse};

/// A ticket type with how many more the caller may still hold.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TicketQuota {
    pub ticket_type_id: i32,
    pub name: String,
    pub label: String,
    pub description: String,
    /// cents
    pub price: i64,
    pub max_per_user: i32,
    pub existing: u64,
    pub remaining: u64,
}

impl TicketQuota {
    pub fn new(ticket_type: ticket_type_entity::Model, existing: u64, remaining: u64) -> Self {
        Self {
            ticket_type_id: ticket_type.id,
            name: ticket_type.name,
            label: ticket_type.label,
            description: ticket_type.description,
            price: ticket_type.price,
            max_per_user: ticket_type.max_per_user,
            existing,
            remaining,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TicketsOverview {
    pub event: EventResponse,
    pub ticket_types: Vec<TicketQuota>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CheckoutLine {
    pub ticket_type_id: i32,
    /// Lines with a quantity of zero or less are ignored.
    pub quantity: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateCheckoutRequest {
    pub items: Vec<CheckoutLine>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    /// Hosted payment page to redirect to.
    pub url: Option<String>,
    pub orders_created: usize,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct FinalizeCheckoutQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FinalizeCheckoutResponse {
    /// False when the provider did not confirm payment or could not be reached.
    pub confirmed: bool,
    pub orders_completed: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: i32,
    pub ticket_type_id: i32,
    pub purchasing_user_id: i32,
    pub owning_user_id: i32,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl From<order_entity::Model> for OrderResponse {
    fn from(m: order_entity::Model) -> Self {
        Self {
            id: m.id,
            ticket_type_id: m.ticket_type_id,
            purchasing_user_id: m.purchasing_user_id,
            owning_user_id: m.owning_user_id,
            status: m.status,
            created_at: m.created_at,
        }
    }
}

/// Everything shown on the "my tickets" page. Empty when no event is active.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MyTicketsResponse {
    pub event: Option<EventResponse>,
    pub owned_tickets: Vec<OrderResponse>,
    pub outgoing_transfers: Vec<TransferResponse>,
    pub incoming_transfers: Vec<TransferResponse>,
}
