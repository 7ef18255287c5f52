use crate::entities::{TransferStatus, transfer_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct InitiateTransferRequest {
    pub to_email: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferResponse {
    pub id: i32,
    pub order_id: i32,
    pub from_user_id: i32,
    pub to_email: String,
    pub to_user_id: Option<i32>,
    pub status: TransferStatus,
    pub created_at: DateTime<Utc>,
}

impl From<transfer_entity::Model> for TransferResponse {
    fn from(m: transfer_entity::Model) -> Self {
        Self {
            id: m.id,
            order_id: m.order_id,
            from_user_id: m.from_user_id,
            to_email: m.to_email,
            to_user_id: m.to_user_id,
            status: m.status,
            created_at: m.created_at,
        }
    }
}
