use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ShiftSummary;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AdminListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub role_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateShiftRequest {
    pub role_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UpdateShiftRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminShiftResponse {
    pub role_name: String,
    #[serde(flatten)]
    pub shift: ShiftSummary,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminAssignmentResponse {
    pub id: i32,
    pub shift_id: i32,
    pub role_id: i32,
    pub user_id: i32,
    pub user_email: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}
