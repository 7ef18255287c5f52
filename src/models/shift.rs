use crate::entities::{role_entity, shift_assignment_entity, shift_entity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::EventResponse;

/// One column of the schedule grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RoleColumn {
    pub id: i32,
    pub name: String,
    pub description: String,
}

impl From<role_entity::Model> for RoleColumn {
    fn from(m: role_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ShiftSummary {
    pub id: i32,
    pub role_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub spots_remaining: i64,
}

impl ShiftSummary {
    pub fn new(shift: &shift_entity::Model, assigned: u64) -> Self {
        Self {
            id: shift.id,
            role_id: shift.role_id,
            start_time: shift.start_time,
            end_time: shift.end_time,
            capacity: shift.capacity,
            spots_remaining: shift.spots_remaining(assigned),
        }
    }
}

/// `ShiftContinue` cells are covered by the rowspan of an earlier
/// `ShiftStart` and must not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GridCell {
    Empty,
    ShiftStart {
        shift: ShiftSummary,
        rowspan: u32,
        is_signed_up: bool,
    },
    ShiftContinue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct GridRow {
    pub hour: DateTime<Utc>,
    /// One cell per role, in role column order.
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ScheduleGrid {
    pub hours: Vec<DateTime<Utc>>,
    pub rows: Vec<GridRow>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShiftBoardResponse {
    pub event: EventResponse,
    pub roles: Vec<RoleColumn>,
    pub grid: ScheduleGrid,
    pub has_ticket: bool,
    pub user_shift_count: u64,
    pub can_signup_more: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShiftAssignmentResponse {
    pub id: i32,
    pub shift_id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
}

impl From<shift_assignment_entity::Model> for ShiftAssignmentResponse {
    fn from(m: shift_assignment_entity::Model) -> Self {
        Self {
            id: m.id,
            shift_id: m.shift_id,
            user_id: m.user_id,
            created_at: m.created_at,
        }
    }
}
