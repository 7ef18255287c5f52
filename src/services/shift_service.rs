use crate::entities::{
    OrderStatus, order_entity as orders, role_entity as roles,
    shift_assignment_entity as shift_assignments, shift_entity as shifts,
    ticket_type_entity as ticket_types,
};
use crate::error::{AppError, AppResult};
use crate::models::{RoleColumn, ShiftAssignmentResponse, ShiftBoardResponse};
use crate::services::{build_schedule_grid, find_active_event, find_active_user, no_active_event};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr,
    EntityTrait, FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};

const ALREADY_SIGNED_UP: &str = "You are already signed up for this shift.";

fn shift_not_found() -> AppError {
    AppError::NotFound("Shift not found".to_string())
}

/// A shift of a role belonging to `event_id`.
pub async fn find_event_shift<C: ConnectionTrait>(
    db: &C,
    event_id: i32,
    shift_id: i32,
) -> Result<Option<shifts::Model>, DbErr> {
    shifts::Entity::find_by_id(shift_id)
        .inner_join(roles::Entity)
        .filter(roles::Column::EventId.eq(event_id))
        .one(db)
        .await
}

/// Whether the user owns a completed order for a ticket type of the event.
pub async fn has_ticket<C: ConnectionTrait>(db: &C, user_id: i32, event_id: i32) -> Result<bool, DbErr> {
    let count = orders::Entity::find()
        .inner_join(ticket_types::Entity)
        .filter(ticket_types::Column::EventId.eq(event_id))
        .filter(orders::Column::OwningUserId.eq(user_id))
        .filter(orders::Column::Status.eq(OrderStatus::Completed))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Assignments the user holds across every shift of the event.
pub async fn user_shift_count<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    event_id: i32,
) -> Result<u64, DbErr> {
    shift_assignments::Entity::find()
        .inner_join(shifts::Entity)
        .join(JoinType::InnerJoin, shifts::Relation::Role.def())
        .filter(roles::Column::EventId.eq(event_id))
        .filter(shift_assignments::Column::UserId.eq(user_id))
        .count(db)
        .await
}

/// Current assignment count per shift id; shifts with none are absent.
pub async fn assignment_counts<C: ConnectionTrait>(
    db: &C,
    shift_ids: &[i32],
) -> Result<HashMap<i32, u64>, DbErr> {
    if shift_ids.is_empty() {
        return Ok(HashMap::new());
    }
    #[derive(Debug, FromQueryResult)]
    struct AssignedRow {
        shift_id: i32,
        assigned: i64,
    }

    let rows = shift_assignments::Entity::find()
        .select_only()
        .column(shift_assignments::Column::ShiftId)
        .column_as(Expr::col(shift_assignments::Column::Id).count(), "assigned")
        .filter(shift_assignments::Column::ShiftId.is_in(shift_ids.iter().copied()))
        .group_by(shift_assignments::Column::ShiftId)
        .into_model::<AssignedRow>()
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .map(|r| (r.shift_id, r.assigned.max(0) as u64))
        .collect())
}

#[derive(Clone)]
pub struct ShiftService {
    pool: DatabaseConnection,
}

impl ShiftService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Roles, the schedule grid and the caller's signup standing for the
    /// active event. `None` when no event is active.
    pub async fn shift_board(&self, user_id: i32) -> AppResult<Option<ShiftBoardResponse>> {
        let user_id = find_active_user(&self.pool, user_id).await?.id;
        let Some(event) = find_active_event(&self.pool).await? else {
            return Ok(None);
        };

        let role_models = roles::Entity::find()
            .filter(roles::Column::EventId.eq(event.id))
            .order_by_asc(roles::Column::Name)
            .all(&self.pool)
            .await?;
        let shift_models = shifts::Entity::find()
            .inner_join(roles::Entity)
            .filter(roles::Column::EventId.eq(event.id))
            .order_by_asc(shifts::Column::StartTime)
            .order_by_asc(shifts::Column::Id)
            .all(&self.pool)
            .await?;

        let shift_ids: Vec<i32> = shift_models.iter().map(|s| s.id).collect();
        let assigned = assignment_counts(&self.pool, &shift_ids).await?;
        let signed_up: HashSet<i32> = shift_assignments::Entity::find()
            .filter(shift_assignments::Column::UserId.eq(user_id))
            .filter(shift_assignments::Column::ShiftId.is_in(shift_ids.iter().copied()))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|a| a.shift_id)
            .collect();
        let has_ticket = has_ticket(&self.pool, user_id, event.id).await?;

        let columns: Vec<RoleColumn> = role_models.into_iter().map(Into::into).collect();
        let grid = build_schedule_grid(&columns, &shift_models, &assigned, &signed_up);
        let user_shift_count = signed_up.len() as u64;

        Ok(Some(ShiftBoardResponse {
            can_signup_more: event.allows_another_shift(user_shift_count),
            event: event.into(),
            roles: columns,
            grid,
            has_ticket,
            user_shift_count,
        }))
    }

    /// Claims a spot on a shift. On Postgres the shift row is locked for the
    /// duration of the transaction so concurrent signups count capacity
    /// one at a time; the unique (shift, user) index backs the duplicate
    /// check on every backend.
    pub async fn signup(&self, user_id: i32, shift_id: i32) -> AppResult<ShiftAssignmentResponse> {
        let user_id = find_active_user(&self.pool, user_id).await?.id;
        let txn = self.pool.begin().await?;

        let event = find_active_event(&txn).await?.ok_or_else(no_active_event)?;

        let mut query = shifts::Entity::find_by_id(shift_id)
            .inner_join(roles::Entity)
            .filter(roles::Column::EventId.eq(event.id));
        if txn.get_database_backend() == DbBackend::Postgres {
            query = query.lock_exclusive();
        }
        let shift = query.one(&txn).await?.ok_or_else(shift_not_found)?;

        if !has_ticket(&txn, user_id, event.id).await? {
            return Err(AppError::PreconditionFailed(
                "You must have a ticket to sign up for shifts.".to_string(),
            ));
        }

        if event.max_shifts_per_user > 0 {
            let current = user_shift_count(&txn, user_id, event.id).await?;
            if !event.allows_another_shift(current) {
                return Err(AppError::PreconditionFailed(format!(
                    "You have reached the maximum of {} shifts.",
                    event.max_shifts_per_user
                )));
            }
        }

        let already = shift_assignments::Entity::find()
            .filter(shift_assignments::Column::ShiftId.eq(shift.id))
            .filter(shift_assignments::Column::UserId.eq(user_id))
            .count(&txn)
            .await?;
        if already > 0 {
            return Err(AppError::PreconditionFailed(ALREADY_SIGNED_UP.to_string()));
        }

        let assigned = shift_assignments::Entity::find()
            .filter(shift_assignments::Column::ShiftId.eq(shift.id))
            .count(&txn)
            .await?;
        if shift.spots_remaining(assigned) <= 0 {
            return Err(AppError::PreconditionFailed("This shift is full.".to_string()));
        }

        let assignment = shift_assignments::ActiveModel {
            shift_id: Set(shift.id),
            user_id: Set(user_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::on_unique_violation(e, ALREADY_SIGNED_UP))?;

        txn.commit().await?;

        log::info!("User {user_id} signed up for shift {}", shift.id);
        Ok(assignment.into())
    }

    pub async fn cancel(&self, user_id: i32, shift_id: i32) -> AppResult<()> {
        let user_id = find_active_user(&self.pool, user_id).await?.id;
        let event = find_active_event(&self.pool)
            .await?
            .ok_or_else(no_active_event)?;
        let shift = find_event_shift(&self.pool, event.id, shift_id)
            .await?
            .ok_or_else(shift_not_found)?;

        let result = shift_assignments::Entity::delete_many()
            .filter(shift_assignments::Column::ShiftId.eq(shift.id))
            .filter(shift_assignments::Column::UserId.eq(user_id))
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::PreconditionFailed(
                "You are not signed up for this shift.".to_string(),
            ));
        }

        log::info!("User {user_id} cancelled shift {}", shift.id);
        Ok(())
    }
}
