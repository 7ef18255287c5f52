use crate::entities::{
    role_entity as roles, role_lead_entity as role_leads,
    shift_assignment_entity as shift_assignments, shift_entity as shifts, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    AdminAssignmentResponse, AdminListQuery, AdminShiftResponse, CreateShiftRequest,
    PaginatedResponse, PaginationParams, ShiftSummary, UpdateShiftRequest,
};
use crate::services::{assignment_counts, find_active_user};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, IntoActiveModel, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;

const DUPLICATE_SHIFT: &str = "A shift for this role with the same start and end time already exists.";

pub async fn is_lead_of<C: ConnectionTrait>(db: &C, user_id: i32, role_id: i32) -> Result<bool, DbErr> {
    let count = role_leads::Entity::find()
        .filter(role_leads::Column::UserId.eq(user_id))
        .filter(role_leads::Column::RoleId.eq(role_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Superusers manage every role; anyone else only the roles they lead.
pub async fn can_manage_role<C: ConnectionTrait>(
    db: &C,
    user: &users::Model,
    role_id: i32,
) -> Result<bool, DbErr> {
    if user.is_superuser {
        return Ok(true);
    }
    is_lead_of(db, user.id, role_id).await
}

/// The roles an admin caller may see and edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagedRoles {
    All,
    Only(Vec<i32>),
}

impl ManagedRoles {
    pub fn covers(&self, role_id: i32) -> bool {
        match self {
            ManagedRoles::All => true,
            ManagedRoles::Only(ids) => ids.contains(&role_id),
        }
    }

    fn condition(&self, role_column: impl ColumnTrait) -> Condition {
        match self {
            ManagedRoles::All => Condition::all(),
            ManagedRoles::Only(ids) => Condition::all().add(role_column.is_in(ids.iter().copied())),
        }
    }
}

fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>, capacity: i32) -> AppResult<()> {
    if end <= start {
        return Err(AppError::ValidationError(
            "End time must be after start time.".to_string(),
        ));
    }
    if capacity < 1 {
        return Err(AppError::ValidationError(
            "Capacity must be at least 1.".to_string(),
        ));
    }
    Ok(())
}

fn shift_not_found() -> AppError {
    AppError::NotFound("Shift not found".to_string())
}

/// Shift maintenance for role leads and superusers. Objects outside the
/// caller's roles are reported as not found.
#[derive(Clone)]
pub struct ShiftAdminService {
    pool: DatabaseConnection,
}

impl ShiftAdminService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn managed_roles(&self, user_id: i32) -> AppResult<ManagedRoles> {
        let user = find_active_user(&self.pool, user_id).await?;
        if user.is_superuser {
            return Ok(ManagedRoles::All);
        }
        let led: Vec<i32> = role_leads::Entity::find()
            .filter(role_leads::Column::UserId.eq(user.id))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|l| l.role_id)
            .collect();
        if led.is_empty() {
            return Err(AppError::Forbidden);
        }
        Ok(ManagedRoles::Only(led))
    }

    pub async fn list_shifts(
        &self,
        user_id: i32,
        query: &AdminListQuery,
    ) -> AppResult<PaginatedResponse<AdminShiftResponse>> {
        let scope = self.managed_roles(user_id).await?;
        let params = PaginationParams::new(query.page, query.per_page);

        let mut condition = scope.condition(shifts::Column::RoleId);
        if let Some(role_id) = query.role_id {
            condition = condition.add(shifts::Column::RoleId.eq(role_id));
        }

        let total = shifts::Entity::find()
            .filter(condition.clone())
            .count(&self.pool)
            .await? as i64;

        let rows = shifts::Entity::find()
            .filter(condition)
            .find_also_related(roles::Entity)
            .order_by_asc(shifts::Column::StartTime)
            .order_by_asc(shifts::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let ids: Vec<i32> = rows.iter().map(|(s, _)| s.id).collect();
        let assigned = assignment_counts(&self.pool, &ids).await?;

        let items = rows
            .into_iter()
            .map(|(shift, role)| AdminShiftResponse {
                role_name: role.map(|r| r.name).unwrap_or_default(),
                shift: ShiftSummary::new(&shift, assigned.get(&shift.id).copied().unwrap_or(0)),
            })
            .collect();

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_limit(),
            total,
        ))
    }

    pub async fn list_assignments(
        &self,
        user_id: i32,
        query: &AdminListQuery,
    ) -> AppResult<PaginatedResponse<AdminAssignmentResponse>> {
        let scope = self.managed_roles(user_id).await?;
        let params = PaginationParams::new(query.page, query.per_page);

        let mut condition = scope.condition(shifts::Column::RoleId);
        if let Some(role_id) = query.role_id {
            condition = condition.add(shifts::Column::RoleId.eq(role_id));
        }

        let base = shift_assignments::Entity::find()
            .find_also_related(shifts::Entity)
            .filter(condition);

        let total = base.clone().count(&self.pool).await? as i64;
        let rows = base
            .order_by_asc(shifts::Column::StartTime)
            .order_by_asc(shift_assignments::Column::Id)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(&self.pool)
            .await?;

        let user_ids: Vec<i32> = rows.iter().map(|(a, _)| a.user_id).collect();
        let people: HashMap<i32, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let items = rows
            .into_iter()
            .map(|(assignment, shift)| {
                let person = people.get(&assignment.user_id);
                AdminAssignmentResponse {
                    id: assignment.id,
                    shift_id: assignment.shift_id,
                    role_id: shift.map(|s| s.role_id).unwrap_or_default(),
                    user_id: assignment.user_id,
                    user_email: person.map(|u| u.email.clone()).unwrap_or_default(),
                    user_name: person.map(|u| u.name.clone()).unwrap_or_default(),
                    created_at: assignment.created_at,
                }
            })
            .collect();

        Ok(PaginatedResponse::new(
            items,
            params.get_page(),
            params.get_limit(),
            total,
        ))
    }

    pub async fn create_shift(
        &self,
        user_id: i32,
        request: CreateShiftRequest,
    ) -> AppResult<AdminShiftResponse> {
        let scope = self.managed_roles(user_id).await?;
        let role = roles::Entity::find_by_id(request.role_id)
            .one(&self.pool)
            .await?
            .filter(|r| scope.covers(r.id))
            .ok_or_else(|| AppError::NotFound("Role not found".to_string()))?;

        let capacity = request.capacity.unwrap_or(1);
        validate_window(request.start_time, request.end_time, capacity)?;

        let now = Utc::now();
        let shift = shifts::ActiveModel {
            role_id: Set(role.id),
            start_time: Set(request.start_time),
            end_time: Set(request.end_time),
            capacity: Set(capacity),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, DUPLICATE_SHIFT))?;

        log::info!("Shift {} created for role {} by user {user_id}", shift.id, role.id);
        Ok(AdminShiftResponse {
            role_name: role.name,
            shift: ShiftSummary::new(&shift, 0),
        })
    }

    /// Capacity may not drop below the number of people already assigned.
    pub async fn update_shift(
        &self,
        user_id: i32,
        shift_id: i32,
        request: UpdateShiftRequest,
    ) -> AppResult<AdminShiftResponse> {
        let scope = self.managed_roles(user_id).await?;
        let (shift, role) = shifts::Entity::find_by_id(shift_id)
            .find_also_related(roles::Entity)
            .one(&self.pool)
            .await?
            .filter(|(s, _)| scope.covers(s.role_id))
            .ok_or_else(shift_not_found)?;

        let start_time = request.start_time.unwrap_or(shift.start_time);
        let end_time = request.end_time.unwrap_or(shift.end_time);
        let capacity = request.capacity.unwrap_or(shift.capacity);
        validate_window(start_time, end_time, capacity)?;

        let assigned = assignment_counts(&self.pool, &[shift.id])
            .await?
            .get(&shift.id)
            .copied()
            .unwrap_or(0);
        if (capacity as u64) < assigned {
            return Err(AppError::PreconditionFailed(format!(
                "{assigned} people are already signed up for this shift."
            )));
        }

        let mut active = shift.into_active_model();
        active.start_time = Set(start_time);
        active.end_time = Set(end_time);
        active.capacity = Set(capacity);
        active.updated_at = Set(Utc::now());
        let shift = active
            .update(&self.pool)
            .await
            .map_err(|e| AppError::on_unique_violation(e, DUPLICATE_SHIFT))?;

        log::info!("Shift {} updated by user {user_id}", shift.id);
        Ok(AdminShiftResponse {
            role_name: role.map(|r| r.name).unwrap_or_default(),
            shift: ShiftSummary::new(&shift, assigned),
        })
    }

    /// Deleting a shift drops its assignments with it.
    pub async fn delete_shift(&self, user_id: i32, shift_id: i32) -> AppResult<()> {
        let scope = self.managed_roles(user_id).await?;
        let shift = shifts::Entity::find_by_id(shift_id)
            .one(&self.pool)
            .await?
            .filter(|s| scope.covers(s.role_id))
            .ok_or_else(shift_not_found)?;

        let txn = self.pool.begin().await?;
        shift_assignments::Entity::delete_many()
            .filter(shift_assignments::Column::ShiftId.eq(shift.id))
            .exec(&txn)
            .await?;
        let id = shift.id;
        shift.delete(&txn).await?;
        txn.commit().await?;

        log::info!("Shift {id} deleted by user {user_id}");
        Ok(())
    }

    pub async fn remove_assignment(&self, user_id: i32, assignment_id: i32) -> AppResult<()> {
        let scope = self.managed_roles(user_id).await?;
        let (assignment, _) = shift_assignments::Entity::find_by_id(assignment_id)
            .find_also_related(shifts::Entity)
            .one(&self.pool)
            .await?
            .filter(|(_, shift)| shift.as_ref().is_some_and(|s| scope.covers(s.role_id)))
            .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;

        let id = assignment.id;
        assignment.delete(&self.pool).await?;

        log::info!("Assignment {id} removed by user {user_id}");
        Ok(())
    }
}
