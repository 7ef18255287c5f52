use crate::entities::event_entity as events;
use crate::error::{AppError, AppResult};
use crate::models::EventResponse;
use crate::services::find_active_user;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, Set, TransactionTrait,
};

/// The event currently flagged active, if any. Every event-scoped
/// operation resolves it first.
pub async fn find_active_event<C: ConnectionTrait>(db: &C) -> Result<Option<events::Model>, DbErr> {
    events::Entity::find()
        .filter(events::Column::IsActive.eq(true))
        .one(db)
        .await
}

pub fn no_active_event() -> AppError {
    AppError::PreconditionFailed("No active event.".to_string())
}

#[derive(Clone)]
pub struct EventService {
    pool: DatabaseConnection,
}

impl EventService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn get_active_event(&self) -> AppResult<Option<EventResponse>> {
        Ok(find_active_event(&self.pool).await?.map(Into::into))
    }

    /// Makes `event_id` the only active event. Superusers only.
    pub async fn activate_event(&self, acting_user_id: i32, event_id: i32) -> AppResult<EventResponse> {
        let user = find_active_user(&self.pool, acting_user_id).await?;
        if !user.is_superuser {
            return Err(AppError::Forbidden);
        }

        let txn = self.pool.begin().await?;

        let event = events::Entity::find_by_id(event_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        let now = Utc::now();
        let cleared = events::Entity::update_many()
            .col_expr(events::Column::IsActive, Expr::value(false))
            .col_expr(events::Column::UpdatedAt, Expr::value(now))
            .filter(events::Column::IsActive.eq(true))
            .filter(events::Column::Id.ne(event.id))
            .exec(&txn)
            .await?;

        let mut active = event.into_active_model();
        active.is_active = Set(true);
        active.updated_at = Set(now);
        let event = active.update(&txn).await?;

        txn.commit().await?;

        log::info!(
            "Event {} activated by user {} ({} event(s) deactivated)",
            event.id,
            user.id,
            cleared.rows_affected
        );
        Ok(event.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[tokio::test]
    async fn test_no_active_event_is_none() {
        let db = setup_db().await;
        seed_event(&db, "Fieldday 2025", false, 0).await;
        let service = EventService::new(db);
        assert!(service.get_active_event().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_activate_event_leaves_single_active() {
        let db = setup_db().await;
        let admin = seed_superuser(&db, "admin@example.org").await;
        let old = seed_event(&db, "Fieldday 2025", true, 0).await;
        let new = seed_event(&db, "Fieldday 2026", false, 0).await;
        let service = EventService::new(db.clone());

        let activated = service.activate_event(admin.id, new.id).await.unwrap();
        assert!(activated.is_active);
        assert_eq!(service.get_active_event().await.unwrap().map(|e| e.id), Some(new.id));

        let old = events::Entity::find_by_id(old.id).one(&db).await.unwrap().unwrap();
        assert!(!old.is_active);

        // re-activating the active event is a no-op
        service.activate_event(admin.id, new.id).await.unwrap();
        let active = events::Entity::find()
            .filter(events::Column::IsActive.eq(true))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_activate_event_requires_superuser() {
        let db = setup_db().await;
        let bob = seed_user(&db, "bob@example.org").await;
        let event = seed_event(&db, "Fieldday 2026", false, 0).await;
        let service = EventService::new(db);

        let err = service.activate_event(bob.id, event.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn test_activate_unknown_event() {
        let db = setup_db().await;
        let admin = seed_superuser(&db, "admin@example.org").await;
        let service = EventService::new(db);

        let err = service.activate_event(admin.id, 42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_store_rejects_second_active_event() {
        let db = setup_db().await;
        seed_event(&db, "Fieldday 2026", true, 0).await;

        let now = Utc::now();
        let err = events::ActiveModel {
            name: Set("Fieldday 2027".to_string()),
            start_date: Set(chrono::NaiveDate::from_ymd_opt(2027, 7, 3).unwrap()),
            end_date: Set(chrono::NaiveDate::from_ymd_opt(2027, 7, 6).unwrap()),
            is_active: Set(true),
            max_shifts_per_user: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap_err();
        assert!(matches!(
            err.sql_err(),
            Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
        ));

        seed_event(&db, "Fieldday 2027", false, 0).await;
        assert_eq!(find_active_event(&db).await.unwrap().unwrap().name, "Fieldday 2026");
    }
}
