use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::utils::normalize_email;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

/// Loads the account behind an authenticated request. A deleted or
/// deactivated account is treated as an expired session.
pub async fn find_active_user<C: ConnectionTrait>(db: &C, user_id: i32) -> AppResult<users::Model> {
    let user = users::Entity::find_by_id(user_id)
        .filter(users::Column::IsActive.eq(true))
        .one(db)
        .await?;
    user.ok_or_else(|| AppError::AuthError("User not found or inactive".to_string()))
}

pub async fn find_user_by_email<C: ConnectionTrait>(
    db: &C,
    email: &str,
) -> AppResult<Option<users::Model>> {
    Ok(users::Entity::find()
        .filter(users::Column::Email.eq(normalize_email(email)))
        .filter(users::Column::IsActive.eq(true))
        .one(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_user, setup_db};

    #[tokio::test]
    async fn test_find_user_by_email_is_case_insensitive() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;

        let found = find_user_by_email(&db, "  ALICE@example.org").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(alice.id));
        assert!(find_user_by_email(&db, "nobody@example.org").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_active_user_rejects_unknown_id() {
        let db = setup_db().await;
        let err = find_active_user(&db, 999).await.unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));
    }
}
