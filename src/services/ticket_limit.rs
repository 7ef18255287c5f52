use crate::entities::{
    OrderStatus, TransferStatus, order_entity as orders, ticket_type_entity as ticket_types,
    transfer_entity as transfers,
};
use crate::error::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QuerySelect,
};
use std::collections::HashMap;

/// How many more tickets of a type a user may hold.
pub fn remaining_quota(max_per_user: i32, existing: u64) -> u64 {
    (max_per_user.max(0) as u64).saturating_sub(existing)
}

/// Rejects a purchase of `requested` more units when it would push the
/// user's held count past the type's cap.
pub fn check_purchase(
    ticket_type: &ticket_types::Model,
    existing: u64,
    requested: u64,
) -> AppResult<()> {
    let max = ticket_type.max_per_user.max(0) as u64;
    if existing.saturating_add(requested) > max {
        return Err(AppError::TicketLimitExceeded {
            ticket_type_id: ticket_type.id,
            ticket_type: ticket_type.label.to_lowercase(),
            max_per_user: ticket_type.max_per_user,
            existing,
            remaining: remaining_quota(ticket_type.max_per_user, existing),
        });
    }
    Ok(())
}

/// Pending incoming transfers are reserved against the recipient's quota.
pub fn recipient_at_limit(max_per_user: i32, existing: u64, pending_incoming: u64) -> bool {
    existing.saturating_add(pending_incoming) >= max_per_user.max(0) as u64
}

pub fn acceptor_at_limit(max_per_user: i32, existing: u64) -> bool {
    existing >= max_per_user.max(0) as u64
}

/// Orders owned by `user_id` for one ticket type that count against its cap.
pub async fn count_held<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    ticket_type_id: i32,
) -> Result<u64, DbErr> {
    orders::Entity::find()
        .filter(orders::Column::OwningUserId.eq(user_id))
        .filter(orders::Column::TicketTypeId.eq(ticket_type_id))
        .filter(orders::Column::Status.is_in(OrderStatus::held()))
        .count(db)
        .await
}

/// Held counts for every ticket type of an event, keyed by ticket type id.
/// Types the user holds none of are absent.
pub async fn held_counts_for_event<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    event_id: i32,
) -> Result<HashMap<i32, u64>, DbErr> {
    #[derive(Debug, FromQueryResult)]
    struct HeldRow {
        ticket_type_id: i32,
        held: i64,
    }

    let rows = orders::Entity::find()
        .select_only()
        .column(orders::Column::TicketTypeId)
        .column_as(Expr::col((orders::Entity, orders::Column::Id)).count(), "held")
        .inner_join(ticket_types::Entity)
        .filter(ticket_types::Column::EventId.eq(event_id))
        .filter(orders::Column::OwningUserId.eq(user_id))
        .filter(orders::Column::Status.is_in(OrderStatus::held()))
        .group_by(orders::Column::TicketTypeId)
        .into_model::<HeldRow>()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|r| (r.ticket_type_id, r.held.max(0) as u64))
        .collect())
}

/// Pending transfers addressed to `to_email` for orders of one ticket type.
pub async fn pending_incoming_count<C: ConnectionTrait>(
    db: &C,
    to_email: &str,
    ticket_type_id: i32,
) -> Result<u64, DbErr> {
    transfers::Entity::find()
        .inner_join(orders::Entity)
        .filter(transfers::Column::ToEmail.eq(to_email))
        .filter(transfers::Column::Status.eq(TransferStatus::Pending))
        .filter(orders::Column::TicketTypeId.eq(ticket_type_id))
        .count(db)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use chrono::Utc;

    fn ticket_type(max_per_user: i32) -> ticket_types::Model {
        ticket_types::Model {
            id: 7,
            event_id: 1,
            name: "adult".to_string(),
            label: "Adult Ticket".to_string(),
            description: String::new(),
            price: 15000,
            stripe_price_id: "price_adult".to_string(),
            max_per_user,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_remaining_quota_never_negative() {
        assert_eq!(remaining_quota(4, 1), 3);
        assert_eq!(remaining_quota(2, 2), 0);
        assert_eq!(remaining_quota(2, 5), 0);
        assert_eq!(remaining_quota(0, 0), 0);
    }

    #[test]
    fn test_check_purchase_at_and_over_limit() {
        let tt = ticket_type(2);
        assert!(check_purchase(&tt, 0, 2).is_ok());
        assert!(check_purchase(&tt, 1, 1).is_ok());

        match check_purchase(&tt, 2, 1) {
            Err(AppError::TicketLimitExceeded {
                ticket_type,
                max_per_user,
                existing,
                remaining,
                ..
            }) => {
                assert_eq!(ticket_type, "adult ticket");
                assert_eq!(max_per_user, 2);
                assert_eq!(existing, 2);
                assert_eq!(remaining, 0);
            }
            other => panic!("expected limit error, got {other:?}"),
        }
    }

    #[test]
    fn test_recipient_and_acceptor_limits() {
        assert!(!recipient_at_limit(2, 1, 0));
        assert!(recipient_at_limit(2, 1, 1));
        assert!(recipient_at_limit(2, 2, 0));
        assert!(!acceptor_at_limit(2, 1));
        assert!(acceptor_at_limit(2, 2));
    }

    #[tokio::test]
    async fn test_counts_only_pending_and_completed() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let event = seed_event(&db, "Fieldday 2026", true, 0).await;
        let adult = seed_ticket_type(&db, event.id, "adult", 4).await;
        let child = seed_ticket_type(&db, event.id, "child", 4).await;

        seed_order(&db, adult.id, alice.id, OrderStatus::Pending).await;
        seed_order(&db, adult.id, alice.id, OrderStatus::Completed).await;
        seed_order(&db, adult.id, alice.id, OrderStatus::Cancelled).await;
        seed_order(&db, child.id, alice.id, OrderStatus::Completed).await;

        assert_eq!(count_held(&db, alice.id, adult.id).await.unwrap(), 2);

        let counts = held_counts_for_event(&db, alice.id, event.id).await.unwrap();
        assert_eq!(counts.get(&adult.id), Some(&2));
        assert_eq!(counts.get(&child.id), Some(&1));
    }

    #[tokio::test]
    async fn test_held_counts_scoped_to_event() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let past = seed_event(&db, "Fieldday 2025", false, 0).await;
        let current = seed_event(&db, "Fieldday 2026", true, 0).await;
        let old = seed_ticket_type(&db, past.id, "adult", 4).await;
        seed_order(&db, old.id, alice.id, OrderStatus::Completed).await;

        let counts = held_counts_for_event(&db, alice.id, current.id).await.unwrap();
        assert!(counts.is_empty());
    }
}
