use crate::config::StripeConfig;
use crate::entities::{
    OrderStatus, TransferStatus, order_entity as orders, ticket_type_entity as ticket_types,
    transfer_entity as transfers,
};
use crate::error::{AppError, AppResult};
use crate::external::{CheckoutLineItem, CreateSessionRequest, PaymentGateway};
use crate::models::{
    CheckoutSessionResponse, CreateCheckoutRequest, FinalizeCheckoutResponse, MyTicketsResponse,
    TicketQuota, TicketsOverview,
};
use crate::services::{
    check_purchase, find_active_event, find_active_user, held_counts_for_event, no_active_event,
    remaining_quota,
};
use crate::utils::normalize_email;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct TicketService {
    pool: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    success_url: String,
    cancel_url: String,
}

impl TicketService {
    pub fn new(
        pool: DatabaseConnection,
        gateway: Arc<dyn PaymentGateway>,
        stripe_config: &StripeConfig,
    ) -> Self {
        Self {
            pool,
            gateway,
            success_url: stripe_config.success_url.clone(),
            cancel_url: stripe_config.cancel_url.clone(),
        }
    }

    /// Ticket types of the active event with the caller's remaining quota.
    pub async fn list_quotas(&self, user_id: i32) -> AppResult<Option<TicketsOverview>> {
        let Some(event) = find_active_event(&self.pool).await? else {
            return Ok(None);
        };

        let types = ticket_types::Entity::find()
            .filter(ticket_types::Column::EventId.eq(event.id))
            .order_by_asc(ticket_types::Column::Id)
            .all(&self.pool)
            .await?;
        let held = held_counts_for_event(&self.pool, user_id, event.id).await?;

        let quotas = types
            .into_iter()
            .map(|tt| {
                let existing = held.get(&tt.id).copied().unwrap_or(0);
                let remaining = remaining_quota(tt.max_per_user, existing);
                TicketQuota::new(tt, existing, remaining)
            })
            .collect();

        Ok(Some(TicketsOverview {
            event: event.into(),
            ticket_types: quotas,
        }))
    }

    /// Validates the basket against per-user limits, opens a hosted
    /// checkout session and records one pending order per ticket unit.
    pub async fn create_checkout(
        &self,
        user_id: i32,
        request: CreateCheckoutRequest,
    ) -> AppResult<CheckoutSessionResponse> {
        let user = find_active_user(&self.pool, user_id).await?;
        let event = find_active_event(&self.pool)
            .await?
            .ok_or_else(no_active_event)?;

        let types = ticket_types::Entity::find()
            .filter(ticket_types::Column::EventId.eq(event.id))
            .order_by_asc(ticket_types::Column::Id)
            .all(&self.pool)
            .await?;

        let mut requested: HashMap<i32, u64> = HashMap::new();
        for line in request.items.iter().filter(|l| l.quantity > 0) {
            *requested.entry(line.ticket_type_id).or_default() += line.quantity as u64;
        }

        let selected: Vec<(&ticket_types::Model, u64)> = types
            .iter()
            .filter_map(|tt| requested.get(&tt.id).map(|qty| (tt, *qty)))
            .collect();
        if selected.is_empty() {
            return Err(AppError::ValidationError(
                "Please select at least one ticket.".to_string(),
            ));
        }

        // every type of the event is checked, not only those in the basket
        let held = held_counts_for_event(&self.pool, user.id, event.id).await?;
        for tt in &types {
            let existing = held.get(&tt.id).copied().unwrap_or(0);
            let qty = requested.get(&tt.id).copied().unwrap_or(0);
            if let Err(e) = check_purchase(tt, existing, qty) {
                log::warn!("Checkout rejected for user {}: {e}", user.id);
                return Err(e);
            }
        }

        let session = self
            .gateway
            .create_session(CreateSessionRequest {
                line_items: selected
                    .iter()
                    .map(|(tt, qty)| CheckoutLineItem {
                        price_id: tt.stripe_price_id.clone(),
                        quantity: *qty,
                    })
                    .collect(),
                success_url: self.success_url.clone(),
                cancel_url: self.cancel_url.clone(),
                customer_email: user.email.clone(),
                metadata: HashMap::from([("user_id".to_string(), user.id.to_string())]),
            })
            .await?;

        let now = Utc::now();
        let rows: Vec<orders::ActiveModel> = selected
            .iter()
            .flat_map(|(tt, qty)| (0..*qty).map(move |_| tt.id))
            .map(|ticket_type_id| orders::ActiveModel {
                ticket_type_id: Set(ticket_type_id),
                purchasing_user_id: Set(user.id),
                owning_user_id: Set(user.id),
                stripe_checkout_session_id: Set(session.id.clone()),
                stripe_payment_intent_id: Set(None),
                status: Set(OrderStatus::Pending),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            })
            .collect();
        let orders_created = rows.len();

        let txn = self.pool.begin().await?;
        orders::Entity::insert_many(rows).exec(&txn).await?;
        txn.commit().await?;

        log::info!(
            "Checkout session {} opened for user {} with {} pending order(s)",
            session.id,
            user.id,
            orders_created
        );

        Ok(CheckoutSessionResponse {
            session_id: session.id,
            url: session.url,
            orders_created,
        })
    }

    /// Completes the session's pending orders once the gateway reports it
    /// paid. Safe to call repeatedly; gateway failures only mean "not yet".
    pub async fn finalize_checkout(&self, session_id: &str) -> AppResult<FinalizeCheckoutResponse> {
        let status = match self.gateway.retrieve_session(session_id).await {
            Ok(status) => status,
            Err(e) => {
                log::warn!("Could not confirm checkout session {session_id}: {e}");
                return Ok(FinalizeCheckoutResponse {
                    confirmed: false,
                    orders_completed: 0,
                });
            }
        };

        if !status.paid {
            return Ok(FinalizeCheckoutResponse {
                confirmed: false,
                orders_completed: 0,
            });
        }

        let result = orders::Entity::update_many()
            .col_expr(orders::Column::Status, Expr::value(OrderStatus::Completed))
            .col_expr(
                orders::Column::StripePaymentIntentId,
                Expr::value(status.payment_intent_id),
            )
            .col_expr(orders::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(orders::Column::StripeCheckoutSessionId.eq(session_id))
            .filter(orders::Column::Status.eq(OrderStatus::Pending))
            .exec(&self.pool)
            .await?;

        if result.rows_affected > 0 {
            log::info!(
                "Checkout session {session_id} paid: {} order(s) completed",
                result.rows_affected
            );
        }

        Ok(FinalizeCheckoutResponse {
            confirmed: true,
            orders_completed: result.rows_affected,
        })
    }

    /// Completed tickets the caller owns in the active event, plus pending
    /// transfers they sent and those addressed to their email.
    pub async fn my_tickets(&self, user_id: i32) -> AppResult<MyTicketsResponse> {
        let user = find_active_user(&self.pool, user_id).await?;
        let Some(event) = find_active_event(&self.pool).await? else {
            return Ok(MyTicketsResponse {
                event: None,
                owned_tickets: Vec::new(),
                outgoing_transfers: Vec::new(),
                incoming_transfers: Vec::new(),
            });
        };

        let owned = orders::Entity::find()
            .inner_join(ticket_types::Entity)
            .filter(ticket_types::Column::EventId.eq(event.id))
            .filter(orders::Column::OwningUserId.eq(user.id))
            .filter(orders::Column::Status.eq(OrderStatus::Completed))
            .order_by_asc(orders::Column::Id)
            .all(&self.pool)
            .await?;

        let pending_in_event = || {
            transfers::Entity::find()
                .inner_join(orders::Entity)
                .join(JoinType::InnerJoin, orders::Relation::TicketType.def())
                .filter(ticket_types::Column::EventId.eq(event.id))
                .filter(transfers::Column::Status.eq(TransferStatus::Pending))
                .order_by_desc(transfers::Column::CreatedAt)
        };

        let outgoing = pending_in_event()
            .filter(transfers::Column::FromUserId.eq(user.id))
            .all(&self.pool)
            .await?;
        let incoming = pending_in_event()
            .filter(transfers::Column::ToEmail.eq(normalize_email(&user.email)))
            .all(&self.pool)
            .await?;

        Ok(MyTicketsResponse {
            event: Some(event.into()),
            owned_tickets: owned.into_iter().map(Into::into).collect(),
            outgoing_transfers: outgoing.into_iter().map(Into::into).collect(),
            incoming_transfers: incoming.into_iter().map(Into::into).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CheckoutLine;
    use crate::test_support::*;
    use sea_orm::PaginatorTrait;

    fn stripe_config() -> StripeConfig {
        StripeConfig {
            secret_key: "sk_test".to_string(),
            success_url: "https://fieldday.example/checkout/success/?session_id={CHECKOUT_SESSION_ID}"
                .to_string(),
            cancel_url: "https://fieldday.example/checkout/cancel/".to_string(),
        }
    }

    fn basket(lines: &[(i32, i64)]) -> CreateCheckoutRequest {
        CreateCheckoutRequest {
            items: lines
                .iter()
                .map(|(ticket_type_id, quantity)| CheckoutLine {
                    ticket_type_id: *ticket_type_id,
                    quantity: *quantity,
                })
                .collect(),
        }
    }

    async fn orders_for(db: &DatabaseConnection, user_id: i32) -> Vec<orders::Model> {
        orders::Entity::find()
            .filter(orders::Column::OwningUserId.eq(user_id))
            .all(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_checkout_records_pending_orders() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let event = seed_event(&db, "Fieldday 2026", true, 0).await;
        let adult = seed_ticket_type(&db, event.id, "adult", 4).await;
        let child = seed_ticket_type(&db, event.id, "child", 4).await;
        let gateway = Arc::new(FakeGateway::paying());
        let service = TicketService::new(db.clone(), gateway.clone(), &stripe_config());

        let resp = service
            .create_checkout(alice.id, basket(&[(adult.id, 1), (child.id, 2), (adult.id, 1)]))
            .await
            .unwrap();

        assert_eq!(resp.orders_created, 4);
        assert!(resp.url.is_some());
        let created = orders_for(&db, alice.id).await;
        assert_eq!(created.len(), 4);
        assert!(created.iter().all(|o| o.status == OrderStatus::Pending
            && o.stripe_checkout_session_id == resp.session_id));

        let requests = gateway.created.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].customer_email, "alice@example.org");
        assert_eq!(requests[0].metadata.get("user_id"), Some(&alice.id.to_string()));
        let adult_line = requests[0]
            .line_items
            .iter()
            .find(|l| l.price_id == "price_adult")
            .unwrap();
        assert_eq!(adult_line.quantity, 2);
    }

    #[tokio::test]
    async fn test_third_ticket_of_max_two_is_rejected() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let event = seed_event(&db, "Fieldday 2026", true, 0).await;
        let adult = seed_ticket_type(&db, event.id, "adult", 2).await;
        let gateway = Arc::new(FakeGateway::paying());
        let service = TicketService::new(db.clone(), gateway.clone(), &stripe_config());

        service
            .create_checkout(alice.id, basket(&[(adult.id, 2)]))
            .await
            .unwrap();
        let err = service
            .create_checkout(alice.id, basket(&[(adult.id, 1)]))
            .await
            .unwrap_err();

        match err {
            AppError::TicketLimitExceeded {
                remaining,
                existing,
                ..
            } => {
                assert_eq!(remaining, 0);
                assert_eq!(existing, 2);
            }
            other => panic!("expected limit error, got {other:?}"),
        }
        assert_eq!(orders_for(&db, alice.id).await.len(), 2);
        assert_eq!(gateway.sessions_created(), 1);
    }

    #[tokio::test]
    async fn test_over_cap_on_one_type_blocks_any_checkout() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let event = seed_event(&db, "Fieldday 2026", true, 0).await;
        let adult = seed_ticket_type(&db, event.id, "adult", 1).await;
        let child = seed_ticket_type(&db, event.id, "child", 4).await;
        seed_order(&db, adult.id, alice.id, OrderStatus::Completed).await;
        seed_order(&db, adult.id, alice.id, OrderStatus::Completed).await;
        let gateway = Arc::new(FakeGateway::paying());
        let service = TicketService::new(db.clone(), gateway.clone(), &stripe_config());

        let err = service
            .create_checkout(alice.id, basket(&[(child.id, 1)]))
            .await
            .unwrap_err();

        match err {
            AppError::TicketLimitExceeded {
                ticket_type_id,
                existing,
                remaining,
                ..
            } => {
                assert_eq!(ticket_type_id, adult.id);
                assert_eq!(existing, 2);
                assert_eq!(remaining, 0);
            }
            other => panic!("expected limit error, got {other:?}"),
        }
        assert_eq!(gateway.sessions_created(), 0);
        assert_eq!(orders_for(&db, alice.id).await.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_basket_and_foreign_types_are_rejected() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let past = seed_event(&db, "Fieldday 2025", false, 0).await;
        let event = seed_event(&db, "Fieldday 2026", true, 0).await;
        let old = seed_ticket_type(&db, past.id, "adult", 4).await;
        let adult = seed_ticket_type(&db, event.id, "adult", 4).await;
        let gateway = Arc::new(FakeGateway::paying());
        let service = TicketService::new(db.clone(), gateway.clone(), &stripe_config());

        for request in [
            basket(&[]),
            basket(&[(adult.id, 0), (adult.id, -3)]),
            basket(&[(old.id, 1)]),
        ] {
            let err = service.create_checkout(alice.id, request).await.unwrap_err();
            assert!(matches!(err, AppError::ValidationError(_)));
        }
        assert_eq!(gateway.sessions_created(), 0);
    }

    #[tokio::test]
    async fn test_checkout_without_active_event() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let service =
            TicketService::new(db.clone(), Arc::new(FakeGateway::paying()), &stripe_config());

        let err = service
            .create_checkout(alice.id, basket(&[(1, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PreconditionFailed(_)));
    }

    #[tokio::test]
    async fn test_gateway_failure_writes_nothing() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let event = seed_event(&db, "Fieldday 2026", true, 0).await;
        let adult = seed_ticket_type(&db, event.id, "adult", 4).await;
        let service =
            TicketService::new(db.clone(), Arc::new(FakeGateway::broken()), &stripe_config());

        let err = service
            .create_checkout(alice.id, basket(&[(adult.id, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalApiError(_)));
        assert!(orders_for(&db, alice.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_finalize_is_idempotent() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let event = seed_event(&db, "Fieldday 2026", true, 0).await;
        let adult = seed_ticket_type(&db, event.id, "adult", 4).await;
        let service =
            TicketService::new(db.clone(), Arc::new(FakeGateway::paying()), &stripe_config());

        let session = service
            .create_checkout(alice.id, basket(&[(adult.id, 3)]))
            .await
            .unwrap();

        let first = service.finalize_checkout(&session.session_id).await.unwrap();
        assert!(first.confirmed);
        assert_eq!(first.orders_completed, 3);

        let second = service.finalize_checkout(&session.session_id).await.unwrap();
        assert!(second.confirmed);
        assert_eq!(second.orders_completed, 0);

        let completed = orders_for(&db, alice.id).await;
        assert!(completed.iter().all(|o| o.status == OrderStatus::Completed
            && o.stripe_payment_intent_id.as_deref()
                == Some(format!("pi_for_{}", session.session_id).as_str())));
    }

    #[tokio::test]
    async fn test_finalize_unpaid_or_unreachable_is_not_confirmed() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let event = seed_event(&db, "Fieldday 2026", true, 0).await;
        let adult = seed_ticket_type(&db, event.id, "adult", 4).await;
        seed_order(&db, adult.id, alice.id, OrderStatus::Pending).await;

        for gateway in [FakeGateway::unpaid(), FakeGateway::broken()] {
            let service = TicketService::new(db.clone(), Arc::new(gateway), &stripe_config());
            let resp = service
                .finalize_checkout(&format!("cs_seed_{}", alice.id))
                .await
                .unwrap();
            assert!(!resp.confirmed);
            assert_eq!(resp.orders_completed, 0);
        }

        let pending = orders::Entity::find()
            .filter(orders::Column::Status.eq(OrderStatus::Pending))
            .count(&db)
            .await
            .unwrap();
        assert_eq!(pending, 1);
    }

    #[tokio::test]
    async fn test_list_quotas_reports_remaining() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let event = seed_event(&db, "Fieldday 2026", true, 0).await;
        let adult = seed_ticket_type(&db, event.id, "adult", 4).await;
        seed_ticket_type(&db, event.id, "child", 2).await;
        seed_order(&db, adult.id, alice.id, OrderStatus::Completed).await;
        seed_order(&db, adult.id, alice.id, OrderStatus::Pending).await;
        let service =
            TicketService::new(db.clone(), Arc::new(FakeGateway::paying()), &stripe_config());

        let overview = service.list_quotas(alice.id).await.unwrap().unwrap();
        let adult_quota = &overview.ticket_types[0];
        assert_eq!(adult_quota.existing, 2);
        assert_eq!(adult_quota.remaining, 2);
        assert_eq!(overview.ticket_types[1].remaining, 2);
    }

    #[tokio::test]
    async fn test_my_tickets_without_active_event_is_empty() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let service =
            TicketService::new(db.clone(), Arc::new(FakeGateway::paying()), &stripe_config());

        let resp = service.my_tickets(alice.id).await.unwrap();
        assert!(resp.event.is_none());
        assert!(resp.owned_tickets.is_empty());
    }

    #[tokio::test]
    async fn test_my_tickets_lists_completed_only() {
        let db = setup_db().await;
        let alice = seed_user(&db, "alice@example.org").await;
        let event = seed_event(&db, "Fieldday 2026", true, 0).await;
        let adult = seed_ticket_type(&db, event.id, "adult", 4).await;
        let done = seed_order(&db, adult.id, alice.id, OrderStatus::Completed).await;
        seed_order(&db, adult.id, alice.id, OrderStatus::Pending).await;
        let service =
            TicketService::new(db.clone(), Arc::new(FakeGateway::paying()), &stripe_config());

        let resp = service.my_tickets(alice.id).await.unwrap();
        assert_eq!(resp.owned_tickets.len(), 1);
        assert_eq!(resp.owned_tickets[0].id, done.id);
    }
}
