use crate::entities::{
    OrderStatus, TransferStatus, order_entity as orders, ticket_type_entity as ticket_types,
    transfer_entity as transfers, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{InitiateTransferRequest, TransferResponse};
use crate::services::{
    acceptor_at_limit, count_held, find_active_user, find_user_by_email, pending_incoming_count,
    recipient_at_limit,
};
use crate::utils::{normalize_email, parse_email};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};

const PENDING_TRANSFER_EXISTS: &str = "This ticket already has a pending transfer.";

fn transfer_not_found() -> AppError {
    AppError::NotFound("Transfer not found".to_string())
}

/// Ticket hand-over between users: `pending` moves to `accepted` or
/// `rejected`, or the row is deleted when the sender rescinds.
#[derive(Clone)]
pub struct TransferService {
    pool: DatabaseConnection,
}

impl TransferService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn initiate(
        &self,
        from_user_id: i32,
        order_id: i32,
        request: InitiateTransferRequest,
    ) -> AppResult<TransferResponse> {
        let sender = find_active_user(&self.pool, from_user_id).await?;

        let order = orders::Entity::find_by_id(order_id)
            .filter(orders::Column::OwningUserId.eq(sender.id))
            .filter(orders::Column::Status.eq(OrderStatus::Completed))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;

        let pending = transfers::Entity::find()
            .filter(transfers::Column::OrderId.eq(order.id))
            .filter(transfers::Column::Status.eq(TransferStatus::Pending))
            .count(&self.pool)
            .await?;
        if pending > 0 {
            return Err(AppError::PreconditionFailed(
                PENDING_TRANSFER_EXISTS.to_string(),
            ));
        }

        let to_email = parse_email(&request.to_email)?;
        if to_email == normalize_email(&sender.email) {
            return Err(AppError::PreconditionFailed(
                "You cannot transfer a ticket to yourself.".to_string(),
            ));
        }

        let recipient = find_user_by_email(&self.pool, &to_email)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("No user found with that email address.".to_string())
            })?;

        let ticket_type = ticket_types::Entity::find_by_id(order.ticket_type_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Ticket not found".to_string()))?;
        let existing = count_held(&self.pool, recipient.id, ticket_type.id).await?;
        let incoming = pending_incoming_count(&self.pool, &to_email, ticket_type.id).await?;
        if recipient_at_limit(ticket_type.max_per_user, existing, incoming) {
            return Err(AppError::PreconditionFailed(
                "The recipient has reached their limit for this ticket type.".to_string(),
            ));
        }

        let now = Utc::now();
        let transfer = transfers::ActiveModel {
            order_id: Set(order.id),
            from_user_id: Set(sender.id),
            to_email: Set(to_email),
            to_user_id: Set(Some(recipient.id)),
            status: Set(TransferStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(|e| AppError::on_unique_violation(e, PENDING_TRANSFER_EXISTS))?;

        log::info!(
            "Transfer {} of order {} initiated by user {} to user {}",
            transfer.id,
            order.id,
            sender.id,
            recipient.id
        );
        Ok(transfer.into())
    }

    /// Moves the order to the acting user. The ownership change and the
    /// status change commit together or not at all. On Postgres the
    /// acceptor's row is locked first so their accepts run one at a time
    /// against the quota.
    pub async fn accept(&self, acting_user_id: i32, transfer_id: i32) -> AppResult<TransferResponse> {
        let user = find_active_user(&self.pool, acting_user_id).await?;
        let email = normalize_email(&user.email);

        let txn = self.pool.begin().await?;

        if txn.get_database_backend() == DbBackend::Postgres {
            users::Entity::find_by_id(user.id)
                .lock_exclusive()
                .one(&txn)
                .await?;
        }

        let transfer = transfers::Entity::find_by_id(transfer_id)
            .filter(transfers::Column::ToEmail.eq(email.as_str()))
            .filter(transfers::Column::Status.eq(TransferStatus::Pending))
            .one(&txn)
            .await?
            .ok_or_else(transfer_not_found)?;

        let order = orders::Entity::find_by_id(transfer.order_id)
            .one(&txn)
            .await?
            .ok_or_else(transfer_not_found)?;
        let ticket_type = ticket_types::Entity::find_by_id(order.ticket_type_id)
            .one(&txn)
            .await?
            .ok_or_else(transfer_not_found)?;

        let existing = count_held(&txn, user.id, ticket_type.id).await?;
        if acceptor_at_limit(ticket_type.max_per_user, existing) {
            log::warn!(
                "User {} at limit for ticket type {}; transfer {} not accepted",
                user.id,
                ticket_type.id,
                transfer.id
            );
            return Err(AppError::PreconditionFailed(
                "You have reached your limit for this ticket type.".to_string(),
            ));
        }

        let now = Utc::now();
        let claimed = transfers::Entity::update_many()
            .col_expr(transfers::Column::Status, Expr::value(TransferStatus::Accepted))
            .col_expr(transfers::Column::ToUserId, Expr::value(Some(user.id)))
            .col_expr(transfers::Column::UpdatedAt, Expr::value(now))
            .filter(transfers::Column::Id.eq(transfer.id))
            .filter(transfers::Column::Status.eq(TransferStatus::Pending))
            .exec(&txn)
            .await?;
        if claimed.rows_affected != 1 {
            // changed underneath us; dropping txn rolls back
            return Err(transfer_not_found());
        }

        let mut order = order.into_active_model();
        order.owning_user_id = Set(user.id);
        order.updated_at = Set(now);
        let order = order.update(&txn).await?;

        txn.commit().await?;

        log::info!(
            "Transfer {} accepted: order {} now owned by user {}",
            transfer.id,
            order.id,
            user.id
        );

        Ok(transfers::Model {
            status: TransferStatus::Accepted,
            to_user_id: Some(user.id),
            updated_at: now,
            ..transfer
        }
        .into())
    }

    pub async fn reject(&self, acting_user_id: i32, transfer_id: i32) -> AppResult<TransferResponse> {
        let user = find_active_user(&self.pool, acting_user_id).await?;
        let email = normalize_email(&user.email);

        let result = transfers::Entity::update_many()
            .col_expr(transfers::Column::Status, Expr::value(TransferStatus::Rejected))
            .col_expr(transfers::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(transfers::Column::Id.eq(transfer_id))
            .filter(transfers::Column::ToEmail.eq(email.as_str()))
            .filter(transfers::Column::Status.eq(TransferStatus::Pending))
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(transfer_not_found());
        }

        log::info!("Transfer {transfer_id} rejected by user {}", user.id);

        let transfer = transfers::Entity::find_by_id(transfer_id)
            .one(&self.pool)
            .await?
            .ok_or_else(transfer_not_found)?;
        Ok(transfer.into())
    }

    /// Withdraws a pending transfer. The row is deleted outright.
    pub async fn rescind(&self, acting_user_id: i32, transfer_id: i32) -> AppResult<()> {
        let sender = find_active_user(&self.pool, acting_user_id).await?;

        let result = transfers::Entity::delete_many()
            .filter(transfers::Column::Id.eq(transfer_id))
            .filter(transfers::Column::FromUserId.eq(sender.id))
            .filter(transfers::Column::Status.eq(TransferStatus::Pending))
            .exec(&self.pool)
            .await?;
        if result.rows_affected == 0 {
            return Err(transfer_not_found());
        }

        log::info!("Transfer {transfer_id} rescinded by user {}", sender.id);
        Ok(())
    }
}
