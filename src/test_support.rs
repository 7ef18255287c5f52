//! Fixtures for service tests: an in-memory SQLite database migrated with
//! the real migrator, row seeders and a scripted payment gateway.

use crate::entities::{
    OrderStatus, event_entity as events, order_entity as orders, role_entity as roles,
    role_lead_entity as role_leads, shift_assignment_entity as shift_assignments,
    shift_entity as shifts, ticket_type_entity as ticket_types, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::external::{
    CheckoutSessionHandle, CheckoutSessionStatus, CreateSessionRequest, PaymentGateway,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opt).await.expect("sqlite connects");
    Migrator::up(&db, None).await.expect("migrations apply");
    db
}

/// 2026-07-04 at `hour:minute` UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 4, hour, minute, 0).unwrap()
}

pub async fn seed_user(db: &DatabaseConnection, email: &str) -> users::Model {
    users::ActiveModel {
        email: Set(email.to_string()),
        name: Set(email.split('@').next().unwrap_or_default().to_string()),
        is_active: Set(true),
        is_staff: Set(false),
        is_superuser: Set(false),
        date_joined: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_superuser(db: &DatabaseConnection, email: &str) -> users::Model {
    let user = seed_user(db, email).await;
    let mut am: users::ActiveModel = user.into();
    am.is_staff = Set(true);
    am.is_superuser = Set(true);
    am.update(db).await.unwrap()
}

pub async fn deactivate_user(db: &DatabaseConnection, user: users::Model) -> users::Model {
    let mut am: users::ActiveModel = user.into();
    am.is_active = Set(false);
    am.update(db).await.unwrap()
}

pub async fn seed_event(
    db: &DatabaseConnection,
    name: &str,
    is_active: bool,
    max_shifts_per_user: i32,
) -> events::Model {
    let now = Utc::now();
    events::ActiveModel {
        name: Set(name.to_string()),
        start_date: Set(NaiveDate::from_ymd_opt(2026, 7, 3).unwrap()),
        end_date: Set(NaiveDate::from_ymd_opt(2026, 7, 6).unwrap()),
        is_active: Set(is_active),
        max_shifts_per_user: Set(max_shifts_per_user),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_ticket_type(
    db: &DatabaseConnection,
    event_id: i32,
    name: &str,
    max_per_user: i32,
) -> ticket_types::Model {
    let now = Utc::now();
    ticket_types::ActiveModel {
        event_id: Set(event_id),
        name: Set(name.to_string()),
        label: Set(format!("{name} Ticket")),
        description: Set(String::new()),
        price: Set(15000),
        stripe_price_id: Set(format!("price_{name}")),
        max_per_user: Set(max_per_user),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_order(
    db: &DatabaseConnection,
    ticket_type_id: i32,
    owner_id: i32,
    status: OrderStatus,
) -> orders::Model {
    let now = Utc::now();
    orders::ActiveModel {
        ticket_type_id: Set(ticket_type_id),
        purchasing_user_id: Set(owner_id),
        owning_user_id: Set(owner_id),
        stripe_checkout_session_id: Set(format!("cs_seed_{owner_id}")),
        stripe_payment_intent_id: Set(None),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_role(db: &DatabaseConnection, event_id: i32, name: &str) -> roles::Model {
    let now = Utc::now();
    roles::ActiveModel {
        event_id: Set(event_id),
        name: Set(name.to_string()),
        description: Set(String::new()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_lead(db: &DatabaseConnection, role_id: i32, user_id: i32) -> role_leads::Model {
    role_leads::ActiveModel {
        role_id: Set(role_id),
        user_id: Set(user_id),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_shift(
    db: &DatabaseConnection,
    role_id: i32,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    capacity: i32,
) -> shifts::Model {
    let now = Utc::now();
    shifts::ActiveModel {
        role_id: Set(role_id),
        start_time: Set(start_time),
        end_time: Set(end_time),
        capacity: Set(capacity),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

pub async fn seed_assignment(
    db: &DatabaseConnection,
    shift_id: i32,
    user_id: i32,
) -> shift_assignments::Model {
    shift_assignments::ActiveModel {
        shift_id: Set(shift_id),
        user_id: Set(user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

/// Scripted gateway: hands out sequential session ids and reports whatever
/// payment state the test configured.
pub struct FakeGateway {
    pub created: Mutex<Vec<CreateSessionRequest>>,
    pub paid: bool,
    pub fail_create: bool,
    pub fail_retrieve: bool,
    counter: AtomicUsize,
}

impl FakeGateway {
    pub fn paying() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            paid: true,
            fail_create: false,
            fail_retrieve: false,
            counter: AtomicUsize::new(0),
        }
    }

    pub fn unpaid() -> Self {
        Self {
            paid: false,
            ..Self::paying()
        }
    }

    pub fn broken() -> Self {
        Self {
            fail_create: true,
            fail_retrieve: true,
            ..Self::paying()
        }
    }

    pub fn sessions_created(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_session(
        &self,
        request: CreateSessionRequest,
    ) -> AppResult<CheckoutSessionHandle> {
        if self.fail_create {
            return Err(AppError::ExternalApiError("gateway down".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.created.lock().unwrap().push(request);
        Ok(CheckoutSessionHandle {
            id: format!("cs_test_{n}"),
            url: Some(format!("https://checkout.example/cs_test_{n}")),
        })
    }

    async fn retrieve_session(&self, session_id: &str) -> AppResult<CheckoutSessionStatus> {
        if self.fail_retrieve {
            return Err(AppError::ExternalApiError("gateway down".to_string()));
        }
        Ok(CheckoutSessionStatus {
            paid: self.paid,
            payment_intent_id: self.paid.then(|| format!("pi_for_{session_id}")),
        })
    }
}
