use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::bill::{self, BillType, Outlet, PaymentStatus, PaymentType};
use crate::entities::bill_item;
use crate::entities::bill_payment;
use crate::entities::bill_student;
use crate::entities::customer::Entity as CustomerEntity;
use crate::entities::inventory_session::{self, Entity as SessionEntity, SessionStatus};
use crate::entities::inventory_session_item::{self, Entity as SessionItemEntity};
use crate::entities::inventory_session_payment::{self, Entity as SessionPaymentEntity};
use crate::entities::inventory_session_student::{self, Entity as SessionStudentEntity};
use crate::entities::item::{self, Entity as ItemEntity};
use crate::entities::user::{self, Entity as UserEntity, UserRole};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::{numbering, record_activity};

lazy_static! {
    static ref SESSIONS_OPENED: IntCounter = register_int_counter!(
        "inventory_sessions_opened_total",
        "Total number of inventory sessions opened"
    )
    .expect("metric can be created");
    static ref SESSIONS_CLOSED: IntCounter = register_int_counter!(
        "inventory_sessions_closed_total",
        "Total number of inventory sessions closed into bills"
    )
    .expect("metric can be created");
    static ref SESSION_CLOSE_FAILURES: IntCounter = register_int_counter!(
        "inventory_session_close_failures_total",
        "Total number of session close attempts rejected by reconciliation"
    )
    .expect("metric can be created");
}

fn default_payment_status() -> PaymentStatus {
    PaymentStatus::Pending
}

/// One stock line: how much went out and how much came back.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionLineInput {
    pub item_id: Uuid,
    pub quantity_taken: i32,
    #[serde(default)]
    pub quantity_returned: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionPaymentInput {
    pub payment_type: PaymentType,
    pub amount: Decimal,
    #[serde(default)]
    pub reference_number: String,
}

/// Full session submission. Used for both opening and editing; edits
/// replace the item and payment sets wholesale.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct SessionPayload {
    pub outlet: Outlet,
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 200, message = "Customer name must be at most 200 characters"))]
    pub customer_name: String,
    #[serde(default = "default_payment_status")]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
    #[serde(default)]
    pub items: Vec<SessionLineInput>,
    #[serde(default)]
    pub payments: Vec<SessionPaymentInput>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SessionLineResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity_taken: i32,
    pub quantity_returned: i32,
    pub quantity_sold: i32,
    /// Current catalog price; what the line is worth if closed now.
    pub unit_price: Decimal,
    pub line_value: Decimal,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SessionPaymentResponse {
    pub id: Uuid,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub reference_number: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SessionStudentResponse {
    pub id: Uuid,
    pub full_name: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub outlet: Outlet,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub payment_status: PaymentStatus,
    pub status: SessionStatus,
    pub created_by: Uuid,
    pub created_at: chrono::DateTime<Utc>,
    pub closed_at: Option<chrono::DateTime<Utc>>,
    /// Bill produced at close time, once closed.
    pub bill_id: Option<Uuid>,
    pub total_value: Decimal,
    pub total_payments: Decimal,
    pub items: Vec<SessionLineResponse>,
    pub payments: Vec<SessionPaymentResponse>,
    pub students: Vec<SessionStudentResponse>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub outlet: Outlet,
    pub customer_name: String,
    pub status: SessionStatus,
    pub payment_status: PaymentStatus,
    pub created_by: Uuid,
    pub created_at: chrono::DateTime<Utc>,
    pub closed_at: Option<chrono::DateTime<Utc>>,
    pub bill_id: Option<Uuid>,
}

impl From<inventory_session::Model> for SessionSummary {
    fn from(model: inventory_session::Model) -> Self {
        Self {
            id: model.id,
            outlet: model.outlet,
            customer_name: model.customer_name,
            status: model.status,
            payment_status: model.payment_status,
            created_by: model.created_by,
            created_at: model.created_at,
            closed_at: model.closed_at,
            bill_id: model.bill_id,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct SessionListFilter {
    pub status: Option<SessionStatus>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Result of closing a session: the terminal session plus the bill it
/// produced.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct CloseSessionResponse {
    pub session: SessionResponse,
    pub bill_id: Uuid,
    pub invoice_number: String,
    pub bill_total: Decimal,
}

/// Resolved, deduplicated form of a submission.
struct PreparedSession {
    customer_id: Option<Uuid>,
    customer_name: String,
    student_ids: Vec<Uuid>,
    lines: Vec<SessionLineInput>,
}

/// Service for managing inventory stock-out/return sessions
#[derive(Clone)]
pub struct InventorySessionService {
    db_pool: Arc<DbPool>,
    config: Arc<AppConfig>,
    event_sender: Option<Arc<EventSender>>,
}

impl InventorySessionService {
    /// Creates a new inventory session service
    pub fn new(
        db_pool: Arc<DbPool>,
        config: Arc<AppConfig>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            config,
            event_sender,
        }
    }

    /// Opens a session with its initial stock lines.
    #[instrument(skip(self, actor, payload), fields(outlet = %payload.outlet, actor_id = %actor.id()))]
    pub async fn open_session(
        &self,
        actor: &CurrentUser,
        payload: SessionPayload,
    ) -> Result<SessionResponse, ServiceError> {
        payload.validate()?;
        let db = &*self.db_pool;
        let prepared = prepare(db, &payload).await?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let session_id = Uuid::new_v4();
        inventory_session::ActiveModel {
            id: Set(session_id),
            outlet: Set(payload.outlet),
            customer_id: Set(prepared.customer_id),
            customer_name: Set(prepared.customer_name.clone()),
            payment_status: Set(payload.payment_status),
            created_by: Set(actor.id()),
            created_at: Set(Utc::now()),
            status: Set(SessionStatus::Open),
            closed_at: Set(None),
            bill_id: Set(None),
        }
        .insert(&txn)
        .await?;

        write_children(&txn, session_id, &prepared, &payload.payments).await?;
        record_activity(
            &txn,
            actor.id(),
            format!("Opened inventory session at {}", payload.outlet),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        SESSIONS_OPENED.inc();
        info!(session_id = %session_id, "inventory session opened");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::SessionOpened(session_id)).await {
                warn!("Failed to send session opened event: {}", e);
            }
        }

        self.load_session(db, session_id).await
    }

    /// Replaces an open session's content. Closed sessions are
    /// immutable.
    #[instrument(skip(self, actor, payload), fields(session_id = %session_id, actor_id = %actor.id()))]
    pub async fn update_session(
        &self,
        actor: &CurrentUser,
        session_id: Uuid,
        payload: SessionPayload,
    ) -> Result<SessionResponse, ServiceError> {
        payload.validate()?;
        let db = &*self.db_pool;
        let existing = SessionEntity::find_by_id(session_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Session {} not found", session_id)))?;
        if existing.is_closed() {
            return Err(ServiceError::InvalidOperation(
                "Session is closed and can no longer be edited".to_string(),
            ));
        }

        let prepared = prepare(db, &payload).await?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut active: inventory_session::ActiveModel = existing.into();
        active.outlet = Set(payload.outlet);
        active.customer_id = Set(prepared.customer_id);
        active.customer_name = Set(prepared.customer_name.clone());
        active.payment_status = Set(payload.payment_status);
        active.update(&txn).await?;

        SessionItemEntity::delete_many()
            .filter(inventory_session_item::Column::SessionId.eq(session_id))
            .exec(&txn)
            .await?;
        SessionPaymentEntity::delete_many()
            .filter(inventory_session_payment::Column::SessionId.eq(session_id))
            .exec(&txn)
            .await?;
        SessionStudentEntity::delete_many()
            .filter(inventory_session_student::Column::SessionId.eq(session_id))
            .exec(&txn)
            .await?;
        write_children(&txn, session_id, &prepared, &payload.payments).await?;
        record_activity(&txn, actor.id(), format!("Updated inventory session {}", session_id))
            .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(session_id = %session_id, "inventory session updated");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::SessionUpdated(session_id)).await {
                warn!("Failed to send session updated event: {}", e);
            }
        }

        self.load_session(db, session_id).await
    }

    /// Closes a session: reconciles returns and payments against sold
    /// stock and converts the session into one sales bill, atomically.
    #[instrument(skip(self, actor), fields(session_id = %session_id, actor_id = %actor.id()))]
    pub async fn close_session(
        &self,
        actor: &CurrentUser,
        session_id: Uuid,
    ) -> Result<CloseSessionResponse, ServiceError> {
        let db = &*self.db_pool;
        let session = SessionEntity::find_by_id(session_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Session {} not found", session_id)))?;
        if session.is_closed() {
            return Err(ServiceError::InvalidOperation(
                "Session is already closed".to_string(),
            ));
        }

        let lines = SessionItemEntity::find()
            .filter(inventory_session_item::Column::SessionId.eq(session_id))
            .all(db)
            .await?;
        let payments = SessionPaymentEntity::find()
            .filter(inventory_session_payment::Column::SessionId.eq(session_id))
            .order_by_asc(inventory_session_payment::Column::CreatedAt)
            .all(db)
            .await?;
        let student_ids: Vec<Uuid> = SessionStudentEntity::find()
            .filter(inventory_session_student::Column::SessionId.eq(session_id))
            .all(db)
            .await?
            .into_iter()
            .map(|row| row.user_id)
            .collect();

        let item_ids: Vec<Uuid> = lines.iter().map(|l| l.item_id).collect();
        let catalog: HashMap<Uuid, item::Model> = if item_ids.is_empty() {
            HashMap::new()
        } else {
            ItemEntity::find()
                .filter(item::Column::Id.is_in(item_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|i| (i.id, i))
                .collect()
        };

        // Reconciliation: every violation in one pass.
        let mut violations: Vec<String> = Vec::new();
        for line in &lines {
            let name = catalog
                .get(&line.item_id)
                .map(|i| i.name.clone())
                .unwrap_or_else(|| line.item_id.to_string());
            if line.quantity_returned > line.quantity_taken {
                violations.push(format!(
                    "{}: returned {} exceeds taken {}",
                    name, line.quantity_returned, line.quantity_taken
                ));
            }
            if !catalog.contains_key(&line.item_id) {
                violations.push(format!("Item {} is no longer in the catalog", line.item_id));
            }
        }
        if !lines.iter().any(|l| l.quantity_taken > 0) {
            violations.push("Session has no items taken".to_string());
        }

        let total_amount: Decimal = lines
            .iter()
            .filter_map(|line| {
                catalog
                    .get(&line.item_id)
                    .map(|i| i.price * Decimal::from(line.quantity_sold()))
            })
            .sum();
        let total_payments: Decimal = payments.iter().map(|p| p.amount).sum();
        if violations.is_empty()
            && (total_payments - total_amount).abs() > self.config.inventory.close_tolerance
        {
            violations.push(format!(
                "Recorded payments total {} but sold stock is worth {}; the session cannot close until they match",
                total_payments, total_amount
            ));
        }
        if !violations.is_empty() {
            SESSION_CLOSE_FAILURES.inc();
            return Err(ServiceError::validation(violations));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let today = Utc::now().date_naive();
        let invoice_number = numbering::next_invoice_number(&txn, BillType::Sales, today).await?;
        let bill_id = Uuid::new_v4();

        // One bill line per sold stock line, at today's catalog price.
        let mut bill_total = Decimal::ZERO;
        for line in &lines {
            let sold = line.quantity_sold();
            if sold <= 0 {
                continue;
            }
            let Some(catalog_item) = catalog.get(&line.item_id) else {
                continue;
            };
            bill_total += catalog_item.price * Decimal::from(sold);
            bill_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                bill_id: Set(bill_id),
                item_id: Set(Some(line.item_id)),
                custom_item_name: Set(None),
                quantity: Set(sold),
                price: Set(catalog_item.price),
            }
            .insert(&txn)
            .await?;
        }

        // Both walks over the same lines must price the stock the same.
        debug_assert_eq!(bill_total, total_amount);
        if bill_total != total_amount {
            return Err(ServiceError::InternalError(
                "Session close reconciliation mismatch".to_string(),
            ));
        }

        let payment_type = payments
            .first()
            .map(|p| p.payment_type)
            .unwrap_or(PaymentType::Cash);
        bill::ActiveModel {
            id: Set(bill_id),
            invoice_number: Set(invoice_number.clone()),
            bill_type: Set(BillType::Sales),
            created_at: Set(Utc::now()),
            created_by: Set(actor.id()),
            customer_id: Set(session.customer_id),
            customer_name: Set(session.customer_name.clone()),
            customer_address: Set(String::new()),
            outlet: Set(Some(session.outlet)),
            payment_type: Set(payment_type),
            advance_payment: Set(Decimal::ZERO),
            advance_payment_type: Set(None),
            payment_status: Set(session.payment_status),
            remarks: Set(format!("Auto-generated from Inventory Session {}", session.id)),
            total_amount: Set(bill_total),
            delivery_date: Set(None),
        }
        .insert(&txn)
        .await?;

        for payment in &payments {
            bill_payment::ActiveModel {
                id: Set(Uuid::new_v4()),
                bill_id: Set(bill_id),
                payment_type: Set(payment.payment_type),
                amount: Set(payment.amount),
                reference_number: Set(payment.reference_number.clone()),
            }
            .insert(&txn)
            .await?;
        }
        for user_id in &student_ids {
            bill_student::ActiveModel {
                bill_id: Set(bill_id),
                user_id: Set(*user_id),
            }
            .insert(&txn)
            .await?;
        }

        let mut active: inventory_session::ActiveModel = session.into();
        active.status = Set(SessionStatus::Closed);
        active.closed_at = Set(Some(Utc::now()));
        active.bill_id = Set(Some(bill_id));
        active.update(&txn).await?;

        record_activity(
            &txn,
            actor.id(),
            format!("Closed inventory session; created bill {}", invoice_number),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        SESSIONS_CLOSED.inc();
        info!(session_id = %session_id, invoice_number = %invoice_number, "inventory session closed");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::SessionClosed {
                    session_id,
                    bill_id,
                    invoice_number: invoice_number.clone(),
                })
                .await
            {
                warn!("Failed to send session closed event: {}", e);
            }
        }

        let session = self.load_session(db, session_id).await?;
        Ok(CloseSessionResponse {
            session,
            bill_id,
            invoice_number,
            bill_total,
        })
    }

    /// Deletes an open session and its children. Closed sessions stay:
    /// their bill refers back to them.
    #[instrument(skip(self, actor), fields(session_id = %session_id, actor_id = %actor.id()))]
    pub async fn delete_session(
        &self,
        actor: &CurrentUser,
        session_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = SessionEntity::find_by_id(session_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Session {} not found", session_id)))?;
        if existing.is_closed() {
            return Err(ServiceError::InvalidOperation(
                "Closed sessions cannot be deleted".to_string(),
            ));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        SessionItemEntity::delete_many()
            .filter(inventory_session_item::Column::SessionId.eq(session_id))
            .exec(&txn)
            .await?;
        SessionPaymentEntity::delete_many()
            .filter(inventory_session_payment::Column::SessionId.eq(session_id))
            .exec(&txn)
            .await?;
        SessionStudentEntity::delete_many()
            .filter(inventory_session_student::Column::SessionId.eq(session_id))
            .exec(&txn)
            .await?;
        SessionEntity::delete_by_id(session_id).exec(&txn).await?;
        record_activity(&txn, actor.id(), format!("Deleted inventory session {}", session_id))
            .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(session_id = %session_id, "inventory session deleted");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::SessionDeleted(session_id)).await {
                warn!("Failed to send session deleted event: {}", e);
            }
        }

        Ok(())
    }

    /// Fetches one session with lines, payments and students.
    pub async fn get_session(&self, session_id: Uuid) -> Result<SessionResponse, ServiceError> {
        self.load_session(&*self.db_pool, session_id).await
    }

    /// Lists sessions, newest first.
    pub async fn list_sessions(
        &self,
        filter: SessionListFilter,
    ) -> Result<SessionListResponse, ServiceError> {
        let db = &*self.db_pool;
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter
            .per_page
            .unwrap_or(u64::from(self.config.api_default_page_size))
            .clamp(1, u64::from(self.config.api_max_page_size));

        let mut query = SessionEntity::find();
        if let Some(status) = filter.status {
            query = query.filter(inventory_session::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(inventory_session::Column::CreatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let sessions = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(SessionSummary::from)
            .collect();

        Ok(SessionListResponse {
            sessions,
            total,
            page,
            per_page,
        })
    }

    async fn load_session<C: ConnectionTrait>(
        &self,
        conn: &C,
        session_id: Uuid,
    ) -> Result<SessionResponse, ServiceError> {
        let session = SessionEntity::find_by_id(session_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Session {} not found", session_id)))?;

        let lines = SessionItemEntity::find()
            .filter(inventory_session_item::Column::SessionId.eq(session_id))
            .all(conn)
            .await?;
        let payments = SessionPaymentEntity::find()
            .filter(inventory_session_payment::Column::SessionId.eq(session_id))
            .order_by_asc(inventory_session_payment::Column::CreatedAt)
            .all(conn)
            .await?;
        let student_ids: Vec<Uuid> = SessionStudentEntity::find()
            .filter(inventory_session_student::Column::SessionId.eq(session_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|row| row.user_id)
            .collect();
        let students: Vec<SessionStudentResponse> = if student_ids.is_empty() {
            Vec::new()
        } else {
            UserEntity::find()
                .filter(user::Column::Id.is_in(student_ids))
                .all(conn)
                .await?
                .into_iter()
                .map(|u| SessionStudentResponse {
                    id: u.id,
                    full_name: u.full_name,
                })
                .collect()
        };

        let item_ids: Vec<Uuid> = lines.iter().map(|l| l.item_id).collect();
        let catalog: HashMap<Uuid, item::Model> = if item_ids.is_empty() {
            HashMap::new()
        } else {
            ItemEntity::find()
                .filter(item::Column::Id.is_in(item_ids))
                .all(conn)
                .await?
                .into_iter()
                .map(|i| (i.id, i))
                .collect()
        };

        let mut total_value = Decimal::ZERO;
        let items: Vec<SessionLineResponse> = lines
            .into_iter()
            .map(|line| {
                let sold = line.quantity_sold();
                let (item_name, unit_price) = catalog
                    .get(&line.item_id)
                    .map(|i| (i.name.clone(), i.price))
                    .unwrap_or_else(|| (line.item_id.to_string(), Decimal::ZERO));
                let line_value = unit_price * Decimal::from(sold);
                total_value += line_value;
                SessionLineResponse {
                    id: line.id,
                    item_id: line.item_id,
                    item_name,
                    quantity_taken: line.quantity_taken,
                    quantity_returned: line.quantity_returned,
                    quantity_sold: sold,
                    unit_price,
                    line_value,
                }
            })
            .collect();

        let total_payments: Decimal = payments.iter().map(|p| p.amount).sum();

        Ok(SessionResponse {
            id: session.id,
            outlet: session.outlet,
            customer_id: session.customer_id,
            customer_name: session.customer_name,
            payment_status: session.payment_status,
            status: session.status,
            created_by: session.created_by,
            created_at: session.created_at,
            closed_at: session.closed_at,
            bill_id: session.bill_id,
            total_value,
            total_payments,
            items,
            payments: payments
                .into_iter()
                .map(|row| SessionPaymentResponse {
                    id: row.id,
                    payment_type: row.payment_type,
                    amount: row.amount,
                    reference_number: row.reference_number,
                })
                .collect(),
            students,
        })
    }
}

/// Resolves references and validates a submission. Returned lines are
/// deduplicated by item with quantities summed.
async fn prepare<C: ConnectionTrait>(
    conn: &C,
    payload: &SessionPayload,
) -> Result<PreparedSession, ServiceError> {
    let mut violations: Vec<String> = Vec::new();

    let mut customer_name = payload.customer_name.trim().to_string();
    let mut customer_id = None;
    if let Some(id) = payload.customer_id {
        match CustomerEntity::find_by_id(id).one(conn).await? {
            Some(found) => {
                if customer_name.is_empty() {
                    customer_name = found.customer_name.clone();
                }
                customer_id = Some(found.id);
            }
            None => violations.push("Selected customer does not exist".to_string()),
        }
    }

    let mut student_ids: Vec<Uuid> = Vec::new();
    for id in &payload.student_ids {
        if !student_ids.contains(id) {
            student_ids.push(*id);
        }
    }
    if !student_ids.is_empty() {
        let found = UserEntity::find()
            .filter(user::Column::Id.is_in(student_ids.clone()))
            .filter(user::Column::Role.eq(UserRole::Student))
            .count(conn)
            .await?;
        if found as usize != student_ids.len() {
            violations.push("One or more selected students do not exist".to_string());
        }
    }

    // Duplicate item rows collapse into one line per item.
    let mut lines: Vec<SessionLineInput> = Vec::new();
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    for line in &payload.items {
        if line.quantity_taken < 0 || line.quantity_returned < 0 {
            violations.push("Quantities cannot be negative".to_string());
            continue;
        }
        match index.get(&line.item_id) {
            Some(&at) => {
                lines[at].quantity_taken += line.quantity_taken;
                lines[at].quantity_returned += line.quantity_returned;
            }
            None => {
                index.insert(line.item_id, lines.len());
                lines.push(line.clone());
            }
        }
    }
    if !lines.is_empty() {
        let item_ids: Vec<Uuid> = lines.iter().map(|l| l.item_id).collect();
        let found = ItemEntity::find()
            .filter(item::Column::Id.is_in(item_ids))
            .count(conn)
            .await?;
        if found as usize != lines.len() {
            violations.push("One or more items are not in the catalog".to_string());
        }
    }

    for payment in &payload.payments {
        if payment.amount <= Decimal::ZERO {
            violations.push("Every payment amount must be greater than zero".to_string());
            break;
        }
    }

    if !violations.is_empty() {
        return Err(ServiceError::validation(violations));
    }
    Ok(PreparedSession {
        customer_id,
        customer_name,
        student_ids,
        lines,
    })
}

async fn write_children<C: ConnectionTrait>(
    conn: &C,
    session_id: Uuid,
    prepared: &PreparedSession,
    payments: &[SessionPaymentInput],
) -> Result<(), ServiceError> {
    for line in &prepared.lines {
        inventory_session_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(session_id),
            item_id: Set(line.item_id),
            quantity_taken: Set(line.quantity_taken),
            quantity_returned: Set(line.quantity_returned),
        }
        .insert(conn)
        .await?;
    }
    for payment in payments {
        inventory_session_payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            session_id: Set(session_id),
            payment_type: Set(payment.payment_type),
            amount: Set(payment.amount),
            reference_number: Set(payment.reference_number.trim().to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;
    }
    for user_id in &prepared.student_ids {
        inventory_session_student::ActiveModel {
            session_id: Set(session_id),
            user_id: Set(*user_id),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}
