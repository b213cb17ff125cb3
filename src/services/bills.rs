use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::permissions::{modules, Action};
use crate::auth::CurrentUser;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::bill::{
    self, BillType, Entity as BillEntity, Outlet, PaymentStatus, PaymentType,
};
use crate::entities::bill_item::{self, Entity as BillItemEntity};
use crate::entities::bill_payment::{self, Entity as BillPaymentEntity};
use crate::entities::bill_student::{self, Entity as BillStudentEntity};
use crate::entities::customer::{self, Entity as CustomerEntity};
use crate::entities::item::{self, Entity as ItemEntity};
use crate::entities::user::{self, Entity as UserEntity, UserRole};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::aggregation::{self, Aggregation, SubmittedLine};
use crate::services::{numbering, record_activity};

lazy_static! {
    static ref BILLS_CREATED: IntCounter =
        register_int_counter!("bills_created_total", "Total number of bills created")
            .expect("metric can be created");
    static ref BILLS_UPDATED: IntCounter =
        register_int_counter!("bills_updated_total", "Total number of bills updated")
            .expect("metric can be created");
    static ref BILLS_DELETED: IntCounter =
        register_int_counter!("bills_deleted_total", "Total number of bills deleted")
            .expect("metric can be created");
    static ref BILL_PAYMENTS_RECORDED: IntCounter = register_int_counter!(
        "bill_payments_recorded_total",
        "Total number of standalone bill payments recorded"
    )
    .expect("metric can be created");
    static ref BILL_VALIDATION_FAILURES: IntCounter = register_int_counter!(
        "bill_validation_failures_total",
        "Total number of bill submissions rejected by validation"
    )
    .expect("metric can be created");
}

fn default_quantity() -> i32 {
    1
}

fn default_payment_type() -> PaymentType {
    PaymentType::Cash
}

fn default_payment_status() -> PaymentStatus {
    PaymentStatus::Pending
}

/// One submitted line item, either a catalog reference or a free-text name.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BillLineInput {
    pub item_id: Option<Uuid>,
    pub custom_item_name: Option<String>,
    /// Unit price override. Catalog lines fall back to the catalog price.
    pub price: Option<Decimal>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// Lines flagged here are dropped before aggregation.
    #[serde(default)]
    pub delete: bool,
}

impl From<&BillLineInput> for SubmittedLine {
    fn from(input: &BillLineInput) -> Self {
        SubmittedLine {
            item_id: input.item_id,
            custom_name: input.custom_item_name.clone(),
            price: input.price,
            quantity: input.quantity,
            delete: input.delete,
        }
    }
}

/// One submitted payment row. An `id` refers to an existing row on edit.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BillPaymentInput {
    pub id: Option<Uuid>,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    #[serde(default)]
    pub reference_number: String,
    /// Existing rows flagged here are removed on save.
    #[serde(default)]
    pub delete: bool,
}

/// Everything a bill submission carries besides its kind. The kind is
/// fixed at creation and absent here so edits cannot change it.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct BillPayload {
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    #[validate(length(max = 200, message = "Customer name must be at most 200 characters"))]
    pub customer_name: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Customer address must be at most 500 characters"))]
    pub customer_address: String,
    pub outlet: Option<Outlet>,
    #[serde(default = "default_payment_type")]
    pub payment_type: PaymentType,
    #[serde(default)]
    pub advance_payment: Decimal,
    pub advance_payment_type: Option<PaymentType>,
    #[serde(default = "default_payment_status")]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    #[validate(length(max = 500, message = "Remarks must be at most 500 characters"))]
    pub remarks: String,
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub student_ids: Vec<Uuid>,
    #[serde(default)]
    pub items: Vec<BillLineInput>,
    #[serde(default)]
    pub payments: Vec<BillPaymentInput>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateBillRequest {
    pub bill_type: BillType,
    #[serde(flatten)]
    #[validate]
    pub payload: BillPayload,
}

/// Appends one payment to an existing sales bill outside the edit flow.
#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentRequest {
    pub payment_type: PaymentType,
    pub amount: Decimal,
    #[serde(default)]
    #[validate(length(max = 50, message = "Reference number must be at most 50 characters"))]
    pub reference_number: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct BillLineResponse {
    pub id: Uuid,
    pub item_id: Option<Uuid>,
    pub name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct BillPaymentResponse {
    pub id: Uuid,
    pub payment_type: PaymentType,
    pub amount: Decimal,
    pub reference_number: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct BillStudentResponse {
    pub id: Uuid,
    pub full_name: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct BillResponse {
    pub id: Uuid,
    pub invoice_number: String,
    pub bill_type: BillType,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_address: String,
    pub outlet: Option<Outlet>,
    pub payment_type: PaymentType,
    pub advance_payment: Decimal,
    pub advance_payment_type: Option<PaymentType>,
    pub payment_status: PaymentStatus,
    pub remarks: String,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub delivery_date: Option<NaiveDate>,
    pub created_by: Uuid,
    pub created_at: chrono::DateTime<Utc>,
    pub items: Vec<BillLineResponse>,
    pub payments: Vec<BillPaymentResponse>,
    pub students: Vec<BillStudentResponse>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct BillSummary {
    pub id: Uuid,
    pub invoice_number: String,
    pub bill_type: BillType,
    pub customer_name: String,
    pub outlet: Option<Outlet>,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub created_by: Uuid,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<bill::Model> for BillSummary {
    fn from(model: bill::Model) -> Self {
        Self {
            id: model.id,
            invoice_number: model.invoice_number,
            bill_type: model.bill_type,
            customer_name: model.customer_name,
            outlet: model.outlet,
            payment_status: model.payment_status,
            total_amount: model.total_amount,
            created_by: model.created_by,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct BillListFilter {
    pub bill_type: Option<BillType>,
    pub payment_status: Option<PaymentStatus>,
    /// Inclusive creation-date lower bound.
    pub from: Option<NaiveDate>,
    /// Inclusive creation-date upper bound.
    pub to: Option<NaiveDate>,
    /// Matched against invoice number and customer names.
    pub q: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct BillListResponse {
    pub bills: Vec<BillSummary>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Validated, resolved form of a submission, ready to persist.
struct PreparedBill {
    aggregation: Aggregation,
    student_ids: Vec<Uuid>,
    customer_id: Option<Uuid>,
    customer_name: String,
}

/// Service for managing bills
#[derive(Clone)]
pub struct BillService {
    db_pool: Arc<DbPool>,
    config: Arc<AppConfig>,
    event_sender: Option<Arc<EventSender>>,
}

impl BillService {
    /// Creates a new bill service
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

    /// Creates a bill from a draft submission.
    ///
    /// Runs every validation before any write, allocates the invoice
    /// number inside the same transaction as the header insert, and
    /// persists items, students and (for sales) payments atomically.
    #[instrument(skip(self, actor, request), fields(bill_type = %request.bill_type, actor_id = %actor.id()))]
    pub async fn create_bill(
        &self,
        actor: &CurrentUser,
        request: CreateBillRequest,
    ) -> Result<BillResponse, ServiceError> {
        if !has_bill_access(actor, request.bill_type, Action::Create) {
            return Err(ServiceError::Forbidden(
                "You do not have permission to create this kind of bill".to_string(),
            ));
        }
        request.validate()?;
        let bill_type = request.bill_type;
        let payload = request.payload;

        let db = &*self.db_pool;
        let prepared = match self.prepare(db, bill_type, &payload).await {
            Ok(prepared) => prepared,
            Err(err) => return Err(count_validation_failure(err)),
        };

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let today = Utc::now().date_naive();
        let invoice_number = numbering::next_invoice_number(&txn, bill_type, today).await?;

        let bill_id = Uuid::new_v4();
        bill::ActiveModel {
            id: Set(bill_id),
            invoice_number: Set(invoice_number.clone()),
            bill_type: Set(bill_type),
            created_at: Set(Utc::now()),
            created_by: Set(actor.id()),
            customer_id: Set(prepared.customer_id),
            customer_name: Set(prepared.customer_name.clone()),
            customer_address: Set(payload.customer_address.trim().to_string()),
            outlet: Set(payload.outlet),
            payment_type: Set(payload.payment_type),
            advance_payment: Set(payload.advance_payment),
            advance_payment_type: Set(payload.advance_payment_type),
            payment_status: Set(payload.payment_status),
            remarks: Set(payload.remarks.trim().to_string()),
            total_amount: Set(prepared.aggregation.grand_total),
            delivery_date: Set(payload.delivery_date),
        }
        .insert(&txn)
        .await?;

        insert_lines(&txn, bill_id, &prepared.aggregation).await?;
        replace_students(&txn, bill_id, &prepared.student_ids).await?;
        if bill_type == BillType::Sales {
            for payment in payload.payments.iter().filter(|p| !p.delete) {
                bill_payment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    bill_id: Set(bill_id),
                    payment_type: Set(payment.payment_type),
                    amount: Set(payment.amount),
                    reference_number: Set(payment.reference_number.trim().to_string()),
                }
                .insert(&txn)
                .await?;
            }
        }
        record_activity(&txn, actor.id(), format!("Created bill {}", invoice_number)).await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        BILLS_CREATED.inc();
        info!(invoice_number = %invoice_number, "bill created");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::BillCreated {
                    bill_id,
                    invoice_number: invoice_number.clone(),
                })
                .await
            {
                warn!("Failed to send bill created event: {}", e);
            }
        }

        self.load_bill(db, bill_id).await
    }

    /// Replaces a bill's mutable content with a fresh submission.
    ///
    /// `bill_type` and `invoice_number` stay fixed; line items are
    /// replaced wholesale and payment rows honor per-row delete flags.
    #[instrument(skip(self, actor, payload), fields(bill_id = %bill_id, actor_id = %actor.id()))]
    pub async fn update_bill(
        &self,
        actor: &CurrentUser,
        bill_id: Uuid,
        payload: BillPayload,
    ) -> Result<BillResponse, ServiceError> {
        payload.validate()?;
        let db = &*self.db_pool;
        let existing = BillEntity::find_by_id(bill_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Bill {} not found", bill_id)))?;
        if !can_modify_bill(actor, &existing, Action::Edit) {
            return Err(ServiceError::Forbidden(
                "You do not have permission to edit this bill".to_string(),
            ));
        }

        let bill_type = existing.bill_type;
        let prepared = match self.prepare(db, bill_type, &payload).await {
            Ok(prepared) => prepared,
            Err(err) => return Err(count_validation_failure(err)),
        };

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let invoice_number = existing.invoice_number.clone();
        let mut active: bill::ActiveModel = existing.into();
        active.customer_id = Set(prepared.customer_id);
        active.customer_name = Set(prepared.customer_name.clone());
        active.customer_address = Set(payload.customer_address.trim().to_string());
        active.outlet = Set(payload.outlet);
        active.payment_type = Set(payload.payment_type);
        active.advance_payment = Set(payload.advance_payment);
        active.advance_payment_type = Set(payload.advance_payment_type);
        active.payment_status = Set(payload.payment_status);
        active.remarks = Set(payload.remarks.trim().to_string());
        active.total_amount = Set(prepared.aggregation.grand_total);
        active.delivery_date = Set(payload.delivery_date);
        active.update(&txn).await?;

        BillItemEntity::delete_many()
            .filter(bill_item::Column::BillId.eq(bill_id))
            .exec(&txn)
            .await?;
        insert_lines(&txn, bill_id, &prepared.aggregation).await?;
        replace_students(&txn, bill_id, &prepared.student_ids).await?;
        if bill_type == BillType::Sales {
            apply_payment_changes(&txn, bill_id, &payload.payments).await?;
        }
        record_activity(&txn, actor.id(), format!("Updated bill {}", invoice_number)).await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        BILLS_UPDATED.inc();
        info!(invoice_number = %invoice_number, "bill updated");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::BillUpdated(bill_id)).await {
                warn!("Failed to send bill updated event: {}", e);
            }
        }

        self.load_bill(db, bill_id).await
    }

    /// Deletes a bill together with its line items, payments and
    /// student associations.
    #[instrument(skip(self, actor), fields(bill_id = %bill_id, actor_id = %actor.id()))]
    pub async fn delete_bill(&self, actor: &CurrentUser, bill_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = BillEntity::find_by_id(bill_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Bill {} not found", bill_id)))?;
        if !can_delete_bill(actor, &existing) {
            return Err(ServiceError::Forbidden(
                "You do not have permission to delete this bill".to_string(),
            ));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        BillPaymentEntity::delete_many()
            .filter(bill_payment::Column::BillId.eq(bill_id))
            .exec(&txn)
            .await?;
        BillItemEntity::delete_many()
            .filter(bill_item::Column::BillId.eq(bill_id))
            .exec(&txn)
            .await?;
        BillStudentEntity::delete_many()
            .filter(bill_student::Column::BillId.eq(bill_id))
            .exec(&txn)
            .await?;
        BillEntity::delete_by_id(bill_id).exec(&txn).await?;
        record_activity(
            &txn,
            actor.id(),
            format!("Deleted bill {}", existing.invoice_number),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        BILLS_DELETED.inc();
        info!(invoice_number = %existing.invoice_number, "bill deleted");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::BillDeleted {
                    bill_id,
                    invoice_number: existing.invoice_number.clone(),
                })
                .await
            {
                warn!("Failed to send bill deleted event: {}", e);
            }
        }

        Ok(())
    }

    /// Fetches one bill with its lines, payments and students.
    pub async fn get_bill(
        &self,
        actor: &CurrentUser,
        bill_id: Uuid,
    ) -> Result<BillResponse, ServiceError> {
        let db = &*self.db_pool;
        let bill = BillEntity::find_by_id(bill_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Bill {} not found", bill_id)))?;
        if !can_view_bill(actor, &bill) {
            return Err(ServiceError::Forbidden(
                "You do not have permission to view this bill".to_string(),
            ));
        }
        self.assemble(db, bill).await
    }

    /// Lists bills the actor may see, newest first.
    ///
    /// Principals without broad billing visibility see their own bills
    /// plus any bill kinds their sub-module grants cover.
    #[instrument(skip(self, actor, filter), fields(actor_id = %actor.id()))]
    pub async fn list_bills(
        &self,
        actor: &CurrentUser,
        filter: BillListFilter,
    ) -> Result<BillListResponse, ServiceError> {
        let db = &*self.db_pool;
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter
            .per_page
            .unwrap_or(u64::from(self.config.api_default_page_size))
            .clamp(1, u64::from(self.config.api_max_page_size));

        let mut query = BillEntity::find();
        if let Some(scope) = visibility_condition(actor) {
            query = query.filter(scope);
        }
        if let Some(bill_type) = filter.bill_type {
            query = query.filter(bill::Column::BillType.eq(bill_type));
        }
        if let Some(status) = filter.payment_status {
            query = query.filter(bill::Column::PaymentStatus.eq(status));
        }
        if let Some(from) = filter.from {
            query = query.filter(bill::Column::CreatedAt.gte(from.and_time(NaiveTime::MIN).and_utc()));
        }
        if let Some(to) = filter.to {
            let end = to.succ_opt().unwrap_or(NaiveDate::MAX);
            query = query.filter(bill::Column::CreatedAt.lt(end.and_time(NaiveTime::MIN).and_utc()));
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            query = query
                .join(JoinType::LeftJoin, bill::Relation::Customer.def())
                .filter(
                    Condition::any()
                        .add(bill::Column::InvoiceNumber.contains(q))
                        .add(bill::Column::CustomerName.contains(q))
                        .add(customer::Column::CustomerName.contains(q)),
                );
        }

        let paginator = query
            .order_by_desc(bill::Column::CreatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let bills = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(BillSummary::from)
            .collect();

        Ok(BillListResponse {
            bills,
            total,
            page,
            per_page,
        })
    }

    /// Records one additional payment against a sales bill and rolls
    /// the payment status forward from what is now settled.
    #[instrument(skip(self, actor, request), fields(bill_id = %bill_id, actor_id = %actor.id()))]
    pub async fn record_payment(
        &self,
        actor: &CurrentUser,
        bill_id: Uuid,
        request: RecordPaymentRequest,
    ) -> Result<BillResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let bill = BillEntity::find_by_id(bill_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Bill {} not found", bill_id)))?;
        if !can_modify_bill(actor, &bill, Action::Edit) {
            return Err(ServiceError::Forbidden(
                "You do not have permission to record payments on this bill".to_string(),
            ));
        }
        if bill.bill_type != BillType::Sales {
            return Err(ServiceError::InvalidOperation(
                "Payments can only be recorded on sales bills".to_string(),
            ));
        }
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be greater than zero".to_string(),
            ));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        bill_payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            bill_id: Set(bill_id),
            payment_type: Set(request.payment_type),
            amount: Set(request.amount),
            reference_number: Set(request.reference_number.trim().to_string()),
        }
        .insert(&txn)
        .await?;

        let payments = BillPaymentEntity::find()
            .filter(bill_payment::Column::BillId.eq(bill_id))
            .all(&txn)
            .await?;
        let settled: Decimal =
            bill.advance_payment + payments.iter().map(|p| p.amount).sum::<Decimal>();
        let status = derive_payment_status(
            bill.total_amount,
            settled,
            self.config.billing.paid_tolerance,
        );

        let invoice_number = bill.invoice_number.clone();
        let mut active: bill::ActiveModel = bill.into();
        active.payment_status = Set(status);
        active.update(&txn).await?;
        record_activity(
            &txn,
            actor.id(),
            format!("Recorded payment of {} on bill {}", request.amount, invoice_number),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        BILL_PAYMENTS_RECORDED.inc();
        info!(invoice_number = %invoice_number, amount = %request.amount, "payment recorded");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::BillPaymentRecorded {
                    bill_id,
                    amount: request.amount,
                })
                .await
            {
                warn!("Failed to send payment recorded event: {}", e);
            }
        }

        self.load_bill(db, bill_id).await
    }

    /// Resolves references and runs the whole validation pass.
    ///
    /// Collects every violation it can find before failing, so one
    /// round trip reports them all.
    async fn prepare<C: ConnectionTrait>(
        &self,
        conn: &C,
        bill_type: BillType,
        payload: &BillPayload,
    ) -> Result<PreparedBill, ServiceError> {
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

        violations.extend(header_violations(
            bill_type,
            payload.outlet,
            customer_id.is_some() || !customer_name.is_empty(),
            payload.delivery_date,
            student_ids.len(),
        ));

        let submitted: Vec<SubmittedLine> = payload.items.iter().map(SubmittedLine::from).collect();
        let catalog_ids: Vec<Uuid> = submitted.iter().filter_map(|l| l.item_id).collect();
        let catalog_prices: HashMap<Uuid, Decimal> = if catalog_ids.is_empty() {
            HashMap::new()
        } else {
            ItemEntity::find()
                .filter(item::Column::Id.is_in(catalog_ids))
                .all(conn)
                .await?
                .into_iter()
                .map(|i| (i.id, i.price))
                .collect()
        };
        let aggregation = match aggregation::aggregate(&submitted, &catalog_prices) {
            Ok(aggregation) => Some(aggregation),
            Err(err) => {
                violations.extend(err.violations);
                None
            }
        };

        let live_amounts: Vec<Decimal> = payload
            .payments
            .iter()
            .filter(|p| !p.delete)
            .map(|p| p.amount)
            .collect();
        violations.extend(reconcile_payments(
            bill_type,
            payload.payment_status,
            payload.advance_payment,
            &live_amounts,
            aggregation.as_ref().map(|a| a.grand_total),
            self.config.billing.paid_tolerance,
        ));

        if !violations.is_empty() {
            return Err(ServiceError::validation(violations));
        }
        // No violations implies aggregation succeeded.
        let aggregation = aggregation.ok_or_else(|| {
            ServiceError::InternalError("Aggregation missing after validation".to_string())
        })?;

        Ok(PreparedBill {
            aggregation,
            student_ids,
            customer_id,
            customer_name,
        })
    }

    async fn load_bill<C: ConnectionTrait>(
        &self,
        conn: &C,
        bill_id: Uuid,
    ) -> Result<BillResponse, ServiceError> {
        let bill = BillEntity::find_by_id(bill_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Bill {} not found", bill_id)))?;
        self.assemble(conn, bill).await
    }

    async fn assemble<C: ConnectionTrait>(
        &self,
        conn: &C,
        bill: bill::Model,
    ) -> Result<BillResponse, ServiceError> {
        let items = BillItemEntity::find()
            .filter(bill_item::Column::BillId.eq(bill.id))
            .all(conn)
            .await?;
        let catalog_ids: Vec<Uuid> = items.iter().filter_map(|i| i.item_id).collect();
        let catalog_names: HashMap<Uuid, String> = if catalog_ids.is_empty() {
            HashMap::new()
        } else {
            ItemEntity::find()
                .filter(item::Column::Id.is_in(catalog_ids))
                .all(conn)
                .await?
                .into_iter()
                .map(|i| (i.id, i.name))
                .collect()
        };

        let payments = BillPaymentEntity::find()
            .filter(bill_payment::Column::BillId.eq(bill.id))
            .all(conn)
            .await?;

        let student_ids: Vec<Uuid> = BillStudentEntity::find()
            .filter(bill_student::Column::BillId.eq(bill.id))
            .all(conn)
            .await?
            .into_iter()
            .map(|row| row.user_id)
            .collect();
        let students: Vec<BillStudentResponse> = if student_ids.is_empty() {
            Vec::new()
        } else {
            UserEntity::find()
                .filter(user::Column::Id.is_in(student_ids))
                .all(conn)
                .await?
                .into_iter()
                .map(|u| BillStudentResponse {
                    id: u.id,
                    full_name: u.full_name,
                })
                .collect()
        };

        let payments_sum: Decimal = payments.iter().map(|p| p.amount).sum();
        let amount_paid = bill.advance_payment + payments_sum;

        Ok(BillResponse {
            id: bill.id,
            invoice_number: bill.invoice_number,
            bill_type: bill.bill_type,
            customer_id: bill.customer_id,
            customer_name: bill.customer_name,
            customer_address: bill.customer_address,
            outlet: bill.outlet,
            payment_type: bill.payment_type,
            advance_payment: bill.advance_payment,
            advance_payment_type: bill.advance_payment_type,
            payment_status: bill.payment_status,
            remarks: bill.remarks,
            total_amount: bill.total_amount,
            amount_paid,
            balance_due: bill.total_amount - amount_paid,
            delivery_date: bill.delivery_date,
            created_by: bill.created_by,
            created_at: bill.created_at,
            items: items
                .into_iter()
                .map(|row| {
                    let name = row
                        .custom_item_name
                        .clone()
                        .or_else(|| row.item_id.and_then(|id| catalog_names.get(&id).cloned()))
                        .unwrap_or_else(|| "(removed item)".to_string());
                    BillLineResponse {
                        id: row.id,
                        item_id: row.item_id,
                        name,
                        quantity: row.quantity,
                        price: row.price,
                        line_total: row.price * Decimal::from(row.quantity),
                    }
                })
                .collect(),
            payments: payments
                .into_iter()
                .map(|row| BillPaymentResponse {
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

/// Create/edit rights come from the matching sub-module or either of
/// the legacy umbrella modules.
fn has_bill_access(actor: &CurrentUser, bill_type: BillType, action: Action) -> bool {
    actor.allows(bill_type.permission_module(), action)
        || actor.allows(modules::LEGACY_BILLING, action)
        || actor.allows(modules::LEGACY_INVOICES, action)
}

fn is_elevated(actor: &CurrentUser) -> bool {
    actor.user.is_superuser
        || matches!(
            actor.user.role,
            UserRole::Admin | UserRole::Supervisor | UserRole::Accountant
        )
}

fn can_view_bill(actor: &CurrentUser, bill: &bill::Model) -> bool {
    is_elevated(actor)
        || bill.created_by == actor.id()
        || actor.allows_any(modules::LEGACY_BILLING)
        || actor.allows_any(bill.bill_type.permission_module())
}

fn can_modify_bill(actor: &CurrentUser, bill: &bill::Model, action: Action) -> bool {
    actor.user.is_superuser
        || matches!(actor.user.role, UserRole::Admin | UserRole::Supervisor)
        || bill.created_by == actor.id()
        || has_bill_access(actor, bill.bill_type, action)
}

fn can_delete_bill(actor: &CurrentUser, bill: &bill::Model) -> bool {
    actor.user.is_superuser
        || matches!(actor.user.role, UserRole::Admin | UserRole::Supervisor)
        || bill.created_by == actor.id()
        || actor.allows_any(modules::LEGACY_BILLING)
}

/// Restricts list queries for principals without broad visibility.
/// `None` means unrestricted.
fn visibility_condition(actor: &CurrentUser) -> Option<Condition> {
    if is_elevated(actor) || actor.allows_any(modules::LEGACY_BILLING) {
        return None;
    }
    let mut condition = Condition::any().add(bill::Column::CreatedBy.eq(actor.id()));
    for bill_type in [BillType::Sales, BillType::Outer, BillType::Inner] {
        if actor.allows(bill_type.permission_module(), Action::View) {
            condition = condition.add(bill::Column::BillType.eq(bill_type));
        }
    }
    Some(condition)
}

fn header_violations(
    bill_type: BillType,
    outlet: Option<Outlet>,
    has_customer: bool,
    delivery_date: Option<NaiveDate>,
    student_count: usize,
) -> Vec<String> {
    let mut violations = Vec::new();
    match bill_type {
        BillType::Inner | BillType::Outer => {
            if !has_customer {
                violations.push("Customer is required for this bill type".to_string());
            }
            if delivery_date.is_none() {
                violations.push("Delivery date is required for this bill type".to_string());
            }
        }
        BillType::Sales => match outlet {
            None => violations.push("Outlet is required for sales bills".to_string()),
            Some(outlet) if outlet.is_mobile() && student_count == 0 => violations
                .push("Select at least one student for mobile outlet sales".to_string()),
            Some(_) => {}
        },
    }
    violations
}

/// Cross-checks submitted payments against the computed grand total.
///
/// The total is `None` when aggregation already failed; total-dependent
/// checks are skipped then rather than reported twice.
fn reconcile_payments(
    bill_type: BillType,
    payment_status: PaymentStatus,
    advance_payment: Decimal,
    live_amounts: &[Decimal],
    grand_total: Option<Decimal>,
    paid_tolerance: Decimal,
) -> Vec<String> {
    let mut violations = Vec::new();
    if advance_payment < Decimal::ZERO {
        violations.push("Advance payment cannot be negative".to_string());
    }
    if bill_type != BillType::Sales && !live_amounts.is_empty() {
        violations.push("Payments can only be recorded on sales bills".to_string());
    }
    if live_amounts.iter().any(|amount| *amount <= Decimal::ZERO) {
        violations.push("Every payment amount must be greater than zero".to_string());
    }
    let Some(total) = grand_total else {
        return violations;
    };
    match (bill_type, payment_status) {
        (BillType::Sales, PaymentStatus::Paid) => {
            let collected: Decimal = live_amounts.iter().copied().sum();
            if (collected - total).abs() > paid_tolerance {
                violations.push(format!(
                    "Payments total {} but the bill total is {}; a paid bill must be settled in full",
                    collected, total
                ));
            }
        }
        (BillType::Outer, PaymentStatus::Pending) => {
            if advance_payment >= total {
                violations.push(format!(
                    "Advance payment {} covers the bill total {}; mark the bill as paid instead",
                    advance_payment, total
                ));
            }
        }
        _ => {}
    }
    violations
}

/// Where payment collection stands once `settled` has been received
/// against `total`.
fn derive_payment_status(total: Decimal, settled: Decimal, tolerance: Decimal) -> PaymentStatus {
    if settled + tolerance >= total {
        PaymentStatus::Paid
    } else if settled > Decimal::ZERO {
        PaymentStatus::Partial
    } else {
        PaymentStatus::Pending
    }
}

async fn insert_lines<C: ConnectionTrait>(
    conn: &C,
    bill_id: Uuid,
    aggregation: &Aggregation,
) -> Result<(), ServiceError> {
    for line in &aggregation.lines {
        bill_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            bill_id: Set(bill_id),
            item_id: Set(line.item_id),
            custom_item_name: Set(line.custom_item_name.clone()),
            quantity: Set(line.quantity),
            price: Set(line.price),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

async fn replace_students<C: ConnectionTrait>(
    conn: &C,
    bill_id: Uuid,
    student_ids: &[Uuid],
) -> Result<(), ServiceError> {
    BillStudentEntity::delete_many()
        .filter(bill_student::Column::BillId.eq(bill_id))
        .exec(conn)
        .await?;
    for user_id in student_ids {
        bill_student::ActiveModel {
            bill_id: Set(bill_id),
            user_id: Set(*user_id),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

/// Applies submitted payment rows on edit. Rows with an id update or
/// delete the referenced record; rows without insert new ones.
async fn apply_payment_changes<C: ConnectionTrait>(
    conn: &C,
    bill_id: Uuid,
    inputs: &[BillPaymentInput],
) -> Result<(), ServiceError> {
    for input in inputs {
        match (input.id, input.delete) {
            (Some(id), true) => {
                BillPaymentEntity::delete_many()
                    .filter(bill_payment::Column::Id.eq(id))
                    .filter(bill_payment::Column::BillId.eq(bill_id))
                    .exec(conn)
                    .await?;
            }
            (Some(id), false) => {
                let existing = BillPaymentEntity::find_by_id(id).one(conn).await?.ok_or_else(
                    || ServiceError::NotFound(format!("Payment {} not found on this bill", id)),
                )?;
                if existing.bill_id != bill_id {
                    return Err(ServiceError::BadRequest(
                        "Payment belongs to a different bill".to_string(),
                    ));
                }
                let mut active: bill_payment::ActiveModel = existing.into();
                active.payment_type = Set(input.payment_type);
                active.amount = Set(input.amount);
                active.reference_number = Set(input.reference_number.trim().to_string());
                active.update(conn).await?;
            }
            (None, false) => {
                bill_payment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    bill_id: Set(bill_id),
                    payment_type: Set(input.payment_type),
                    amount: Set(input.amount),
                    reference_number: Set(input.reference_number.trim().to_string()),
                }
                .insert(conn)
                .await?;
            }
            // Never persisted, nothing to remove.
            (None, true) => {}
        }
    }
    Ok(())
}

fn count_validation_failure(err: ServiceError) -> ServiceError {
    if matches!(
        err,
        ServiceError::ValidationError(_) | ServiceError::ValidationFailed(_)
    ) {
        BILL_VALIDATION_FAILURES.inc();
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn inner_and_outer_bills_require_customer_and_delivery_date() {
        let violations = header_violations(BillType::Inner, None, false, None, 0);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].contains("Customer"));
        assert!(violations[1].contains("Delivery date"));

        let today = NaiveDate::from_ymd_opt(2024, 5, 23).unwrap();
        let violations = header_violations(BillType::Outer, None, true, Some(today), 0);
        assert!(violations.is_empty());
    }

    #[test]
    fn sales_bills_require_an_outlet() {
        let violations = header_violations(BillType::Sales, None, false, None, 0);
        assert_eq!(violations, vec!["Outlet is required for sales bills".to_string()]);
    }

    #[test]
    fn mobile_outlets_require_a_student() {
        let violations = header_violations(BillType::Sales, Some(Outlet::Mobile2), false, None, 0);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("student"));

        let violations = header_violations(BillType::Sales, Some(Outlet::Mobile2), false, None, 1);
        assert!(violations.is_empty());

        let violations = header_violations(BillType::Sales, Some(Outlet::EatRight), false, None, 0);
        assert!(violations.is_empty());
    }

    #[test]
    fn paid_sales_bill_accepts_payments_within_tolerance() {
        let violations = reconcile_payments(
            BillType::Sales,
            PaymentStatus::Paid,
            Decimal::ZERO,
            &[d("999.60")],
            Some(d("1000.00")),
            dec!(0.5),
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn paid_sales_bill_rejects_payments_outside_tolerance() {
        let violations = reconcile_payments(
            BillType::Sales,
            PaymentStatus::Paid,
            Decimal::ZERO,
            &[d("999.40")],
            Some(d("1000.00")),
            dec!(0.5),
        );
        assert_eq!(violations.len(), 1);
        // The message names both totals.
        assert!(violations[0].contains("999.40"));
        assert!(violations[0].contains("1000.00"));
    }

    #[test]
    fn paid_sales_bill_rejects_non_positive_payment_amounts() {
        let violations = reconcile_payments(
            BillType::Sales,
            PaymentStatus::Paid,
            Decimal::ZERO,
            &[d("1000.00"), Decimal::ZERO],
            Some(d("1000.00")),
            dec!(0.5),
        );
        assert!(violations
            .iter()
            .any(|v| v.contains("greater than zero")));
    }

    #[test]
    fn pending_outer_bill_bounds_the_advance() {
        // Advance equal to the total contradicts PENDING.
        let violations = reconcile_payments(
            BillType::Outer,
            PaymentStatus::Pending,
            d("500.00"),
            &[],
            Some(d("500.00")),
            dec!(0.5),
        );
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("mark the bill as paid"));

        let violations = reconcile_payments(
            BillType::Outer,
            PaymentStatus::Pending,
            d("499.99"),
            &[],
            Some(d("500.00")),
            dec!(0.5),
        );
        assert!(violations.is_empty());

        let violations = reconcile_payments(
            BillType::Outer,
            PaymentStatus::Pending,
            d("-1"),
            &[],
            Some(d("500.00")),
            dec!(0.5),
        );
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("negative"));
    }

    #[test]
    fn payments_are_rejected_on_non_sales_bills() {
        let violations = reconcile_payments(
            BillType::Inner,
            PaymentStatus::Pending,
            Decimal::ZERO,
            &[d("10.00")],
            Some(d("10.00")),
            dec!(0.5),
        );
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("sales bills"));
    }

    #[test]
    fn total_dependent_checks_wait_for_a_total() {
        // Aggregation already failed; only the standalone checks run.
        let violations = reconcile_payments(
            BillType::Sales,
            PaymentStatus::Paid,
            Decimal::ZERO,
            &[d("10.00")],
            None,
            dec!(0.5),
        );
        assert!(violations.is_empty());
    }

    #[test]
    fn payment_status_rolls_forward_as_money_arrives() {
        let total = d("1000.00");
        let tolerance = dec!(0.5);
        assert_eq!(
            derive_payment_status(total, Decimal::ZERO, tolerance),
            PaymentStatus::Pending
        );
        assert_eq!(
            derive_payment_status(total, d("400.00"), tolerance),
            PaymentStatus::Partial
        );
        assert_eq!(
            derive_payment_status(total, d("999.50"), tolerance),
            PaymentStatus::Paid
        );
        assert_eq!(
            derive_payment_status(total, d("1000.00"), tolerance),
            PaymentStatus::Paid
        );
    }
}
