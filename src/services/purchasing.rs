use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
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
use crate::entities::bill::{PaymentStatus, PaymentType};
use crate::entities::purchase_item::{self, Entity as PurchaseItemEntity};
use crate::entities::purchase_record::{self, Entity as PurchaseEntity};
use crate::entities::user::UserRole;
use crate::entities::vendor::{self, Entity as VendorEntity};
use crate::entities::vendor_payment::{self, Entity as VendorPaymentEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::{numbering, record_activity};

lazy_static! {
    static ref PURCHASES_RECORDED: IntCounter = register_int_counter!(
        "purchases_recorded_total",
        "Total number of purchase records created"
    )
    .expect("metric can be created");
    static ref VENDOR_PAYMENTS_RECORDED: IntCounter = register_int_counter!(
        "vendor_payments_recorded_total",
        "Total number of vendor payments recorded"
    )
    .expect("metric can be created");
    static ref VENDOR_PAYMENTS_APPROVED: IntCounter = register_int_counter!(
        "vendor_payments_approved_total",
        "Total number of vendor payments approved"
    )
    .expect("metric can be created");
}

fn default_quantity() -> i32 {
    1
}

fn default_payment_status() -> PaymentStatus {
    PaymentStatus::Pending
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PurchaseLineInput {
    pub item_name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub price: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseRequest {
    pub vendor_id: Uuid,
    #[serde(default)]
    #[validate(length(max = 100, message = "Bill number must be at most 100 characters"))]
    pub bill_no: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: String,
    /// Defaults to today.
    pub ordered_date: Option<NaiveDate>,
    pub payment_type: Option<PaymentType>,
    #[serde(default = "default_payment_status")]
    pub payment_status: PaymentStatus,
    pub payment_date: Option<NaiveDate>,
    pub items: Vec<PurchaseLineInput>,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct MarkReceivedRequest {
    /// Defaults to today.
    pub received_date: Option<NaiveDate>,
}

/// Partial update of how and when a purchase was settled.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePurchasePaymentRequest {
    pub payment_type: Option<PaymentType>,
    pub payment_status: Option<PaymentStatus>,
    pub payment_date: Option<NaiveDate>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateVendorPaymentRequest {
    pub vendor_id: Uuid,
    pub amount: Decimal,
    /// Defaults to now.
    pub date: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    #[validate(length(max = 500, message = "Details must be at most 500 characters"))]
    pub details: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PurchaseItemResponse {
    pub id: Uuid,
    pub item_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PurchaseResponse {
    pub id: Uuid,
    pub purchase_order_id: String,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub bill_no: String,
    pub description: String,
    pub total_amount: Decimal,
    pub ordered_date: NaiveDate,
    pub received_date: Option<NaiveDate>,
    pub payment_type: Option<PaymentType>,
    pub payment_status: PaymentStatus,
    pub payment_date: Option<NaiveDate>,
    pub created_at: chrono::DateTime<Utc>,
    pub purchased_by: Uuid,
    pub items: Vec<PurchaseItemResponse>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PurchaseSummary {
    pub id: Uuid,
    pub purchase_order_id: String,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub total_amount: Decimal,
    pub ordered_date: NaiveDate,
    pub received_date: Option<NaiveDate>,
    pub payment_status: PaymentStatus,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct PurchaseListFilter {
    pub vendor_id: Option<Uuid>,
    pub payment_status: Option<PaymentStatus>,
    /// Inclusive ordered-date lower bound.
    pub from: Option<NaiveDate>,
    /// Inclusive ordered-date upper bound.
    pub to: Option<NaiveDate>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct PurchaseListResponse {
    pub purchases: Vec<PurchaseSummary>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct VendorPaymentResponse {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub amount: Decimal,
    pub date: chrono::DateTime<Utc>,
    pub status: PaymentStatus,
    pub approval_status: bool,
    pub details: String,
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct VendorPaymentListFilter {
    pub vendor_id: Option<Uuid>,
    pub approved: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct VendorPaymentListResponse {
    pub payments: Vec<VendorPaymentResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for vendor purchasing and payouts
#[derive(Clone)]
pub struct PurchasingService {
    db_pool: Arc<DbPool>,
    config: Arc<AppConfig>,
    event_sender: Option<Arc<EventSender>>,
}

impl PurchasingService {
    /// Creates a new purchasing service
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

    /// Records a purchase with its line items. The purchase order
    /// number is allocated inside the same transaction; the total is
    /// always the sum of the lines.
    #[instrument(skip(self, actor, request), fields(vendor_id = %request.vendor_id, actor_id = %actor.id()))]
    pub async fn create_purchase(
        &self,
        actor: &CurrentUser,
        request: CreatePurchaseRequest,
    ) -> Result<PurchaseResponse, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;

        let mut violations: Vec<String> = Vec::new();
        let vendor = VendorEntity::find_by_id(request.vendor_id).one(db).await?;
        match &vendor {
            Some(v) if !v.is_active => {
                violations.push(format!("Vendor {} is inactive", v.name));
            }
            Some(_) => {}
            None => violations.push("Selected vendor does not exist".to_string()),
        }

        let mut lines: Vec<PurchaseLineInput> = Vec::new();
        for (position, line) in request.items.iter().enumerate() {
            let number = position + 1;
            let item_name = line.item_name.trim().to_string();
            if item_name.is_empty() {
                violations.push(format!("Item {}: name is required", number));
                continue;
            }
            if line.quantity <= 0 {
                violations.push(format!("Item {}: quantity must be at least 1", number));
                continue;
            }
            if line.price < Decimal::ZERO {
                violations.push(format!("Item {}: price cannot be negative", number));
                continue;
            }
            lines.push(PurchaseLineInput {
                item_name,
                quantity: line.quantity,
                price: line.price,
            });
        }
        if lines.is_empty() && violations.is_empty() {
            violations.push("A purchase needs at least one item".to_string());
        }
        if !violations.is_empty() {
            return Err(ServiceError::validation(violations));
        }
        let vendor = vendor.ok_or_else(|| {
            ServiceError::InternalError("Vendor missing after validation".to_string())
        })?;

        let total_amount: Decimal = lines
            .iter()
            .map(|l| l.price * Decimal::from(l.quantity))
            .sum();

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let today = Utc::now().date_naive();
        let purchase_order_id = numbering::next_purchase_order_id(&txn, today).await?;
        let purchase_id = Uuid::new_v4();
        purchase_record::ActiveModel {
            id: Set(purchase_id),
            vendor_id: Set(vendor.id),
            purchase_order_id: Set(purchase_order_id.clone()),
            bill_no: Set(request.bill_no.trim().to_string()),
            description: Set(request.description.trim().to_string()),
            total_amount: Set(total_amount),
            ordered_date: Set(request.ordered_date.unwrap_or(today)),
            received_date: Set(None),
            payment_type: Set(request.payment_type),
            payment_status: Set(request.payment_status),
            payment_date: Set(request.payment_date),
            created_at: Set(Utc::now()),
            purchased_by: Set(actor.id()),
        }
        .insert(&txn)
        .await?;

        for line in &lines {
            purchase_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                purchase_id: Set(purchase_id),
                item_name: Set(line.item_name.clone()),
                quantity: Set(line.quantity),
                price: Set(line.price),
            }
            .insert(&txn)
            .await?;
        }
        record_activity(
            &txn,
            actor.id(),
            format!("Recorded purchase {}", purchase_order_id),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        PURCHASES_RECORDED.inc();
        info!(purchase_order_id = %purchase_order_id, total = %total_amount, "purchase recorded");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::PurchaseRecorded {
                    purchase_id,
                    purchase_order_id: purchase_order_id.clone(),
                })
                .await
            {
                warn!("Failed to send purchase recorded event: {}", e);
            }
        }

        self.load_purchase(db, purchase_id).await
    }

    /// Marks the goods as received.
    #[instrument(skip(self, actor, request), fields(purchase_id = %purchase_id, actor_id = %actor.id()))]
    pub async fn mark_received(
        &self,
        actor: &CurrentUser,
        purchase_id: Uuid,
        request: MarkReceivedRequest,
    ) -> Result<PurchaseResponse, ServiceError> {
        let db = &*self.db_pool;
        let purchase = PurchaseEntity::find_by_id(purchase_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Purchase {} not found", purchase_id)))?;
        if purchase.received_date.is_some() {
            return Err(ServiceError::InvalidOperation(
                "Purchase is already marked received".to_string(),
            ));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let purchase_order_id = purchase.purchase_order_id.clone();
        let mut active: purchase_record::ActiveModel = purchase.into();
        active.received_date = Set(Some(
            request.received_date.unwrap_or_else(|| Utc::now().date_naive()),
        ));
        active.update(&txn).await?;
        record_activity(
            &txn,
            actor.id(),
            format!("Marked purchase {} received", purchase_order_id),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(purchase_order_id = %purchase_order_id, "purchase received");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::PurchaseUpdated(purchase_id)).await {
                warn!("Failed to send purchase updated event: {}", e);
            }
        }

        self.load_purchase(db, purchase_id).await
    }

    /// Updates how and when the purchase was settled.
    #[instrument(skip(self, actor, request), fields(purchase_id = %purchase_id, actor_id = %actor.id()))]
    pub async fn update_payment(
        &self,
        actor: &CurrentUser,
        purchase_id: Uuid,
        request: UpdatePurchasePaymentRequest,
    ) -> Result<PurchaseResponse, ServiceError> {
        let db = &*self.db_pool;
        let purchase = PurchaseEntity::find_by_id(purchase_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Purchase {} not found", purchase_id)))?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let purchase_order_id = purchase.purchase_order_id.clone();
        let mut active: purchase_record::ActiveModel = purchase.into();
        if let Some(payment_type) = request.payment_type {
            active.payment_type = Set(Some(payment_type));
        }
        if let Some(payment_status) = request.payment_status {
            active.payment_status = Set(payment_status);
        }
        if let Some(payment_date) = request.payment_date {
            active.payment_date = Set(Some(payment_date));
        }
        active.update(&txn).await?;
        record_activity(
            &txn,
            actor.id(),
            format!("Updated payment on purchase {}", purchase_order_id),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(purchase_order_id = %purchase_order_id, "purchase payment updated");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::PurchaseUpdated(purchase_id)).await {
                warn!("Failed to send purchase updated event: {}", e);
            }
        }

        self.load_purchase(db, purchase_id).await
    }

    /// Fetches one purchase with its line items.
    pub async fn get_purchase(&self, purchase_id: Uuid) -> Result<PurchaseResponse, ServiceError> {
        self.load_purchase(&*self.db_pool, purchase_id).await
    }

    /// Lists purchases, most recently ordered first.
    pub async fn list_purchases(
        &self,
        filter: PurchaseListFilter,
    ) -> Result<PurchaseListResponse, ServiceError> {
        let db = &*self.db_pool;
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter
            .per_page
            .unwrap_or(u64::from(self.config.api_default_page_size))
            .clamp(1, u64::from(self.config.api_max_page_size));

        let mut query = PurchaseEntity::find();
        if let Some(vendor_id) = filter.vendor_id {
            query = query.filter(purchase_record::Column::VendorId.eq(vendor_id));
        }
        if let Some(status) = filter.payment_status {
            query = query.filter(purchase_record::Column::PaymentStatus.eq(status));
        }
        if let Some(from) = filter.from {
            query = query.filter(purchase_record::Column::OrderedDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(purchase_record::Column::OrderedDate.lte(to));
        }

        let paginator = query
            .order_by_desc(purchase_record::Column::OrderedDate)
            .order_by_desc(purchase_record::Column::CreatedAt)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        let vendor_names = self.vendor_names(db, rows.iter().map(|r| r.vendor_id)).await?;
        let purchases = rows
            .into_iter()
            .map(|row| {
                let vendor_name = vendor_names.get(&row.vendor_id).cloned().unwrap_or_default();
                PurchaseSummary {
                    id: row.id,
                    purchase_order_id: row.purchase_order_id,
                    vendor_id: row.vendor_id,
                    vendor_name,
                    total_amount: row.total_amount,
                    ordered_date: row.ordered_date,
                    received_date: row.received_date,
                    payment_status: row.payment_status,
                }
            })
            .collect();

        Ok(PurchaseListResponse {
            purchases,
            total,
            page,
            per_page,
        })
    }

    /// Records a payout to a vendor. Payouts start unapproved and
    /// pending.
    #[instrument(skip(self, actor, request), fields(vendor_id = %request.vendor_id, actor_id = %actor.id()))]
    pub async fn create_vendor_payment(
        &self,
        actor: &CurrentUser,
        request: CreateVendorPaymentRequest,
    ) -> Result<VendorPaymentResponse, ServiceError> {
        request.validate()?;
        if request.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be greater than zero".to_string(),
            ));
        }
        let db = &*self.db_pool;
        let vendor = VendorEntity::find_by_id(request.vendor_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::ValidationError("Selected vendor does not exist".to_string()))?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let payment_id = Uuid::new_v4();
        let payment = vendor_payment::ActiveModel {
            id: Set(payment_id),
            vendor_id: Set(vendor.id),
            amount: Set(request.amount),
            date: Set(request.date.unwrap_or_else(Utc::now)),
            status: Set(PaymentStatus::Pending),
            approval_status: Set(false),
            details: Set(request.details.trim().to_string()),
        }
        .insert(&txn)
        .await?;
        record_activity(
            &txn,
            actor.id(),
            format!("Recorded vendor payment of {} to {}", request.amount, vendor.name),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        VENDOR_PAYMENTS_RECORDED.inc();
        info!(vendor = %vendor.name, amount = %request.amount, "vendor payment recorded");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::VendorPaymentRecorded {
                    payment_id,
                    vendor_id: vendor.id,
                    amount: request.amount,
                })
                .await
            {
                warn!("Failed to send vendor payment recorded event: {}", e);
            }
        }

        Ok(vendor_payment_response(payment, vendor.name))
    }

    /// Approves a payout, marking it paid.
    #[instrument(skip(self, actor), fields(payment_id = %payment_id, actor_id = %actor.id()))]
    pub async fn approve_vendor_payment(
        &self,
        actor: &CurrentUser,
        payment_id: Uuid,
    ) -> Result<VendorPaymentResponse, ServiceError> {
        if !can_approve_payout(actor) {
            return Err(ServiceError::Forbidden(
                "Only accountants, supervisors and admins can approve vendor payments".to_string(),
            ));
        }
        let db = &*self.db_pool;
        let payment = VendorPaymentEntity::find_by_id(payment_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Vendor payment {} not found", payment_id))
            })?;
        if payment.approval_status {
            return Err(ServiceError::InvalidOperation(
                "Vendor payment is already approved".to_string(),
            ));
        }
        let vendor = VendorEntity::find_by_id(payment.vendor_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Vendor no longer exists".to_string()))?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let mut active: vendor_payment::ActiveModel = payment.into();
        active.approval_status = Set(true);
        active.status = Set(PaymentStatus::Paid);
        let payment = active.update(&txn).await?;
        record_activity(
            &txn,
            actor.id(),
            format!("Approved vendor payment to {}", vendor.name),
        )
        .await?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        VENDOR_PAYMENTS_APPROVED.inc();
        info!(vendor = %vendor.name, amount = %payment.amount, "vendor payment approved");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::VendorPaymentApproved(payment_id)).await {
                warn!("Failed to send vendor payment approved event: {}", e);
            }
        }

        Ok(vendor_payment_response(payment, vendor.name))
    }

    /// Lists vendor payments, newest first.
    pub async fn list_vendor_payments(
        &self,
        filter: VendorPaymentListFilter,
    ) -> Result<VendorPaymentListResponse, ServiceError> {
        let db = &*self.db_pool;
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter
            .per_page
            .unwrap_or(u64::from(self.config.api_default_page_size))
            .clamp(1, u64::from(self.config.api_max_page_size));

        let mut query = VendorPaymentEntity::find();
        if let Some(vendor_id) = filter.vendor_id {
            query = query.filter(vendor_payment::Column::VendorId.eq(vendor_id));
        }
        if let Some(approved) = filter.approved {
            query = query.filter(vendor_payment::Column::ApprovalStatus.eq(approved));
        }

        let paginator = query
            .order_by_desc(vendor_payment::Column::Date)
            .paginate(db, per_page);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        let vendor_names = self.vendor_names(db, rows.iter().map(|r| r.vendor_id)).await?;
        let payments = rows
            .into_iter()
            .map(|row| {
                let vendor_name = vendor_names.get(&row.vendor_id).cloned().unwrap_or_default();
                vendor_payment_response(row, vendor_name)
            })
            .collect();

        Ok(VendorPaymentListResponse {
            payments,
            total,
            page,
            per_page,
        })
    }

    async fn load_purchase<C: ConnectionTrait>(
        &self,
        conn: &C,
        purchase_id: Uuid,
    ) -> Result<PurchaseResponse, ServiceError> {
        let purchase = PurchaseEntity::find_by_id(purchase_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Purchase {} not found", purchase_id)))?;
        let vendor_name = VendorEntity::find_by_id(purchase.vendor_id)
            .one(conn)
            .await?
            .map(|v| v.name)
            .unwrap_or_default();
        let items = PurchaseItemEntity::find()
            .filter(purchase_item::Column::PurchaseId.eq(purchase_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|row| PurchaseItemResponse {
                id: row.id,
                item_name: row.item_name,
                quantity: row.quantity,
                price: row.price,
                line_total: row.price * Decimal::from(row.quantity),
            })
            .collect();

        Ok(PurchaseResponse {
            id: purchase.id,
            purchase_order_id: purchase.purchase_order_id,
            vendor_id: purchase.vendor_id,
            vendor_name,
            bill_no: purchase.bill_no,
            description: purchase.description,
            total_amount: purchase.total_amount,
            ordered_date: purchase.ordered_date,
            received_date: purchase.received_date,
            payment_type: purchase.payment_type,
            payment_status: purchase.payment_status,
            payment_date: purchase.payment_date,
            created_at: purchase.created_at,
            purchased_by: purchase.purchased_by,
            items,
        })
    }

    async fn vendor_names<C, I>(&self, conn: &C, ids: I) -> Result<HashMap<Uuid, String>, ServiceError>
    where
        C: ConnectionTrait,
        I: Iterator<Item = Uuid>,
    {
        let mut vendor_ids: Vec<Uuid> = ids.collect();
        vendor_ids.sort();
        vendor_ids.dedup();
        if vendor_ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(VendorEntity::find()
            .filter(vendor::Column::Id.is_in(vendor_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|v| (v.id, v.name))
            .collect())
    }
}

fn vendor_payment_response(model: vendor_payment::Model, vendor_name: String) -> VendorPaymentResponse {
    VendorPaymentResponse {
        id: model.id,
        vendor_id: model.vendor_id,
        vendor_name,
        amount: model.amount,
        date: model.date,
        status: model.status,
        approval_status: model.approval_status,
        details: model.details,
    }
}

fn can_approve_payout(actor: &CurrentUser) -> bool {
    actor.user.is_superuser
        || matches!(
            actor.user.role,
            UserRole::Accountant | UserRole::Supervisor | UserRole::Admin
        )
}
