use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::auth::CurrentUser;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::entities::bill_item::{self, Entity as BillItemEntity};
use crate::entities::customer::{self, Entity as CustomerEntity};
use crate::entities::inventory_session_item::{self, Entity as SessionItemEntity};
use crate::entities::item::{self, Entity as ItemEntity};
use crate::entities::purchase_record::{self, Entity as PurchaseEntity};
use crate::entities::vendor::{self, Entity as VendorEntity};
use crate::entities::vendor_payment::{self, Entity as VendorPaymentEntity};
use crate::errors::ServiceError;
use crate::services::record_activity;

#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ItemRequest {
    #[validate(length(min = 1, max = 200, message = "Item name must be 1 to 200 characters"))]
    pub name: String,
    pub price: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CustomerRequest {
    #[validate(length(min = 1, max = 200, message = "Customer name must be 1 to 200 characters"))]
    pub customer_name: String,
    #[serde(default)]
    #[validate(length(max = 500, message = "Address must be at most 500 characters"))]
    pub address: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "Contact number must be at most 20 characters"))]
    pub contact_number: String,
    #[validate(email(message = "Email address is not valid"))]
    pub email_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct VendorRequest {
    #[validate(length(min = 1, max = 50, message = "Vendor code must be 1 to 50 characters"))]
    pub vendor_id: String,
    #[validate(length(min = 1, max = 200, message = "Vendor name must be 1 to 200 characters"))]
    pub name: String,
    #[serde(default)]
    pub account_holder_name: String,
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub ac_number: String,
    #[serde(default)]
    pub ifsc_code: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
pub struct CatalogListFilter {
    /// Substring match on the name.
    pub q: Option<String>,
    pub active: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ItemListResponse {
    pub items: Vec<item::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct CustomerListResponse {
    pub customers: Vec<customer::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct VendorListResponse {
    pub vendors: Vec<vendor::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// How a removal request was carried out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemovalOutcome {
    Deleted,
    Deactivated,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct RemovalResponse {
    pub id: Uuid,
    pub outcome: RemovalOutcome,
}

/// Service for the item, customer and vendor registers
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
    config: Arc<AppConfig>,
}

impl CatalogService {
    /// Creates a new catalog service
    pub fn new(db_pool: Arc<DbPool>, config: Arc<AppConfig>) -> Self {
        Self { db_pool, config }
    }

    #[instrument(skip(self, actor, request), fields(actor_id = %actor.id()))]
    pub async fn create_item(
        &self,
        actor: &CurrentUser,
        request: ItemRequest,
    ) -> Result<item::Model, ServiceError> {
        request.validate()?;
        if request.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }
        let db = &*self.db_pool;
        let name = request.name.trim().to_string();

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let item = item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.clone()),
            price: Set(request.price),
            is_active: Set(request.is_active),
        }
        .insert(&txn)
        .await?;
        record_activity(&txn, actor.id(), format!("Created item {}", name)).await?;
        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(item = %name, "item created");
        Ok(item)
    }

    /// Updates an item. Price changes only affect future bills; lines
    /// already written keep the price they were sold at.
    #[instrument(skip(self, actor, request), fields(item_id = %item_id, actor_id = %actor.id()))]
    pub async fn update_item(
        &self,
        actor: &CurrentUser,
        item_id: Uuid,
        request: ItemRequest,
    ) -> Result<item::Model, ServiceError> {
        request.validate()?;
        if request.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Price cannot be negative".to_string(),
            ));
        }
        let db = &*self.db_pool;
        let item = ItemEntity::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let mut active: item::ActiveModel = item.into();
        let name = request.name.trim().to_string();
        active.name = Set(name.clone());
        active.price = Set(request.price);
        active.is_active = Set(request.is_active);
        let item = active.update(&txn).await?;
        record_activity(&txn, actor.id(), format!("Updated item {}", name)).await?;
        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        Ok(item)
    }

    /// Removes an item: deleted outright when nothing references it,
    /// deactivated when bill or session lines still point at it.
    #[instrument(skip(self, actor), fields(item_id = %item_id, actor_id = %actor.id()))]
    pub async fn remove_item(
        &self,
        actor: &CurrentUser,
        item_id: Uuid,
    ) -> Result<RemovalResponse, ServiceError> {
        let db = &*self.db_pool;
        let item = ItemEntity::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))?;

        let bill_refs = BillItemEntity::find()
            .filter(bill_item::Column::ItemId.eq(item_id))
            .count(db)
            .await?;
        let session_refs = SessionItemEntity::find()
            .filter(inventory_session_item::Column::ItemId.eq(item_id))
            .count(db)
            .await?;
        let referenced = bill_refs + session_refs > 0;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let name = item.name.clone();
        let outcome = if referenced {
            let mut active: item::ActiveModel = item.into();
            active.is_active = Set(false);
            active.update(&txn).await?;
            record_activity(&txn, actor.id(), format!("Deactivated item {}", name)).await?;
            RemovalOutcome::Deactivated
        } else {
            ItemEntity::delete_by_id(item_id).exec(&txn).await?;
            record_activity(&txn, actor.id(), format!("Deleted item {}", name)).await?;
            RemovalOutcome::Deleted
        };
        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(item = %name, ?outcome, "item removed");
        Ok(RemovalResponse {
            id: item_id,
            outcome,
        })
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<item::Model, ServiceError> {
        ItemEntity::find_by_id(item_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found", item_id)))
    }

    pub async fn list_items(
        &self,
        filter: CatalogListFilter,
    ) -> Result<ItemListResponse, ServiceError> {
        let (page, per_page) = self.page_bounds(&filter);
        let mut query = ItemEntity::find();
        if let Some(active) = filter.active {
            query = query.filter(item::Column::IsActive.eq(active));
        }
        if let Some(q) = trimmed(&filter.q) {
            query = query.filter(item::Column::Name.contains(q));
        }
        let paginator = query.order_by_asc(item::Column::Name).paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok(ItemListResponse {
            items,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, actor, request), fields(actor_id = %actor.id()))]
    pub async fn create_customer(
        &self,
        actor: &CurrentUser,
        request: CustomerRequest,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let name = request.customer_name.trim().to_string();

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let row = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_name: Set(name.clone()),
            address: Set(request.address.trim().to_string()),
            contact_number: Set(request.contact_number.trim().to_string()),
            email_id: Set(request.email_id),
        }
        .insert(&txn)
        .await?;
        record_activity(&txn, actor.id(), format!("Created customer {}", name)).await?;
        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(customer = %name, "customer created");
        Ok(row)
    }

    #[instrument(skip(self, actor, request), fields(customer_id = %customer_id, actor_id = %actor.id()))]
    pub async fn update_customer(
        &self,
        actor: &CurrentUser,
        customer_id: Uuid,
        request: CustomerRequest,
    ) -> Result<customer::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let row = CustomerEntity::find_by_id(customer_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))?;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let mut active: customer::ActiveModel = row.into();
        let name = request.customer_name.trim().to_string();
        active.customer_name = Set(name.clone());
        active.address = Set(request.address.trim().to_string());
        active.contact_number = Set(request.contact_number.trim().to_string());
        active.email_id = Set(request.email_id);
        let row = active.update(&txn).await?;
        record_activity(&txn, actor.id(), format!("Updated customer {}", name)).await?;
        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        Ok(row)
    }

    pub async fn get_customer(&self, customer_id: Uuid) -> Result<customer::Model, ServiceError> {
        CustomerEntity::find_by_id(customer_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))
    }

    pub async fn list_customers(
        &self,
        filter: CatalogListFilter,
    ) -> Result<CustomerListResponse, ServiceError> {
        let (page, per_page) = self.page_bounds(&filter);
        let mut query = CustomerEntity::find();
        if let Some(q) = trimmed(&filter.q) {
            query = query.filter(
                Condition::any()
                    .add(customer::Column::CustomerName.contains(q))
                    .add(customer::Column::ContactNumber.contains(q)),
            );
        }
        let paginator = query
            .order_by_asc(customer::Column::CustomerName)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page - 1).await?;
        Ok(CustomerListResponse {
            customers,
            total,
            page,
            per_page,
        })
    }

    #[instrument(skip(self, actor, request), fields(actor_id = %actor.id()))]
    pub async fn create_vendor(
        &self,
        actor: &CurrentUser,
        request: VendorRequest,
    ) -> Result<vendor::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let code = request.vendor_id.trim().to_string();
        let existing = VendorEntity::find()
            .filter(vendor::Column::VendorId.eq(code.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Vendor code {} is already in use",
                code
            )));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let name = request.name.trim().to_string();
        let row = vendor::ActiveModel {
            id: Set(Uuid::new_v4()),
            vendor_id: Set(code),
            name: Set(name.clone()),
            account_holder_name: Set(request.account_holder_name),
            bank_name: Set(request.bank_name),
            ac_number: Set(request.ac_number),
            ifsc_code: Set(request.ifsc_code),
            branch: Set(request.branch),
            contact: Set(request.contact),
            email: Set(request.email),
            is_active: Set(request.is_active),
        }
        .insert(&txn)
        .await?;
        record_activity(&txn, actor.id(), format!("Created vendor {}", name)).await?;
        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(vendor = %name, "vendor created");
        Ok(row)
    }

    #[instrument(skip(self, actor, request), fields(vendor_id = %vendor_id, actor_id = %actor.id()))]
    pub async fn update_vendor(
        &self,
        actor: &CurrentUser,
        vendor_id: Uuid,
        request: VendorRequest,
    ) -> Result<vendor::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let row = VendorEntity::find_by_id(vendor_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Vendor {} not found", vendor_id)))?;
        let code = request.vendor_id.trim().to_string();
        let clash = VendorEntity::find()
            .filter(vendor::Column::VendorId.eq(code.clone()))
            .filter(vendor::Column::Id.ne(vendor_id))
            .one(db)
            .await?;
        if clash.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Vendor code {} is already in use",
                code
            )));
        }

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let mut active: vendor::ActiveModel = row.into();
        let name = request.name.trim().to_string();
        active.vendor_id = Set(code);
        active.name = Set(name.clone());
        active.account_holder_name = Set(request.account_holder_name);
        active.bank_name = Set(request.bank_name);
        active.ac_number = Set(request.ac_number);
        active.ifsc_code = Set(request.ifsc_code);
        active.branch = Set(request.branch);
        active.contact = Set(request.contact);
        active.email = Set(request.email);
        active.is_active = Set(request.is_active);
        let row = active.update(&txn).await?;
        record_activity(&txn, actor.id(), format!("Updated vendor {}", name)).await?;
        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        Ok(row)
    }

    /// Removes a vendor: deleted outright when nothing references it,
    /// deactivated when purchases or payments still point at it.
    #[instrument(skip(self, actor), fields(vendor_id = %vendor_id, actor_id = %actor.id()))]
    pub async fn remove_vendor(
        &self,
        actor: &CurrentUser,
        vendor_id: Uuid,
    ) -> Result<RemovalResponse, ServiceError> {
        let db = &*self.db_pool;
        let row = VendorEntity::find_by_id(vendor_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Vendor {} not found", vendor_id)))?;

        let purchase_refs = PurchaseEntity::find()
            .filter(purchase_record::Column::VendorId.eq(vendor_id))
            .count(db)
            .await?;
        let payment_refs = VendorPaymentEntity::find()
            .filter(vendor_payment::Column::VendorId.eq(vendor_id))
            .count(db)
            .await?;
        let referenced = purchase_refs + payment_refs > 0;

        let txn = db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        let name = row.name.clone();
        let outcome = if referenced {
            let mut active: vendor::ActiveModel = row.into();
            active.is_active = Set(false);
            active.update(&txn).await?;
            record_activity(&txn, actor.id(), format!("Deactivated vendor {}", name)).await?;
            RemovalOutcome::Deactivated
        } else {
            VendorEntity::delete_by_id(vendor_id).exec(&txn).await?;
            record_activity(&txn, actor.id(), format!("Deleted vendor {}", name)).await?;
            RemovalOutcome::Deleted
        };
        txn.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(vendor = %name, ?outcome, "vendor removed");
        Ok(RemovalResponse {
            id: vendor_id,
            outcome,
        })
    }

    pub async fn get_vendor(&self, vendor_id: Uuid) -> Result<vendor::Model, ServiceError> {
        VendorEntity::find_by_id(vendor_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Vendor {} not found", vendor_id)))
    }

    pub async fn list_vendors(
        &self,
        filter: CatalogListFilter,
    ) -> Result<VendorListResponse, ServiceError> {
        let (page, per_page) = self.page_bounds(&filter);
        let mut query = VendorEntity::find();
        if let Some(active) = filter.active {
            query = query.filter(vendor::Column::IsActive.eq(active));
        }
        if let Some(q) = trimmed(&filter.q) {
            query = query.filter(
                Condition::any()
                    .add(vendor::Column::Name.contains(q))
                    .add(vendor::Column::VendorId.contains(q)),
            );
        }
        let paginator = query
            .order_by_asc(vendor::Column::Name)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let vendors = paginator.fetch_page(page - 1).await?;
        Ok(VendorListResponse {
            vendors,
            total,
            page,
            per_page,
        })
    }

    fn page_bounds(&self, filter: &CatalogListFilter) -> (u64, u64) {
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter
            .per_page
            .unwrap_or(u64::from(self.config.api_default_page_size))
            .clamp(1, u64::from(self.config.api_max_page_size));
        (page, per_page)
    }
}

fn trimmed(q: &Option<String>) -> Option<&str> {
    q.as_deref().map(str::trim).filter(|q| !q.is_empty())
}
