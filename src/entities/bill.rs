use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enum representing the kind of bill.
///
/// The kind determines the invoice number prefix and which permission
/// module guards the bill.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BillType {
    /// Counter sale to a walk-in or registered customer.
    #[sea_orm(string_value = "SALES")]
    Sales,
    /// Sale fulfilled outside the premises (catering, delivery).
    #[sea_orm(string_value = "OUTER")]
    Outer,
    /// Internal consumption billed across departments.
    #[sea_orm(string_value = "INNER")]
    Inner,
}

impl BillType {
    /// Document number prefix for this bill kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            BillType::Sales => "SB",
            BillType::Outer => "OB",
            BillType::Inner => "IB",
        }
    }

    /// Permission module that guards bills of this kind.
    pub fn permission_module(&self) -> &'static str {
        match self {
            BillType::Sales => "sales_bill",
            BillType::Outer => "outer_bill",
            BillType::Inner => "inner_bill",
        }
    }
}

/// Enum representing how far along payment collection is.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PARTIAL")]
    Partial,
    #[sea_orm(string_value = "PAID")]
    Paid,
}

/// Enum representing the instrument a payment was made with.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    #[sea_orm(string_value = "CASH")]
    Cash,
    #[sea_orm(string_value = "UPI")]
    Upi,
    #[sea_orm(string_value = "ONLINE")]
    Online,
    #[sea_orm(string_value = "CHEQUE")]
    Cheque,
    #[sea_orm(string_value = "CARD")]
    Card,
    #[sea_orm(string_value = "NEFT")]
    Neft,
}

/// Enum representing the outlet a transaction belongs to.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(50))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Outlet {
    #[sea_orm(string_value = "EAT_RIGHT")]
    EatRight,
    #[sea_orm(string_value = "BED")]
    Bed,
    #[sea_orm(string_value = "LIBA")]
    Liba,
    #[sea_orm(string_value = "MOBILE_1")]
    #[serde(rename = "MOBILE_1")]
    #[strum(serialize = "MOBILE_1")]
    Mobile1,
    #[sea_orm(string_value = "MOBILE_2")]
    #[serde(rename = "MOBILE_2")]
    #[strum(serialize = "MOBILE_2")]
    Mobile2,
    #[sea_orm(string_value = "MOBILE_3")]
    #[serde(rename = "MOBILE_3")]
    #[strum(serialize = "MOBILE_3")]
    Mobile3,
}

impl Outlet {
    /// Mobile outlets are staffed by students and need at least one
    /// student credited on every sale.
    pub fn is_mobile(&self) -> bool {
        matches!(self, Outlet::Mobile1 | Outlet::Mobile2 | Outlet::Mobile3)
    }
}

/// The `bills` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bills")]
pub struct Model {
    /// Primary key: Unique identifier for the bill.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unique document number, e.g. `SB-202405230004`.
    pub invoice_number: String,

    /// Kind of bill.
    pub bill_type: BillType,

    /// Timestamp when the bill was created.
    pub created_at: DateTime<Utc>,

    /// Account that created the bill.
    pub created_by: Uuid,

    /// Optional link to a registered customer.
    pub customer_id: Option<Uuid>,

    /// Customer name as entered on the bill. Kept even when a registered
    /// customer is linked so the bill stays readable after customer edits.
    pub customer_name: String,

    /// Delivery or billing address as entered.
    pub customer_address: String,

    /// Outlet the sale happened at, when tracked.
    pub outlet: Option<Outlet>,

    /// Instrument expected for the main settlement.
    pub payment_type: PaymentType,

    /// Amount collected up front.
    pub advance_payment: Decimal,

    /// Instrument the advance was collected with.
    pub advance_payment_type: Option<PaymentType>,

    /// How far along payment collection is.
    pub payment_status: PaymentStatus,

    /// Free-form notes.
    pub remarks: String,

    /// Grand total across line items.
    pub total_amount: Decimal,

    /// Promised delivery date, when applicable.
    pub delivery_date: Option<NaiveDate>,
}

/// Define relations for the `bills` table.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A bill has many line items.
    #[sea_orm(has_many = "super::bill_item::Entity")]
    BillItems,

    /// A bill has many recorded payments.
    #[sea_orm(has_many = "super::bill_payment::Entity")]
    BillPayments,

    /// Students credited with working the sale.
    #[sea_orm(has_many = "super::bill_student::Entity")]
    BillStudents,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::CreatedBy",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    CreatedBy,

    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id",
        on_delete = "SetNull"
    )]
    Customer,
}

impl Related<super::bill_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillItems.def()
    }
}

impl Related<super::bill_payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillPayments.def()
    }
}

impl Related<super::bill_student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillStudents.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Amount still owed before per-payment records are considered.
    pub fn balance_due(&self) -> Decimal {
        self.total_amount - self.advance_payment
    }
}
