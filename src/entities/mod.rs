pub mod activity_log;
pub mod attendance;
pub mod bill;
pub mod bill_item;
pub mod bill_payment;
pub mod bill_student;
pub mod customer;
pub mod document_counter;
pub mod inventory_session;
pub mod inventory_session_item;
pub mod inventory_session_payment;
pub mod inventory_session_student;
pub mod item;
pub mod purchase_item;
pub mod purchase_record;
pub mod role_permission;
pub mod user;
pub mod vendor;
pub mod vendor_payment;
pub mod work_log;
