use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Bill events
    BillCreated {
        bill_id: Uuid,
        invoice_number: String,
    },
    BillUpdated(Uuid),
    BillDeleted {
        bill_id: Uuid,
        invoice_number: String,
    },
    BillPaymentRecorded {
        bill_id: Uuid,
        amount: Decimal,
    },

    // Inventory session events
    SessionOpened(Uuid),
    SessionUpdated(Uuid),
    SessionClosed {
        session_id: Uuid,
        bill_id: Uuid,
        invoice_number: String,
    },
    SessionDeleted(Uuid),

    // Workforce events
    AttendanceClockedIn {
        user_id: Uuid,
        date: chrono::NaiveDate,
    },
    AttendanceClockedOut {
        user_id: Uuid,
        date: chrono::NaiveDate,
        total_hours: Decimal,
    },
    AttendanceApproved {
        attendance_id: Uuid,
        approved_by: Uuid,
    },
    WorkLogSubmitted(Uuid),
    WorkLogApproved {
        work_log_id: Uuid,
        approved_by: Uuid,
    },
    WorkLogRejected {
        work_log_id: Uuid,
        approved_by: Uuid,
    },

    // Purchasing events
    PurchaseRecorded {
        purchase_id: Uuid,
        purchase_order_id: String,
    },
    PurchaseUpdated(Uuid),
    VendorPaymentRecorded {
        payment_id: Uuid,
        vendor_id: Uuid,
        amount: Decimal,
    },
    VendorPaymentApproved(Uuid),

    // Account events
    UserCreated(Uuid),
    UserUpdated(Uuid),
    UserDeactivated(Uuid),
    RolePermissionsChanged {
        role: String,
    },

    // Generic event for custom messages
    Generic {
        message: String,
        timestamp: DateTime<Utc>,
        metadata: serde_json::Value,
    },
}

impl Event {
    /// Create a generic event with string data
    pub fn with_data(data: String) -> Self {
        Event::Generic {
            message: data,
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }
}

// Function to process incoming events. Today this is a structured-log sink;
// anything that needs to fan out (webhooks, notifications) hangs off here.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::SessionClosed {
                session_id,
                bill_id,
                invoice_number,
            } => {
                info!(
                    session_id = %session_id,
                    bill_id = %bill_id,
                    invoice_number = %invoice_number,
                    "Inventory session converted to bill"
                );
            }
            Event::BillDeleted {
                bill_id,
                invoice_number,
            } => {
                // Deletions are rare enough to warrant a louder record.
                warn!(bill_id = %bill_id, invoice_number = %invoice_number, "Bill deleted");
            }
            Event::VendorPaymentRecorded {
                payment_id,
                vendor_id,
                amount,
            } => {
                info!(
                    payment_id = %payment_id,
                    vendor_id = %vendor_id,
                    amount = %amount,
                    "Vendor payment recorded"
                );
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_sender_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::BillUpdated(Uuid::new_v4()))
            .await
            .unwrap();

        assert!(matches!(rx.recv().await, Some(Event::BillUpdated(_))));
    }

    #[tokio::test]
    async fn send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::SessionOpened(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
