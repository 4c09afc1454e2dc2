//! Pending transaction persistence on top of a [`SessionStore`]

use std::sync::Arc;

use crate::storage::{SessionStore, keys};
use crate::types::{PendingTransaction, PropertyContext, TransactionType};

/// Reads and writes the single pending transaction.
///
/// There is at most one pending transaction per store; saving a new one
/// replaces whatever was there.
#[derive(Clone)]
pub struct PaymentSession {
    store: Arc<dyn SessionStore>,
}

impl PaymentSession {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Persist `pending`, replacing any previous attempt in a single store
    /// write.
    pub fn save(&self, pending: &PendingTransaction) {
        let mut entries = vec![
            (
                keys::TRANSACTION_TYPE,
                pending.transaction_type.as_str().to_string(),
            ),
            (keys::DESCRIPTION, pending.description.clone()),
            (keys::SUBJECT_REFERENCE, pending.subject_reference.clone()),
            (keys::AMOUNT, pending.amount.to_string()),
        ];

        if let Some(ctx) = &pending.property_context {
            if let Some(price) = ctx.price {
                entries.push((keys::PRICE, price.to_string()));
            }
            match serde_json::to_string(ctx) {
                Ok(json) => entries.push((keys::PROPERTY_CONTEXT, json)),
                Err(e) => tracing::warn!("Could not serialize property context: {}", e),
            }
        }

        self.store.replace_all(&entries);

        tracing::debug!(
            "Saved pending {} for {}",
            pending.transaction_type,
            pending.subject_reference
        );
    }

    /// Load the pending transaction.
    ///
    /// Returns `None` when no subject reference is stored. Other fields are
    /// read leniently: an unknown type is treated as a reservation and an
    /// unparsable property context is dropped.
    pub fn load(&self) -> Option<PendingTransaction> {
        let subject_reference = self
            .store
            .get(keys::SUBJECT_REFERENCE)
            .filter(|s| !s.is_empty())?;

        let transaction_type = self
            .store
            .get(keys::TRANSACTION_TYPE)
            .and_then(|t| TransactionType::from_str(&t))
            .unwrap_or(TransactionType::VisitReservation);

        let amount = self
            .store
            .get(keys::AMOUNT)
            .and_then(|a| a.parse().ok())
            .unwrap_or_default();

        let property_context = self.store.get(keys::PROPERTY_CONTEXT).and_then(|raw| {
            match serde_json::from_str::<PropertyContext>(&raw) {
                Ok(ctx) => Some(ctx),
                Err(e) => {
                    tracing::warn!("Ignoring unparsable property context: {}", e);
                    None
                }
            }
        });

        Some(PendingTransaction {
            transaction_type,
            description: self.store.get(keys::DESCRIPTION).unwrap_or_default(),
            subject_reference,
            amount,
            property_context,
        })
    }

    /// Remove every key of the pending transaction. Idempotent.
    pub fn clear(&self) {
        self.store.replace_all(&[]);
    }
}

impl std::fmt::Debug for PaymentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSession")
            .field("store", &"<store>")
            .finish()
    }
}
