//! # rental-checkout
//!
//! WebPay redirect handshake for the property rental marketplace.
//!
//! A payment is split across two independent entry points that share state
//! only through a [`SessionStore`]:
//!
//! 1. [`TransactionInitiator`] validates the amount, stores the pending
//!    transaction, asks the backend for a gateway transaction and redirects
//!    to the gateway with `token_ws` attached.
//! 2. [`ReturnHandler`] runs when the gateway redirects back. It reads the
//!    pending transaction, settles it through the backend and ends in
//!    `Success` (with an automatic redirect after a short countdown) or
//!    `Error` (with retry and go-to-wallet actions).
//!
//! After a settled visit reservation the handler also triggers recommendation
//! generation in the background; its outcome never affects the payment.

pub mod api;
pub mod checkout;
pub mod config;
pub mod countdown;
pub mod error;
pub mod format;
pub mod initiator;
pub mod navigation;
pub mod recommendations;
pub mod return_handler;
pub mod session;
pub mod storage;
pub mod types;

// Main client
pub use checkout::{Checkout, CheckoutOptions};

// Error types
pub use error::{CheckoutError, CheckoutErrorCode, Result};

// Handshake
pub use initiator::{TransactionInitiator, redirect_url, validate_amount};
pub use return_handler::{ReturnHandler, ReturnState};

// Storage and navigation seams
pub use navigation::{LogNavigator, Navigator};
pub use session::PaymentSession;
pub use storage::{FileStorage, MemoryStorage, SessionStore};

// Types
pub use types::{
    Destination, MINIMUM_AMOUNT, PaymentRequest, PendingTransaction, PropertyContext,
    RedirectTarget, TransactionResult, TransactionStatus, TransactionType,
};
