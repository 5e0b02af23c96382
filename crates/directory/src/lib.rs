//! User directory module.
//!
//! Users, their company (tenant) affiliation and subscription state, plus the
//! append-only payment history. Pure domain logic; storage lives in infra.

pub mod payment;
pub mod user;

pub use payment::{NewPayment, PaymentRecord, amount_in_cents};
pub use user::{CompanyAssignment, NewUser, PaymentStatus, SubscriptionUpdate, User};
