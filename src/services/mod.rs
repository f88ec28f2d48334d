//! Request-level operations. Every call takes the authenticated [`Actor`]
//! explicitly and performs its own authorization before touching the store.
//!
//! [`Actor`]: crate::auth::Actor

pub mod accounts;
pub mod catalog;
pub mod orders;
