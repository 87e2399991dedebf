//! Core types and trait definitions for the Campus school-administration
//! backend.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the account provisioning saga, assignment-based visibility resolution, and
//! the appraisal workflow; the identity directory and document store are
//! reached only through the traits in [`directory`] and [`store`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod appraisal;
pub mod assignment;
pub mod catalog;
pub mod credentials;
pub mod directory;
pub mod error;
pub mod paths;
pub mod profile;
pub mod provision;
pub mod remarks;
pub mod roster;
pub mod store;
pub mod users;
pub mod visibility;

#[cfg(test)]
mod testing;

pub use error::{DirectoryError, Error, ProvisionError, Result, StoreError};
