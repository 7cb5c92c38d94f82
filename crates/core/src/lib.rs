//! Backoffice Core - Shared domain types.
//!
//! This crate provides the types exchanged between the console library,
//! the CLI front end and the remote resource API:
//! - identities (`Principal`, `Role`)
//! - the two managed resource families (accounts and tenant organizations)
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no timers.
//! Wire casing follows the remote API (`camelCase`).
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, roles and resource records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
