//! # custos-contracts
//!
//! Shared types, data contracts, and error types for the CUSTOS
//! access-control and audit subsystem.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, small constructors, and error types.

pub mod analysis;
pub mod audit;
pub mod error;
pub mod rbac;
