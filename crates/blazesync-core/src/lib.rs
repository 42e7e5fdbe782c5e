//! BlazeSync Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Inventory model** - `SyncKey`, `RemoteObject`, `LocalFile` and the inventories built from them
//! - **Staleness oracle** - modification-time and size comparisons between both sides
//! - **Reconciler** - the pure diff that decides what is missing and what is unsynced
//! - **Port definitions** - Traits for adapters: `IAuthProvider`, `IRemoteInventory`, `ILastSyncStore`
//!
//! # Architecture
//!
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that the adapter crates (`blazesync-api`,
//! `blazesync-sync`) implement, and the orchestrator consumes.

pub mod config;
pub mod domain;
pub mod ports;
