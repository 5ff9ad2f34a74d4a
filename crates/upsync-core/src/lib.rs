//! upsync core - domain types, ports and configuration
//!
//! This crate holds everything the synchronization engine and the backend
//! adapters agree on:
//! - **Domain types** - `RelativePath`, `PathSet`, `RemoteRoot`, the set diff
//! - **Port definitions** - the `RemoteStore` capability every backend implements
//! - **Configuration** - environment/YAML configuration with validation
//!
//! # Architecture
//!
//! Ports & adapters: the domain module is pure, the ports module defines the
//! trait the backend crates (`upsync-gdrive`, `upsync-synology`) implement,
//! and `upsync-sync` drives the ports.

pub mod config;
pub mod domain;
pub mod ports;
