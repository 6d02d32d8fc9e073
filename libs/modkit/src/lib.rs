//! # ModKit - Module System
//!
//! Building blocks for a modular server: module contracts, a context handed to
//! each module, a type-keyed client hub, an explicit registry and the runner
//! that drives the lifecycle.
//!
//! ## Lifecycle
//!
//! init → db (migrate) → rest (sync router composition) → start → wait → stop
//!
//! ## Example
//!
//! ```rust,ignore
//! use modkit::registry::RegistryBuilder;
//!
//! let mut b = RegistryBuilder::default();
//! b.module("api_ingress", &[], ingress).rest_host().stateful();
//! b.module("user_directory", &["api_ingress"], users).db().rest();
//! let registry = b.build_topo_sorted()?;
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

// Core module contracts and traits
pub mod contracts;
pub use crate::contracts::*;

pub mod context;
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};

pub mod client_hub;
pub mod registry;

pub use client_hub::{ClientHub, ClientHubError};
pub use registry::{ModuleRegistry, RegistryBuilder, RegistryError};

// Plain-text error responses for REST modules
pub mod api;
pub use api::text_error::{bad_request, conflict, internal_error, not_found, TextErrorResponse};

pub mod runtime;
pub use runtime::{bootstrap, run, Bootstrapped, DbFactory, DbOptions, RunOptions, ShutdownOptions};
