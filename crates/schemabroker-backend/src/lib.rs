//! # Schema Broker Backend
//!
//! The seam between the schema broker and the shared SQL server.
//!
//! The broker never links a database driver directly. It drives the server
//! through [`SessionFactory`] and [`SqlSession`], and builds every statement
//! with the [`statements`] module, which targets a single dialect (HANA
//! catalog views and DDL grammar).
//!
//! ## Crate Organization
//!
//! - [`error`] - `BackendError`, the only error a transport reports
//! - [`session`] - Session traits and result rows
//! - [`privilege`] - Schema privileges and the full/write access sets
//! - [`statements`] - DDL, grant and catalog query builders
//! - [`config`] - Connection parameters of the shared server

pub mod config;
pub mod error;
pub mod privilege;
pub mod session;
pub mod statements;

pub use config::BackendConfig;
pub use error::{BackendError, BackendResult};
pub use privilege::{Privilege, FULL_ACCESS, WRITE_ACCESS};
pub use session::{Row, SessionFactory, SqlSession, SqlValue};

// Re-export async_trait for transport implementors
pub use async_trait::async_trait;
