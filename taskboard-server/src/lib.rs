//! Taskboard server library.
//!
//! Exposes the task store, the live-update relay, and the HTTP router for
//! use in tests and embedding. The filesystem is the database: every
//! directory under the tasks root is a task, and archiving a task moves its
//! directory under the archive root.

pub mod archive;
pub mod auth;
pub mod config;
pub mod error;
pub mod notes;
pub mod relay;
pub mod routes;
pub mod server;
pub mod store;
pub mod upload;
