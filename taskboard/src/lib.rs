//! Taskboard terminal client.
//!
//! Talks to a `taskboard-server` over HTTP for listings, notes, uploads and
//! archive moves, and over the `/ws` live-update channel for workflow state
//! that only clients track. Workflow state is cached locally and overlaid on
//! every fresh listing from the server.

pub mod api;
pub mod app;
pub mod board;
pub mod cache;
pub mod config;
pub mod net;
pub mod overlay;
pub mod ui;
