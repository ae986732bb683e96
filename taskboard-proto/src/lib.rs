//! Shared definitions for the Taskboard HTTP surface and live-update channel.

pub mod api;
pub mod event;
pub mod task;
