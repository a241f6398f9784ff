//! Named, reusable, per-project development containers.
//!
//! `devctr` gives every host working directory a development container of
//! its own. The container name is derived from the directory, so running
//! `dev` again from the same place returns to the same container. Mounts,
//! published ports, and environment come from a small environment
//! descriptor file that is re-read on every invocation.
//!
//! # Modules
//!
//! - [`descriptor`]: Environment descriptor parsing
//! - [`session`]: Container identity, path mapping, port negotiation, and the
//!   session state machine
//! - [`engine`]: Container engine connection and the runtime abstraction
//! - [`api`]: One orchestration function per CLI command
//! - [`config`]: Configuration system with layered precedence (CLI > env > file > defaults)
//! - [`error`]: Semantic error types for the application

pub mod api;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod session;
