//! Use-case services.
//!
//! # Responsibility
//! - Orchestrate remote, sync and export modules into one backup run.
//! - Keep the CLI decoupled from module-level details.

pub mod backup_service;
