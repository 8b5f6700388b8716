//! Test utilities and fixtures for pkgprobe integration tests.
//!
//! This crate provides a scripted executor and builders to reduce boilerplate when
//! writing tests for pkgprobe. It includes:
//!
//! - [`ScriptedExecutor`] - In-memory environment that understands the provisioning and
//!   validation commands, records every call, and replays scripted responses
//! - [`ScenarioBuilder`] - Fluent API for constructing test scenarios
//! - [`CollectingListener`] - Records engine stage events
//! - [`write_scenarios`] - Scenario files on disk
//!
//! # Example
//!
//! ```ignore
//! use pkgprobe_fixtures::{ScenarioBuilder, ScriptedExecutor, output};
//!
//! let executor = ScriptedExecutor::new().respond("mytool", output(0, "ok", ""));
//! let scenario = ScenarioBuilder::new("smoke", "mytool")
//!     .stdout_contains("ok")
//!     .build();
//! ```

// Test fixtures crate - relaxed lints for test utilities
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]
#![allow(missing_docs)]

pub mod builders;
pub mod helpers;
pub mod scripted;

// Re-export commonly used items at crate root
pub use builders::ScenarioBuilder;
pub use helpers::{write_scenarios, CollectingListener};
pub use scripted::{output, Response, ScriptedExecutor};
