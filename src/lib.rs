//! Assistant Relay
//!
//! An HTTP relay that answers a chat message by driving a remote assistant
//! thread/run API through one short-lived conversation, and forwards foot
//! scans to a shoe generation service.
//!
//! # Architecture
//!
//! - **Server**: Axum routes for chat and shoe generation, plus static assets
//! - **Orchestration**: thread → message → run → poll → reply, with the
//!   thread deleted on every exit path
//! - **Configuration**: defaults, config file, `RELAY_` environment and CLI
//!
//! # Modules
//!
//! - [`llm`]: assistant backend, run supervision and cleanup
//! - [`shoe`]: shoe generation relay
//! - [`config`]: layered application configuration
//! - [`server`]: router, handlers and error responses
//! - [`telemetry`]: tracing subscriber setup

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod llm;
pub mod server;
pub mod shoe;
pub mod telemetry;

use crate::config::AppConfig;

use llm::orchestrator::Orchestrator;
use shoe::ShoeDesigner;
use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Assistant orchestrator for chat requests.
    pub orchestrator: Arc<Orchestrator>,
    /// Shoe generation backend.
    pub shoes: Arc<dyn ShoeDesigner>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
