//! Stratus CLI
//!
//! Command-line client for the Stratus deployment platform. Subcommands
//! the CLI does not recognize itself are delegated to standalone extension
//! executables named `stratus-<command>`, which are handed authenticated
//! API access through a short-lived loopback proxy.
//!
//! # Architecture
//!
//! - **Extension Module**: resolve, proxy, spawn, and report pipeline
//! - **API Module**: authenticated client for the upstream REST API
//! - **Project Module**: manifest and lockfile scanning for project roots
//! - **Config / Auth Modules**: user state under `~/.stratus`
//!
//! # Usage
//!
//! ```no_run
//! use stratus_cli::{ApiClient, Config};
//! use stratus_cli::auth::load_credentials;
//!
//! let config = Config::load().expect("Failed to load config");
//! let client = ApiClient::new(&config, &load_credentials()).expect("Bad API URL");
//! // Hand the client to extension::invoke_extension...
//! ```

// Clippy configuration - allow common patterns
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::similar_names)]

pub mod api;
pub mod auth;
pub mod config;
pub mod extension;
pub mod logging;
pub mod project;

// Re-export main types
pub use api::ApiClient;
pub use auth::Credentials;
pub use config::Config;
pub use extension::{ApiProxy, ExtensionError, RunOutcome, invoke_extension};
