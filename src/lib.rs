//! # relayhook
//!
//! A DHCPv4 server hook that audits relay agent information (option 82) and
//! overrides lease addresses for clients behind a configured relay marker.
//!
//! The host server calls three stage callouts per transaction:
//!
//! - receive: option 82 is parsed and the request is audited
//! - lease select: if the relay data carries a configured marker, the
//!   proposed lease address is replaced
//! - send: the final response is audited
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use relayhook::pipeline::{hooks, Callouts};
//! use relayhook::Config;
//!
//! let config = Config::default();
//! let mut registry: Vec<Arc<dyn Callouts>> = Vec::new();
//! let engine = hooks::load(&config, &mut registry)?;
//! // ... host drives the callouts in `registry` ...
//! engine.unload();
//! # Ok::<(), relayhook::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`parser::Option82Parser`] - option 82 payload → [`domain::RelayInfoOption`]
//! - [`policy::OverridePolicy`] - marker → replacement address rules
//! - [`sink::AuditSink`] - append-only audit trail
//! - [`pipeline::PipelineController`] - the three callouts

pub mod capture;
pub mod config;
pub mod domain;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod policy;
pub mod sink;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{CalloutStatus, Callouts, PipelineController};
