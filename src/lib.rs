//! Cellular radio power mediator.
//!
//! Decides whether a watch's cellular radio should be powered, from a large
//! set of independent signals, and applies that decision through a single
//! serialized worker.
//!
//! ```text
//!  Signal ──▶ SignalState ──▶ policy::evaluate ──▶ HysteresisController ──▶ execute
//!                               (rule cascade)      (linger / delay)       (toggle, wait)
//! ```
//!
//! The pure layers ([`policy`], [`hysteresis`], [`history`]) carry no I/O.
//! [`app::service::CellMediator`] drives them through the port traits in
//! [`app::ports`]; [`app::worker`] runs it on its own thread.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod history;
pub mod hysteresis;
pub mod policy;
pub mod scheduler;

pub use error::{Error, Result};
