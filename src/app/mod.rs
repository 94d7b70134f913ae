//! Application core.
//!
//! [`service`] holds the mediator state machine; [`worker`] serializes it
//! onto one thread.  All interaction with the platform happens through the
//! **port traits** defined in [`ports`], keeping the service fully testable
//! without a modem.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod worker;
