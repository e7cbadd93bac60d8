//! Pure expiry decision logic for the cinder message bus.
//!
//! This crate holds the one piece of the bus with real control flow: deciding,
//! per fetched deletion job, whether the referenced remote artifact gets
//! deleted now, pushed back for a later pass, or dropped as permanently
//! malformed. The decision is a pure function of the payload and the current
//! wall-clock second - no I/O, no async, no shared state - so it can be tested
//! exhaustively without a queue or a network.
//!
//! Driver loops (in `cinder-relay`) fetch jobs, call [`assess`], and execute
//! the returned [`SweepAction`] against the real queue and artifact clients.

pub mod clock;
pub mod expire;

pub use clock::{Clock, SystemClock};
pub use expire::{SweepAction, assess};
