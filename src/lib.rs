//! echoprobe - fleet network-health prober.
//!
//! Periodically exercises TCP and UDP echo round-trips against a
//! configured set of hosts, verifies payload integrity, classifies
//! failures, and exposes the accumulated measurements over a
//! destructive-drain HTTP endpoint. The matching echo server lives in
//! [`echo`] and is started with the `server` subcommand.

pub mod config;
pub mod echo;
pub mod probe;
pub mod scheduler;
pub mod stats;
pub mod web;
