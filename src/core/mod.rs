//! Core infrastructure for the gateway.

pub mod realtime;
