//! Utility helpers for the DTMF relay

pub mod logger;

pub use logger::setup_logging;
