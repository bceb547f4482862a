//! DTMF Relay - touch-tone signaling over SIP INFO
//!
//! Sends and receives DTMF tones as `application/dtmf-relay` bodies of
//! in-dialog SIP INFO requests, tracking each outgoing tone until the dialog
//! layer reports how its request ended.
//!
//! **Sponsored by [Carrier One Inc](https://carrierone.com) - Professional Telecommunications Solutions**

pub mod config;
pub mod core;
pub mod protocols;
pub mod error;
pub mod utils;

pub use error::{Error, Result};

/// Relay version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
