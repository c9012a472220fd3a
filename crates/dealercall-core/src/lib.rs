//! dealercall-core - Core types for outbound dealer voice calls
//!
//! This crate holds everything that does not touch the network:
//! - the data model shared with upstream collaborators (`User`, `Vehicle`)
//!   and the provider's call record (`CallRecord`, `CallStatus`)
//! - configuration resolution and validation (`VoiceCallConfig`)
//! - phone number formatting/validation
//! - the call context builder that produces the provider's variable payload

pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod phone;

pub use config::{ConfigSource, ConfigStatus, EnvSource, VoiceCallConfig};
pub use context::{CallContext, VariableValues};
pub use error::{ConfigError, ConfigResult};
pub use models::*;
