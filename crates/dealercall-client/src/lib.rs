//! dealercall client library
//!
//! Places outbound voice calls through the provider's REST API on behalf of
//! a signed-in shopper, tracks the resulting call, and exposes cancellation.
//!
//! # Example
//!
//! ```rust,no_run
//! use dealercall_client::{CallController, CallOptions};
//! use dealercall_core::{User, Vehicle, VoiceCallConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = CallController::http(VoiceCallConfig::from_env())?;
//!
//!     let user = User::new("Ada", "Lovelace").with_phone("555-123-4567");
//!     let car = Vehicle::new("Toyota", "RAV4", 2024, "Blueprint");
//!
//!     let record = controller.initiate(&user, &car, CallOptions::default()).await?;
//!
//!     // Status is pull-only: refresh when you want to know more
//!     let record = controller.refresh_status(&record.id).await?;
//!     println!("{} is {}", record.id, record.status);
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides an in-process fake of the voice API:
//!
//! ```rust,ignore
//! use dealercall_client::testing::{MockVoiceApi, TestServer};
//!
//! let api = MockVoiceApi::new("test-key");
//! let server = TestServer::start(api.router()).await?;
//! let controller = CallController::http(server.config("test-key"))?;
//! ```

mod controller;
mod error;
pub mod testing;
pub mod transport;
mod types;

pub use controller::{CallController, CallOptions};
pub use error::{CallError, Result, TransportError};
pub use transport::{CallPayload, CallTransport, HttpCallTransport, MockCallTransport};
pub use types::*;

// Re-export core types for convenience
pub use dealercall_core::{
    CallRecord, CallState, CallStatus, ConfigStatus, FinancingOption, User, Vehicle,
    VoiceCallConfig,
};
