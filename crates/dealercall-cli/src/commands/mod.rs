//! Command implementations for dealercall

pub mod call;
pub mod cancel;
pub mod get;
pub mod history;
pub mod status;
pub mod watch;

pub use call::{call, CallArgs};
pub use cancel::cancel;
pub use get::get;
pub use history::history;
pub use status::status;
pub use watch::watch;
