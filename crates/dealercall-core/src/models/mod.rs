//! Data model for dealer voice calls
//!
//! `User` and `Vehicle` are handed to us by upstream collaborators (profile
//! and inventory); `CallRecord` is the provider's view of one outbound call.

mod call;
mod user;
mod vehicle;

pub use call::*;
pub use user::*;
pub use vehicle::*;
