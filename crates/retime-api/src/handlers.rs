//! Request handlers.

pub mod health;
pub mod retime;

pub use health::*;
pub use retime::*;
