//! Trait seams between the dispatcher and its external services.

pub mod channel;
pub mod provider;

pub use channel::Channel;
pub use provider::Provider;
