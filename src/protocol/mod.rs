//! Wire events exchanged with the realtime endpoint.

pub mod client;
pub mod events;

pub use client::{ClientEvent, ConversationItem};
pub use events::{OutputItem, ServerEvent};
