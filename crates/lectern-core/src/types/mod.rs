//! Core types for lectern.

mod document;
mod message;

pub use document::*;
pub use message::*;
