//! Common types shared across tilestore.
//!
//! - Configuration ([`EngineConfig`])
//! - Error types
//! - Identifiers ([`BlockKey`], [`FrameId`])

mod block_key;
pub mod config;
pub mod error;
mod frame_id;

pub use block_key::BlockKey;
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use frame_id::FrameId;
