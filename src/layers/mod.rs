//! Layered Value Module
//!
//! Implements the override stack:
//! - Base layer: permanent, never removable
//! - Override layers: pushed and removed by independent callers
//! - Perceived value: the topmost layer still present

mod id;
mod shared;
mod stack;

pub use id::LayerId;
pub use shared::{Layer, RemoveError, SharedLayeredValue, WeakLayeredValue};
pub use stack::LayeredValue;
