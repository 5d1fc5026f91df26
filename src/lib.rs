//! Layered - Layered-Override Values
//!
//! A [`LayeredValue`](layers::LayeredValue) lets independent systems shadow a
//! single logical value (a speed, an opacity, an enabled flag) without
//! destroying the base value and without coordinating with each other.
//!
//! # Architecture
//!
//! The value is a stack:
//! - Base layer: the permanent value at position 0, never removable
//! - Override layers: pushed by callers, each addressed by its own handle
//! - Perceived value: the most recently added layer still present
//!
//! Every change to the stack or to a layer value runs the change callback
//! with the perceived value. The callback is a "may have changed" signal and
//! is never deduplicated.
//!
//! ```
//! use layered::layers::LayeredValue;
//!
//! let mut speed = LayeredValue::new(10);
//! let slowed = speed.add_override_layer(4);
//! assert_eq!(*speed.perceived_value(), 4);
//!
//! speed.remove_override_layer(slowed).unwrap();
//! assert_eq!(*speed.perceived_value(), 10);
//! ```

pub mod cli;
pub mod error;
pub mod layers;
pub mod num_utils;

pub use error::{LayeredError, Result};
pub use layers::{Layer, LayerId, LayeredValue, SharedLayeredValue};
