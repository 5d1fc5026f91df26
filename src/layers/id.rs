//! Layer handles
//!
//! A [`LayerId`] is a generational handle into a container's slot arena. It
//! goes stale as soon as its layer is removed, even if the slot is later
//! reused for a new override.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Slot index of the base layer in every container.
pub(crate) const BASE_SLOT: u32 = 0;

/// Handle to one override layer of a [`LayeredValue`](super::LayeredValue).
///
/// Only the owning container mints these, so a `LayerId` always names the
/// container it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LayerId {
    container: Uuid,
    slot: u32,
    generation: u32,
}

impl LayerId {
    pub(crate) fn new(container: Uuid, slot: u32, generation: u32) -> Self {
        Self {
            container,
            slot,
            generation,
        }
    }

    /// Id of the container that created this handle
    pub fn container(&self) -> Uuid {
        self.container
    }

    /// Arena slot this handle points at
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation of the slot when this handle was minted
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub(crate) fn is_base(&self) -> bool {
        self.slot == BASE_SLOT
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}.{}", self.slot, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let id = LayerId::new(Uuid::nil(), 3, 7);
        assert_eq!(id.to_string(), "layer#3.7");
    }

    #[test]
    fn test_generation_distinguishes_handles() {
        let container = Uuid::new_v4();
        let old = LayerId::new(container, 1, 0);
        let reused = LayerId::new(container, 1, 1);
        assert_ne!(old, reused);
        assert!(!old.is_base());
        assert!(LayerId::new(container, BASE_SLOT, 0).is_base());
    }
}
