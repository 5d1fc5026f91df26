//! Override Stack
//!
//! [`LayeredValue`] keeps a permanent base value and a stack of override
//! layers on top of it. The most recently added layer that is still present
//! is the perceived value. Layers are addressed through generational
//! [`LayerId`] handles, so removing one layer never invalidates another.
//!
//! Every change to the stack composition or to any layer value runs the
//! change callback with the perceived value. Calls are not deduplicated: the
//! callback means "may have changed" and consumers must tolerate repeats.

use std::fmt;
use std::iter;

use log::{debug, trace, warn};
use uuid::Uuid;

use super::id::{LayerId, BASE_SLOT};
use crate::error::{LayeredError, Result};

/// Callback run whenever the perceived value may have changed
pub(crate) type OnChange<T> = Box<dyn FnMut(&T) + Send>;

/// Liveness bookkeeping for one arena slot
#[derive(Debug, Clone, Copy)]
struct SlotState {
    generation: u32,
    attached: bool,
}

/// One override on the stack
#[derive(Debug)]
struct Entry<T> {
    slot: u32,
    value: T,
}

/// A value that can be temporarily shadowed by independent override layers.
///
/// The base value sits at stack position 0 and can never be removed. Adding
/// an override pushes a new layer on top and returns its handle; removing it
/// reverts the perceived value to whatever is below.
///
/// The container is single-owner: the change callback runs under `&mut self`
/// and therefore cannot re-enter the same container.
pub struct LayeredValue<T> {
    /// Identity checked against every handle passed in
    id: Uuid,
    base: T,
    /// Overrides in application order; the last one is perceived
    overrides: Vec<Entry<T>>,
    /// Slot arena indexed by `LayerId::slot`; slot 0 belongs to the base
    slots: Vec<SlotState>,
    free: Vec<u32>,
    on_change: Option<OnChange<T>>,
}

impl<T> LayeredValue<T> {
    /// Create a container holding only `base`. No callback is registered.
    pub fn new(base: T) -> Self {
        Self {
            id: Uuid::new_v4(),
            base,
            overrides: Vec::new(),
            slots: vec![SlotState {
                generation: 0,
                attached: true,
            }],
            free: Vec::new(),
            on_change: None,
        }
    }

    /// Create a container with a change callback.
    ///
    /// The callback is not run on construction.
    pub fn with_callback<F>(base: T, on_change: F) -> Self
    where
        F: FnMut(&T) + Send + 'static,
    {
        let mut value = Self::new(base);
        value.on_change = Some(Box::new(on_change));
        value
    }

    /// Replace the change callback
    pub fn set_on_change<F>(&mut self, on_change: F)
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.on_change = Some(Box::new(on_change));
    }

    /// Drop the change callback
    pub fn clear_on_change(&mut self) {
        self.on_change = None;
    }

    /// Identity of this container, as carried by its handles
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The permanent value at the bottom of the stack
    pub fn base_value(&self) -> &T {
        &self.base
    }

    /// Overwrite the base value.
    ///
    /// Notifies even when overrides hide the base.
    pub fn set_base_value(&mut self, value: T) {
        self.base = value;
        self.value_possibly_changed();
    }

    /// The value after all overrides have been applied
    pub fn perceived_value(&self) -> &T {
        match self.overrides.last() {
            Some(entry) => &entry.value,
            None => &self.base,
        }
    }

    /// Push a new override on top of the stack.
    ///
    /// Until it is removed or another layer is added above it, this layer is
    /// the perceived value.
    pub fn add_override_layer(&mut self, value: T) -> LayerId {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot as usize].attached = true;
                slot
            }
            None => {
                self.slots.push(SlotState {
                    generation: 0,
                    attached: true,
                });
                (self.slots.len() - 1) as u32
            }
        };

        self.overrides.push(Entry { slot, value });
        let id = self.layer_id(slot);
        debug!(
            "Added override {} to container {} (depth {})",
            id,
            self.id,
            self.depth()
        );

        self.value_possibly_changed();
        id
    }

    /// Remove an override and return its value.
    ///
    /// The perceived value reverts to the layer added just before it, or to
    /// the base when no overrides remain.
    ///
    /// # Errors
    /// Fails without touching the stack if the handle is stale (already
    /// removed), foreign to this container, unknown, or names the base layer.
    pub fn remove_override_layer(&mut self, layer: LayerId) -> Result<T> {
        self.validate(layer)?;
        if layer.is_base() {
            warn!("Rejected removal of the base layer of container {}", self.id);
            return Err(LayeredError::BaseLayer { container: self.id });
        }

        let position = self.position(layer)?;
        let entry = self.overrides.remove(position);

        let state = &mut self.slots[entry.slot as usize];
        state.attached = false;
        state.generation = state.generation.wrapping_add(1);
        self.free.push(entry.slot);

        debug!(
            "Removed override {} from container {} (depth {})",
            layer,
            self.id,
            self.depth()
        );

        self.value_possibly_changed();
        Ok(entry.value)
    }

    /// Check whether `layer` is currently the perceived one.
    ///
    /// # Errors
    /// Fails if `layer` is not a member of this stack.
    pub fn is_top_of_stack(&self, layer: LayerId) -> Result<bool> {
        self.validate(layer)?;
        if layer.is_base() {
            return Ok(self.overrides.is_empty());
        }
        let position = self.position(layer)?;
        Ok(position + 1 == self.overrides.len())
    }

    /// Read the value held by an override layer
    pub fn layer_value(&self, layer: LayerId) -> Result<&T> {
        self.validate(layer)?;
        if layer.is_base() {
            return Ok(&self.base);
        }
        let position = self.position(layer)?;
        Ok(&self.overrides[position].value)
    }

    /// Overwrite the value held by an override layer.
    ///
    /// Notifies unconditionally, including when the layer is buried under
    /// other overrides and the perceived value is unchanged.
    pub fn set_layer_value(&mut self, layer: LayerId, value: T) -> Result<()> {
        self.validate(layer)?;
        if layer.is_base() {
            self.base = value;
        } else {
            let position = self.position(layer)?;
            self.overrides[position].value = value;
        }
        self.value_possibly_changed();
        Ok(())
    }

    /// Whether `layer` is attached to this container
    pub fn contains(&self, layer: LayerId) -> bool {
        self.validate(layer).is_ok()
    }

    /// Handle of the perceived override, or `None` when only the base is present
    pub fn top_layer(&self) -> Option<LayerId> {
        self.overrides.last().map(|entry| self.layer_id(entry.slot))
    }

    /// Number of active overrides, excluding the base
    pub fn override_count(&self) -> usize {
        self.overrides.len()
    }

    /// Number of layers on the stack, including the base
    pub fn depth(&self) -> usize {
        self.overrides.len() + 1
    }

    /// Iterate over layer values from the base up to the perceived value
    pub fn values(&self) -> impl Iterator<Item = &T> {
        iter::once(&self.base).chain(self.overrides.iter().map(|entry| &entry.value))
    }

    fn layer_id(&self, slot: u32) -> LayerId {
        LayerId::new(self.id, slot, self.slots[slot as usize].generation)
    }

    fn validate(&self, layer: LayerId) -> Result<()> {
        if layer.container() != self.id {
            warn!("Rejected {} from container {} in {}", layer, layer.container(), self.id);
            return Err(LayeredError::ForeignLayer {
                layer,
                owner: layer.container(),
                container: self.id,
            });
        }

        let state = self
            .slots
            .get(layer.slot() as usize)
            .ok_or(LayeredError::UnknownLayer {
                layer,
                container: self.id,
            })?;

        if !state.attached || state.generation != layer.generation() {
            warn!("Rejected stale {} in container {}", layer, self.id);
            return Err(LayeredError::StaleLayer {
                layer,
                container: self.id,
            });
        }

        Ok(())
    }

    fn position(&self, layer: LayerId) -> Result<usize> {
        debug_assert_ne!(layer.slot(), BASE_SLOT);
        self.overrides
            .iter()
            .position(|entry| entry.slot == layer.slot())
            .ok_or(LayeredError::UnknownLayer {
                layer,
                container: self.id,
            })
    }

    fn value_possibly_changed(&mut self) {
        let Some(callback) = self.on_change.as_mut() else {
            return;
        };
        let perceived = match self.overrides.last() {
            Some(entry) => &entry.value,
            None => &self.base,
        };
        trace!("Notifying change for container {}", self.id);
        callback(perceived);
    }
}

impl<T: fmt::Debug> fmt::Debug for LayeredValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayeredValue")
            .field("id", &self.id)
            .field("base", &self.base)
            .field("overrides", &self.overrides)
            .field("has_callback", &self.on_change.is_some())
            .finish()
    }
}
