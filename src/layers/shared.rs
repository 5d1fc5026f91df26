//! Shared Override Stack
//!
//! [`SharedLayeredValue`] wraps a [`LayeredValue`] in `Rc` so that override
//! handles can live apart from the container. Each [`Layer`] holds a `Weak`
//! back-reference: it can read and write its own slot and trigger the
//! container's notification, but never keeps the container alive.
//!
//! The change callback runs after every internal borrow has been released,
//! so it may add, remove, or mutate layers of the same container.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use uuid::Uuid;

use super::id::LayerId;
use super::stack::LayeredValue;
use crate::error::{LayeredError, Result};

type SharedCallback<T> = Rc<dyn Fn(&T)>;

struct Shared<T> {
    stack: RefCell<LayeredValue<T>>,
    on_change: RefCell<Option<SharedCallback<T>>>,
}

impl<T: Clone> Shared<T> {
    fn value_possibly_changed(&self) {
        let callback = self.on_change.borrow().clone();
        let Some(callback) = callback else {
            return;
        };
        let perceived = self.stack.borrow().perceived_value().clone();
        callback(&perceived);
    }

    fn layer_value(&self, id: LayerId) -> Result<T> {
        self.stack.borrow().layer_value(id).cloned()
    }

    fn contains(&self, id: LayerId) -> bool {
        self.stack.borrow().contains(id)
    }
}

/// Layered value whose override handles carry their own back-reference.
///
/// Cloning yields another strong reference to the same stack. Confined to one
/// thread.
pub struct SharedLayeredValue<T> {
    shared: Rc<Shared<T>>,
}

/// Non-owning reference to a [`SharedLayeredValue`], for use inside its own callback
pub struct WeakLayeredValue<T> {
    shared: Weak<Shared<T>>,
}

/// Handle to one override of a [`SharedLayeredValue`].
///
/// Not `Clone`: whoever holds the handle owns the override's lifetime and
/// ends it by passing the handle to
/// [`SharedLayeredValue::remove_override_layer`]. Dropping the handle does
/// not remove the override; it stays attached and can no longer be removed.
#[must_use = "dropping a layer handle leaves its override attached for good"]
pub struct Layer<T> {
    id: LayerId,
    owner: Weak<Shared<T>>,
}

/// A rejected removal, carrying the handle back to the caller
pub struct RemoveError<T> {
    pub error: LayeredError,
    pub layer: Layer<T>,
}

impl<T> RemoveError<T> {
    /// Take back the handle that could not be removed
    pub fn into_layer(self) -> Layer<T> {
        self.layer
    }
}

impl<T> fmt::Debug for RemoveError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoveError")
            .field("error", &self.error)
            .field("layer", &self.layer)
            .finish()
    }
}

impl<T> fmt::Display for RemoveError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl<T> std::error::Error for RemoveError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl<T> From<RemoveError<T>> for LayeredError {
    fn from(err: RemoveError<T>) -> Self {
        err.error
    }
}

impl<T: Clone> SharedLayeredValue<T> {
    /// Create a shared container holding only `base`
    pub fn new(base: T) -> Self {
        Self {
            shared: Rc::new(Shared {
                stack: RefCell::new(LayeredValue::new(base)),
                on_change: RefCell::new(None),
            }),
        }
    }

    /// Create a shared container with a change callback (not run on construction)
    pub fn with_callback<F>(base: T, on_change: F) -> Self
    where
        F: Fn(&T) + 'static,
    {
        let value = Self::new(base);
        value.set_on_change(on_change);
        value
    }

    /// Replace the change callback
    pub fn set_on_change<F>(&self, on_change: F)
    where
        F: Fn(&T) + 'static,
    {
        *self.shared.on_change.borrow_mut() = Some(Rc::new(on_change));
    }

    /// Drop the change callback
    pub fn clear_on_change(&self) {
        *self.shared.on_change.borrow_mut() = None;
    }

    /// Identity of the underlying container, as carried by its handles
    pub fn id(&self) -> Uuid {
        self.shared.stack.borrow().id()
    }

    /// Non-owning reference, safe to capture in the container's own callback
    pub fn downgrade(&self) -> WeakLayeredValue<T> {
        WeakLayeredValue {
            shared: Rc::downgrade(&self.shared),
        }
    }

    /// A copy of the permanent value at the bottom of the stack
    pub fn base_value(&self) -> T {
        self.shared.stack.borrow().base_value().clone()
    }

    /// Overwrite the base value and notify
    pub fn set_base_value(&self, value: T) {
        {
            let mut stack = self.shared.stack.borrow_mut();
            stack.set_base_value(value);
        }
        self.shared.value_possibly_changed();
    }

    /// A copy of the value after all overrides have been applied
    pub fn perceived_value(&self) -> T {
        self.shared.stack.borrow().perceived_value().clone()
    }

    /// Push a new override and hand back its handle
    pub fn add_override_layer(&self, value: T) -> Layer<T> {
        let id = self.shared.stack.borrow_mut().add_override_layer(value);
        self.shared.value_possibly_changed();
        Layer {
            id,
            owner: Rc::downgrade(&self.shared),
        }
    }

    /// Remove an override, consuming its handle, and return the value it held.
    ///
    /// # Errors
    /// Fails if the handle belongs to another container. The handle is handed
    /// back inside the [`RemoveError`] so it can still be removed from its
    /// real owner.
    pub fn remove_override_layer(
        &self,
        layer: Layer<T>,
    ) -> std::result::Result<T, RemoveError<T>> {
        let removed = self.shared.stack.borrow_mut().remove_override_layer(layer.id);
        match removed {
            Ok(value) => {
                self.shared.value_possibly_changed();
                Ok(value)
            }
            Err(error) => Err(RemoveError { error, layer }),
        }
    }

    /// Check whether `layer` is the perceived override
    pub fn is_top_of_stack(&self, layer: &Layer<T>) -> Result<bool> {
        self.shared.stack.borrow().is_top_of_stack(layer.id)
    }

    /// Number of active overrides, excluding the base
    pub fn override_count(&self) -> usize {
        self.shared.stack.borrow().override_count()
    }

    /// Number of layers on the stack, including the base
    pub fn depth(&self) -> usize {
        self.shared.stack.borrow().depth()
    }
}

impl<T> Clone for SharedLayeredValue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for SharedLayeredValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shared.stack.try_borrow() {
            Ok(stack) => f.debug_tuple("SharedLayeredValue").field(&*stack).finish(),
            Err(_) => f.write_str("SharedLayeredValue(<borrowed>)"),
        }
    }
}

impl<T> WeakLayeredValue<T> {
    /// Get the container back, if it is still alive
    pub fn upgrade(&self) -> Option<SharedLayeredValue<T>> {
        self.shared
            .upgrade()
            .map(|shared| SharedLayeredValue { shared })
    }
}

impl<T> Clone for WeakLayeredValue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<T: Clone> Layer<T> {
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Read this layer's value
    pub fn value(&self) -> Result<T> {
        self.owner()?.layer_value(self.id)
    }

    /// Overwrite this layer's value.
    ///
    /// The container is notified even if this layer is buried under other
    /// overrides.
    pub fn set_value(&self, value: T) -> Result<()> {
        let shared = self.owner()?;
        shared.stack.borrow_mut().set_layer_value(self.id, value)?;
        shared.value_possibly_changed();
        Ok(())
    }

    /// Whether the owning container is alive and still holds this layer
    pub fn is_attached(&self) -> bool {
        self.owner
            .upgrade()
            .is_some_and(|shared| shared.contains(self.id))
    }

    fn owner(&self) -> Result<Rc<Shared<T>>> {
        self.owner
            .upgrade()
            .ok_or(LayeredError::ContainerDropped {
                layer: self.id,
                container: self.id.container(),
            })
    }
}

impl<T> fmt::Debug for Layer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.id)
            .field("owner_alive", &(self.owner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn recorded<T: Clone + 'static>(base: T) -> (SharedLayeredValue<T>, Rc<RefCell<Vec<T>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let value = SharedLayeredValue::with_callback(base, move |v: &T| {
            sink.borrow_mut().push(v.clone());
        });
        (value, seen)
    }

    #[test]
    fn test_layer_set_value_notifies() {
        let (value, seen) = recorded(10);
        let a = value.add_override_layer(20);
        let _b = value.add_override_layer(30);

        a.set_value(25).unwrap();
        assert_eq!(a.value().unwrap(), 25);
        assert_eq!(value.perceived_value(), 30);
        assert_eq!(*seen.borrow(), vec![20, 30, 30]);
    }

    #[test]
    fn test_remove_consumes_handle() {
        let value = SharedLayeredValue::new("idle".to_string());
        let running = value.add_override_layer("running".to_string());
        assert!(running.is_attached());

        let removed = value.remove_override_layer(running).unwrap();
        assert_eq!(removed, "running");
        assert_eq!(value.perceived_value(), "idle");
        assert_eq!(value.depth(), 1);
    }

    #[test]
    fn test_foreign_layer_rejected() {
        let first = SharedLayeredValue::new(0);
        let second = SharedLayeredValue::new(0);
        let a = first.add_override_layer(1);

        assert!(second.is_top_of_stack(&a).is_err());
        let err = second.remove_override_layer(a).unwrap_err();
        assert!(matches!(err.error, LayeredError::ForeignLayer { .. }));
        assert_eq!(first.perceived_value(), 1);
    }

    #[test]
    fn test_rejected_remove_returns_handle() {
        let first = SharedLayeredValue::new(0);
        let second = SharedLayeredValue::new(0);
        let a = first.add_override_layer(1);

        let err = second.remove_override_layer(a).unwrap_err();
        assert_eq!(err.to_string(), err.error.to_string());
        let a = err.into_layer();
        assert!(a.is_attached());

        assert_eq!(first.remove_override_layer(a).unwrap(), 1);
        assert_eq!(first.perceived_value(), 0);
        assert_eq!(first.override_count(), 0);
    }

    #[test]
    fn test_rejected_remove_converts_to_layered_error() {
        fn remove_from(value: &SharedLayeredValue<i32>, layer: Layer<i32>) -> Result<i32> {
            Ok(value.remove_override_layer(layer)?)
        }

        let first = SharedLayeredValue::new(0);
        let second = SharedLayeredValue::new(0);
        let a = first.add_override_layer(1);

        let err = remove_from(&second, a).unwrap_err();
        assert_eq!(err.error_code(), "FOREIGN_LAYER");
    }

    #[test]
    fn test_dropped_handle_leaves_override_attached() {
        let value = SharedLayeredValue::new(0);
        drop(value.add_override_layer(1));

        assert_eq!(value.perceived_value(), 1);
        assert_eq!(value.override_count(), 1);
    }

    #[test]
    fn test_layer_outliving_container() {
        let value = SharedLayeredValue::new(1);
        let a = value.add_override_layer(2);
        drop(value);

        assert!(!a.is_attached());
        let err = a.set_value(3).unwrap_err();
        assert!(matches!(err, LayeredError::ContainerDropped { .. }));
        assert!(a.value().is_err());
    }

    #[test]
    fn test_callback_may_reenter_container() {
        let value = SharedLayeredValue::new(0);
        let weak = value.downgrade();
        let pushed = Rc::new(Cell::new(false));
        let guard = Rc::clone(&pushed);

        // The first time 1 is perceived, stack a 2 on top from inside the callback.
        value.set_on_change(move |v: &i32| {
            if *v == 1 && !guard.get() {
                guard.set(true);
                if let Some(value) = weak.upgrade() {
                    let layer = value.add_override_layer(2);
                    assert!(value.is_top_of_stack(&layer).unwrap());
                }
            }
        });

        let a = value.add_override_layer(1);
        assert!(pushed.get());
        assert_eq!(value.perceived_value(), 2);
        assert_eq!(value.override_count(), 2);
        assert!(!value.is_top_of_stack(&a).unwrap());
    }

    #[test]
    fn test_callback_may_remove_layer() {
        let (value, seen) = recorded(0);
        let a = value.add_override_layer(5);

        let weak = value.downgrade();
        let slot = Rc::new(RefCell::new(Some(a)));
        let held = Rc::clone(&slot);
        let sink = Rc::clone(&seen);
        value.set_on_change(move |v: &i32| {
            sink.borrow_mut().push(*v);
            if *v == 99 {
                let layer = held.borrow_mut().take();
                if let (Some(value), Some(layer)) = (weak.upgrade(), layer) {
                    value.remove_override_layer(layer).unwrap();
                }
            }
        });

        value.set_base_value(1);
        let _top = value.add_override_layer(99);
        assert_eq!(value.perceived_value(), 99);
        assert_eq!(value.override_count(), 1);
        assert!(slot.borrow().is_none());
        assert_eq!(*seen.borrow(), vec![5, 5, 99, 99]);
    }
}
