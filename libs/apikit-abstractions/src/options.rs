use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Per-request configuration read by pipeline middlewares.
///
/// Options are keyed by their concrete type: a request carries at most one
/// instance of each option type.
pub trait RequestOption: Any + Send + Sync + fmt::Debug {}

/// Typed set of request options, at most one per option type.
///
/// Adding an option whose type is already present replaces the earlier one.
/// Cloning is cheap: option values are shared.
#[derive(Clone, Default)]
pub struct RequestOptions {
    entries: HashMap<TypeId, Arc<dyn RequestOption>>,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `option`, replacing any earlier option of the same type.
    pub fn add<T: RequestOption>(&mut self, option: T) {
        self.entries.insert(TypeId::of::<T>(), Arc::new(option));
    }

    #[must_use]
    pub fn get<T: RequestOption>(&self) -> Option<&T> {
        self.entries.get(&TypeId::of::<T>()).and_then(|option| {
            let any: &dyn Any = option.as_ref();
            any.downcast_ref::<T>()
        })
    }

    /// Remove the option of type `T`, returning whether one was present.
    pub fn remove<T: RequestOption>(&mut self) -> bool {
        self.entries.remove(&TypeId::of::<T>()).is_some()
    }

    /// Copy every option of `other` into `self`, `other` winning on conflicts.
    pub fn extend(&mut self, other: &RequestOptions) {
        for (key, value) in &other.entries {
            self.entries.insert(*key, Arc::clone(value));
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.values()).finish()
    }
}
