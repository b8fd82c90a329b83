// Type registry - resolves type discriminators to factories

//! # Type Registry
//!
//! Externally-typed nodes name their concrete type with a discriminator: the
//! `type` field of a `condition`, or the field name of a consumer inside a body.
//! A [`TypeRegistry`] maps each discriminator to a factory that turns the node's
//! remaining fields into an instance. Registries are filled once at startup and
//! then only read.
//!
//! ## Registration Styles
//!
//! - **`register::<C>`**: `C` implements the contract and `Deserialize`
//! - **`register_adapted::<A>`**: `A` is an adapter; the factory deserializes
//!   `A::Adaptee`, creates `A::default()` and calls `set_adaptee`
//! - **`register_with::<R, _>`**: deserializes `R` and wraps it in [`Adapted`]
//!   with a forwarding closure
//! - **`register_factory`**: full control over construction
//!
//! A type that neither implements the contract nor comes with an adapter cannot
//! be registered at all: the trait bounds reject it at compile time.
//!
//! ## Rust Learning Notes:
//!
//! ### ?Sized Type Parameters
//! `TypeRegistry<P: ?Sized>` is instantiated with trait objects
//! (`dyn Predicate<T>`, `dyn Consumer<T>`), which are unsized. Factories return
//! `Arc<P>`, so `P` never needs a known size.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::models::{Adapted, Configured, Consumer, ConsumerAdapter, Predicate, PredicateAdapter};
use crate::{FlowError, Result};

type Factory<P> = Arc<dyn Fn(&Map<String, Value>) -> anyhow::Result<Arc<P>> + Send + Sync>;

/// Discriminator → factory map for one family of nodes
pub struct TypeRegistry<P: ?Sized> {
    family: &'static str,
    factories: BTreeMap<String, Factory<P>>,
}

/// Registry of condition types
pub type ConditionRegistry<T> = TypeRegistry<dyn Predicate<T>>;

/// Registry of consumer types
pub type ConsumerRegistry<T> = TypeRegistry<dyn Consumer<T>>;

impl<P: ?Sized> TypeRegistry<P> {
    /// Empty registry; `family` names the node kind in error messages
    pub fn new(family: &'static str) -> Self {
        Self {
            family,
            factories: BTreeMap::new(),
        }
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered discriminators, sorted
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Register a factory under `kind`
    ///
    /// ## Errors
    /// `FlowError::DuplicateType` if `kind` is already registered.
    pub fn register_factory<F>(&mut self, kind: impl Into<String>, factory: F) -> Result<&mut Self>
    where
        F: Fn(&Map<String, Value>) -> anyhow::Result<Arc<P>> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.factories.contains_key(&kind) {
            return Err(FlowError::DuplicateType {
                family: self.family,
                kind,
            });
        }
        debug!(family = self.family, kind = %kind, "registered type");
        self.factories.insert(kind, Arc::new(factory));
        Ok(self)
    }

    /// Build the node for `kind` from its configuration fields
    ///
    /// `path` locates the node in the document for error messages.
    pub fn build(&self, kind: &str, config: Map<String, Value>, path: &str) -> Result<Configured<P>> {
        let factory = self.factories.get(kind).ok_or_else(|| FlowError::UnknownType {
            family: self.family,
            kind: kind.to_string(),
            path: path.to_string(),
        })?;

        let inner = factory(&config).map_err(|source| FlowError::InvalidConfig {
            family: self.family,
            kind: kind.to_string(),
            path: path.to_string(),
            source,
        })?;

        debug!(family = self.family, kind, path, "resolved type");
        Ok(Configured::new(kind, config, inner))
    }
}

impl<P: ?Sized> Clone for TypeRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            family: self.family,
            factories: self.factories.clone(),
        }
    }
}

impl<P: ?Sized> fmt::Debug for TypeRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("family", &self.family)
            .field("kinds", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: 'static> TypeRegistry<dyn Predicate<T>> {
    /// Empty condition registry
    pub fn conditions() -> Self {
        Self::new("condition")
    }

    /// Register a deserializable predicate type
    pub fn register<C>(&mut self, kind: impl Into<String>) -> Result<&mut Self>
    where
        C: Predicate<T> + DeserializeOwned + 'static,
    {
        self.register_factory(kind, |config| {
            let predicate: C = from_config(config)?;
            Ok(Arc::new(predicate) as Arc<dyn Predicate<T>>)
        })
    }

    /// Register an adapter type; its adaptee is what the configuration describes
    pub fn register_adapted<A>(&mut self, kind: impl Into<String>) -> Result<&mut Self>
    where
        A: PredicateAdapter<T> + 'static,
    {
        self.register_factory(kind, |config| {
            let adaptee: A::Adaptee = from_config(config)?;
            let mut adapter = A::default();
            adapter.set_adaptee(adaptee)?;
            Ok(Arc::new(adapter) as Arc<dyn Predicate<T>>)
        })
    }

    /// Register a raw type together with the function that tests it
    pub fn register_with<R, F>(&mut self, kind: impl Into<String>, forward: F) -> Result<&mut Self>
    where
        R: DeserializeOwned + Send + Sync + 'static,
        F: Fn(&R, &T) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        let forward = Arc::new(forward);
        self.register_factory(kind, move |config| {
            let adaptee: R = from_config(config)?;
            Ok(Arc::new(Adapted::new(adaptee, Arc::clone(&forward))) as Arc<dyn Predicate<T>>)
        })
    }
}

impl<T: 'static> TypeRegistry<dyn Consumer<T>> {
    /// Empty consumer registry
    pub fn consumers() -> Self {
        Self::new("consumer")
    }

    /// Register a deserializable consumer type
    pub fn register<C>(&mut self, kind: impl Into<String>) -> Result<&mut Self>
    where
        C: Consumer<T> + DeserializeOwned + 'static,
    {
        self.register_factory(kind, |config| {
            let consumer: C = from_config(config)?;
            Ok(Arc::new(consumer) as Arc<dyn Consumer<T>>)
        })
    }

    /// Register an adapter type; its adaptee is what the configuration describes
    pub fn register_adapted<A>(&mut self, kind: impl Into<String>) -> Result<&mut Self>
    where
        A: ConsumerAdapter<T> + 'static,
    {
        self.register_factory(kind, |config| {
            let adaptee: A::Adaptee = from_config(config)?;
            let mut adapter = A::default();
            adapter.set_adaptee(adaptee)?;
            Ok(Arc::new(adapter) as Arc<dyn Consumer<T>>)
        })
    }

    /// Register a raw type together with the function that applies it
    pub fn register_with<R, F>(&mut self, kind: impl Into<String>, forward: F) -> Result<&mut Self>
    where
        R: DeserializeOwned + Send + Sync + 'static,
        F: Fn(&R, &mut T) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let forward = Arc::new(forward);
        self.register_factory(kind, move |config| {
            let adaptee: R = from_config(config)?;
            Ok(Arc::new(Adapted::new(adaptee, Arc::clone(&forward))) as Arc<dyn Consumer<T>>)
        })
    }
}

fn from_config<D: DeserializeOwned>(config: &Map<String, Value>) -> anyhow::Result<D> {
    Ok(serde_json::from_value(Value::Object(config.clone()))?)
}
