// Adapters - let foreign types take part in a flow

//! # Adapters
//!
//! Sometimes the objects an application wants to configure do not implement
//! [`Predicate`] or [`Consumer`] themselves, e.g. rule types owned by another
//! crate. Two seams make them usable:
//!
//! - **Adapter traits** ([`PredicateAdapter`], [`ConsumerAdapter`]): a type
//!   constructed with `Default`, handed the deserialized raw adaptee through
//!   `set_adaptee`, and then used in place of it.
//! - **[`Adapted`]**: a ready-made wrapper holding the raw adaptee and a
//!   forwarding function, for when writing a dedicated adapter type is overkill.
//!
//! The engine only resolves adapters (see `TypeRegistry::register_adapted` and
//! `TypeRegistry::register_with`); what the adapter does is up to its author.

use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::contract::{Consumer, Predicate};

/// A predicate wrapping a raw adaptee of another type
pub trait PredicateAdapter<T>: Predicate<T> + Default {
    /// The raw type read from configuration
    type Adaptee: DeserializeOwned;

    /// Attach the raw object; may reject it
    fn set_adaptee(&mut self, adaptee: Self::Adaptee) -> anyhow::Result<()>;
}

/// A consumer wrapping a raw adaptee of another type
pub trait ConsumerAdapter<T>: Consumer<T> + Default {
    /// The raw type read from configuration
    type Adaptee: DeserializeOwned;

    /// Attach the raw object; may reject it
    fn set_adaptee(&mut self, adaptee: Self::Adaptee) -> anyhow::Result<()>;
}

/// Raw adaptee plus the function translating calls onto it
///
/// Implements [`Predicate<T>`] when `F: Fn(&R, &T) -> anyhow::Result<bool>` and
/// [`Consumer<T>`] when `F: Fn(&R, &mut T) -> anyhow::Result<()>`.
pub struct Adapted<R, F> {
    adaptee: R,
    forward: Arc<F>,
}

impl<R, F> Adapted<R, F> {
    /// Pair an adaptee with its forwarding function
    pub fn new(adaptee: R, forward: Arc<F>) -> Self {
        Self { adaptee, forward }
    }

    /// The raw object calls are forwarded to
    pub fn adaptee(&self) -> &R {
        &self.adaptee
    }
}

impl<T, R, F> Predicate<T> for Adapted<R, F>
where
    R: Send + Sync,
    F: Fn(&R, &T) -> anyhow::Result<bool> + Send + Sync,
{
    fn test(&self, input: &T) -> anyhow::Result<bool> {
        (*self.forward)(&self.adaptee, input)
    }
}

impl<T, R, F> Consumer<T> for Adapted<R, F>
where
    R: Send + Sync,
    F: Fn(&R, &mut T) -> anyhow::Result<()> + Send + Sync,
{
    fn accept(&self, input: &mut T) -> anyhow::Result<()> {
        (*self.forward)(&self.adaptee, input)
    }
}
