// Predicate and consumer contracts - what every flow node satisfies

//! # Contracts
//!
//! The flow engine composes two kinds of objects over a payload type `T`:
//!
//! - **[`Predicate<T>`]**: `test(&T) -> bool`, used by `condition` nodes
//! - **[`Consumer<T>`]**: `accept(&mut T)`, used by bodies (`then`/`else`/root)
//!
//! Both return `anyhow::Result` so that application code can fail during
//! evaluation. The engine neither retries nor wraps those errors.
//!
//! Externally-typed nodes are held as [`Configured`]: the instance plus the type
//! discriminator and configuration fields it was built from, which is what the
//! writer emits when a flow is saved.
//!
//! ## Rust Learning Notes:
//!
//! ### Send + Sync Supertraits
//! A parsed flow is immutable and may be shared across threads behind an `Arc`.
//! Requiring `Send + Sync` on the contracts makes every composed graph
//! shareable without any locking in the engine.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A single-argument test over the payload
pub trait Predicate<T>: Send + Sync {
    /// Evaluate against `input`
    fn test(&self, input: &T) -> anyhow::Result<bool>;
}

/// A single-argument action over the payload
pub trait Consumer<T>: Send + Sync {
    /// Apply to `input`, possibly mutating it
    fn accept(&self, input: &mut T) -> anyhow::Result<()>;
}

/// Predicate backed by a closure, see [`predicate_fn`]
pub struct FnPredicate<F>(F);

impl<T, F> Predicate<T> for FnPredicate<F>
where
    F: Fn(&T) -> anyhow::Result<bool> + Send + Sync,
{
    fn test(&self, input: &T) -> anyhow::Result<bool> {
        (self.0)(input)
    }
}

/// Consumer backed by a closure, see [`consumer_fn`]
pub struct FnConsumer<F>(F);

impl<T, F> Consumer<T> for FnConsumer<F>
where
    F: Fn(&mut T) -> anyhow::Result<()> + Send + Sync,
{
    fn accept(&self, input: &mut T) -> anyhow::Result<()> {
        (self.0)(input)
    }
}

/// Wrap a closure as a [`Predicate`]
pub fn predicate_fn<T, F>(f: F) -> FnPredicate<F>
where
    F: Fn(&T) -> anyhow::Result<bool> + Send + Sync,
{
    FnPredicate(f)
}

/// Wrap a closure as a [`Consumer`]
pub fn consumer_fn<T, F>(f: F) -> FnConsumer<F>
where
    F: Fn(&mut T) -> anyhow::Result<()> + Send + Sync,
{
    FnConsumer(f)
}

/// An externally-typed node together with the configuration it came from
///
/// `kind` is the type discriminator (`field_equals`, `uppercase`, ...) and
/// `config` the remaining fields. Both are retained so that writing a parsed
/// flow reproduces the original configuration exactly.
pub struct Configured<P: ?Sized> {
    kind: String,
    config: Map<String, Value>,
    inner: Arc<P>,
}

impl<P: ?Sized> Configured<P> {
    /// Pair an instance with its discriminator and configuration
    pub fn new(kind: impl Into<String>, config: Map<String, Value>, inner: Arc<P>) -> Self {
        Self {
            kind: kind.into(),
            config,
            inner,
        }
    }

    /// The type discriminator
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Configuration fields, without the discriminator
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// The shared instance
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: ?Sized> Clone for Configured<P> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            config: self.config.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: ?Sized> fmt::Debug for Configured<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configured")
            .field("kind", &self.kind)
            .field("config", &self.config)
            .finish()
    }
}

impl<T> Configured<dyn Predicate<T>> {
    /// Build a predicate node programmatically
    ///
    /// The value is serialized to obtain the configuration the writer will emit,
    /// so it should serialize to the same fields its registered factory reads.
    pub fn predicate<C>(kind: impl Into<String>, value: C) -> anyhow::Result<Self>
    where
        C: Predicate<T> + Serialize + 'static,
    {
        let config = config_of(&value)?;
        Ok(Self::new(kind, config, Arc::new(value)))
    }
}

impl<T> Configured<dyn Consumer<T>> {
    /// Build a consumer node programmatically, see [`Configured::predicate`]
    pub fn consumer<C>(kind: impl Into<String>, value: C) -> anyhow::Result<Self>
    where
        C: Consumer<T> + Serialize + 'static,
    {
        let config = config_of(&value)?;
        Ok(Self::new(kind, config, Arc::new(value)))
    }
}

impl<T> Predicate<T> for Configured<dyn Predicate<T>> {
    fn test(&self, input: &T) -> anyhow::Result<bool> {
        self.inner.test(input)
    }
}

impl<T> Consumer<T> for Configured<dyn Consumer<T>> {
    fn accept(&self, input: &mut T) -> anyhow::Result<()> {
        self.inner.accept(input)
    }
}

fn config_of<C: Serialize>(value: &C) -> anyhow::Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => anyhow::bail!("node configuration must serialize to an object, got {}", other),
    }
}
