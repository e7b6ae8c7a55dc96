//! Derived values: named async computations layered on top of prompt answers.
//!
//! Derivations are grouped into ordered stages. Every derivation in a stage sees the same
//! snapshot of the data, and runs concurrently with its siblings on the current task.
//! A stage's results are merged before the next stage starts, so a derivation that needs
//! another derived value belongs in a later stage.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::error::{Error, Result};

/// Flat mapping from variable name to value, shared by prompts, derivations and templates.
pub type Data = serde_json::Map<String, Value>;

pub type DeriveFuture = BoxFuture<'static, Result<Value>>;

/// A single derivation function.
pub trait Derive: Send + Sync {
    fn derive(&self, data: Arc<Data>) -> DeriveFuture;
}

struct FnDerive<F>(F);

impl<F, Fut> Derive for FnDerive<F>
where
    F: Fn(Arc<Data>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    fn derive(&self, data: Arc<Data>) -> DeriveFuture {
        Box::pin((self.0)(data))
    }
}

/// An ordered group of derivations that run concurrently.
#[derive(Clone, Default)]
pub struct Stage {
    derivations: IndexMap<String, Arc<dyn Derive>>,
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.derivations.keys()).finish()
    }
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an async derivation computed from the stage's data snapshot.
    pub fn derive<N, F, Fut>(mut self, name: N, f: F) -> Self
    where
        N: Into<String>,
        F: Fn(Arc<Data>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.insert(name, Arc::new(FnDerive(f)));
        self
    }

    /// Adds a derivation that ignores its input and yields `value`.
    pub fn value<N: Into<String>, V: Into<Value>>(self, name: N, value: V) -> Self {
        let value = value.into();
        self.derive(name, move |_| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    /// Adds (or replaces) a derivation. Replacing keeps the original position.
    pub fn insert<N: Into<String>>(&mut self, name: N, derivation: Arc<dyn Derive>) {
        self.derivations.insert(name.into(), derivation);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.derivations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.derivations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.derivations.is_empty()
    }
}

/// Resolves every stage in order on top of `data`.
///
/// # Returns
/// * `Result<Data>` - `data` extended with every derived value, later stages winning
///
/// # Errors
/// * `Error::DerivationError` wrapping the first failure observed. Sibling derivations
///   still pending in that stage are dropped.
pub async fn resolve(mut data: Data, stages: &[Stage]) -> Result<Data> {
    for (index, stage) in stages.iter().enumerate() {
        if stage.is_empty() {
            continue;
        }
        debug!("Resolving derivation stage {}: {:?}", index, stage);

        let snapshot = Arc::new(data.clone());
        let mut pending: FuturesUnordered<_> = stage
            .derivations
            .values()
            .enumerate()
            .map(|(position, derivation)| {
                let future = derivation.derive(Arc::clone(&snapshot));
                async move { (position, future.await) }
            })
            .collect();

        let mut results: Vec<Option<Value>> = vec![None; stage.len()];
        while let Some((position, result)) = pending.next().await {
            match result {
                Ok(value) => results[position] = Some(value),
                Err(e) => {
                    let name = stage
                        .derivations
                        .get_index(position)
                        .map(|(name, _)| name.clone())
                        .unwrap_or_default();
                    debug!("Derivation '{}' failed: {}", name, e);
                    return Err(Error::DerivationError { name, source: Box::new(e) });
                }
            }
        }

        for (name, value) in stage.derivations.keys().zip(results) {
            if let Some(value) = value {
                data.insert(name.clone(), value);
            }
        }
    }
    Ok(data)
}
