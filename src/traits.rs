//! The black-box model contract.
//!
//! Explainers only ever see a model through [`PredictionProvider`]: an
//! asynchronous, batch-capable call from inputs to outputs, returning one
//! output per input in request order.

use crate::error::{ExplicarError, Result};
use crate::prediction::{PredictionInput, PredictionOutput};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// An opaque model evaluated in batches.
///
/// Implementations must return exactly one [`PredictionOutput`] per input,
/// in the order the inputs were given. Explainers treat any error as a
/// failure of the whole explanation.
///
/// # Examples
///
/// ```
/// use explicar::prelude::*;
///
/// let model = FnPredictionProvider::new(|inputs: &[PredictionInput]| {
///     Ok(inputs
///         .iter()
///         .map(|input| {
///             let x = input.features[0].value().as_number();
///             PredictionOutput::new(vec![Output::number("y", 2.0 * x)])
///         })
///         .collect())
/// });
/// let rt = tokio::runtime::Runtime::new().unwrap();
/// let out = rt
///     .block_on(model.predict(vec![PredictionInput::new(vec![Feature::number("x", 3.0)])]))
///     .unwrap();
/// assert_eq!(out[0].outputs[0].value.as_number(), 6.0);
/// ```
#[async_trait]
pub trait PredictionProvider: Send + Sync {
    /// Evaluates the model on a batch of inputs.
    ///
    /// # Errors
    ///
    /// Any error the model raises; explainers surface it as
    /// `PredictionFailure`.
    async fn predict(&self, inputs: Vec<PredictionInput>) -> Result<Vec<PredictionOutput>>;
}

#[async_trait]
impl<T: PredictionProvider + ?Sized> PredictionProvider for Arc<T> {
    async fn predict(&self, inputs: Vec<PredictionInput>) -> Result<Vec<PredictionOutput>> {
        (**self).predict(inputs).await
    }
}

type BatchFn = dyn Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync;
type SingleFn = dyn Fn(&PredictionInput) -> Result<PredictionOutput> + Send + Sync;

/// Adapter running a synchronous batch closure inline.
#[derive(Clone)]
pub struct FnPredictionProvider {
    model: Arc<BatchFn>,
}

impl FnPredictionProvider {
    /// Wraps a closure mapping a batch of inputs to outputs.
    pub fn new<F>(model: F) -> Self
    where
        F: Fn(&[PredictionInput]) -> Result<Vec<PredictionOutput>> + Send + Sync + 'static,
    {
        Self {
            model: Arc::new(model),
        }
    }
}

impl fmt::Debug for FnPredictionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPredictionProvider").finish_non_exhaustive()
    }
}

#[async_trait]
impl PredictionProvider for FnPredictionProvider {
    async fn predict(&self, inputs: Vec<PredictionInput>) -> Result<Vec<PredictionOutput>> {
        (self.model)(&inputs)
    }
}

/// Adapter that fans a batch out over blocking worker tasks.
///
/// The batch is split into at most `workers` contiguous chunks, each
/// evaluated on [`tokio::task::spawn_blocking`]; outputs are reassembled in
/// request order. Requires a running tokio runtime.
#[derive(Clone)]
pub struct ParallelPredictionProvider {
    model: Arc<SingleFn>,
    workers: usize,
}

impl ParallelPredictionProvider {
    /// Wraps a per-input closure; `workers` is clamped to at least 1.
    pub fn new<F>(model: F, workers: usize) -> Self
    where
        F: Fn(&PredictionInput) -> Result<PredictionOutput> + Send + Sync + 'static,
    {
        Self {
            model: Arc::new(model),
            workers: workers.max(1),
        }
    }

    /// Number of worker tasks per batch.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl fmt::Debug for ParallelPredictionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelPredictionProvider")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PredictionProvider for ParallelPredictionProvider {
    async fn predict(&self, inputs: Vec<PredictionInput>) -> Result<Vec<PredictionOutput>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let total = inputs.len();
        let chunk_size = total.div_ceil(self.workers);

        let handles = inputs.chunks(chunk_size).map(|chunk| {
            let chunk = chunk.to_vec();
            let model = Arc::clone(&self.model);
            tokio::task::spawn_blocking(move || {
                chunk.iter().map(|input| model(input)).collect::<Result<Vec<_>>>()
            })
        });
        let chunks = futures::future::try_join_all(handles)
            .await
            .map_err(|e| ExplicarError::prediction(format!("prediction worker failed: {e}")))?;

        let mut outputs = Vec::with_capacity(total);
        for chunk in chunks {
            outputs.extend(chunk?);
        }
        Ok(outputs)
    }
}
