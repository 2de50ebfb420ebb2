use candle_core::Tensor;
use crossbeam::channel;
use rayon::prelude::*;

use crate::error::PredictionError;
use crate::pipeline::traits::MosDataset;

/// Batches queued ahead of the consumer when a worker pool is present.
const PREFETCH_BATCHES: usize = 1;

/// Groups dataset items into fixed-size batches in index order. Each batch
/// holds one stacked tensor per tuple position.
pub struct BatchLoader<'a> {
    dataset: &'a dyn MosDataset,
    batch_size: usize,
    pool: Option<rayon::ThreadPool>,
}

impl<'a> BatchLoader<'a> {
    /// `num_workers == 0` prepares items on the calling thread.
    pub fn new(
        dataset: &'a dyn MosDataset,
        batch_size: usize,
        num_workers: usize,
    ) -> Result<Self, PredictionError> {
        if batch_size == 0 {
            return Err(PredictionError::invalid_argument(
                "batch_size must be at least 1",
            ));
        }
        let pool = if num_workers > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(num_workers)
                .thread_name(|i| format!("utmos-loader-{i}"))
                .build()
                .map_err(|e| PredictionError::runtime("build loader thread pool", e))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self {
            dataset,
            batch_size,
            pool,
        })
    }

    pub fn num_items(&self) -> usize {
        self.dataset.len()
    }

    /// Number of batches, counting a final partial one.
    pub fn len(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    pub fn iter(&self) -> Batches<'_, 'a> {
        Batches {
            loader: self,
            next_index: 0,
        }
    }

    /// Feeds every batch to `consume` in order. With a worker pool the next
    /// batch is prepared while `consume` works on the current one; the first
    /// error from either side stops the loop.
    pub fn for_each_batch<F>(&self, mut consume: F) -> Result<(), PredictionError>
    where
        F: FnMut(Vec<Tensor>) -> Result<(), PredictionError>,
    {
        if self.pool.is_none() {
            for batch in self.iter() {
                consume(batch?)?;
            }
            return Ok(());
        }

        let (tx, rx) = channel::bounded(PREFETCH_BATCHES);
        std::thread::scope(|scope| {
            std::thread::Builder::new()
                .name("utmos-prefetch".to_string())
                .spawn_scoped(scope, move || {
                    for batch in self.iter() {
                        let failed = batch.is_err();
                        // a send error means the consumer has already stopped
                        if tx.send(batch).is_err() || failed {
                            break;
                        }
                    }
                })
                .map_err(|e| PredictionError::io("spawn batch prefetch thread", e))?;

            for batch in rx {
                consume(batch?)?;
            }
            Ok(())
        })
    }

    fn load_batch(&self, start: usize, end: usize) -> Result<Vec<Tensor>, PredictionError> {
        let items = match &self.pool {
            Some(pool) => pool.install(|| {
                (start..end)
                    .into_par_iter()
                    .map(|index| self.dataset.get(index))
                    .collect::<Result<Vec<_>, _>>()
            })?,
            None => (start..end)
                .map(|index| self.dataset.get(index))
                .collect::<Result<Vec<_>, _>>()?,
        };
        collate(&items)
    }
}

pub struct Batches<'l, 'a> {
    loader: &'l BatchLoader<'a>,
    next_index: usize,
}

impl Iterator for Batches<'_, '_> {
    type Item = Result<Vec<Tensor>, PredictionError>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.loader.num_items();
        if self.next_index >= total {
            return None;
        }
        let start = self.next_index;
        let end = (start + self.loader.batch_size).min(total);
        self.next_index = end;
        Some(self.loader.load_batch(start, end))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self
            .loader
            .num_items()
            .saturating_sub(self.next_index)
            .div_ceil(self.loader.batch_size);
        (remaining, Some(remaining))
    }
}

/// Stacks the i-th tensor of every item along a new leading batch dimension.
fn collate(items: &[Vec<Tensor>]) -> Result<Vec<Tensor>, PredictionError> {
    let Some(first) = items.first() else {
        return Ok(Vec::new());
    };
    let arity = first.len();
    if let Some(bad) = items.iter().position(|item| item.len() != arity) {
        return Err(PredictionError::runtime(
            "collate batch",
            format!(
                "item {bad} has {} tensors, expected {arity}",
                items[bad].len()
            ),
        ));
    }
    (0..arity)
        .map(|slot| {
            let column: Vec<&Tensor> = items.iter().map(|item| &item[slot]).collect();
            Tensor::stack(&column, 0).map_err(|e| PredictionError::runtime("collate batch", e))
        })
        .collect()
}
