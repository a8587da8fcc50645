//! Parallel or sequential execution of per-agent phases
//!
//! The `cfg` switch between rayon and plain iterators lives here in one
//! place so the phase code reads the same either way. Results always come
//! back in slice order, and agents draw only from their own substreams, so
//! the outcome of a phase is identical for any worker count.

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "parallel")]
use std::sync::Arc;

/// Runs closures over agent slices
#[derive(Debug, Clone)]
pub struct Executor {
    #[cfg(feature = "parallel")]
    pool: Option<Arc<rayon::ThreadPool>>,
    sequential: bool,
}

impl Executor {
    /// `workers == 0` uses the global rayon pool, `1` runs sequentially,
    /// anything larger gets a dedicated pool of that size. Without the
    /// `parallel` feature every executor is sequential.
    pub fn new(workers: usize) -> Result<Self, String> {
        #[cfg(feature = "parallel")]
        {
            let pool = if workers > 1 {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .build()
                    .map_err(|e| e.to_string())?;
                Some(Arc::new(pool))
            } else {
                None
            };
            Ok(Self {
                pool,
                sequential: workers == 1,
            })
        }

        #[cfg(not(feature = "parallel"))]
        {
            let _ = workers;
            Ok(Self::sequential())
        }
    }

    pub fn sequential() -> Self {
        Self {
            #[cfg(feature = "parallel")]
            pool: None,
            sequential: true,
        }
    }

    pub fn is_sequential(&self) -> bool {
        self.sequential
    }

    /// Apply `f` to every element, collecting results in slice order
    pub fn map_slice_mut<T, F, R>(&self, slice: &mut [T], f: F) -> Vec<R>
    where
        T: Send,
        F: Fn(&mut T) -> R + Sync + Send,
        R: Send,
    {
        #[cfg(feature = "parallel")]
        {
            if self.sequential {
                slice.iter_mut().map(f).collect()
            } else if let Some(pool) = &self.pool {
                pool.install(|| slice.par_iter_mut().map(f).collect())
            } else {
                slice.par_iter_mut().map(f).collect()
            }
        }

        #[cfg(not(feature = "parallel"))]
        {
            slice.iter_mut().map(f).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_keep_slice_order() {
        let executor = Executor::new(0).unwrap();
        let mut items: Vec<u64> = (0..1_000).collect();
        let out = executor.map_slice_mut(&mut items, |x| {
            *x += 1;
            *x * 2
        });
        assert_eq!(out[0], 2);
        assert_eq!(out[999], 2_000);
        assert_eq!(items[10], 11);
    }

    #[test]
    fn test_single_worker_is_sequential() {
        assert!(Executor::new(1).unwrap().is_sequential());
        assert!(Executor::sequential().is_sequential());
    }
}
