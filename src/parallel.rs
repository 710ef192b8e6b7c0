//! Worker pool for the embarrassingly parallel tree-building loops.
//!
//! Workers claim indices from an atomic counter, collect their results
//! locally and merge after join; the first observed error wins and stops the
//! remaining workers at their next claim.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use crate::error::SignatureError;

/// Computes `f(0..len)` in index order, spreading the work over the
/// available cores once `len` reaches `min_parallel_len`.
pub(crate) fn compute_parallel<T, Func>(
    len: usize,
    min_parallel_len: usize,
    f: Func,
) -> Result<Vec<T>, SignatureError>
where
    T: Send,
    Func: Fn(usize) -> Result<T, SignatureError> + Sync,
{
    let workers = available_workers(len);
    if workers <= 1 || len < min_parallel_len {
        return (0..len).map(&f).collect();
    }

    let next = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    let first_error: Mutex<Option<SignatureError>> = Mutex::new(None);
    let mut slots: Vec<Option<T>> = Vec::with_capacity(len);
    slots.resize_with(len, || None);

    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(|| {
                    let mut local = Vec::new();
                    loop {
                        if failed.load(Ordering::Relaxed) {
                            break;
                        }
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        if index >= len {
                            break;
                        }
                        match f(index) {
                            Ok(value) => local.push((index, value)),
                            Err(err) => {
                                let mut guard =
                                    first_error.lock().expect("error slot poisoned");
                                if guard.is_none() {
                                    *guard = Some(err);
                                }
                                failed.store(true, Ordering::Relaxed);
                                break;
                            }
                        }
                    }
                    local
                })
            })
            .collect();

        for handle in handles {
            for (index, value) in handle.join().expect("worker panicked") {
                slots[index] = Some(value);
            }
        }
    });

    if let Some(err) = first_error.into_inner().expect("error slot poisoned") {
        return Err(err);
    }
    Ok(slots
        .into_iter()
        .map(|slot| slot.expect("claimed index without result"))
        .collect())
}

fn available_workers(len: usize) -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_the_sequential_result() {
        let parallel = compute_parallel(1000, 1, |i| Ok(i * i)).unwrap();
        let sequential: Vec<usize> = (0..1000).map(|i| i * i).collect();
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn small_inputs_stay_sequential() {
        let out = compute_parallel(3, 64, |i| Ok(i + 1)).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn an_error_is_reported_after_join() {
        let result = compute_parallel(500, 1, |i| {
            if i == 250 {
                Err(SignatureError::InvalidBottomTree)
            } else {
                Ok(i)
            }
        });
        assert_eq!(result, Err(SignatureError::InvalidBottomTree));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let out = compute_parallel(0, 1, |i| Ok(i)).unwrap();
        assert!(out.is_empty());
    }
}
