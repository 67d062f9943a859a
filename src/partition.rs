//! Deterministic partitioned evaluation of independent force terms.
//!
//! Terms are embarrassingly parallel: each reads only its own particles'
//! positions and parameters. The one shared resource is the per-particle
//! force array, so each worker accumulates into a private buffer and the
//! buffers are summed in worker order afterwards. Energy and forces are
//! therefore invariant to the worker count within reduction roundoff,
//! and no worker ever writes the shared array concurrently.

use rayon::prelude::*;
use ultraviolet::DVec3;

use crate::config::MIN_TERMS_PER_WORKER;

/// Split `n_terms` across `workers` contiguous chunks, evaluate each chunk
/// into a private force buffer, and reduce the buffers elementwise in chunk
/// order. `eval` is called once per term index with the chunk's buffer and
/// returns the term's energy contribution.
pub fn evaluate_terms<F>(
    n_particles: usize,
    n_terms: usize,
    workers: usize,
    eval: F,
) -> (f64, Vec<DVec3>)
where
    F: Fn(usize, &mut [DVec3]) -> f64 + Sync,
{
    let workers = effective_workers(workers, n_terms);
    let chunk = n_terms.div_ceil(workers);
    let ranges: Vec<(usize, usize)> = (0..workers)
        .map(|w| (w * chunk, ((w + 1) * chunk).min(n_terms)))
        .collect();

    let partials: Vec<(f64, Vec<DVec3>)> = ranges
        .par_iter()
        .map(|&(start, end)| {
            let mut local = vec![DVec3::zero(); n_particles];
            let mut energy = 0.0;
            for term in start..end {
                energy += eval(term, &mut local);
            }
            (energy, local)
        })
        .collect();

    let mut energy = 0.0;
    let mut forces = vec![DVec3::zero(); n_particles];
    for (partial_energy, local) in partials {
        energy += partial_energy;
        for (total, contribution) in forces.iter_mut().zip(local) {
            *total += contribution;
        }
    }
    (energy, forces)
}

/// Clamp the worker count so each worker gets a worthwhile slice.
fn effective_workers(requested: usize, n_terms: usize) -> usize {
    let useful = (n_terms / MIN_TERMS_PER_WORKER).max(1);
    requested.max(1).min(useful)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energies_sum_over_all_terms() {
        let (energy, forces) = evaluate_terms(3, 100, 4, |term, local| {
            local[term % 3] += DVec3::new(1.0, 0.0, 0.0);
            term as f64
        });
        assert_eq!(energy, (0..100).sum::<usize>() as f64);
        let total: f64 = forces.iter().map(|f| f.x).sum();
        assert_eq!(total, 100.0);
    }

    #[test]
    fn worker_count_does_not_change_results() {
        let eval = |term: usize, local: &mut [DVec3]| {
            local[term % 5] += DVec3::new(0.1 * term as f64, -0.2, 0.3);
            (term as f64).sin()
        };
        let (e1, f1) = evaluate_terms(5, 200, 1, eval);
        let (e2, f2) = evaluate_terms(5, 200, 2, eval);
        assert!((e1 - e2).abs() <= 1e-5 * e1.abs().max(1.0));
        for (a, b) in f1.iter().zip(&f2) {
            assert!((*a - *b).mag() <= 1e-5 * a.mag().max(1.0));
        }
    }

    #[test]
    fn zero_terms_is_fine() {
        let (energy, forces) = evaluate_terms(2, 0, 8, |_, _| unreachable!());
        assert_eq!(energy, 0.0);
        assert_eq!(forces.len(), 2);
    }

    #[test]
    fn tiny_workloads_collapse_to_one_worker() {
        assert_eq!(effective_workers(8, 4), 1);
        assert_eq!(effective_workers(2, 200), 2);
        assert_eq!(effective_workers(0, 200), 1);
    }
}
