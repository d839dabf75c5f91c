//! Permutation-preserving variation operators.
//!
//! - Partially matched crossover (PMX): the segment between two cut points is
//!   exchanged between the parents, and values outside the segment that now
//!   appear twice are repaired through the mapping between the two segments.
//! - Shuffle-indexes mutation: each position, with a given probability, swaps
//!   its value with another uniformly chosen position.
//!
//! Both always return permutations when given permutations.

use crate::individual::Individual;
use rand::Rng;

/// Two distinct cut points in `0..=size`, returned as a half-open segment
/// `start..end`.
pub fn random_cut_points<R: Rng + ?Sized>(size: usize, rng: &mut R) -> (usize, usize) {
    let mut start = rng.gen_range(0..=size);
    let mut end = rng.gen_range(0..size);
    if end >= start {
        end += 1;
    } else {
        std::mem::swap(&mut start, &mut end);
    }
    (start, end)
}

/// Build one PMX child: `receiver` with `donor`'s segment copied in.
///
/// A value outside the segment that collides with the copied segment is
/// replaced by following the matched pairs `donor[i] -> receiver[i]` until
/// the value is free.
fn pmx_child(receiver: &[usize], donor: &[usize], start: usize, end: usize) -> Vec<usize> {
    let n = receiver.len();
    let mut segment_pos: Vec<Option<usize>> = vec![None; n];
    for i in start..end {
        segment_pos[donor[i]] = Some(i);
    }

    let mut child = receiver.to_vec();
    child[start..end].copy_from_slice(&donor[start..end]);

    for k in (0..start).chain(end..n) {
        let mut value = receiver[k];
        while let Some(pos) = segment_pos[value] {
            value = receiver[pos];
        }
        child[k] = value;
    }

    child
}

/// PMX with explicit cut points. Both parents must be permutations of the
/// same length.
pub fn pmx_crossover_at(
    parent1: &[usize],
    parent2: &[usize],
    start: usize,
    end: usize,
) -> (Vec<usize>, Vec<usize>) {
    debug_assert_eq!(parent1.len(), parent2.len(), "PMX parents differ in length");
    let end = end.min(parent1.len());
    let start = start.min(end);
    (
        pmx_child(parent1, parent2, start, end),
        pmx_child(parent2, parent1, start, end),
    )
}

/// PMX with random cut points. Parents shorter than two genes are copied.
pub fn pmx_crossover<R: Rng + ?Sized>(
    parent1: &[usize],
    parent2: &[usize],
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    debug_assert_eq!(parent1.len(), parent2.len(), "PMX parents differ in length");
    let size = parent1.len();
    if size < 2 {
        return (parent1.to_vec(), parent2.to_vec());
    }
    let (start, end) = random_cut_points(size, rng);
    pmx_crossover_at(parent1, parent2, start, end)
}

/// Recombine two individuals in place; both lose their cached fitness.
pub fn crossover<R: Rng + ?Sized>(first: &mut Individual, second: &mut Individual, rng: &mut R) {
    debug_assert_eq!(first.len(), second.len(), "crossover parents differ in length");
    if first.len() < 2 {
        return;
    }
    let (child1, child2) = pmx_crossover(first.genes(), second.genes(), rng);
    first.genes_mut().copy_from_slice(&child1);
    second.genes_mut().copy_from_slice(&child2);
}

/// Positions to swap for a shuffle-indexes mutation of a genome of `size`.
fn shuffle_swaps<R: Rng + ?Sized>(size: usize, per_gene_prob: f64, rng: &mut R) -> Vec<(usize, usize)> {
    let mut swaps = Vec::new();
    if size < 2 {
        return swaps;
    }
    for i in 0..size {
        if rng.gen::<f64>() < per_gene_prob {
            let mut other = rng.gen_range(0..size - 1);
            if other >= i {
                other += 1;
            }
            swaps.push((i, other));
        }
    }
    swaps
}

/// Shuffle-indexes mutation on a raw genome. Returns whether anything moved.
pub fn shuffle_indexes<R: Rng + ?Sized>(genes: &mut [usize], per_gene_prob: f64, rng: &mut R) -> bool {
    let swaps = shuffle_swaps(genes.len(), per_gene_prob, rng);
    for &(i, j) in &swaps {
        genes.swap(i, j);
    }
    !swaps.is_empty()
}

/// Mutate an individual in place. The cached fitness is only cleared when at
/// least one swap happened.
pub fn mutate<R: Rng + ?Sized>(individual: &mut Individual, per_gene_prob: f64, rng: &mut R) -> bool {
    let swaps = shuffle_swaps(individual.len(), per_gene_prob, rng);
    if swaps.is_empty() {
        return false;
    }
    let genes = individual.genes_mut();
    for (i, j) in swaps {
        genes.swap(i, j);
    }
    true
}
