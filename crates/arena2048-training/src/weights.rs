//! Gene vector operations for the genetic algorithm.
//!
//! These are the building blocks [`PopulationEvolver`](crate::genetic::PopulationEvolver)
//! combines into one generation step:
//!
//! - **Initialization**: [`random_below`] samples each gene from its own range
//! - **Crossover**: [`average`] takes the component-wise mean of two parents
//! - **Mutation**: [`mutate`] adds a uniform perturbation to some genes
//! - **Selection**: [`roulette_select`] picks a parent proportionally to fitness
//!
//! Genes are unbounded after mutation; a gene may drift negative, which turns
//! its feature into a penalty.

use rand::Rng;

/// Creates a gene array by applying a function to each index.
///
/// # Examples
///
/// ```
/// use arena2048_training::weights;
///
/// let genes: [f32; 3] = weights::from_fn(|i| i as f32 * 0.5);
/// assert_eq!(genes, [0.0, 0.5, 1.0]);
/// ```
pub fn from_fn<F, const N: usize>(f: F) -> [f32; N]
where
    F: FnMut(usize) -> f32,
{
    std::array::from_fn(f)
}

/// Samples gene `i` uniformly from `[0, upper[i])`.
pub fn random_below<R, const N: usize>(rng: &mut R, upper: &[f32; N]) -> [f32; N]
where
    R: Rng + ?Sized,
{
    from_fn(|i| rng.random_range(0.0..upper[i]))
}

/// Component-wise mean of two parents.
#[must_use]
pub fn average<const N: usize>(p1: &[f32; N], p2: &[f32; N]) -> [f32; N] {
    from_fn(|i| f32::midpoint(p1[i], p2[i]))
}

/// With probability `rate` per gene, adds a uniform perturbation from
/// `[-range, range]`.
pub fn mutate<R>(genes: &mut [f32], rate: f32, range: f32, rng: &mut R)
where
    R: Rng + ?Sized,
{
    let rate = f64::from(rate.clamp(0.0, 1.0));
    for g in genes {
        if rng.random_bool(rate) {
            *g += rng.random_range(-range..=range);
        }
    }
}

/// Fitness-proportional selection.
///
/// Each candidate is weighted by `max(0, fitness)`. When every weight is
/// zero the first candidate is returned. Returns `None` for an empty slice.
pub fn roulette_select<R>(fitness: &[f32], rng: &mut R) -> Option<usize>
where
    R: Rng + ?Sized,
{
    if fitness.is_empty() {
        return None;
    }
    let total: f32 = fitness.iter().map(|f| f.max(0.0)).sum();
    if total <= 0.0 {
        return Some(0);
    }
    let mut ball = rng.random_range(0.0..total);
    for (i, f) in fitness.iter().enumerate() {
        let w = f.max(0.0);
        if ball < w {
            return Some(i);
        }
        ball -= w;
    }
    // Rounding can leave a sliver past the last positive slot.
    fitness.iter().rposition(|f| *f > 0.0)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_random_below_respects_ranges() {
        let mut rng = Pcg32::seed_from_u64(1);
        let upper = [20.0, 15.0, 10.0, 5.0, 3.0];
        for _ in 0..200 {
            let genes = random_below(&mut rng, &upper);
            for (g, u) in genes.iter().zip(upper) {
                assert!((0.0..u).contains(g));
            }
        }
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[1.0, 4.0], &[3.0, 0.0]), [2.0, 2.0]);
    }

    #[test]
    fn test_mutate_rate_bounds() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut genes = [1.0; 8];
        mutate(&mut genes, 0.0, 1.0, &mut rng);
        assert_eq!(genes, [1.0; 8]);

        mutate(&mut genes, 1.0, 1.0, &mut rng);
        assert!(genes.iter().all(|g| (0.0..=2.0).contains(g)));
    }

    #[test]
    fn test_roulette_select() {
        let mut rng = Pcg32::seed_from_u64(3);
        assert_eq!(roulette_select(&[], &mut rng), None);
        assert_eq!(roulette_select(&[0.0, -5.0, 0.0], &mut rng), Some(0));
        for _ in 0..100 {
            assert_eq!(roulette_select(&[-1.0, 0.0, 7.5, 0.0], &mut rng), Some(2));
        }
    }
}
