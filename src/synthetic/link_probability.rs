use nalgebra::DMatrix;
use rand::Rng;

use crate::error::{EvalError, EvalResult};

/// Within-cluster link probability of the base regime.
pub const WITHIN_CLUSTER_DENSITY: f64 = 0.9;
/// Upper end of the quantized grid for between-cluster link probabilities.
pub const MAX_BETWEEN_CLUSTER_DENSITY: f64 = 0.4;

/// Symmetric K×K matrix of cluster-to-cluster link probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkProbabilityMatrix {
    matrix: DMatrix<f64>,
}

impl LinkProbabilityMatrix {
    pub fn new(matrix: DMatrix<f64>) -> EvalResult<Self> {
        if !matrix.is_square() || matrix.nrows() == 0 {
            return Err(EvalError::Validation(format!(
                "link probability matrix must be square and non-empty, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }
        if let Some(value) = matrix.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(EvalError::Validation(format!(
                "link probability {value} lies outside [0, 1]"
            )));
        }
        if matrix != matrix.transpose() {
            return Err(EvalError::Validation(
                "link probability matrix is not symmetric".to_string(),
            ));
        }
        Ok(Self { matrix })
    }

    pub fn cluster_count(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[(i, j)]
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }
}

/// The base regime, its complement, and the two mixed population matrices.
#[derive(Debug, Clone)]
pub struct PopulationEtas {
    pub base: LinkProbabilityMatrix,
    pub complement: LinkProbabilityMatrix,
    pub population1: LinkProbabilityMatrix,
    pub population2: LinkProbabilityMatrix,
    pub mixing: f64,
}

/// Builds the two population link-probability matrices from a mixing value.
///
/// `mixing` is the doubled alpha in `[0, 1]`: 0 yields `eta_p1 = eta1` and
/// `eta_p2 = 1 - eta1`, 1 yields two identical averaged matrices.
#[derive(Debug, Clone, Copy)]
pub struct LinkProbabilityModel {
    cluster_count: usize,
    mixing: f64,
}

impl LinkProbabilityModel {
    pub fn new(cluster_count: usize, mixing: f64) -> EvalResult<Self> {
        if cluster_count == 0 {
            return Err(EvalError::Configuration(
                "cluster count must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&mixing) {
            return Err(EvalError::Configuration(format!(
                "mixing parameter must be in [0, 1], got {mixing}"
            )));
        }
        Ok(Self {
            cluster_count,
            mixing,
        })
    }

    pub fn cluster_count(&self) -> usize {
        self.cluster_count
    }

    pub fn mixing(&self) -> f64 {
        self.mixing
    }

    /// Draw a base matrix and mix it into the two population matrices.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> EvalResult<PopulationEtas> {
        let base = self.sample_base(rng)?;
        self.mix(&base)
    }

    /// Base regime: off-diagonal entries drawn from a K²-point grid over
    /// `[0, 0.4]`, diagonal fixed at 0.9, strict upper triangle mirrored down.
    pub fn sample_base<R: Rng>(&self, rng: &mut R) -> EvalResult<LinkProbabilityMatrix> {
        let k = self.cluster_count;
        let grid = quantized_grid(k * k);
        let mut draws = DMatrix::zeros(k, k);
        for i in 0..k {
            for j in 0..k {
                draws[(i, j)] = grid[rng.gen_range(0..grid.len())];
            }
        }
        let eta = DMatrix::from_fn(k, k, |i, j| match i.cmp(&j) {
            std::cmp::Ordering::Equal => WITHIN_CLUSTER_DENSITY,
            std::cmp::Ordering::Less => draws[(i, j)],
            std::cmp::Ordering::Greater => draws[(j, i)],
        });
        LinkProbabilityMatrix::new(eta)
    }

    /// Complement the base matrix and blend the two regimes by `mixing / 2`.
    pub fn mix(&self, base: &LinkProbabilityMatrix) -> EvalResult<PopulationEtas> {
        if base.cluster_count() != self.cluster_count {
            return Err(EvalError::ShapeMismatch(format!(
                "base matrix has {} clusters, model expects {}",
                base.cluster_count(),
                self.cluster_count
            )));
        }
        let eta1 = base.as_matrix();
        let eta2 = eta1.map(|v| 1.0 - v);
        let half = self.mixing / 2.0;
        let population1 = eta1 * (1.0 - half) + &eta2 * half;
        let population2 = eta1 * half + &eta2 * (1.0 - half);

        Ok(PopulationEtas {
            base: base.clone(),
            complement: LinkProbabilityMatrix::new(eta2)?,
            population1: LinkProbabilityMatrix::new(population1)?,
            population2: LinkProbabilityMatrix::new(population2)?,
            mixing: self.mixing,
        })
    }
}

fn quantized_grid(points: usize) -> Vec<f64> {
    if points <= 1 {
        return vec![0.0];
    }
    let step = MAX_BETWEEN_CLUSTER_DENSITY / (points - 1) as f64;
    (0..points).map(|i| i as f64 * step).collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::*;

    fn sample(k: usize, mixing: f64, seed: u64) -> PopulationEtas {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        LinkProbabilityModel::new(k, mixing)
            .expect("model")
            .sample(&mut rng)
            .expect("etas")
    }

    #[test]
    fn base_matrix_has_dense_diagonal_and_sparse_off_diagonal() {
        let etas = sample(5, 0.0, 7);
        let base = etas.base.as_matrix();
        for i in 0..5 {
            assert_eq!(base[(i, i)], WITHIN_CLUSTER_DENSITY);
            for j in 0..5 {
                assert_eq!(base[(i, j)], base[(j, i)]);
                if i != j {
                    assert!((0.0..=MAX_BETWEEN_CLUSTER_DENSITY).contains(&base[(i, j)]));
                }
            }
        }
    }

    #[test]
    fn zero_mixing_keeps_regimes_apart() {
        let etas = sample(4, 0.0, 1);
        assert_eq!(etas.population1, etas.base);
        assert_eq!(etas.population2, etas.complement);
    }

    #[test]
    fn full_mixing_makes_populations_identical() {
        let etas = sample(4, 1.0, 3);
        assert_eq!(etas.population1, etas.population2);
        let expected = (etas.base.as_matrix() + etas.complement.as_matrix()) * 0.5;
        assert!((etas.population1.as_matrix() - expected).amax() < 1e-12);
    }

    #[test]
    fn mixing_preserves_population_sum() {
        for mixing in [0.0, 0.2, 0.5, 0.8, 1.0] {
            let etas = sample(3, mixing, 11);
            let sum = etas.population1.as_matrix() + etas.population2.as_matrix();
            assert!(sum.iter().all(|v| (v - 1.0).abs() < 1e-12), "mixing {mixing}");
        }
    }

    #[test]
    fn single_cluster_uses_zero_grid_point() {
        let etas = sample(1, 0.0, 0);
        assert_eq!(etas.base.get(0, 0), WITHIN_CLUSTER_DENSITY);
    }

    #[test]
    fn asymmetric_matrix_is_rejected() {
        let matrix = DMatrix::from_row_slice(2, 2, &[0.9, 0.1, 0.2, 0.9]);
        assert!(matches!(
            LinkProbabilityMatrix::new(matrix),
            Err(EvalError::Validation(_))
        ));
    }

    #[test]
    fn out_of_range_mixing_is_rejected() {
        assert!(LinkProbabilityModel::new(2, 1.5).is_err());
        assert!(LinkProbabilityModel::new(0, 0.5).is_err());
    }
}
