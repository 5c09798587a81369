//! Gradient-based minimizers working on flat parameter vectors.
//!
//! Gradients are approximated by forward finite differences, so the only thing a
//! minimizer needs from the problem is an [`Objective`].

pub mod bfgs;
pub mod cg;
pub mod objective;

use std::fmt;

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use bfgs::Bfgs;
pub use cg::ConjugateGradient;
pub use objective::Objective;

pub trait Optimizer {
    fn name(&self) -> &'static str;

    fn minimize(&self, objective: &mut dyn Objective, x0: Array1<f64>) -> Result<OptimizationResult>;
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// The gradient norm dropped below `gtol`
    Converged,
    MaxIterations,
    /// No step along the search direction decreased the cost
    LineSearchFailed,
    /// The cost or its gradient stopped being finite
    NonFinite,
}

impl fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            OptimizationStatus::Converged => "converged",
            OptimizationStatus::MaxIterations => "maximum number of iterations reached",
            OptimizationStatus::LineSearchFailed => "line search failed",
            OptimizationStatus::NonFinite => "non-finite cost or gradient",
        };
        f.write_str(msg)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OptimizationResult {
    pub x: Array1<f64>,
    pub fun: f64,
    pub iterations: usize,
    pub func_calls: usize,
    pub grad_calls: usize,
    pub status: OptimizationStatus,
}

impl OptimizationResult {
    /// Whether the run ended normally, at convergence or at the iteration limit.
    pub fn success(&self) -> bool {
        matches!(
            self.status,
            OptimizationStatus::Converged | OptimizationStatus::MaxIterations
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Algorithm {
    Bfgs(Bfgs),
    Cg(ConjugateGradient),
}

impl Algorithm {
    pub fn maxiter(&self) -> usize {
        match self {
            Algorithm::Bfgs(optimizer) => optimizer.maxiter,
            Algorithm::Cg(optimizer) => optimizer.maxiter,
        }
    }
}

impl Optimizer for Algorithm {
    fn name(&self) -> &'static str {
        match self {
            Algorithm::Bfgs(optimizer) => optimizer.name(),
            Algorithm::Cg(optimizer) => optimizer.name(),
        }
    }

    fn minimize(&self, objective: &mut dyn Objective, x0: Array1<f64>) -> Result<OptimizationResult> {
        match self {
            Algorithm::Bfgs(optimizer) => optimizer.minimize(objective, x0),
            Algorithm::Cg(optimizer) => optimizer.minimize(objective, x0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TenbilacError;
    use ndarray::{array, ArrayView1};

    struct Rosenbrock {
        iterations: usize,
    }

    impl Objective for Rosenbrock {
        fn cost(&mut self, p: ArrayView1<f64>) -> Result<f64> {
            Ok((1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2))
        }

        fn iteration(&mut self, _p: ArrayView1<f64>) -> Result<()> {
            self.iterations += 1;
            Ok(())
        }
    }

    struct Bowl;

    impl Objective for Bowl {
        fn cost(&mut self, p: ArrayView1<f64>) -> Result<f64> {
            Ok(p.iter()
                .enumerate()
                .map(|(i, x)| (i + 1) as f64 * (x - 0.5).powi(2))
                .sum())
        }

        fn iteration(&mut self, _p: ArrayView1<f64>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_bfgs_rosenbrock() {
        let mut objective = Rosenbrock { iterations: 0 };
        let result = Bfgs::new(500, 1e-4)
            .minimize(&mut objective, array![-1.2, 1.0])
            .unwrap();
        assert!((result.x[0] - 1.0).abs() < 1e-2, "x = {}", result.x);
        assert!((result.x[1] - 1.0).abs() < 2e-2, "x = {}", result.x);
        assert_eq!(objective.iterations, result.iterations);
        assert!(result.func_calls > result.iterations);
    }

    #[test]
    fn test_cg_quadratic() {
        let mut objective = Bowl;
        let result = ConjugateGradient::new(500, 1e-6)
            .minimize(&mut objective, array![3.0, -2.0, 1.0])
            .unwrap();
        assert!(result.fun < 1e-8, "fun = {}", result.fun);
        for x in result.x.iter() {
            assert!((x - 0.5).abs() < 1e-3);
        }
    }

    #[test]
    fn test_maxiter_respected() {
        let mut objective = Rosenbrock { iterations: 0 };
        let algo = Algorithm::Bfgs(Bfgs::new(3, 0.0));
        let result = algo.minimize(&mut objective, array![-1.2, 1.0]).unwrap();
        assert!(result.iterations <= 3);
        assert_eq!(algo.name(), "bfgs");
    }

    #[test]
    fn test_starting_at_minimum_converges_immediately() {
        let mut objective = Bowl;
        let result = Algorithm::Cg(ConjugateGradient::new(10, 1e-4))
            .minimize(&mut objective, array![0.5, 0.5])
            .unwrap();
        assert_eq!(result.status, OptimizationStatus::Converged);
        assert_eq!(result.iterations, 0);
    }

    struct Failing;

    impl Objective for Failing {
        fn cost(&mut self, p: ArrayView1<f64>) -> Result<f64> {
            Ok(p[0] * p[0])
        }

        fn iteration(&mut self, _p: ArrayView1<f64>) -> Result<()> {
            Err(TenbilacError::Io("disk full".to_string()))
        }
    }

    #[test]
    fn test_iteration_error_propagates() {
        let result = Bfgs::new(10, 1e-8).minimize(&mut Failing, array![2.0]);
        assert!(matches!(result, Err(TenbilacError::Io(_))));
    }
}
