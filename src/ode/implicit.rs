use crate::error::{ConfigError, Result};
use crate::linalg::{Matrix, Vector};
use crate::ode::runge_kutta::ButcherTableau;
use crate::ode::stepper::{Attempt, StageScheme};

/// Solves the implicit stage equations by fixed point iteration.
///
/// The stage derivatives are kept as the rows of an `s x n` matrix `K`.
/// Starting from `K_0` with rows `f(xn + c_j h, yn)` every pass computes
///
/// `K_i = f(xn + c h, Y_n + h A K_{i-1})`
///
/// row by row, where `Y_n` repeats `yn` in every row. The last pass weighs
/// into the new state, the one before into the companion estimate.
///
/// The estimate measures how far the iteration has converged, not the
/// truncation error of the method. Every additional pass shrinks it, so
/// raising the iteration count lets the controller accept larger steps and
/// weakens error control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedPoint {
    /// the number of stage matrices `K_0 ... K_{m-1}` computed per attempt
    iterations: usize,
}

impl FixedPoint {
    /// at least two iterations are required for an error estimate
    pub fn new(iterations: usize) -> Result<Self> {
        if iterations < 2 {
            return Err(ConfigError::InvalidOption(format!(
                "at least 2 fixed point iterations are required, got {}",
                iterations
            ))
            .into());
        }
        Ok(Self { iterations })
    }

    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// `yn + h K^T b`
    fn weigh(tableau: &ButcherTableau, k: &Matrix, yn: &Vector, h: f64) -> Result<Vector> {
        let increment = k.transpose().try_mul_vector(tableau.b())?;
        yn.try_add_scaled(h, &increment)
    }
}

impl StageScheme for FixedPoint {
    #[inline]
    fn exponent(&self, tableau: &ButcherTableau) -> f64 {
        1. / tableau.order() as f64
    }

    fn attempt(
        &self,
        tableau: &ButcherTableau,
        f: &mut dyn FnMut(f64, &Vector) -> Vector,
        xn: f64,
        yn: &Vector,
        h: f64,
    ) -> Result<Attempt> {
        let s = tableau.nstages();
        let c = tableau.c();
        let ha = tableau.a().scale(h);
        let base = Matrix::repeat_row(s, yn);

        let mut current = Matrix::from_rows(s, yn.dimension(), |j| f(xn + c[j] * h, yn))?;
        let mut previous = current.clone();
        for _ in 1..self.iterations {
            let stages = base.try_add(&ha.try_mul(&current)?)?;
            let next = stages.apply_by_row(|j, y| f(xn + c[j] * h, y))?;
            previous = std::mem::replace(&mut current, next);
        }

        let y_next = Self::weigh(tableau, &current, yn, h)?;
        let companion = Self::weigh(tableau, &previous, yn, h)?;
        let err = y_next.try_sub(&companion)?.length();
        Ok(Attempt {
            y_next,
            companion,
            err,
        })
    }
}
