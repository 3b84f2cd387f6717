use crate::error::Result;
use crate::linalg::Vector;
use crate::ode::runge_kutta::ButcherTableau;
use crate::ode::stepper::{Attempt, StageScheme};

/// Explicit stage computation with a step doubling error estimate.
///
/// Every attempt takes the step `h` from `xn` and, as companion, a step of
/// `2h` from `xn - h`, both starting at `yn`. The local error is the maximum
/// norm of their difference scaled by `1 / (2^(p+1) - 1)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Explicit;

impl Explicit {
    /// a single explicit step of size `h` from `(xn, yn)`
    ///
    /// `k_i = f(xn + c_i h, yn + h sum_{j<i} a_ij k_j)` and
    /// `y_{n+1} = yn + h sum_i b_i k_i`
    pub fn single_step(
        tableau: &ButcherTableau,
        f: &mut dyn FnMut(f64, &Vector) -> Vector,
        xn: f64,
        yn: &Vector,
        h: f64,
    ) -> Result<Vector> {
        let a = tableau.a();
        let c = tableau.c();
        let mut ks: Vec<Vector> = Vec::with_capacity(tableau.nstages());

        for i in 0..tableau.nstages() {
            // need a fresh yn, only the previous stages contribute
            let mut yi = yn.clone();
            for (j, k) in ks.iter().enumerate() {
                yi = yi.try_add_scaled(h * a[(i, j)], k)?;
            }
            ks.push(f(xn + c[i] * h, &yi));
        }

        let mut y_next = yn.clone();
        for (b, k) in tableau.b().iter().zip(&ks) {
            y_next = y_next.try_add_scaled(h * b, k)?;
        }
        Ok(y_next)
    }
}

impl StageScheme for Explicit {
    #[inline]
    fn exponent(&self, tableau: &ButcherTableau) -> f64 {
        1. / (tableau.order() as f64 + 1.)
    }

    fn attempt(
        &self,
        tableau: &ButcherTableau,
        f: &mut dyn FnMut(f64, &Vector) -> Vector,
        xn: f64,
        yn: &Vector,
        h: f64,
    ) -> Result<Attempt> {
        let y_next = Self::single_step(tableau, f, xn, yn, h)?;
        let companion = Self::single_step(tableau, f, xn - h, yn, 2. * h)?;
        let scale = 1. / (2f64.powi(tableau.order() as i32 + 1) - 1.);
        let err = scale * y_next.try_sub(&companion)?.l1();
        Ok(Attempt {
            y_next,
            companion,
            err,
        })
    }
}
