use crate::error::{ConfigError, OdeError, Result};
use crate::linalg::Vector;
use crate::ode::explicit::Explicit;
use crate::ode::implicit::FixedPoint;
use crate::ode::options::OdeOptions;
use crate::ode::runge_kutta::{ButcherTableau, RKKind};
use crate::ode::solution::{Diagnostics, OdeSolution};
use log::{debug, info, trace, warn};
use std::fmt;
use std::time::Instant;

/// The outcome of one step attempt from `(xn, yn)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    /// the proposed state at `xn + h`
    pub y_next: Vector,
    /// the lower quality estimate the error is measured against
    pub companion: Vector,
    /// the scalar local error estimate
    pub err: f64,
}

impl Attempt {
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.err.is_finite() && self.y_next.is_finite() && self.companion.is_finite()
    }
}

/// How the stages of a single step are computed and how its local error is
/// estimated.
pub trait StageScheme {
    /// the exponent applied to `tol / err` by the step size controller
    fn exponent(&self, tableau: &ButcherTableau) -> f64;

    /// computes a step of size `h` from `(xn, yn)` together with its error
    /// estimate, every evaluation of the RHS goes through `f`
    fn attempt(
        &self,
        tableau: &ButcherTableau,
        f: &mut dyn FnMut(f64, &Vector) -> Vector,
        xn: f64,
        yn: &Vector,
        h: f64,
    ) -> Result<Attempt>;
}

/// The adaptive step size control loop, generic over the stage scheme.
#[derive(Debug, Clone)]
pub struct RungeKutta<S> {
    tableau: ButcherTableau,
    scheme: S,
    options: OdeOptions,
}

impl<S: StageScheme> RungeKutta<S> {
    pub fn new(tableau: ButcherTableau, scheme: S, options: OdeOptions) -> Result<Self> {
        tableau.validate()?;
        Ok(Self {
            tableau,
            scheme,
            options,
        })
    }

    #[inline]
    pub fn tableau(&self) -> &ButcherTableau {
        &self.tableau
    }

    #[inline]
    pub fn scheme(&self) -> &S {
        &self.scheme
    }

    #[inline]
    pub fn options(&self) -> &OdeOptions {
        &self.options
    }

    /// Integrates from `x_start` to `x_stop`.
    ///
    /// A step is accepted if its error estimate does not exceed the
    /// tolerance, either way the next step size is
    /// `h * clamp(h_fac * (tol / err)^e, h_min, h_max)`, cut so no step passes
    /// `x_stop`. Fails with [`OdeError::StepSizePlateau`] once a rejected step
    /// would be retried with the same step size.
    pub fn integrate(&self) -> Result<OdeSolution> {
        let opts = &self.options;
        let tableau = &self.tableau;
        let exponent = self.scheme.exponent(tableau);
        let x_stop = opts.x_stop();

        let start = Instant::now();
        let mut num_eval = 0;
        let mut f = |x: f64, y: &Vector| {
            num_eval += 1;
            opts.eval(x, y)
        };

        let mut xn = opts.x_start();
        let mut yn = opts.start_values().clone();
        let mut h = opts.h_init();
        let mut accepted_steps = 0;
        let mut rejected_steps = 0;

        let mut solution = OdeSolution::default();
        solution.push(xn, yn.clone());

        info!(
            "Integrating {} from {} to {} with h = {}",
            tableau.symbol(),
            xn,
            x_stop,
            h
        );

        while xn < x_stop {
            h = opts.h_cut(h, xn);
            if h <= 0. {
                warn!("No progress possible at x = {} with h = {}", xn, h);
                return Err(OdeError::StepSizePlateau { h, x: xn }.into());
            }

            let attempt = self.scheme.attempt(tableau, &mut f, xn, &yn, h)?;
            if !attempt.is_finite() {
                return Err(OdeError::NonFinite { x: xn, h }.into());
            }

            let tol = opts.tolerance(&attempt.y_next);
            let factor = tableau.step_factor((tol / attempt.err).powf(exponent));
            let h_next = opts.h_cut(h * factor, xn);

            if attempt.err > tol {
                if h_next == h {
                    warn!("Step size plateaued at h = {} (x = {})", h, xn);
                    return Err(OdeError::StepSizePlateau { h, x: xn }.into());
                }
                rejected_steps += 1;
                debug!(
                    "Rejected step at x = {}: err = {:e} > tol = {:e}, retrying with h = {}",
                    xn, attempt.err, tol, h_next
                );
            } else {
                accepted_steps += 1;
                // a step cut to x_stop lands on it exactly
                xn = (xn + h).min(x_stop);
                yn = attempt.y_next;
                trace!("Accepted step to x = {} with h = {}", xn, h);
                solution.push(xn, yn.clone());
            }
            h = h_next;
        }

        solution.diagnostics = Diagnostics {
            num_eval,
            accepted_steps,
            rejected_steps,
        };
        solution.elapsed = start.elapsed();
        info!(
            "Finished after {} accepted and {} rejected steps in {} ms",
            accepted_steps,
            rejected_steps,
            solution.elapsed_millis()
        );
        Ok(solution)
    }
}

impl<S> fmt::Display for RungeKutta<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} {}-stage RK method of order {}",
            self.tableau.kind(),
            self.tableau.nstages(),
            self.tableau.order()
        )?;
        write!(
            f,
            "Integrating from {} to {}, starting value {}",
            self.options.x_start(),
            self.options.x_stop(),
            self.options.start_values()
        )
    }
}

/// An adaptive Runge-Kutta integrator ready to run.
#[derive(Debug, Clone)]
pub enum Stepper {
    /// stages in sequence, error by step doubling
    Explicit(RungeKutta<Explicit>),
    /// stages by fixed point iteration, error from the last two iterates
    Implicit(RungeKutta<FixedPoint>),
}

impl Stepper {
    /// picks the strategy matching the kind of the tableau
    pub fn new(tableau: ButcherTableau, options: OdeOptions) -> Result<Self> {
        match tableau.kind() {
            RKKind::Explicit => Self::explicit(tableau, options),
            _ => Self::implicit(tableau, options),
        }
    }

    /// Fails unless `tableau` describes an explicit method.
    pub fn explicit(tableau: ButcherTableau, options: OdeOptions) -> Result<Self> {
        if tableau.kind() != RKKind::Explicit {
            return Err(ConfigError::InvalidTableau(format!(
                "{} is {}, step doubling needs an explicit method",
                tableau.symbol(),
                tableau.kind()
            ))
            .into());
        }
        Ok(Stepper::Explicit(RungeKutta::new(tableau, Explicit, options)?))
    }

    /// Iterates the stage equations as often as
    /// [`OdeOptions::fixed_point_iterations`] says, by default as often as
    /// the order of the method.
    pub fn implicit(tableau: ButcherTableau, options: OdeOptions) -> Result<Self> {
        let iterations = options
            .fixed_point_iterations()
            .unwrap_or_else(|| tableau.order());
        let scheme = FixedPoint::new(iterations)?;
        Ok(Stepper::Implicit(RungeKutta::new(tableau, scheme, options)?))
    }

    pub fn integrate(&self) -> Result<OdeSolution> {
        match self {
            Stepper::Explicit(rk) => rk.integrate(),
            Stepper::Implicit(rk) => rk.integrate(),
        }
    }

    pub fn tableau(&self) -> &ButcherTableau {
        match self {
            Stepper::Explicit(rk) => rk.tableau(),
            Stepper::Implicit(rk) => rk.tableau(),
        }
    }

    pub fn options(&self) -> &OdeOptions {
        match self {
            Stepper::Explicit(rk) => rk.options(),
            Stepper::Implicit(rk) => rk.options(),
        }
    }
}

impl fmt::Display for Stepper {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Stepper::Explicit(rk) => write!(f, "{}", rk),
            Stepper::Implicit(rk) => write!(f, "{}", rk),
        }
    }
}
