//! Adaptive step size Runge-Kutta integration of initial value problems
//! `dy/dx = f(x, y)`, `y(x_start) = y_0`.
//!
//! ```
//! use rkode::{Ode, OdeOptions};
//!
//! let opts = OdeOptions::builder()
//!     .x_stop(std::f64::consts::LN_2)
//!     .start_values(vec![1.])
//!     .problem(|_, y| -y)
//!     .relative_tolerance(1e-8)
//!     .build()
//!     .unwrap();
//! let sol = rkode::solve(Ode::Irk4, opts).unwrap();
//! let (_, y) = sol.last().unwrap();
//! assert!((y[0] - 0.5).abs() < 1e-6);
//! ```

extern crate nalgebra as na;

pub mod error;
pub mod linalg;
pub mod ode;

pub use crate::error::{ConfigError, Error, OdeError, Result};
pub use crate::linalg::{Matrix, Vector};
pub use crate::ode::options::OdeOptions;
pub use crate::ode::runge_kutta::ButcherTableau;
pub use crate::ode::solution::OdeSolution;
pub use crate::ode::stepper::Stepper;
pub use crate::ode::Ode;

/// Integrates the problem described by `options` with the solver `ode`.
pub fn solve(ode: Ode, options: OdeOptions) -> Result<OdeSolution> {
    ode.solve(options)
}
