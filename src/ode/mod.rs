pub mod explicit;
pub mod implicit;
pub mod options;
pub mod runge_kutta;
pub mod solution;
pub mod stepper;
use crate::error::Result;
use crate::ode::options::OdeOptions;
use crate::ode::runge_kutta::ButcherTableau;
use crate::ode::solution::OdeSolution;
use crate::ode::stepper::Stepper;
#[cfg(feature = "serde0")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// The available ODE solvers.
#[cfg_attr(feature = "serde0", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ode {
    /// classic explicit Runge Kutta method of order 4
    Erk4,
    /// diagonally implicit method of order 3
    Dirk3,
    /// implicit Gauss-Legendre method of order 4
    Irk4,
}

impl Ode {
    #[inline]
    pub fn tableau(&self) -> ButcherTableau {
        match self {
            Ode::Erk4 => ButcherTableau::erk4(),
            Ode::Dirk3 => ButcherTableau::dirk3(),
            Ode::Irk4 => ButcherTableau::irk4(),
        }
    }

    /// the integrator for this solver, explicit methods step by doubling,
    /// the others by fixed point iteration
    pub fn stepper(&self, options: OdeOptions) -> Result<Stepper> {
        Stepper::new(self.tableau(), options)
    }

    /// integrates `options` with this solver
    pub fn solve(&self, options: OdeOptions) -> Result<OdeSolution> {
        self.stepper(options)?.integrate()
    }
}

impl std::str::FromStr for Ode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "erk4" => Ok(Ode::Erk4),
            "dirk3" => Ok(Ode::Dirk3),
            "irk4" => Ok(Ode::Irk4),
            _ => Err(format!("{} is not a valid Ode identifier", s)),
        }
    }
}

impl fmt::Display for Ode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Ode::Erk4 => write!(f, "erk4"),
            Ode::Dirk3 => write!(f, "dirk3"),
            Ode::Irk4 => write!(f, "irk4"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::Vector;
    use crate::ode::runge_kutta::RKSymbol;

    #[test]
    fn parse() {
        for ode in &[Ode::Erk4, Ode::Dirk3, Ode::Irk4] {
            assert_eq!(Ok(*ode), ode.to_string().parse::<Ode>());
        }
        assert!("ode45".parse::<Ode>().is_err());
        assert_eq!(&RKSymbol::Dirk3, Ode::Dirk3.tableau().symbol());
    }

    #[test]
    fn solve_with_every_method() {
        for ode in &[Ode::Erk4, Ode::Dirk3, Ode::Irk4] {
            let opts = OdeOptions::builder()
                .start_values(vec![1., 0.])
                .problem(|x, y| Vector::from(vec![-y[0], x]))
                .relative_tolerance(1e-6)
                .absolute_tolerance(1e-6)
                .build()
                .unwrap();
            let sol = ode.solve(opts).unwrap();
            let (x, y) = sol.last().unwrap();
            assert_eq!(1., x);
            assert!((y[0] - (-1f64).exp()).abs() < 1e-4, "{}: {}", ode, y);
            assert!((y[1] - 0.5).abs() < 1e-4, "{}: {}", ode, y);
        }
    }
}
