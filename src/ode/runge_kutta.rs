#[cfg(feature = "serde0")]
use serde::{Deserialize, Serialize};
use crate::error::{ConfigError, Result};
use crate::linalg::{Matrix, Vector};
use std::fmt;

/// Lower bound of the factor a step may shrink by in one attempt.
pub const DEFAULT_H_MIN: f64 = 1. / 3.;
/// Upper bound of the factor a step may grow by in one attempt.
pub const DEFAULT_H_MAX: f64 = 6.;
/// Safety damping applied to the optimal step factor.
pub const DEFAULT_H_FAC: f64 = 0.9;

#[cfg_attr(feature = "serde0", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum RKSymbol {
    Erk4,
    Dirk3,
    Irk4,
    Other(String),
}

impl fmt::Display for RKSymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RKSymbol::Erk4 => write!(f, "ERK4"),
            RKSymbol::Dirk3 => write!(f, "DIRK3"),
            RKSymbol::Irk4 => write!(f, "IRK4"),
            RKSymbol::Other(name) => write!(f, "{}", name),
        }
    }
}

/// How the stages of a method couple, read off the shape of `A`.
#[cfg_attr(feature = "serde0", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RKKind {
    /// `A` is strictly lower triangular
    Explicit,
    /// `A` is lower triangular
    DiagonallyImplicit,
    /// `A` is full
    Implicit,
}

impl fmt::Display for RKKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RKKind::Explicit => write!(f, "explicit"),
            RKKind::DiagonallyImplicit => write!(f, "diagonally implicit"),
            RKKind::Implicit => write!(f, "implicit"),
        }
    }
}

/// Tableau of the form
///
/// ```text
///  c1  | a_11   ....   a_1s
///  .   | a_21 .          .
///  .   | a_31     .      .
///  .   | ....         .  .
///  c_s | a_s1  ....... a_ss
/// -----+--------------------
///      | b_1     ...   b_s
/// ```
///
/// together with the order `p` of the method and the bounds the step size
/// controller clamps its factor to: a new step is `h * clamp(h_fac * q,
/// h_min, h_max)` for the optimal factor `q`.
#[derive(Debug, Clone, PartialEq)]
pub struct ButcherTableau {
    /// identifier for the rk method
    symbol: RKSymbol,
    kind: RKKind,
    /// coefficients - rk matrix
    a: Matrix,
    /// weights
    b: Vector,
    /// nodes
    c: Vector,
    /// consistency order
    order: usize,
    h_min: f64,
    h_max: f64,
    h_fac: f64,
}

/// https://en.wikipedia.org/wiki/Runge%E2%80%93Kutta_methods
impl ButcherTableau {
    /// creates a new tableau with the default step factor bounds
    ///
    /// Fails with [`ConfigError::InvalidTableau`] if the coefficients do not
    /// describe a method of the given `kind`.
    pub fn new(
        symbol: RKSymbol,
        kind: RKKind,
        order: usize,
        a: Matrix,
        b: Vector,
        c: Vector,
    ) -> Result<Self> {
        let tableau = Self {
            symbol,
            kind,
            a,
            b,
            c,
            order,
            h_min: DEFAULT_H_MIN,
            h_max: DEFAULT_H_MAX,
            h_fac: DEFAULT_H_FAC,
        };
        tableau.validate()?;
        Ok(tableau)
    }

    /// replaces the bounds of the step size factor
    pub fn with_step_bounds(mut self, h_min: f64, h_max: f64) -> Result<Self> {
        self.h_min = h_min;
        self.h_max = h_max;
        self.validate()?;
        Ok(self)
    }

    /// replaces the safety damping factor
    pub fn with_safety_factor(mut self, h_fac: f64) -> Result<Self> {
        self.h_fac = h_fac;
        self.validate()?;
        Ok(self)
    }

    #[inline]
    pub fn symbol(&self) -> &RKSymbol {
        &self.symbol
    }

    #[inline]
    pub fn kind(&self) -> RKKind {
        self.kind
    }

    #[inline]
    pub fn a(&self) -> &Matrix {
        &self.a
    }

    #[inline]
    pub fn b(&self) -> &Vector {
        &self.b
    }

    #[inline]
    pub fn c(&self) -> &Vector {
        &self.c
    }

    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// the number of stages `s`
    #[inline]
    pub fn nstages(&self) -> usize {
        self.c.dimension()
    }

    #[inline]
    pub fn h_min(&self) -> f64 {
        self.h_min
    }

    #[inline]
    pub fn h_max(&self) -> f64 {
        self.h_max
    }

    #[inline]
    pub fn h_fac(&self) -> f64 {
        self.h_fac
    }

    /// damps the optimal step factor and clamps it to `[h_min, h_max]`
    #[inline]
    pub fn step_factor(&self, optimal: f64) -> f64 {
        self.h_max.min(self.h_min.max(self.h_fac * optimal))
    }

    /// checks whether the rk method is consistent
    /// A Runge–Kutta method is consistent if:
    /// \sum _{j=1}^{s}a_{ij}=c_{i}{\text{ for }}i=1,\ldots ,s.
    pub fn is_consistent_rk(&self) -> bool {
        (0..self.nstages()).all(|i| {
            let row_sum: f64 = self.a.row(i).iter().sum();
            (row_sum - self.c[i]).abs() <= 1e-12
        })
    }

    /// whether `A` is strictly lower triangular
    pub fn is_explicit(&self) -> bool {
        self.upper_triangle_vanishes(0)
    }

    /// whether `A` is lower triangular
    pub fn is_diagonally_implicit(&self) -> bool {
        self.upper_triangle_vanishes(1)
    }

    /// all entries `a_ij` with `j >= i + offset` are zero
    fn upper_triangle_vanishes(&self, offset: usize) -> bool {
        let s = self.nstages();
        (0..s).all(|i| ((i + offset)..s).all(|j| self.a[(i, j)] == 0.))
    }

    /// checks the shape of the coefficients and the controller constants
    pub fn validate(&self) -> Result<()> {
        let invalid =
            |msg: String| -> Result<()> { Err(ConfigError::InvalidTableau(msg).into()) };
        let s = self.c.dimension();

        if s == 0 {
            return invalid("a method needs at least one stage".into());
        }
        if self.a.dimensions() != (s, s) {
            return invalid(format!(
                "A is {:?} but there are {} nodes",
                self.a.dimensions(),
                s
            ));
        }
        if self.b.dimension() != s {
            return invalid(format!(
                "{} weights but there are {} nodes",
                self.b.dimension(),
                s
            ));
        }
        if self.order < 1 {
            return invalid("the order must be at least 1".into());
        }
        match self.kind {
            RKKind::Explicit if !self.is_explicit() => {
                return invalid("A of an explicit method must be strictly lower triangular".into())
            }
            RKKind::DiagonallyImplicit if !self.is_diagonally_implicit() => {
                return invalid("A of a diagonally implicit method must be lower triangular".into())
            }
            _ => {}
        }
        if !(self.h_min > 0. && self.h_min <= self.h_max && self.h_max.is_finite()) {
            return invalid(format!(
                "step bounds must satisfy 0 < h_min <= h_max, got h_min = {}, h_max = {}",
                self.h_min, self.h_max
            ));
        }
        if !(self.h_fac > 0. && self.h_fac < 1.) {
            return invalid(format!("h_fac must lie in (0, 1), got {}", self.h_fac));
        }
        Ok(())
    }
}

impl fmt::Display for ButcherTableau {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for row in 0..self.nstages() {
            write!(f, " {:.3} |", self.c[row])?;
            for col in 0..self.nstages() {
                write!(f, " {:.3}", self.a[(row, col)])?;
            }
            writeln!(f)?;
        }
        write!(f, "-------+")?;
        write!(f, "{}", "------".repeat(self.nstages()))?;
        write!(f, "\n       |")?;
        for b in self.b.iter() {
            write!(f, " {:.3}", b)?;
        }
        Ok(())
    }
}

const ERK4_A: [f64; 16] = [
    0., 0., 0., 0., //
    0.5, 0., 0., 0., //
    0., 0.5, 0., 0., //
    0., 0., 1., 0.,
];
const ERK4_B: [f64; 4] = [1. / 6., 1. / 3., 1. / 3., 1. / 6.];
const ERK4_C: [f64; 4] = [0., 0.5, 0.5, 1.];

impl ButcherTableau {
    /// constructs the Butcher Tableau for the classic Runge Kutta 4 method
    /// ```text
    ///  0.000 | 0.000 0.000 0.000 0.000
    ///  0.500 | 0.500 0.000 0.000 0.000
    ///  0.500 | 0.000 0.500 0.000 0.000
    ///  1.000 | 0.000 0.000 1.000 0.000
    /// -------+------------------------
    ///        | 0.167 0.333 0.333 0.167
    /// ```
    pub fn erk4() -> Self {
        Self {
            symbol: RKSymbol::Erk4,
            kind: RKKind::Explicit,
            a: Matrix::from_fn(4, 4, |i, j| ERK4_A[i * 4 + j]),
            b: Vector::from(&ERK4_B[..]),
            c: Vector::from(&ERK4_C[..]),
            order: 4,
            h_min: DEFAULT_H_MIN,
            h_max: DEFAULT_H_MAX,
            h_fac: DEFAULT_H_FAC,
        }
    }

    /// two stage SDIRK method of order 3 (Crouzeix), `γ = (3 + √3) / 6`
    /// ```text
    ///  0.789 | 0.789 0.000
    ///  0.211 | -0.577 0.789
    /// -------+------------
    ///        | 0.500 0.500
    /// ```
    pub fn dirk3() -> Self {
        let gamma = (3. + 3f64.sqrt()) / 6.;
        Self {
            symbol: RKSymbol::Dirk3,
            kind: RKKind::DiagonallyImplicit,
            a: Matrix::from_fn(2, 2, |i, j| match (i, j) {
                (0, 0) | (1, 1) => gamma,
                (1, 0) => 1. - 2. * gamma,
                _ => 0.,
            }),
            b: Vector::constant(2, 0.5),
            c: Vector::from(vec![gamma, 1. - gamma]),
            order: 3,
            h_min: DEFAULT_H_MIN,
            h_max: DEFAULT_H_MAX,
            h_fac: DEFAULT_H_FAC,
        }
    }

    /// two stage Gauss-Legendre method of order 4
    /// ```text
    ///  0.211 | 0.250 -0.039
    ///  0.789 | 0.539 0.250
    /// -------+------------
    ///        | 0.500 0.500
    /// ```
    pub fn irk4() -> Self {
        let d = 3f64.sqrt() / 6.;
        Self {
            symbol: RKSymbol::Irk4,
            kind: RKKind::Implicit,
            a: Matrix::from_fn(2, 2, |i, j| match (i, j) {
                (0, 1) => 0.25 - d,
                (1, 0) => 0.25 + d,
                _ => 0.25,
            }),
            b: Vector::constant(2, 0.5),
            c: Vector::from(vec![0.5 - d, 0.5 + d]),
            order: 4,
            h_min: DEFAULT_H_MIN,
            h_max: DEFAULT_H_MAX,
            h_fac: DEFAULT_H_FAC,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use approx::assert_relative_eq;

    #[test]
    fn builtin_tableaus_are_valid() {
        for tableau in &[
            ButcherTableau::erk4(),
            ButcherTableau::dirk3(),
            ButcherTableau::irk4(),
        ] {
            tableau.validate().unwrap();
            assert!(tableau.is_consistent_rk(), "{}", tableau);
            let weights: f64 = tableau.b().iter().sum();
            assert_relative_eq!(1., weights, max_relative = 1e-12);
        }
    }

    #[test]
    fn kinds() {
        assert!(ButcherTableau::erk4().is_explicit());
        assert!(!ButcherTableau::dirk3().is_explicit());
        assert!(ButcherTableau::dirk3().is_diagonally_implicit());
        assert!(!ButcherTableau::irk4().is_diagonally_implicit());
        assert_eq!(4, ButcherTableau::erk4().nstages());
        assert_eq!(2, ButcherTableau::irk4().nstages());
        assert_eq!(3, ButcherTableau::dirk3().order());
    }

    #[test]
    fn step_factor_is_clamped() {
        let tableau = ButcherTableau::erk4();
        assert_relative_eq!(DEFAULT_H_MIN, tableau.step_factor(1e-6));
        assert_relative_eq!(DEFAULT_H_MAX, tableau.step_factor(1e6));
        assert_relative_eq!(0.9, tableau.step_factor(1.));
        assert_relative_eq!(DEFAULT_H_MAX, tableau.step_factor(f64::INFINITY));
    }

    #[test]
    fn rejects_malformed_tableaus() {
        let full = Matrix::from_fn(2, 2, |_, _| 0.25);
        let b = Vector::constant(2, 0.5);
        let c = Vector::constant(2, 0.5);

        let not_explicit = ButcherTableau::new(
            RKSymbol::Other("bad".into()),
            RKKind::Explicit,
            2,
            full.clone(),
            b.clone(),
            c.clone(),
        );
        assert!(matches!(
            not_explicit,
            Err(Error::Config(ConfigError::InvalidTableau(_)))
        ));

        let wrong_weights = ButcherTableau::new(
            RKSymbol::Other("bad".into()),
            RKKind::Implicit,
            2,
            full.clone(),
            Vector::ones(3),
            c.clone(),
        );
        assert!(wrong_weights.is_err());

        let zero_order = ButcherTableau::new(
            RKSymbol::Other("bad".into()),
            RKKind::Implicit,
            0,
            full,
            b,
            c,
        );
        assert!(zero_order.is_err());
    }

    #[test]
    fn rejects_bad_controller_constants() {
        assert!(ButcherTableau::erk4().with_step_bounds(2., 1.).is_err());
        assert!(ButcherTableau::erk4().with_step_bounds(0., 1.).is_err());
        assert!(ButcherTableau::erk4().with_safety_factor(1.).is_err());
        let fixed = ButcherTableau::erk4().with_step_bounds(1., 1.).unwrap();
        assert_eq!(1., fixed.step_factor(1e-9));
    }

    #[test]
    fn display() {
        let s = ButcherTableau::erk4().to_string();
        assert!(s.starts_with(" 0.000 | 0.000 0.000 0.000 0.000"));
        assert!(s.ends_with("| 0.167 0.333 0.333 0.167"));
    }
}
