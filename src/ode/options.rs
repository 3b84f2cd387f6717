use crate::error::{ConfigError, Error, Result};
use crate::linalg::{Matrix, Vector};
use derive_builder::Builder;
use num_traits::signum;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_H_INIT: f64 = 1e-6;
pub const DEFAULT_X_START: f64 = 0.;
pub const DEFAULT_X_STOP: f64 = 1.;

/// the RHS of the ODE dy/dx = f(x, y)
pub type OdeFn = Arc<dyn Fn(f64, &Vector) -> Vector + Send + Sync>;

/// the jacobian of the RHS with respect to `y`
pub type JacobianFn = Arc<dyn Fn(f64, &Vector) -> Matrix + Send + Sync>;

/// A validated integration request.
///
/// Built through [`OdeOptionsBuilder`], `build` fails if neither a relative
/// nor an absolute tolerance is set, or if the interval and initial step do
/// not describe a forward integration.
///
/// ```
/// use rkode::ode::options::OdeOptions;
///
/// let opts = OdeOptions::builder()
///     .x_stop(2.)
///     .start_values(vec![1.])
///     .problem(|_, y| -y)
///     .relative_tolerance(1e-6)
///     .build()
///     .unwrap();
/// assert_eq!(2., opts.x_stop());
/// ```
#[derive(Clone, Builder)]
#[builder(
    pattern = "owned",
    build_fn(validate = "Self::validate", error = "Error")
)]
pub struct OdeOptions {
    /// the first step size tried
    #[builder(default = "DEFAULT_H_INIT")]
    h_init: f64,
    #[builder(default = "DEFAULT_X_START")]
    x_start: f64,
    #[builder(default = "DEFAULT_X_STOP")]
    x_stop: f64,
    /// the state at `x_start`
    #[builder(setter(into))]
    start_values: Vector,
    #[builder(setter(custom))]
    problem: OdeFn,
    #[builder(setter(strip_option), default)]
    relative_tolerance: Option<f64>,
    #[builder(setter(strip_option), default)]
    absolute_tolerance: Option<f64>,
    /// not used by the fixed point iteration
    #[builder(setter(custom), default)]
    jacobian: Option<JacobianFn>,
    /// number of stage iterations of the implicit methods, defaults to the
    /// order of the method. The error estimate is the difference of the last
    /// two iterates, so raising the count weakens error control.
    #[builder(setter(strip_option), default)]
    fixed_point_iterations: Option<usize>,
}

impl OdeOptions {
    /// convenience method to create a new builder
    /// same as `OdeOptionsBuilder::default()`
    pub fn builder() -> OdeOptionsBuilder {
        OdeOptionsBuilder::default()
    }

    #[inline]
    pub fn h_init(&self) -> f64 {
        self.h_init
    }

    #[inline]
    pub fn x_start(&self) -> f64 {
        self.x_start
    }

    #[inline]
    pub fn x_stop(&self) -> f64 {
        self.x_stop
    }

    #[inline]
    pub fn start_values(&self) -> &Vector {
        &self.start_values
    }

    #[inline]
    pub fn relative_tolerance(&self) -> Option<f64> {
        self.relative_tolerance
    }

    #[inline]
    pub fn absolute_tolerance(&self) -> Option<f64> {
        self.absolute_tolerance
    }

    #[inline]
    pub fn jacobian(&self) -> Option<&JacobianFn> {
        self.jacobian.as_ref()
    }

    #[inline]
    pub fn fixed_point_iterations(&self) -> Option<usize> {
        self.fixed_point_iterations
    }

    /// evaluates the RHS
    #[inline]
    pub fn eval(&self, x: f64, y: &Vector) -> Vector {
        (self.problem)(x, y)
    }

    /// The tolerance a step ending in `y` has to meet: the absolute tolerance
    /// plus the relative tolerance scaled by the euclidean norm of `y`.
    /// Missing tolerances count as zero.
    #[inline]
    pub fn tolerance(&self, y: &Vector) -> f64 {
        self.absolute_tolerance.unwrap_or(0.) + self.relative_tolerance.unwrap_or(0.) * y.length()
    }

    /// clamps `h` so a step from `xn` never passes `x_stop`
    #[inline]
    pub fn h_cut(&self, h: f64, xn: f64) -> f64 {
        (xn + h).min(self.x_stop) - xn
    }
}

impl OdeOptionsBuilder {
    /// set the problem function
    pub fn problem<F>(mut self, f: F) -> Self
    where
        F: Fn(f64, &Vector) -> Vector + Send + Sync + 'static,
    {
        self.problem = Some(Arc::new(f));
        self
    }

    /// set the jacobian of the problem function
    pub fn jacobian<F>(mut self, jac: F) -> Self
    where
        F: Fn(f64, &Vector) -> Matrix + Send + Sync + 'static,
    {
        self.jacobian = Some(Some(Arc::new(jac)));
        self
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> Result<()> {
            Err(ConfigError::InvalidOption(msg.to_string()).into())
        };

        let rtol = self.relative_tolerance.flatten();
        let atol = self.absolute_tolerance.flatten();
        if rtol.is_none() && atol.is_none() {
            return Err(ConfigError::MissingTolerance.into());
        }
        if rtol.into_iter().chain(atol).any(|tol| !(tol >= 0. && tol.is_finite())) {
            return invalid("tolerances must be finite and not negative");
        }
        if rtol.unwrap_or(0.) == 0. && atol.unwrap_or(0.) == 0. {
            return invalid("at least one tolerance must be positive");
        }

        let x_start = self.x_start.unwrap_or(DEFAULT_X_START);
        let x_stop = self.x_stop.unwrap_or(DEFAULT_X_STOP);
        let h_init = self.h_init.unwrap_or(DEFAULT_H_INIT);
        if !(x_start.is_finite() && x_stop.is_finite()) {
            return invalid("the interval bounds must be finite");
        }
        if x_start == x_stop {
            return Err(ConfigError::ZeroTimeSpan.into());
        }
        if x_stop < x_start {
            return invalid("x_stop must be greater than x_start");
        }
        if !h_init.is_finite() || h_init == 0. || signum(h_init) != signum(x_stop - x_start) {
            return Err(ConfigError::InvalidInitstep.into());
        }

        if let Some(values) = &self.start_values {
            if values.is_empty() {
                return invalid("the start values must not be empty");
            }
        }
        if let Some(Some(iterations)) = self.fixed_point_iterations {
            if iterations < 2 {
                return invalid("at least 2 fixed point iterations are required");
            }
        }
        Ok(())
    }
}

impl fmt::Debug for OdeOptions {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("OdeOptions")
            .field("h_init", &self.h_init)
            .field("x_start", &self.x_start)
            .field("x_stop", &self.x_stop)
            .field("start_values", &self.start_values)
            .field("relative_tolerance", &self.relative_tolerance)
            .field("absolute_tolerance", &self.absolute_tolerance)
            .field("jacobian", &self.jacobian.is_some())
            .field("fixed_point_iterations", &self.fixed_point_iterations)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decay() -> OdeOptionsBuilder {
        OdeOptions::builder()
            .start_values(vec![1.])
            .problem(|_, y| -y)
    }

    #[test]
    fn defaults() {
        let opts = decay().absolute_tolerance(1e-8).build().unwrap();
        assert_eq!(DEFAULT_H_INIT, opts.h_init());
        assert_eq!(0., opts.x_start());
        assert_eq!(1., opts.x_stop());
        assert_eq!(None, opts.relative_tolerance());
        assert_eq!(Some(1e-8), opts.absolute_tolerance());
        assert!(opts.jacobian().is_none());
        assert_eq!(None, opts.fixed_point_iterations());
        assert_eq!(Vector::from(vec![-2.]), opts.eval(0., &Vector::from(vec![2.])));
    }

    #[test]
    fn jacobian() {
        let opts = decay()
            .relative_tolerance(1e-6)
            .jacobian(|_, y| Matrix::identity(y.dimension()).scale(-1.))
            .build()
            .unwrap();
        let jac = opts.jacobian().unwrap();
        assert_eq!(Matrix::identity(1).scale(-1.), jac(0., opts.start_values()));
    }

    #[test]
    fn missing_tolerance() {
        let err = decay().build().unwrap_err();
        assert_eq!(Error::Config(ConfigError::MissingTolerance), err);
        assert!(err.is_config());
    }

    #[test]
    fn missing_fields() {
        let err = OdeOptions::builder()
            .relative_tolerance(1e-6)
            .problem(|_, y| y.clone())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Uninitialized(_))));
    }

    #[test]
    fn invalid_interval_and_step() {
        assert_eq!(
            Error::Config(ConfigError::ZeroTimeSpan),
            decay()
                .relative_tolerance(1e-6)
                .x_start(1.)
                .x_stop(1.)
                .build()
                .unwrap_err()
        );
        assert_eq!(
            Error::Config(ConfigError::InvalidInitstep),
            decay()
                .relative_tolerance(1e-6)
                .h_init(-0.1)
                .build()
                .unwrap_err()
        );
        assert!(decay()
            .relative_tolerance(1e-6)
            .x_start(2.)
            .x_stop(1.)
            .build()
            .is_err());
        assert!(decay().relative_tolerance(-1.).build().is_err());
        assert!(matches!(
            decay().absolute_tolerance(0.).build().unwrap_err(),
            Error::Config(ConfigError::InvalidOption(_))
        ));
        assert!(decay()
            .absolute_tolerance(0.)
            .relative_tolerance(0.)
            .build()
            .is_err());
        assert!(decay()
            .absolute_tolerance(0.)
            .relative_tolerance(1e-6)
            .build()
            .is_ok());
        assert!(decay()
            .relative_tolerance(1e-6)
            .fixed_point_iterations(1)
            .build()
            .is_err());
        assert!(OdeOptions::builder()
            .start_values(Vec::new())
            .problem(|_, y| y.clone())
            .relative_tolerance(1e-6)
            .build()
            .is_err());
    }

    #[test]
    fn combined_tolerance() {
        let y = Vector::from(vec![3., 4.]);
        let both = decay()
            .relative_tolerance(1e-3)
            .absolute_tolerance(1e-2)
            .build()
            .unwrap();
        assert!((both.tolerance(&y) - (1e-2 + 5e-3)).abs() < 1e-15);

        let rel = decay().relative_tolerance(1e-3).build().unwrap();
        assert!((rel.tolerance(&y) - 5e-3).abs() < 1e-15);
    }

    #[test]
    fn h_cut_never_overshoots() {
        let opts = decay().relative_tolerance(1e-6).build().unwrap();
        assert_eq!(0.5, opts.h_cut(0.5, 0.));
        assert_eq!(0.25, opts.h_cut(0.5, 0.75));
        assert_eq!(1., 0.75 + opts.h_cut(10., 0.75));
    }
}
