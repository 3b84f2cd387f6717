#[cfg(feature = "serde0")]
use serde::{Deserialize, Serialize};
use crate::linalg::Vector;
use std::fmt;
use std::time::Duration;

/// Trajectories longer than this are thinned out before plotting.
pub const PLOT_THRESHOLD: usize = 100_000;
/// Every `PLOT_STRIDE`th point is kept of a thinned out trajectory.
pub const PLOT_STRIDE: usize = 1000;

/// pairs the independent variable with the corresponding calculated value
#[cfg_attr(feature = "serde0", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionPoint {
    pub x: f64,
    pub y: Vector,
}

impl SolutionPoint {
    #[inline]
    pub fn new(x: f64, y: Vector) -> Self {
        Self { x, y }
    }
}

/// Contains some diagnostics of the integration.
#[cfg_attr(feature = "serde0", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub num_eval: usize,
    pub accepted_steps: usize,
    pub rejected_steps: usize,
}

impl Diagnostics {
    /// every step attempt, accepted or not
    #[inline]
    pub fn attempts(&self) -> usize {
        self.accepted_steps + self.rejected_steps
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Number of function evaluations: {}", self.num_eval)?;
        writeln!(f, "Number of accepted steps: {}", self.accepted_steps)?;
        write!(f, "Number of rejected steps: {}", self.rejected_steps)
    }
}

/// The accepted trajectory of an integration.
///
/// `tout` is strictly increasing, starts at `x_start` and ends exactly at
/// `x_stop`. `yout[i]` is the state at `tout[i]`.
#[cfg_attr(feature = "serde0", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct OdeSolution {
    /// points at which solutions were obtained
    pub tout: Vec<f64>,
    /// solutions at `tout`
    pub yout: Vec<Vector>,
    pub diagnostics: Diagnostics,
    /// wall clock time spent integrating
    pub elapsed: Duration,
}

impl OdeSolution {
    /// the number of points on the trajectory
    #[inline]
    pub fn len(&self) -> usize {
        self.tout.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tout.is_empty()
    }

    #[inline]
    pub fn accepted_steps(&self) -> usize {
        self.diagnostics.accepted_steps
    }

    #[inline]
    pub fn rejected_steps(&self) -> usize {
        self.diagnostics.rejected_steps
    }

    #[inline]
    pub fn elapsed_millis(&self) -> u128 {
        self.elapsed.as_millis()
    }

    /// all points in ascending order of `x`
    pub fn points(&self) -> impl Iterator<Item = (f64, &Vector)> + '_ {
        self.tout.iter().copied().zip(self.yout.iter())
    }

    #[inline]
    pub fn first(&self) -> Option<(f64, &Vector)> {
        self.points().next()
    }

    #[inline]
    pub fn last(&self) -> Option<(f64, &Vector)> {
        Some((*self.tout.last()?, self.yout.last()?))
    }

    /// every `rate`th point, starting with the first one
    pub fn sample(&self, rate: usize) -> impl Iterator<Item = (f64, &Vector)> + '_ {
        self.points().step_by(rate.max(1))
    }

    /// The points handed to a plot: all of them, or every
    /// [`PLOT_STRIDE`]th one once the trajectory exceeds [`PLOT_THRESHOLD`].
    pub fn plot_points(&self) -> impl Iterator<Item = (f64, &Vector)> + '_ {
        let rate = if self.len() > PLOT_THRESHOLD {
            PLOT_STRIDE
        } else {
            1
        };
        self.sample(rate)
    }

    /// splits the plotted points into one `(x, y_i)` series per component
    pub fn component_series(&self) -> Vec<Vec<(f64, f64)>> {
        let dim = self.yout.first().map_or(0, Vector::dimension);
        let mut series = vec![Vec::new(); dim];
        for (x, y) in self.plot_points() {
            for (s, yi) in series.iter_mut().zip(y.iter()) {
                s.push((x, *yi));
            }
        }
        series
    }

    /// pair each point with the corresponding output
    #[inline]
    pub fn zipped(self) -> Vec<SolutionPoint> {
        self.tout
            .into_iter()
            .zip(self.yout)
            .map(|(x, y)| SolutionPoint::new(x, y))
            .collect()
    }

    pub(crate) fn push(&mut self, x: f64, y: Vector) {
        self.tout.push(x);
        self.yout.push(y);
    }
}

impl fmt::Display for OdeSolution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "(")?;

        fn slice_print<T: fmt::Display>(f: &mut fmt::Formatter, items: &[T]) -> fmt::Result {
            write!(f, "[")?;
            let mut i = 0;
            while i < items.len() {
                if i == items.len() - 1 {
                    write!(f, "{}", items[i])?;
                } else {
                    write!(f, "{}, ", items[i])?;
                }
                if i > 8 && i + 10 < items.len() {
                    write!(f, "... ")?;
                    i = items.len() - 11;
                }
                i += 1;
            }
            write!(f, "]")
        }

        slice_print(f, &self.tout)?;
        write!(f, ", Vec{{{}}}", self.yout.len())?;
        slice_print(f, &self.yout)?;

        write!(f, ")")
    }
}
