#[cfg(feature = "serde0")]
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use na::DVector;
use num_traits::identities::Zero;
use std::fmt;
use std::ops::{Index, Mul, Neg};

/// A dense real vector of fixed dimension.
///
/// Elementwise operations between two vectors are fallible and return
/// [`Error::DimensionMismatch`] when the dimensions differ. Scaling and
/// negation can not fail and are exposed as operators.
#[cfg_attr(feature = "serde0", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    inner: DVector<f64>,
}

impl Vector {
    #[inline]
    pub fn constant(dim: usize, value: f64) -> Self {
        Self {
            inner: DVector::from_element(dim, value),
        }
    }

    #[inline]
    pub fn zeros(dim: usize) -> Self {
        Self::constant(dim, 0.)
    }

    #[inline]
    pub fn ones(dim: usize) -> Self {
        Self::constant(dim, 1.)
    }

    /// creates a new vector of dimension `dim` where element `i` is `f(i)`
    pub fn from_fn<F: FnMut(usize) -> f64>(dim: usize, f: F) -> Self {
        (0..dim).map(f).collect::<Vec<_>>().into()
    }

    /// the number of components
    #[inline]
    pub fn dimension(&self) -> usize {
        self.inner.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.inner.as_slice().get(index).copied()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.inner.as_slice().iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        self.inner.as_slice()
    }

    #[inline]
    pub fn to_vec(&self) -> Vec<f64> {
        self.as_slice().to_vec()
    }

    #[inline]
    pub(crate) fn as_dvector(&self) -> &DVector<f64> {
        &self.inner
    }

    /// the squared euclidean norm
    #[inline]
    pub fn length2(&self) -> f64 {
        self.iter().map(|x| x * x).sum()
    }

    /// the euclidean norm
    #[inline]
    pub fn length(&self) -> f64 {
        self.length2().sqrt()
    }

    /// the largest absolute component.
    ///
    /// This is the maximum norm, the name is kept for its use in the explicit
    /// error estimate.
    pub fn l1(&self) -> f64 {
        self.iter().fold(f64::zero(), |norm, item| {
            let abs = item.abs();
            if abs > norm {
                abs
            } else {
                norm
            }
        })
    }

    /// whether every component is neither infinite nor NaN
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.iter().all(|x| x.is_finite())
    }

    pub fn try_add(&self, other: &Vector) -> Result<Vector> {
        self.zip_with("addition", other, |a, b| a + b)
    }

    pub fn try_sub(&self, other: &Vector) -> Result<Vector> {
        self.zip_with("subtraction", other, |a, b| a - b)
    }

    /// the inner product
    pub fn try_dot(&self, other: &Vector) -> Result<f64> {
        self.check_dimension("dot product", other)?;
        Ok(self.iter().zip(other.iter()).map(|(a, b)| a * b).sum())
    }

    /// `self + factor * other`, the update every stage of a step is built from
    pub fn try_add_scaled(&self, factor: f64, other: &Vector) -> Result<Vector> {
        self.zip_with("addition", other, |a, b| a + factor * b)
    }

    /// sums all vectors, `None` if the iterator is empty
    pub fn try_sum<'a, I>(vectors: I) -> Result<Option<Vector>>
    where
        I: IntoIterator<Item = &'a Vector>,
    {
        let mut iter = vectors.into_iter();
        let mut acc = match iter.next() {
            Some(first) => first.clone(),
            None => return Ok(None),
        };
        for v in iter {
            acc = acc.try_add(v)?;
        }
        Ok(Some(acc))
    }

    #[inline]
    pub fn scale(&self, factor: f64) -> Vector {
        Self {
            inner: self.inner.map(|x| x * factor),
        }
    }

    fn check_dimension(&self, op: &'static str, other: &Vector) -> Result<()> {
        if self.dimension() != other.dimension() {
            return Err(Error::dimension_mismatch(
                op,
                (self.dimension(), 1),
                (other.dimension(), 1),
            ));
        }
        Ok(())
    }

    fn zip_with<F>(&self, op: &'static str, other: &Vector, f: F) -> Result<Vector>
    where
        F: Fn(f64, f64) -> f64,
    {
        self.check_dimension(op, other)?;
        Ok(self
            .iter()
            .zip(other.iter())
            .map(|(a, b)| f(*a, *b))
            .collect::<Vec<_>>()
            .into())
    }
}

impl From<Vec<f64>> for Vector {
    #[inline]
    fn from(v: Vec<f64>) -> Self {
        Self {
            inner: DVector::from_vec(v),
        }
    }
}

impl From<&[f64]> for Vector {
    #[inline]
    fn from(v: &[f64]) -> Self {
        v.to_vec().into()
    }
}

impl From<DVector<f64>> for Vector {
    #[inline]
    fn from(inner: DVector<f64>) -> Self {
        Self { inner }
    }
}

impl From<Vector> for Vec<f64> {
    #[inline]
    fn from(v: Vector) -> Self {
        v.to_vec()
    }
}

impl std::iter::FromIterator<f64> for Vector {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl Index<usize> for Vector {
    type Output = f64;

    #[inline]
    fn index(&self, index: usize) -> &f64 {
        &self.inner[index]
    }
}

impl Mul<f64> for &Vector {
    type Output = Vector;

    #[inline]
    fn mul(self, rhs: f64) -> Vector {
        self.scale(rhs)
    }
}

impl Mul<f64> for Vector {
    type Output = Vector;

    #[inline]
    fn mul(self, rhs: f64) -> Vector {
        self.scale(rhs)
    }
}

impl Mul<&Vector> for f64 {
    type Output = Vector;

    #[inline]
    fn mul(self, rhs: &Vector) -> Vector {
        rhs.scale(self)
    }
}

impl Mul<Vector> for f64 {
    type Output = Vector;

    #[inline]
    fn mul(self, rhs: Vector) -> Vector {
        rhs.scale(self)
    }
}

impl Neg for &Vector {
    type Output = Vector;

    #[inline]
    fn neg(self) -> Vector {
        self.scale(-1.)
    }
}

impl Neg for Vector {
    type Output = Vector;

    #[inline]
    fn neg(self) -> Vector {
        self.scale(-1.)
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        let mut iter = self.iter();
        if let Some(first) = iter.next() {
            write!(f, "{}", first)?;
        }
        for x in iter {
            write!(f, ", {}", x)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn norms() {
        let v = Vector::from(vec![3., -4.]);
        assert_eq!(2, v.dimension());
        assert_relative_eq!(5., v.length());
        assert_relative_eq!(25., v.length2());
        // the maximum absolute component, not the sum
        assert_relative_eq!(4., v.l1());
        assert_eq!(0., Vector::zeros(3).l1());
    }

    #[test]
    fn arithmetic() {
        let v = Vector::from(vec![1., 2., 3.]);
        let w = Vector::from(vec![0.5, -1., 2.]);

        assert_eq!(Vector::from(vec![1.5, 1., 5.]), v.try_add(&w).unwrap());
        assert_eq!(Vector::from(vec![0.5, 3., 1.]), v.try_sub(&w).unwrap());
        assert_eq!(Vector::from(vec![-1., -2., -3.]), -&v);
        assert_eq!(Vector::from(vec![2., 4., 6.]), 2. * &v);
        assert_eq!(Vector::from(vec![2., 0., 7.]), v.try_add_scaled(2., &w).unwrap());
        assert_relative_eq!(4.5, v.try_dot(&w).unwrap());
    }

    #[test]
    fn addition_is_commutative_and_associative() {
        let triples = vec![
            (vec![1., 2.], vec![-3., 0.25], vec![1e-3, 7.]),
            (vec![0.1, 0.2, 0.3], vec![1e8, -1e8, 3.], vec![-0.5, 0.5, 0.]),
            (vec![2.5], vec![-2.5], vec![100.]),
        ];
        for (u, v, w) in triples {
            let (u, v, w) = (Vector::from(u), Vector::from(v), Vector::from(w));
            assert_eq!(u.try_add(&v).unwrap(), v.try_add(&u).unwrap());

            let left = u.try_add(&v).unwrap().try_add(&w).unwrap();
            let right = u.try_add(&v.try_add(&w).unwrap()).unwrap();
            for (a, b) in left.iter().zip(right.iter()) {
                assert_relative_eq!(*a, *b, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn dimension_mismatch() {
        let v = Vector::ones(2);
        let w = Vector::ones(3);
        assert_eq!(
            Err(Error::DimensionMismatch {
                op: "addition",
                left: (2, 1),
                right: (3, 1)
            }),
            v.try_add(&w)
        );
        assert!(v.try_sub(&w).is_err());
        assert!(v.try_dot(&w).is_err());
    }

    #[test]
    fn sum() {
        let vs = vec![Vector::ones(2), Vector::constant(2, 2.), Vector::zeros(2)];
        assert_eq!(Some(Vector::constant(2, 3.)), Vector::try_sum(&vs).unwrap());
        assert_eq!(None, Vector::try_sum(&Vec::<Vector>::new()).unwrap());
    }

    #[test]
    fn display() {
        assert_eq!("[1, 2.5]", Vector::from(vec![1., 2.5]).to_string());
    }
}
