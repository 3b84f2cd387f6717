#[cfg(feature = "serde0")]
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::linalg::Vector;
use na::DMatrix;
use std::fmt;
use std::ops::{Index, Mul};

/// Pivots with a magnitude at or below this value are treated as zero.
pub const PIVOT_TOLERANCE: f64 = 1e-40;

/// A dense real matrix with a fixed number of rows and columns.
#[cfg_attr(feature = "serde0", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    inner: DMatrix<f64>,
}

impl Matrix {
    #[inline]
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            inner: DMatrix::zeros(nrows, ncols),
        }
    }

    #[inline]
    pub fn identity(dim: usize) -> Self {
        Self {
            inner: DMatrix::identity(dim, dim),
        }
    }

    /// creates a new matrix where element `(i, j)` is `f(i, j)`
    #[inline]
    pub fn from_fn<F: FnMut(usize, usize) -> f64>(nrows: usize, ncols: usize, f: F) -> Self {
        Self {
            inner: DMatrix::from_fn(nrows, ncols, f),
        }
    }

    /// creates a new matrix from its elements in row-major order
    pub fn from_row_slice(nrows: usize, ncols: usize, data: &[f64]) -> Result<Self> {
        if nrows * ncols != data.len() {
            return Err(Error::dimension_mismatch(
                "matrix construction",
                (nrows, ncols),
                (data.len(), 1),
            ));
        }
        Ok(Self {
            inner: DMatrix::from_row_slice(nrows, ncols, data),
        })
    }

    /// stacks `nrows` vectors of dimension `ncols`, row `i` is `f(i)`
    pub fn from_rows<F>(nrows: usize, ncols: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize) -> Vector,
    {
        let rows = (0..nrows).map(&mut f).collect::<Vec<_>>();
        Self::stack(ncols, rows)
    }

    /// a matrix with `nrows` copies of `row`
    pub fn repeat_row(nrows: usize, row: &Vector) -> Self {
        Self::from_fn(nrows, row.dimension(), |_, j| row[j])
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.inner.nrows()
    }

    #[inline]
    pub fn ncols(&self) -> usize {
        self.inner.ncols()
    }

    /// `(rows, columns)`
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    #[inline]
    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.nrows() && j < self.ncols() {
            Some(self.inner[(i, j)])
        } else {
            None
        }
    }

    /// the `i`th row as vector
    pub fn row(&self, i: usize) -> Vector {
        Vector::from_fn(self.ncols(), |j| self.inner[(i, j)])
    }

    /// all rows, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = Vector> + '_ {
        (0..self.nrows()).map(move |i| self.row(i))
    }

    #[inline]
    pub fn transpose(&self) -> Matrix {
        Self {
            inner: self.inner.transpose(),
        }
    }

    #[inline]
    pub fn scale(&self, factor: f64) -> Matrix {
        Self {
            inner: self.inner.map(|x| x * factor),
        }
    }

    pub fn try_add(&self, other: &Matrix) -> Result<Matrix> {
        self.check_same_shape("addition", other)?;
        Ok(Self {
            inner: &self.inner + &other.inner,
        })
    }

    pub fn try_sub(&self, other: &Matrix) -> Result<Matrix> {
        self.check_same_shape("subtraction", other)?;
        Ok(Self {
            inner: &self.inner - &other.inner,
        })
    }

    /// the matrix product `self * other`
    pub fn try_mul(&self, other: &Matrix) -> Result<Matrix> {
        if self.ncols() != other.nrows() {
            return Err(Error::dimension_mismatch(
                "multiplication",
                self.dimensions(),
                other.dimensions(),
            ));
        }
        Ok(Self {
            inner: &self.inner * &other.inner,
        })
    }

    /// the matrix-vector product `self * v`
    pub fn try_mul_vector(&self, v: &Vector) -> Result<Vector> {
        if self.ncols() != v.dimension() {
            return Err(Error::dimension_mismatch(
                "multiplication",
                self.dimensions(),
                (v.dimension(), 1),
            ));
        }
        Ok((&self.inner * v.as_dvector()).into())
    }

    /// Maps every row, viewed as a vector, through `f` and reassembles the
    /// results into a matrix of the same shape.
    ///
    /// `f` receives the row index along with the row and must return a vector
    /// of length `ncols`.
    pub fn apply_by_row<F>(&self, mut f: F) -> Result<Matrix>
    where
        F: FnMut(usize, &Vector) -> Vector,
    {
        let rows = self
            .rows()
            .enumerate()
            .map(|(i, row)| f(i, &row))
            .collect::<Vec<_>>();
        Self::stack(self.ncols(), rows)
    }

    /// Solves `self * x = b` by LU decomposition with partial pivoting.
    pub fn solve(&self, b: &Vector) -> Result<Vector> {
        if self.nrows() != b.dimension() {
            return Err(Error::dimension_mismatch(
                "linear solve",
                self.dimensions(),
                (b.dimension(), 1),
            ));
        }
        self.lu()?.solve(b)
    }

    /// the LU decomposition with partial pivoting, `P * self = L * U`
    pub fn lu(&self) -> Result<LuDecomposition> {
        LuDecomposition::new(self)
    }

    fn stack(ncols: usize, rows: Vec<Vector>) -> Result<Matrix> {
        if let Some(row) = rows.iter().find(|row| row.dimension() != ncols) {
            return Err(Error::dimension_mismatch(
                "row assembly",
                (rows.len(), ncols),
                (row.dimension(), 1),
            ));
        }
        Ok(Self::from_fn(rows.len(), ncols, |i, j| rows[i][j]))
    }

    fn check_same_shape(&self, op: &'static str, other: &Matrix) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(Error::dimension_mismatch(
                op,
                self.dimensions(),
                other.dimensions(),
            ));
        }
        Ok(())
    }
}

/// Packed `L` and `U` factors together with the row permutation.
///
/// `L` has an implicit unit diagonal and is stored below the diagonal of
/// `lu`, `U` is stored on and above it. Row `i` of the factored matrix is row
/// `permutation[i]` of the original.
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    lu: DMatrix<f64>,
    permutation: Vec<usize>,
}

impl LuDecomposition {
    fn new(m: &Matrix) -> Result<Self> {
        if !m.is_square() {
            return Err(Error::dimension_mismatch(
                "LU decomposition",
                m.dimensions(),
                (m.ncols(), m.nrows()),
            ));
        }
        let n = m.nrows();
        let mut lu = m.inner.clone();
        let mut permutation = (0..n).collect::<Vec<_>>();

        for i in 0..n {
            let mut max = 0.;
            let mut imax = i;
            for k in i..n {
                let abs = lu[(k, i)].abs();
                if abs > max {
                    max = abs;
                    imax = k;
                }
            }
            if max <= PIVOT_TOLERANCE {
                return Err(Error::SingularMatrix { pivot: max });
            }
            if imax != i {
                permutation.swap(i, imax);
                lu.swap_rows(i, imax);
            }
            let pivot = lu[(i, i)];
            for j in (i + 1)..n {
                lu[(j, i)] /= pivot;
                let factor = lu[(j, i)];
                for k in (i + 1)..n {
                    lu[(j, k)] -= factor * lu[(i, k)];
                }
            }
        }

        Ok(Self { lu, permutation })
    }

    #[inline]
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    pub fn solve(&self, b: &Vector) -> Result<Vector> {
        let n = self.permutation.len();
        if n != b.dimension() {
            return Err(Error::dimension_mismatch(
                "linear solve",
                (n, n),
                (b.dimension(), 1),
            ));
        }
        let lu = &self.lu;
        let mut x = self.permutation.iter().map(|&p| b[p]).collect::<Vec<_>>();

        // forward substitution with the unit lower triangle
        for i in 0..n {
            for k in 0..i {
                x[i] -= lu[(i, k)] * x[k];
            }
        }
        // back substitution with the upper triangle
        for i in (0..n).rev() {
            for k in (i + 1)..n {
                x[i] -= lu[(i, k)] * x[k];
            }
            x[i] /= lu[(i, i)];
        }

        Ok(x.into())
    }
}

impl From<DMatrix<f64>> for Matrix {
    #[inline]
    fn from(inner: DMatrix<f64>) -> Self {
        Self { inner }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, index: (usize, usize)) -> &f64 {
        &self.inner[index]
    }
}

impl Mul<&Matrix> for f64 {
    type Output = Matrix;

    #[inline]
    fn mul(self, rhs: &Matrix) -> Matrix {
        rhs.scale(self)
    }
}

impl Mul<f64> for &Matrix {
    type Output = Matrix;

    #[inline]
    fn mul(self, rhs: f64) -> Matrix {
        self.scale(rhs)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.nrows() {
            if i > 0 {
                write!(f, "\n ")?;
            }
            write!(f, "[")?;
            for j in 0..self.ncols() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{:e}", self.inner[(i, j)])?;
            }
            write!(f, "]")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn m(nrows: usize, ncols: usize, data: &[f64]) -> Matrix {
        Matrix::from_row_slice(nrows, ncols, data).unwrap()
    }

    fn assert_matrix_eq(expected: &Matrix, actual: &Matrix) {
        assert_eq!(expected.dimensions(), actual.dimensions());
        for i in 0..expected.nrows() {
            for j in 0..expected.ncols() {
                assert_relative_eq!(expected[(i, j)], actual[(i, j)], max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn construction() {
        let a = m(2, 3, &[1., 2., 3., 4., 5., 6.]);
        assert_eq!((2, 3), a.dimensions());
        assert_eq!(6., a[(1, 2)]);
        assert_eq!(Vector::from(vec![4., 5., 6.]), a.row(1));
        assert!(Matrix::from_row_slice(2, 2, &[1., 2., 3.]).is_err());

        let r = Matrix::repeat_row(3, &Vector::from(vec![1., -1.]));
        assert_eq!(m(3, 2, &[1., -1., 1., -1., 1., -1.]), r);
    }

    #[test]
    fn arithmetic() {
        let a = m(2, 2, &[1., 2., 3., 4.]);
        let b = m(2, 2, &[0.5, 0., -1., 2.]);
        assert_eq!(m(2, 2, &[1.5, 2., 2., 6.]), a.try_add(&b).unwrap());
        assert_eq!(m(2, 2, &[0.5, 2., 4., 2.]), a.try_sub(&b).unwrap());
        assert_eq!(m(2, 2, &[-1.5, 4., -2.5, 8.]), a.try_mul(&b).unwrap());
        assert_eq!(m(2, 2, &[2., 4., 6., 8.]), 2. * &a);
        assert_eq!(
            Vector::from(vec![5., 11.]),
            a.try_mul_vector(&Vector::from(vec![1., 2.])).unwrap()
        );
    }

    #[test]
    fn shape_checks() {
        let a = m(2, 3, &[1., 2., 3., 4., 5., 6.]);
        let b = m(2, 2, &[1., 2., 3., 4.]);
        assert!(a.try_add(&b).is_err());
        assert!(a.try_sub(&b).is_err());
        assert_eq!(
            Err(Error::DimensionMismatch {
                op: "multiplication",
                left: (2, 3),
                right: (2, 2)
            }),
            a.try_mul(&b)
        );
        assert_eq!((2, 3), b.try_mul(&a).unwrap().dimensions());
        assert!(a.try_mul_vector(&Vector::ones(2)).is_err());
    }

    #[test]
    fn multiplication_is_associative() {
        let a = m(2, 3, &[1., -2., 0.5, 3., 0., 1.]);
        let b = m(3, 2, &[2., 1., 0., -1., 4., 0.25]);
        let c = m(2, 4, &[1., 0., 2., -3., 0.5, 1., 1., 1.]);

        let left = a.try_mul(&b).unwrap().try_mul(&c).unwrap();
        let right = a.try_mul(&b.try_mul(&c).unwrap()).unwrap();
        assert_matrix_eq(&left, &right);
    }

    #[test]
    fn transpose_twice_is_identity() {
        let a = m(2, 3, &[1., 2., 3., 4., 5., 6.]);
        let t = a.transpose();
        assert_eq!((3, 2), t.dimensions());
        assert_eq!(a[(0, 2)], t[(2, 0)]);
        assert_eq!(a, t.transpose());
    }

    #[test]
    fn apply_by_row() {
        let a = m(2, 2, &[1., 2., 3., 4.]);
        let mapped = a
            .apply_by_row(|i, row| row.scale((i + 1) as f64))
            .unwrap();
        assert_eq!(m(2, 2, &[1., 2., 6., 8.]), mapped);

        let err = a.apply_by_row(|_, row| Vector::from(vec![row[0]]));
        assert!(matches!(err, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn solve() {
        let a = m(3, 3, &[2., 1., -1., -3., -1., 2., -2., 1., 2.]);
        let b = Vector::from(vec![8., -11., -3.]);
        let x = a.solve(&b).unwrap();
        assert_relative_eq!(2., x[0], max_relative = 1e-12);
        assert_relative_eq!(3., x[1], max_relative = 1e-12);
        assert_relative_eq!(-1., x[2], max_relative = 1e-12);
    }

    #[test]
    fn solve_needs_pivoting() {
        // the leading entry is zero, elimination without row swaps fails
        let a = m(2, 2, &[0., 1., 1., 1.]);
        let lu = a.lu().unwrap();
        assert_eq!(&[1, 0], lu.permutation());
        let x = lu.solve(&Vector::from(vec![2., 3.])).unwrap();
        assert_relative_eq!(1., x[0]);
        assert_relative_eq!(2., x[1]);
    }

    #[test]
    fn singular() {
        let a = m(2, 2, &[1., 2., 2., 4.]);
        assert!(matches!(
            a.solve(&Vector::ones(2)),
            Err(Error::SingularMatrix { .. })
        ));
        assert!(matches!(
            Matrix::zeros(3, 3).lu(),
            Err(Error::SingularMatrix { pivot }) if pivot == 0.
        ));
        assert!(m(2, 3, &[1., 2., 3., 4., 5., 6.]).lu().is_err());
    }
}
