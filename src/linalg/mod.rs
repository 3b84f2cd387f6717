//! The dense linear algebra the stage equations are expressed in.

pub mod matrix;
pub mod vector;

pub use matrix::{LuDecomposition, Matrix};
pub use vector::Vector;
