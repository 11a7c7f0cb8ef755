//! Parameter store: global bias, linear weights and latent factors.
//!
//! All parameters live in contiguous `Vec<f64>` buffers. The factor matrix
//! has one row per feature; its columns are either `k` shared latent
//! dimensions or, for the field-aware variant, `k` dimensions per
//! counterpart field laid out as `field * k + f`.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::interaction::InteractionKind;

/// Dense row-major matrix of latent factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl FactorMatrix {
    /// Creates a zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Creates a matrix from row-major data.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(ModelError::ShapeMismatch {
                expected: (rows, cols),
                actual: (data.len() / cols.max(1), cols),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        debug_assert!(row < self.rows && col < self.cols, "({row}, {col}) out of bounds");
        self.data[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.rows && col < self.cols, "({row}, {col}) out of bounds");
        self.data[row * self.cols + col] = value;
    }

    #[inline]
    pub fn add(&mut self, row: usize, col: usize, delta: f64) {
        debug_assert!(row < self.rows && col < self.cols, "({row}, {col}) out of bounds");
        self.data[row * self.cols + col] += delta;
    }

    /// One feature's factor row.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Mutable factor row.
    pub fn row_mut(&mut self, row: usize) -> &mut [f64] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Row-major backing buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Mutable row-major backing buffer.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

/// Trainable parameters of a factorization machine.
///
/// # Examples
///
/// ```
/// use sparsefm_model::interaction::InteractionKind;
/// use sparsefm_model::params::ParameterStore;
///
/// let store = ParameterStore::zeros(10, 4, 3, InteractionKind::FieldAware);
/// assert_eq!(store.factors().shape(), (10, 12));
/// assert_eq!(store.factor_column(2, 1), 9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterStore {
    w0: f64,
    w: Vec<f64>,
    v: FactorMatrix,
    num_factors: usize,
    num_fields: usize,
    kind: InteractionKind,
}

impl ParameterStore {
    /// Creates an all-zero store for `num_features` features.
    pub fn zeros(
        num_features: usize,
        num_factors: usize,
        num_fields: usize,
        kind: InteractionKind,
    ) -> Self {
        let cols = match kind {
            InteractionKind::Factorization => num_factors,
            InteractionKind::FieldAware => num_factors * num_fields,
        };
        Self {
            w0: 0.0,
            w: vec![0.0; num_features],
            v: FactorMatrix::zeros(num_features, cols),
            num_factors,
            num_fields,
            kind,
        }
    }

    /// Interaction parameterization of the factor matrix.
    #[inline]
    pub fn kind(&self) -> InteractionKind {
        self.kind
    }

    /// Number of latent dimensions `k`.
    #[inline]
    pub fn num_factors(&self) -> usize {
        self.num_factors
    }

    /// Number of fields the store was shaped for.
    #[inline]
    pub fn num_fields(&self) -> usize {
        self.num_fields
    }

    /// Size `p` of the feature space.
    #[inline]
    pub fn num_features(&self) -> usize {
        self.w.len()
    }

    /// Column of the factor matrix holding latent dimension `f` for use
    /// against a counterpart in `counterpart_field`.
    #[inline]
    pub fn factor_column(&self, counterpart_field: usize, f: usize) -> usize {
        match self.kind {
            InteractionKind::Factorization => f,
            InteractionKind::FieldAware => counterpart_field * self.num_factors + f,
        }
    }

    #[inline]
    pub fn w0(&self) -> f64 {
        self.w0
    }

    #[inline]
    pub fn set_w0(&mut self, value: f64) {
        self.w0 = value;
    }

    #[inline]
    pub fn add_w0(&mut self, delta: f64) {
        self.w0 += delta;
    }

    /// Linear weight of feature `i`.
    #[inline]
    pub fn weight(&self, i: usize) -> f64 {
        self.w[i]
    }

    #[inline]
    pub fn set_weight(&mut self, i: usize, value: f64) {
        self.w[i] = value;
    }

    #[inline]
    pub fn add_weight(&mut self, i: usize, delta: f64) {
        self.w[i] += delta;
    }

    /// All linear weights.
    pub fn weights(&self) -> &[f64] {
        &self.w
    }

    /// Replaces all linear weights.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<()> {
        if weights.len() != self.w.len() {
            return Err(ModelError::ShapeMismatch {
                expected: (self.w.len(), 1),
                actual: (weights.len(), 1),
            });
        }
        self.w.copy_from_slice(weights);
        Ok(())
    }

    /// The factor matrix.
    pub fn factors(&self) -> &FactorMatrix {
        &self.v
    }

    /// Mutable factor matrix.
    pub fn factors_mut(&mut self) -> &mut FactorMatrix {
        &mut self.v
    }

    /// Replaces the factor matrix with row-major `data`.
    pub fn set_factors(&mut self, data: &[f64]) -> Result<()> {
        if data.len() != self.v.as_slice().len() {
            return Err(ModelError::ShapeMismatch {
                expected: self.v.shape(),
                actual: (data.len() / self.v.cols().max(1), self.v.cols()),
            });
        }
        self.v.as_mut_slice().copy_from_slice(data);
        Ok(())
    }

    /// Number of scalar parameters, counting `w0`.
    pub fn len(&self) -> usize {
        1 + self.w.len() + self.v.as_slice().len()
    }

    /// Always false: a store holds at least `w0`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns true if every parameter is finite.
    pub fn is_finite(&self) -> bool {
        self.w0.is_finite()
            && self.w.iter().all(|v| v.is_finite())
            && self.v.as_slice().iter().all(|v| v.is_finite())
    }
}
