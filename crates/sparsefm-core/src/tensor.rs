//! In-memory interaction tensor.
//!
//! The tensor is the materialized training set handed to the trainer: a
//! list of entries, each holding one raw key per dimension (field) plus a
//! real-valued label. Entries are iterated in insertion order.

use serde::{Deserialize, Serialize};

use crate::error::{FmError, Result};

/// One observed interaction: a raw key per field and its label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEntry {
    /// Raw per-field keys, in field order.
    pub keys: Vec<usize>,
    /// Observed value (rating or score).
    pub label: f64,
}

impl InteractionEntry {
    /// Creates a new entry.
    pub fn new(keys: Vec<usize>, label: f64) -> Self {
        Self { keys, label }
    }
}

/// A materialized interaction tensor with known per-dimension cardinalities.
///
/// Keys are not range-checked on insertion; the encoder rejects
/// out-of-range keys when the entry is used.
///
/// # Examples
///
/// ```
/// use sparsefm_core::tensor::InteractionTensor;
///
/// let mut tensor = InteractionTensor::new(vec![2, 3]).unwrap();
/// tensor.push(vec![0, 2], 4.0).unwrap();
/// tensor.push(vec![1, 0], 1.5).unwrap();
/// assert_eq!(tensor.len(), 2);
/// assert_eq!(tensor.num_dimensions(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionTensor {
    dimensions: Vec<usize>,
    entries: Vec<InteractionEntry>,
}

impl InteractionTensor {
    /// Creates an empty tensor with the given per-dimension cardinalities.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::ConfigError`] if no dimensions are given.
    pub fn new(dimensions: Vec<usize>) -> Result<Self> {
        if dimensions.is_empty() {
            return Err(FmError::config("tensor needs at least one dimension"));
        }
        Ok(Self {
            dimensions,
            entries: Vec::new(),
        })
    }

    /// Creates a tensor from existing entries.
    pub fn from_entries(dimensions: Vec<usize>, entries: Vec<InteractionEntry>) -> Result<Self> {
        let mut tensor = Self::new(dimensions)?;
        tensor.entries.reserve(entries.len());
        for entry in entries {
            tensor.push_entry(entry)?;
        }
        Ok(tensor)
    }

    /// Appends an entry.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::FieldCountMismatch`] if `keys` does not hold one key
    /// per dimension.
    pub fn push(&mut self, keys: Vec<usize>, label: f64) -> Result<()> {
        self.push_entry(InteractionEntry::new(keys, label))
    }

    fn push_entry(&mut self, entry: InteractionEntry) -> Result<()> {
        if entry.keys.len() != self.dimensions.len() {
            return Err(FmError::FieldCountMismatch {
                expected: self.dimensions.len(),
                actual: entry.keys.len(),
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Per-dimension cardinalities.
    pub fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    /// Number of dimensions (fields).
    pub fn num_dimensions(&self) -> usize {
        self.dimensions.len()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the tensor holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[InteractionEntry] {
        &self.entries
    }

    /// Iterates over entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, InteractionEntry> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a InteractionTensor {
    type Item = &'a InteractionEntry;
    type IntoIter = std::slice::Iter<'a, InteractionEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
