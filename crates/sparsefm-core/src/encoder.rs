//! One-hot encoding of interaction-tensor entries.

use crate::error::{FmError, Result};
use crate::field::FieldMap;
use crate::sparse::{SparseEntry, SparseVector};

/// Turns per-field raw keys into sparse one-hot feature vectors.
///
/// The encoder is a pure function of its field map and the supplied keys.
///
/// # Examples
///
/// ```
/// use sparsefm_core::encoder::FeatureEncoder;
/// use sparsefm_core::field::FieldMap;
///
/// let encoder = FeatureEncoder::new(FieldMap::new(&[3, 2]).unwrap());
/// let x = encoder.encode(&[2, 1]).unwrap();
/// assert_eq!(x.indices().collect::<Vec<_>>(), vec![2, 4]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureEncoder {
    field_map: FieldMap,
}

impl FeatureEncoder {
    /// Creates an encoder over `field_map`.
    pub fn new(field_map: FieldMap) -> Self {
        Self { field_map }
    }

    /// Creates an encoder directly from per-field cardinalities.
    pub fn from_cardinalities(cardinalities: &[usize]) -> Result<Self> {
        FieldMap::new(cardinalities).map(Self::new)
    }

    /// The field map used for encoding.
    pub fn field_map(&self) -> &FieldMap {
        &self.field_map
    }

    /// Encodes one key per field into a one-hot sparse vector.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::FieldCountMismatch`] if `keys` does not hold one key
    /// per field, and [`FmError::InvalidFieldKey`] if a key is outside its
    /// field's cardinality.
    pub fn encode(&self, keys: &[usize]) -> Result<SparseVector> {
        let num_fields = self.field_map.num_fields();
        if keys.len() != num_fields {
            return Err(FmError::FieldCountMismatch {
                expected: num_fields,
                actual: keys.len(),
            });
        }

        let entries = keys
            .iter()
            .enumerate()
            .map(|(field, &key)| {
                let index = self.field_map.global_index(field, key)?;
                Ok(SparseEntry::new(index, field, 1.0))
            })
            .collect::<Result<Vec<_>>>()?;

        // Field blocks are laid out in field order, so indices are already sorted.
        Ok(SparseVector::from_sorted_unchecked(entries))
    }
}
