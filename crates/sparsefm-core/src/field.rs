//! Field map for the flattened one-hot feature space.
//!
//! Every field (one dimension of the interaction tensor) owns a contiguous
//! block of global feature indices sized to its cardinality. Blocks are laid
//! out in field order, so the field map is a bijection between
//! `(field, local key)` and a global index in `[0, p)`.
//!
//! # Layout
//!
//! ```text
//! field:        0         1            2
//! cardinality:  3         2            4
//! indices:   [0 1 2] [3 4] [5 6 7 8]          p = 9
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{FmError, Result};
use crate::sparse::SparseVector;

/// Identifier of a field (tensor dimension), in declaration order.
pub type FieldId = usize;

/// Global index into the flattened feature space.
pub type FeatureIndex = usize;

/// Immutable lookup between global feature indices and fields.
///
/// Built once at setup; every query is O(1).
///
/// # Examples
///
/// ```
/// use sparsefm_core::field::FieldMap;
///
/// let map = FieldMap::new(&[3, 2]).unwrap();
/// assert_eq!(map.num_features(), 5);
/// assert_eq!(map.global_index(1, 0).unwrap(), 3);
/// assert_eq!(map.field_of(4), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    cardinalities: Vec<usize>,
    offsets: Vec<usize>,
    field_of: Vec<FieldId>,
}

impl FieldMap {
    /// Builds the field map from per-field cardinalities.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::ConfigError`] if there are no fields or any field
    /// has cardinality zero.
    pub fn new(cardinalities: &[usize]) -> Result<Self> {
        if cardinalities.is_empty() {
            return Err(FmError::config("at least one field is required"));
        }

        let total: usize = cardinalities.iter().sum();
        let mut offsets = Vec::with_capacity(cardinalities.len());
        let mut field_of = Vec::with_capacity(total);
        let mut offset = 0usize;

        for (field, &cardinality) in cardinalities.iter().enumerate() {
            if cardinality == 0 {
                return Err(FmError::config(format!(
                    "field {} has cardinality 0",
                    field
                )));
            }
            offsets.push(offset);
            field_of.extend(std::iter::repeat(field).take(cardinality));
            offset += cardinality;
        }

        Ok(Self {
            cardinalities: cardinalities.to_vec(),
            offsets,
            field_of,
        })
    }

    /// Size `p` of the flattened feature space.
    #[inline]
    pub fn num_features(&self) -> usize {
        self.field_of.len()
    }

    /// Number of fields.
    #[inline]
    pub fn num_fields(&self) -> usize {
        self.cardinalities.len()
    }

    /// Per-field cardinalities in declaration order.
    pub fn cardinalities(&self) -> &[usize] {
        &self.cardinalities
    }

    /// Cardinality of `field`, if it exists.
    pub fn cardinality(&self, field: FieldId) -> Option<usize> {
        self.cardinalities.get(field).copied()
    }

    /// First global index owned by `field`, if it exists.
    pub fn offset(&self, field: FieldId) -> Option<FeatureIndex> {
        self.offsets.get(field).copied()
    }

    /// Field that owns global index `index`.
    #[inline]
    pub fn field_of(&self, index: FeatureIndex) -> Option<FieldId> {
        self.field_of.get(index).copied()
    }

    /// Range of global indices owned by `field`.
    pub fn field_range(&self, field: FieldId) -> Option<Range<FeatureIndex>> {
        let offset = self.offset(field)?;
        Some(offset..offset + self.cardinalities[field])
    }

    /// Maps a `(field, key)` pair to its global feature index.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::UnknownField`] for a field outside the map and
    /// [`FmError::InvalidFieldKey`] for a key outside the field's cardinality.
    pub fn global_index(&self, field: FieldId, key: usize) -> Result<FeatureIndex> {
        let cardinality = self.cardinality(field).ok_or(FmError::UnknownField {
            field,
            num_fields: self.num_fields(),
        })?;
        if key >= cardinality {
            return Err(FmError::InvalidFieldKey {
                field,
                key,
                cardinality,
            });
        }
        Ok(self.offsets[field] + key)
    }

    /// Inverse of [`FieldMap::global_index`].
    pub fn local_key(&self, index: FeatureIndex) -> Option<(FieldId, usize)> {
        let field = self.field_of(index)?;
        Some((field, index - self.offsets[field]))
    }

    /// Checks that every entry of `x` lies inside this map and carries the
    /// field that owns its index.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::FeatureOutOfRange`] or [`FmError::FieldMismatch`]
    /// for the first offending entry.
    pub fn check_vector(&self, x: &SparseVector) -> Result<()> {
        for entry in x {
            match self.field_of(entry.index) {
                None => {
                    return Err(FmError::FeatureOutOfRange {
                        index: entry.index,
                        num_features: self.num_features(),
                    })
                }
                Some(field) if field != entry.field => {
                    return Err(FmError::FieldMismatch {
                        index: entry.index,
                        expected: field,
                        actual: entry.field,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_vector_against_another_map() {
        let map = FieldMap::new(&[2, 2]).unwrap();
        let own = SparseVector::from_pairs(&map, &[(0, 1.0), (3, 1.0)]).unwrap();
        assert!(map.check_vector(&own).is_ok());

        // index 1 is field 1 in [1, 3] but field 0 in [2, 2]
        let other = FieldMap::new(&[1, 3]).unwrap();
        let x = SparseVector::from_pairs(&other, &[(0, 1.0), (1, 1.0)]).unwrap();
        assert_eq!(
            map.check_vector(&x).unwrap_err(),
            FmError::FieldMismatch {
                index: 1,
                expected: 0,
                actual: 1
            }
        );

        let wide = FieldMap::new(&[5, 5]).unwrap();
        let x = SparseVector::from_pairs(&wide, &[(9, 1.0)]).unwrap();
        assert_eq!(
            map.check_vector(&x).unwrap_err(),
            FmError::FeatureOutOfRange {
                index: 9,
                num_features: 4
            }
        );
    }

    #[test]
    fn test_field_ranges_partition_feature_space() {
        let map = FieldMap::new(&[3, 2, 4]).unwrap();
        assert_eq!(map.num_features(), 9);
        assert_eq!(map.num_fields(), 3);

        let mut covered = vec![0usize; map.num_features()];
        for field in 0..map.num_fields() {
            for index in map.field_range(field).unwrap() {
                covered[index] += 1;
                assert_eq!(map.field_of(index), Some(field));
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_global_index_round_trip() {
        let map = FieldMap::new(&[3, 2, 4]).unwrap();
        for field in 0..map.num_fields() {
            for key in 0..map.cardinality(field).unwrap() {
                let index = map.global_index(field, key).unwrap();
                assert_eq!(map.local_key(index), Some((field, key)));
            }
        }
        assert_eq!(map.global_index(2, 0).unwrap(), 5);
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let map = FieldMap::new(&[3, 2]).unwrap();
        assert_eq!(
            map.global_index(1, 2),
            Err(FmError::InvalidFieldKey {
                field: 1,
                key: 2,
                cardinality: 2
            })
        );
        assert!(matches!(
            map.global_index(5, 0),
            Err(FmError::UnknownField { field: 5, .. })
        ));
    }

    #[test]
    fn test_out_of_range_lookups() {
        let map = FieldMap::new(&[2, 2]).unwrap();
        assert_eq!(map.field_of(4), None);
        assert_eq!(map.local_key(4), None);
        assert_eq!(map.field_range(2), None);
    }

    #[test]
    fn test_invalid_construction() {
        assert!(matches!(
            FieldMap::new(&[]),
            Err(FmError::ConfigError { .. })
        ));
        assert!(matches!(
            FieldMap::new(&[3, 0, 1]),
            Err(FmError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_field_map_serialization() {
        let map = FieldMap::new(&[4, 1]).unwrap();
        let json = serde_json::to_string(&map).unwrap();
        let back: FieldMap = serde_json::from_str(&json).unwrap();
        assert_eq!(map, back);
    }
}
