//! Sparse feature vectors over the flattened feature space.

use serde::{Deserialize, Serialize};

use crate::error::{FmError, Result};
use crate::field::{FeatureIndex, FieldId, FieldMap};

/// One active feature of a sparse vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparseEntry {
    /// Global feature index.
    pub index: FeatureIndex,
    /// Field that owns `index`.
    pub field: FieldId,
    /// Feature value (1.0 for one-hot).
    pub value: f64,
}

impl SparseEntry {
    /// Creates a new entry.
    pub fn new(index: FeatureIndex, field: FieldId, value: f64) -> Self {
        Self {
            index,
            field,
            value,
        }
    }
}

/// A sparse feature vector with at most one active feature per field,
/// ordered by feature index.
///
/// # Examples
///
/// ```
/// use sparsefm_core::field::FieldMap;
/// use sparsefm_core::sparse::SparseVector;
///
/// let map = FieldMap::new(&[2, 3]).unwrap();
/// let x = SparseVector::from_pairs(&map, &[(4, 1.0), (1, 1.0)]).unwrap();
/// assert_eq!(x.indices().collect::<Vec<_>>(), vec![1, 4]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SparseVector {
    entries: Vec<SparseEntry>,
}

impl SparseVector {
    /// Builds a vector from entries in any order. Fields are taken as given;
    /// public callers go through [`SparseVector::from_pairs`] or the encoder.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::DuplicateFeature`] if an index or a field appears
    /// twice.
    pub(crate) fn from_entries(mut entries: Vec<SparseEntry>) -> Result<Self> {
        entries.sort_by_key(|e| e.index);

        for (pos, entry) in entries.iter().enumerate() {
            let clash = entries[..pos]
                .iter()
                .any(|other| other.index == entry.index || other.field == entry.field);
            if clash {
                return Err(FmError::DuplicateFeature {
                    index: entry.index,
                    field: entry.field,
                });
            }
        }

        Ok(Self { entries })
    }

    /// Builds a vector from `(index, value)` pairs, resolving fields through
    /// `field_map`.
    ///
    /// # Errors
    ///
    /// Returns [`FmError::FeatureOutOfRange`] for an index outside the map,
    /// or [`FmError::DuplicateFeature`] if two pairs share an index or a field.
    pub fn from_pairs(field_map: &FieldMap, pairs: &[(FeatureIndex, f64)]) -> Result<Self> {
        let entries = pairs
            .iter()
            .map(|&(index, value)| {
                let field = field_map
                    .field_of(index)
                    .ok_or(FmError::FeatureOutOfRange {
                        index,
                        num_features: field_map.num_features(),
                    })?;
                Ok(SparseEntry::new(index, field, value))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_entries(entries)
    }

    /// Wraps entries that are already sorted and unique. Used by the encoder,
    /// whose field-ordered layout guarantees both.
    pub(crate) fn from_sorted_unchecked(entries: Vec<SparseEntry>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].index < w[1].index));
        Self { entries }
    }

    /// Number of active features.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no feature is active.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Active entries ordered by index.
    #[inline]
    pub fn entries(&self) -> &[SparseEntry] {
        &self.entries
    }

    /// Iterates over active entries.
    pub fn iter(&self) -> std::slice::Iter<'_, SparseEntry> {
        self.entries.iter()
    }

    /// Iterates over active feature indices.
    pub fn indices(&self) -> impl Iterator<Item = FeatureIndex> + '_ {
        self.entries.iter().map(|e| e.index)
    }
}

impl<'a> IntoIterator for &'a SparseVector {
    type Item = &'a SparseEntry;
    type IntoIter = std::slice::Iter<'a, SparseEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
