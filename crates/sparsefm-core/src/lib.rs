//! Core types for sparse multi-field interaction data.
//!
//! This crate provides the foundational types used throughout sparsefm:
//!
//! - **Field map**: the bijection between `(field, key)` pairs and global
//!   indices of the flattened one-hot feature space.
//! - **Sparse vectors**: at most one active feature per field, ordered by index.
//! - **Encoder**: turns raw per-field keys into sparse vectors.
//! - **Interaction tensor**: the in-memory training set.
//! - **Error types**: structured error handling with detailed context.
//!
//! # Example
//!
//! ```
//! use sparsefm_core::{FeatureEncoder, InteractionTensor};
//!
//! let mut tensor = InteractionTensor::new(vec![3, 2]).unwrap();
//! tensor.push(vec![2, 1], 5.0).unwrap();
//!
//! let encoder = FeatureEncoder::from_cardinalities(tensor.dimensions()).unwrap();
//! let entry = &tensor.entries()[0];
//! let x = encoder.encode(&entry.keys).unwrap();
//! assert_eq!(x.indices().collect::<Vec<_>>(), vec![2, 4]);
//! ```

pub mod encoder;
pub mod error;
pub mod field;
pub mod sparse;
pub mod tensor;

pub use encoder::FeatureEncoder;
pub use error::{FmError, Result};
pub use field::{FeatureIndex, FieldId, FieldMap};
pub use sparse::{SparseEntry, SparseVector};
pub use tensor::{InteractionEntry, InteractionTensor};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_reexports() {
        let map: FieldMap = FieldMap::new(&[2, 2]).unwrap();
        let index: FeatureIndex = map.global_index(1, 1).unwrap();
        let field: Option<FieldId> = map.field_of(index);
        assert_eq!(field, Some(1));

        let x: SparseVector = SparseVector::from_pairs(&map, &[(3, 1.0)]).unwrap();
        let entry: &SparseEntry = x.iter().next().unwrap();
        assert_eq!(*entry, SparseEntry::new(3, 1, 1.0));
        let _err: Result<()> = Err(FmError::config("test"));
    }

    #[test]
    fn test_integration_workflow() {
        let mut tensor = InteractionTensor::new(vec![2, 3, 2]).unwrap();
        tensor.push(vec![0, 2, 1], 1.0).unwrap();
        tensor.push(vec![1, 0, 0], 0.0).unwrap();

        let encoder = FeatureEncoder::from_cardinalities(tensor.dimensions()).unwrap();
        let encoded: Vec<SparseVector> = tensor
            .iter()
            .map(|e| encoder.encode(&e.keys))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(encoded[0].indices().collect::<Vec<_>>(), vec![0, 4, 6]);
        assert_eq!(encoded[1].indices().collect::<Vec<_>>(), vec![1, 2, 5]);
        for x in &encoded {
            for entry in x {
                assert_eq!(encoder.field_map().field_of(entry.index), Some(entry.field));
            }
        }
    }
}
