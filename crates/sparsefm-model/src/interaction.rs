//! Second-order interaction term of factorization machines.
//!
//! # Mathematical Formulation
//!
//! For a sparse vector `x` the interaction term is
//! ```text
//! sum over active pairs (i, j), i < j, of <v_i, v_j> * x_i * x_j
//! ```
//! In the field-agnostic form every feature has one factor vector and the
//! sum can be rewritten as
//! ```text
//! 0.5 * sum_f [ (sum_i v_{i,f} x_i)^2 - sum_i (v_{i,f} x_i)^2 ]
//! ```
//! which costs O(k·n) instead of O(k·n²).
//!
//! In the field-aware form (FFM) feature `i` uses `v_{i, field(j)}` against
//! feature `j`, and `j` uses `v_{j, field(i)}` against `i`. The factor pair
//! changes with every counterpart, so only the O(k·n²) pair enumeration
//! applies.
//!
//! # References
//!
//! - [Factorization Machines](https://www.csie.ntu.edu.tw/~b97053/paper/Rendle2010FM.pdf)
//! - [Field-aware Factorization Machines for CTR Prediction][ffm]
//!
//! [ffm]: https://www.csie.ntu.edu.tw/~cjlin/papers/ffm.pdf

use serde::{Deserialize, Serialize};
use sparsefm_core::SparseVector;

use crate::params::ParameterStore;

/// How latent factors are parameterized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionKind {
    /// One factor vector per feature (FM).
    #[default]
    Factorization,
    /// One factor vector per feature and counterpart field (FFM).
    FieldAware,
}

impl InteractionKind {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            InteractionKind::Factorization => "fm",
            InteractionKind::FieldAware => "ffm",
        }
    }
}

/// Interaction term using the cheapest evaluation valid for the store.
pub fn interaction(params: &ParameterStore, x: &SparseVector) -> f64 {
    match params.kind() {
        InteractionKind::Factorization => factorized_interaction(params, x),
        InteractionKind::FieldAware => pairwise_interaction(params, x),
    }
}

/// O(k·n) evaluation through the sum-of-squares identity.
///
/// Field-aware stores have no shared factor vectors, so they are evaluated
/// pairwise instead.
pub fn factorized_interaction(params: &ParameterStore, x: &SparseVector) -> f64 {
    if params.kind() == InteractionKind::FieldAware {
        return pairwise_interaction(params, x);
    }

    let v = params.factors();
    let mut result = 0.0;
    for f in 0..params.num_factors() {
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for e in x {
            let vx = v.get(e.index, f) * e.value;
            sum += vx;
            sum_sq += vx * vx;
        }
        result += 0.5 * (sum * sum - sum_sq);
    }
    result
}

/// O(k·n²) evaluation enumerating every unordered active pair.
pub fn pairwise_interaction(params: &ParameterStore, x: &SparseVector) -> f64 {
    let v = params.factors();
    let entries = x.entries();
    let mut result = 0.0;

    for (a, ei) in entries.iter().enumerate() {
        for ej in &entries[a + 1..] {
            let xx = ei.value * ej.value;
            for f in 0..params.num_factors() {
                let vi = v.get(ei.index, params.factor_column(ej.field, f));
                let vj = v.get(ej.index, params.factor_column(ei.field, f));
                result += vi * vj * xx;
            }
        }
    }
    result
}

/// Collects the factor columns of the feature at position `pos` of `x` that
/// an example touches.
///
/// Field-agnostic: every latent dimension. Field-aware: the `k` columns
/// selected by each other active feature's field.
pub fn touched_columns(
    params: &ParameterStore,
    x: &SparseVector,
    pos: usize,
    out: &mut Vec<usize>,
) {
    out.clear();
    let k = params.num_factors();
    match params.kind() {
        InteractionKind::Factorization => out.extend(0..k),
        InteractionKind::FieldAware => {
            for (b, other) in x.iter().enumerate() {
                if b != pos {
                    let start = params.factor_column(other.field, 0);
                    out.extend(start..start + k);
                }
            }
        }
    }
}

/// Partial derivative of the interaction term with respect to
/// `V[x[pos].index, col]`, read from the store's current factors.
///
/// Field-aware: only the active feature of field `col / k` pairs with the
/// column, so it costs O(log n) instead of a scan.
pub fn factor_partial(params: &ParameterStore, x: &SparseVector, pos: usize, col: usize) -> f64 {
    let v = params.factors();
    let entries = x.entries();
    let own = entries[pos];

    let mut sum = 0.0;
    match params.kind() {
        InteractionKind::Factorization => {
            for (b, other) in entries.iter().enumerate() {
                if b != pos {
                    sum += v.get(other.index, col) * other.value;
                }
            }
        }
        InteractionKind::FieldAware => {
            let k = params.num_factors();
            let counterpart_col = params.factor_column(own.field, col % k);
            // field blocks are laid out in index order
            if let Ok(b) = entries.binary_search_by_key(&(col / k), |e| e.field) {
                if b != pos {
                    let other = entries[b];
                    sum = v.get(other.index, counterpart_col) * other.value;
                }
            }
        }
    }
    own.value * sum
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};
    use sparsefm_core::{FeatureEncoder, FieldMap};

    fn random_store(
        p: usize,
        k: usize,
        fields: usize,
        kind: InteractionKind,
        seed: u64,
    ) -> ParameterStore {
        let mut store = ParameterStore::zeros(p, k, fields, kind);
        let normal = Normal::new(0.0, 0.5).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);
        for v in store.factors_mut().as_mut_slice() {
            *v = normal.sample(&mut rng);
        }
        store
    }

    #[test]
    fn test_factorized_matches_pairwise() {
        let encoder = FeatureEncoder::from_cardinalities(&[4, 3, 5, 2]).unwrap();
        let store = random_store(14, 6, 4, InteractionKind::Factorization, 3);

        for keys in [[0, 0, 0, 0], [3, 2, 4, 1], [1, 0, 2, 1], [2, 1, 3, 0]] {
            let x = encoder.encode(&keys).unwrap();
            let fast = factorized_interaction(&store, &x);
            let naive = pairwise_interaction(&store, &x);
            assert!((fast - naive).abs() < 1e-10, "fast={} naive={}", fast, naive);
        }
    }

    #[test]
    fn test_factorized_matches_pairwise_with_real_values() {
        let store = random_store(6, 3, 3, InteractionKind::Factorization, 11);
        let map = FieldMap::new(&[2, 2, 2]).unwrap();
        let x = SparseVector::from_pairs(&map, &[(0, 0.5), (3, -2.0), (5, 1.5)]).unwrap();
        let fast = factorized_interaction(&store, &x);
        let naive = pairwise_interaction(&store, &x);
        assert!((fast - naive).abs() < 1e-10);
    }

    #[test]
    fn test_field_aware_hand_computed() {
        // Two fields of cardinality 1, k = 1.
        // V row 0 = [v_{0,field0}, v_{0,field1}] = [9.0, 2.0]
        // V row 1 = [v_{1,field0}, v_{1,field1}] = [3.0, 7.0]
        // Pair (0, 1): v_{0, field(1)} * v_{1, field(0)} = 2 * 3.
        let mut store = ParameterStore::zeros(2, 1, 2, InteractionKind::FieldAware);
        store.set_factors(&[9.0, 2.0, 3.0, 7.0]).unwrap();
        let encoder = FeatureEncoder::from_cardinalities(&[1, 1]).unwrap();
        let x = encoder.encode(&[0, 0]).unwrap();

        assert_eq!(pairwise_interaction(&store, &x), 6.0);
        assert_eq!(interaction(&store, &x), 6.0);
        assert_eq!(factorized_interaction(&store, &x), 6.0);
    }

    #[test]
    fn test_field_aware_depends_on_field_columns() {
        let encoder = FeatureEncoder::from_cardinalities(&[1, 1]).unwrap();
        let x = encoder.encode(&[0, 0]).unwrap();

        let mut store = ParameterStore::zeros(2, 1, 2, InteractionKind::FieldAware);
        store.set_factors(&[9.0, 2.0, 3.0, 7.0]).unwrap();
        let mut swapped = ParameterStore::zeros(2, 1, 2, InteractionKind::FieldAware);
        swapped.set_factors(&[2.0, 9.0, 7.0, 3.0]).unwrap();

        // 2 * 3 versus 9 * 7
        assert_eq!(pairwise_interaction(&store, &x), 6.0);
        assert_eq!(pairwise_interaction(&swapped, &x), 63.0);
    }

    #[test]
    fn test_touched_columns() {
        let encoder = FeatureEncoder::from_cardinalities(&[2, 2, 2]).unwrap();
        let x = encoder.encode(&[1, 0, 1]).unwrap();
        let mut cols = Vec::new();

        let fm = ParameterStore::zeros(6, 2, 3, InteractionKind::Factorization);
        touched_columns(&fm, &x, 1, &mut cols);
        assert_eq!(cols, vec![0, 1]);

        let ffm = ParameterStore::zeros(6, 2, 3, InteractionKind::FieldAware);
        touched_columns(&ffm, &x, 1, &mut cols);
        // counterparts are fields 0 and 2
        assert_eq!(cols, vec![0, 1, 4, 5]);
    }

    fn check_partials_against_finite_differences(kind: InteractionKind) {
        let encoder = FeatureEncoder::from_cardinalities(&[3, 2, 4]).unwrap();
        let store = random_store(9, 2, 3, kind, 5);
        let x = encoder.encode(&[2, 1, 0]).unwrap();
        let h = 1e-6;
        let mut cols = Vec::new();

        for pos in 0..x.len() {
            let row = x.entries()[pos].index;
            touched_columns(&store, &x, pos, &mut cols);
            for &col in &cols {
                let mut plus = store.clone();
                plus.factors_mut().add(row, col, h);
                let mut minus = store.clone();
                minus.factors_mut().add(row, col, -h);
                let numeric =
                    (interaction(&plus, &x) - interaction(&minus, &x)) / (2.0 * h);
                let analytic = factor_partial(&store, &x, pos, col);
                assert!(
                    (numeric - analytic).abs() < 1e-6,
                    "{:?} pos={} col={}: numeric={} analytic={}",
                    kind,
                    pos,
                    col,
                    numeric,
                    analytic
                );
            }
        }
    }

    #[test]
    fn test_factor_partial_matches_finite_differences() {
        check_partials_against_finite_differences(InteractionKind::Factorization);
        check_partials_against_finite_differences(InteractionKind::FieldAware);
    }

    #[test]
    fn test_field_aware_partial_picks_counterpart_by_field() {
        // V[i, f] = 10 * i + f, k = 1
        let mut store = ParameterStore::zeros(4, 1, 4, InteractionKind::FieldAware);
        let factors: Vec<f64> = (0..4)
            .flat_map(|i| (0..4).map(move |f| (10 * i + f) as f64))
            .collect();
        store.set_factors(&factors).unwrap();

        let encoder = FeatureEncoder::from_cardinalities(&[1, 1, 1, 1]).unwrap();
        let x = encoder.encode(&[0, 0, 0, 0]).unwrap();
        // feature 1 against field 3 reads V[3, field(1)]
        assert_eq!(factor_partial(&store, &x, 1, 3), 31.0);
        assert_eq!(factor_partial(&store, &x, 1, 0), 1.0);
        assert_eq!(factor_partial(&store, &x, 1, 1), 0.0);

        // field 1 inactive
        let map = FieldMap::new(&[1, 1, 1, 1]).unwrap();
        let partial = SparseVector::from_pairs(&map, &[(2, 0.5), (0, 1.0)]).unwrap();
        assert_eq!(factor_partial(&store, &partial, 1, 1), 0.0);
        assert_eq!(factor_partial(&store, &partial, 1, 0), 0.5 * 2.0);
        assert_eq!(factor_partial(&store, &partial, 0, 2), 20.0 * 0.5);
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&InteractionKind::FieldAware).unwrap();
        let back: InteractionKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, InteractionKind::FieldAware);
        assert_eq!(InteractionKind::default().name(), "fm");
    }
}
