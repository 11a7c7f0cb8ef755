//! Example applications for sparsefm.
//!
//! - `demo_train` - trains FM-SGD, FM-FTRL or FFM on a synthetic
//!   user × item × context rating tensor
//!
//! # Running Examples
//!
//! ```bash
//! cargo run -p sparsefm-examples --bin demo_train -- --model ffm --iterations 50
//! cargo run -p sparsefm-examples --bin demo_train -- --optimizer ftrl --alpha 0.05
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sparsefm_core::{FmError, InteractionTensor};

/// Builds a rating tensor whose labels come from a hidden low-rank model.
///
/// Each entry draws one key per dimension uniformly. The label is a
/// per-key bias sum plus a rank-1 interaction between the first two
/// dimensions, plus uniform noise in `[-noise, noise]`.
pub fn synthetic_ratings(
    dimensions: &[usize],
    num_entries: usize,
    noise: f64,
    seed: u64,
) -> Result<InteractionTensor, FmError> {
    let mut tensor = InteractionTensor::new(dimensions.to_vec())?;
    let mut rng = StdRng::seed_from_u64(seed);

    let biases: Vec<Vec<f64>> = dimensions
        .iter()
        .map(|&card| (0..card).map(|_| rng.gen_range(-0.5..0.5)).collect())
        .collect();
    let latent: Vec<Vec<f64>> = dimensions
        .iter()
        .map(|&card| (0..card).map(|_| rng.gen_range(-1.0..1.0)).collect())
        .collect();

    for _ in 0..num_entries {
        let keys: Vec<usize> = dimensions.iter().map(|&card| rng.gen_range(0..card)).collect();
        let mut label = 3.0;
        for (field, &key) in keys.iter().enumerate() {
            label += biases[field][key];
        }
        if keys.len() >= 2 {
            label += latent[0][keys[0]] * latent[1][keys[1]];
        }
        if noise > 0.0 {
            label += rng.gen_range(-noise..noise);
        }
        tensor.push(keys, label)?;
    }
    Ok(tensor)
}
