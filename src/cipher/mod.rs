//! Frame ciphers.
//!
//! Both ciphers XOR a keystream into the frame bytes, so running the same
//! keystream over an encrypted frame decrypts it. Neither is meant to resist
//! cryptanalysis.

pub mod logistic;
pub mod random;

pub use logistic::{LogisticMap, LogisticXor};
pub use random::RandomXor;

use crate::config::{CipherConfig, CipherKind};
use crate::pipeline::Transform;
use crate::types::Frame;

/// Instantiate the configured cipher.
///
/// A random cipher without a seed draws one from OS entropy.
pub fn build_cipher(config: &CipherConfig) -> Box<dyn Transform<Frame>> {
    match config.kind {
        CipherKind::Logistic => Box::new(LogisticXor::new(config.r, config.x0)),
        CipherKind::Random => match config.seed {
            Some(seed) => Box::new(RandomXor::from_seed(seed)),
            None => {
                tracing::warn!("No seed given for random cipher; output cannot be decrypted");
                Box::new(RandomXor::new())
            }
        },
    }
}
