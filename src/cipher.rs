//! Stream cipher construction from system entropy.
//!
//! Every generator instance runs an unauthenticated XChaCha20 stream (32-byte
//! key, 24-byte extended nonce). Key and nonce material exists only inside
//! this module, held in [`Zeroizing`] buffers that are wiped on every exit
//! path, success and failure alike.

use chacha20::XChaCha20;
use chacha20::cipher::KeyIvInit;
use zeroize::Zeroizing;

use crate::entropy::EntropySource;
use crate::error::RngError;

/// XChaCha20 key length in bytes.
pub(crate) const KEY_LEN: usize = 32;

/// XChaCha20 extended nonce length in bytes.
pub(crate) const NONCE_LEN: usize = 24;

/// Construct a fresh XChaCha20 stream seeded from `entropy`.
///
/// Draws the key and extended nonce in full from the entropy source, builds
/// the cipher, and lets the `Zeroizing` wrappers erase both buffers. A fresh
/// cipher's keystream position is zero, so two ciphers built from identical
/// entropy bytes emit identical keystreams.
///
/// # Errors
/// `EntropyUnavailable` if either draw is refused, `CipherConstructionFailed`
/// if the primitive rejects the key or nonce. Neither buffer outlives the
/// call on any path.
pub(crate) fn make_cipher(entropy: &dyn EntropySource) -> Result<XChaCha20, RngError> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let mut nonce = Zeroizing::new([0u8; NONCE_LEN]);

    entropy.fill(&mut key[..])?;
    entropy.fill(&mut nonce[..])?;

    XChaCha20::new_from_slices(&key[..], &nonce[..])
        .map_err(|err| RngError::CipherConstructionFailed(err.to_string()))
}
