//! Proof Key for Code Exchange (RFC 7636), S256 method only.

use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    sha2::{Digest, Sha256},
};

use crate::types::PkceChallenge;

/// Generate a fresh verifier from 32 random bytes and its S256 challenge.
pub fn generate() -> PkceChallenge {
    let bytes: [u8; 32] = rand::random();
    let verifier = URL_SAFE_NO_PAD.encode(bytes);
    let challenge = challenge_for(&verifier);
    PkceChallenge {
        verifier,
        challenge,
    }
}

/// base64url(SHA-256(verifier)), unpadded.
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
