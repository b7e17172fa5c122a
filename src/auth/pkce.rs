//! PKCE (RFC 7636) verifier/challenge pairs and CSRF state values.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// A PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub code_verifier: String,
    pub code_challenge: String,
}

impl PkcePair {
    pub fn generate() -> Self {
        let code_verifier = URL_SAFE_NO_PAD.encode(random_bytes::<32>());
        let code_challenge = compute_code_challenge(&code_verifier);
        Self {
            code_verifier,
            code_challenge,
        }
    }

    pub const METHOD: &'static str = "S256";
}

/// Random hex string used as the OAuth `state` parameter.
pub fn random_state() -> String {
    hex_encode(&random_bytes::<16>())
}

pub fn compute_code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    for chunk in buf.chunks_mut(16) {
        let id = uuid::Uuid::new_v4();
        let len = chunk.len();
        chunk.copy_from_slice(&id.as_bytes()[..len]);
    }
    buf
}

fn hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for byte in data {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
