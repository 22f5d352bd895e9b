//! Domain-tagged settlement signing.
//!
//! Key material is normalized once at startup into a fixed-width 32-byte
//! big-endian scalar; an unsupported algorithm is a load-time error, never
//! a sign-time one. Signing hashes the message with a 32-byte-padded
//! domain tag prepended (SHA2-256) and applies secp256k1 ECDSA over the
//! prehashed digest.

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Width the domain tag is padded to before hashing.
pub const DOMAIN_TAG_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("unsupported key algorithm \"{0}\"")]
    UnsupportedAlgorithm(String),
    #[error("invalid private key scalar: {0}")]
    InvalidScalar(String),
    #[error("domain tag is {0} bytes, limit is {DOMAIN_TAG_LEN}")]
    TagTooLong(usize),
    #[error("signing failed: {0}")]
    Signing(#[from] k256::ecdsa::Error),
}

/// Private-key material, tagged by algorithm. The set of supported
/// algorithms is finite and matched exhaustively wherever it is consumed.
#[derive(Clone)]
pub enum KeyMaterial {
    Secp256k1([u8; 32]),
}

impl KeyMaterial {
    /// Normalize raw scalar bytes for `algorithm`. Scalars shorter than 32
    /// bytes are left-padded with zeros; anything longer is rejected.
    pub fn load(algorithm: &str, raw: &[u8]) -> Result<Self, KeyError> {
        match algorithm {
            "secp256k1" => {
                if raw.is_empty() || raw.len() > 32 {
                    return Err(KeyError::InvalidScalar(format!(
                        "{} byte(s), expected 1..=32",
                        raw.len()
                    )));
                }
                let mut scalar = [0u8; 32];
                scalar[32 - raw.len()..].copy_from_slice(raw);
                Ok(KeyMaterial::Secp256k1(scalar))
            }
            other => Err(KeyError::UnsupportedAlgorithm(other.to_string())),
        }
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            KeyMaterial::Secp256k1(_) => "secp256k1",
        }
    }

    fn normalize(&self) -> &[u8; 32] {
        match self {
            KeyMaterial::Secp256k1(scalar) => scalar,
        }
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm())
            .field("scalar", &"<redacted>")
            .finish()
    }
}

/// Fixed string scoping every signature to one protocol, right-padded
/// with zeros to [`DOMAIN_TAG_LEN`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainTag([u8; DOMAIN_TAG_LEN]);

impl DomainTag {
    pub fn new(tag: &str) -> Result<Self, KeyError> {
        let raw = tag.as_bytes();
        if raw.len() > DOMAIN_TAG_LEN {
            return Err(KeyError::TagTooLong(raw.len()));
        }
        let mut padded = [0u8; DOMAIN_TAG_LEN];
        padded[..raw.len()].copy_from_slice(raw);
        Ok(Self(padded))
    }

    pub fn as_bytes(&self) -> &[u8; DOMAIN_TAG_LEN] {
        &self.0
    }
}

pub struct Signer {
    key: SigningKey,
    tag: DomainTag,
}

impl Signer {
    pub fn new(material: &KeyMaterial, tag: DomainTag) -> Result<Self, KeyError> {
        let key = SigningKey::from_slice(material.normalize())
            .map_err(|e| KeyError::InvalidScalar(e.to_string()))?;
        Ok(Self { key, tag })
    }

    /// SHA2-256 over the padded domain tag followed by the message.
    pub fn digest(&self, message: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.tag.as_bytes());
        hasher.update(message);
        hasher.finalize().into()
    }

    /// 64-byte r‖s ECDSA signature over the domain-tagged digest.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        let digest = self.digest(message);
        let signature: Signature = self.key.sign_prehash(&digest)?;
        Ok(signature.to_bytes().to_vec())
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.key.verifying_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    fn test_signer() -> Signer {
        let material = KeyMaterial::load("secp256k1", &[7u8; 32]).unwrap();
        Signer::new(&material, DomainTag::new("RELAY-V1-voter").unwrap()).unwrap()
    }

    #[test]
    fn test_signature_verifies() {
        let signer = test_signer();
        let message = b"settlement value bytes";
        let sig_bytes = signer.sign(message).unwrap();
        assert_eq!(sig_bytes.len(), 64);

        let signature = Signature::from_slice(&sig_bytes).unwrap();
        let digest = signer.digest(message);
        signer
            .verifying_key()
            .verify_prehash(&digest, &signature)
            .expect("signature must verify against the signer's key");
    }

    #[test]
    fn test_repeat_signing_both_verify() {
        // Determinism is not required, verifiability is.
        let signer = test_signer();
        let message = b"same message twice";
        let digest = signer.digest(message);
        for _ in 0..2 {
            let sig = Signature::from_slice(&signer.sign(message).unwrap()).unwrap();
            signer
                .verifying_key()
                .verify_prehash(&digest, &sig)
                .unwrap();
        }
    }

    #[test]
    fn test_domain_tag_separates_signatures() {
        let material = KeyMaterial::load("secp256k1", &[7u8; 32]).unwrap();
        let a = Signer::new(&material, DomainTag::new("tag-a").unwrap()).unwrap();
        let b = Signer::new(&material, DomainTag::new("tag-b").unwrap()).unwrap();
        assert_ne!(a.digest(b"msg"), b.digest(b"msg"));
    }

    #[test]
    fn test_short_scalar_left_padded() {
        let material = KeyMaterial::load("secp256k1", &[0x01, 0x02]).unwrap();
        let KeyMaterial::Secp256k1(scalar) = material;
        assert_eq!(&scalar[..30], &[0u8; 30]);
        assert_eq!(&scalar[30..], &[0x01, 0x02]);
    }

    #[test]
    fn test_unsupported_algorithm_fails_at_load() {
        match KeyMaterial::load("ed25519", &[7u8; 32]) {
            Err(KeyError::UnsupportedAlgorithm(name)) => assert_eq!(name, "ed25519"),
            other => panic!("expected unsupported algorithm, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_scalar_rejected() {
        assert!(matches!(
            KeyMaterial::load("secp256k1", &[1u8; 33]),
            Err(KeyError::InvalidScalar(_))
        ));
        assert!(matches!(
            KeyMaterial::load("secp256k1", &[]),
            Err(KeyError::InvalidScalar(_))
        ));
    }

    #[test]
    fn test_zero_scalar_rejected_at_construction() {
        let material = KeyMaterial::load("secp256k1", &[0u8; 32]).unwrap();
        assert!(matches!(
            Signer::new(&material, DomainTag::new("t").unwrap()),
            Err(KeyError::InvalidScalar(_))
        ));
    }

    #[test]
    fn test_overlong_domain_tag_rejected() {
        let long = "x".repeat(DOMAIN_TAG_LEN + 1);
        assert!(matches!(
            DomainTag::new(&long),
            Err(KeyError::TagTooLong(33))
        ));
    }
}
