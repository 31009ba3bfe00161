use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::pss::Pss;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};

use crate::error::KeystoreError;

/// RSA-2048 keys throughout the network, matching the original protocol's
/// fixed signature width so frames can be parsed without a length prefix.
pub const KEY_BITS: usize = 2048;
pub const SIGNATURE_SIZE: usize = KEY_BITS / 8;

fn pss_max_salt() -> Pss {
    // PSS maximum salt length for an RSA-2048 key signing a SHA-256 digest:
    // modulus bytes - hash bytes - 2.
    let salt_len = SIGNATURE_SIZE - Sha256::output_size() - 2;
    Pss::new_with_salt::<Sha256>(salt_len)
}

/// A node's long-lived RSA identity: the private key used to sign outgoing
/// frames and the public key advertised to peers.
pub struct NodeIdentity {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl NodeIdentity {
    /// Generates a fresh RSA-2048 keypair. CPU-bound; callers should run this
    /// inside `tokio::task::spawn_blocking`.
    pub fn generate() -> Result<Self, KeystoreError> {
        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| KeystoreError::KeyGeneration(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Loads an identity from a PKCS#8 PEM-encoded private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, KeystoreError> {
        let private_key =
            RsaPrivateKey::from_pkcs8_pem(pem).map_err(|e| KeystoreError::Pem(e.to_string()))?;
        let public_key = RsaPublicKey::from(&private_key);
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// PKCS#8 PEM encoding of the private key, suitable for persisting to
    /// disk between restarts.
    pub fn to_pkcs8_pem(&self) -> Result<String, KeystoreError> {
        self.private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map(|s| s.to_string())
            .map_err(|e| KeystoreError::Pem(e.to_string()))
    }

    /// This node's public identity, shareable with peers.
    pub fn public(&self) -> PublicIdentity {
        PublicIdentity {
            public_key: self.public_key.clone(),
        }
    }

    /// Signs `message` with RSA-PSS/SHA-256 using the maximum allowed salt
    /// length, producing a fixed [`SIGNATURE_SIZE`]-byte signature.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeystoreError> {
        let digest = Sha256::digest(message);
        let mut rng = rand::thread_rng();
        self.private_key
            .sign_with_rng(&mut rng, pss_max_salt(), &digest)
            .map_err(|e| KeystoreError::Sign(e.to_string()))
    }
}

/// A peer's public key, as advertised over the wire and verified against
/// incoming signed frames.
#[derive(Clone)]
pub struct PublicIdentity {
    public_key: RsaPublicKey,
}

impl PublicIdentity {
    /// Decodes a SubjectPublicKeyInfo PEM block, the format exchanged during
    /// the transport handshake.
    pub fn from_spki_pem(pem: &str) -> Result<Self, KeystoreError> {
        let public_key =
            RsaPublicKey::from_public_key_pem(pem).map_err(|e| KeystoreError::Pem(e.to_string()))?;
        Ok(Self { public_key })
    }

    /// SubjectPublicKeyInfo PEM encoding, sent as the first handshake frame.
    pub fn to_spki_pem(&self) -> Result<String, KeystoreError> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeystoreError::Pem(e.to_string()))
    }

    /// Verifies a signature produced by [`NodeIdentity::sign`] over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), KeystoreError> {
        if signature.len() != SIGNATURE_SIZE {
            return Err(KeystoreError::InvalidSignature);
        }
        let digest = Sha256::digest(message);
        self.public_key
            .verify(pss_max_salt(), &digest, signature)
            .map_err(|_| KeystoreError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let identity = NodeIdentity::generate().unwrap();
        let message = b"the node discovered 3 peers";
        let signature = identity.sign(message).unwrap();

        assert_eq!(signature.len(), SIGNATURE_SIZE);
        identity.public().verify(message, &signature).unwrap();
    }

    #[test]
    fn tampered_message_fails_verification() {
        let identity = NodeIdentity::generate().unwrap();
        let signature = identity.sign(b"original").unwrap();
        assert!(identity.public().verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn pem_round_trips() {
        let identity = NodeIdentity::generate().unwrap();
        let pem = identity.to_pkcs8_pem().unwrap();
        let reloaded = NodeIdentity::from_pkcs8_pem(&pem).unwrap();

        let message = b"reload check";
        let signature = reloaded.sign(message).unwrap();
        identity.public().verify(message, &signature).unwrap();
    }

    #[test]
    fn public_key_pem_round_trips() {
        let identity = NodeIdentity::generate().unwrap();
        let pem = identity.public().to_spki_pem().unwrap();
        let reloaded = PublicIdentity::from_spki_pem(&pem).unwrap();

        let message = b"public key round trip";
        let signature = identity.sign(message).unwrap();
        reloaded.verify(message, &signature).unwrap();
    }
}
