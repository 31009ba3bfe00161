use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("RSA key generation failed: {0}")]
    KeyGeneration(String),

    #[error("signing failed: {0}")]
    Sign(String),

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("malformed PEM key: {0}")]
    Pem(String),

    #[error("malformed TLS certificate or key: {0}")]
    Tls(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
