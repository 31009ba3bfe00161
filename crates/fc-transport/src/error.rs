use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("keystore error: {0}")]
    Keystore(#[from] fc_keystore::KeystoreError),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("payload contains the frame separator, which is not permitted")]
    SeparatorInPayload,

    #[error("signature verification failed for peer {0}")]
    InvalidSignature(String),

    #[error("message content does not match its declared message_type")]
    ContentTagMismatch,

    #[error("peer link {0} is not known")]
    UnknownLink(u64),

    #[error("handshake did not complete before an application frame arrived")]
    HandshakeIncomplete,
}
