pub mod error;
pub mod identity;
pub mod tls;

pub use error::KeystoreError;
pub use identity::{NodeIdentity, PublicIdentity, SIGNATURE_SIZE};
