use rustls::pki_types::{CertificateDer, PrivateKeyDer};

use crate::error::KeystoreError;

/// A TLS certificate chain and its matching private key, loaded from
/// operator-provided PEM files (the node's self-signed transport cert, not
/// to be confused with the RSA identity used for frame signing).
pub struct TlsMaterial {
    pub cert_chain: Vec<CertificateDer<'static>>,
    pub private_key: PrivateKeyDer<'static>,
}

impl TlsMaterial {
    /// Parses a PEM certificate chain and a PEM private key from their raw
    /// bytes, as read from the files named by node configuration.
    pub fn from_pem_bytes(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, KeystoreError> {
        let cert_chain: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut &cert_pem[..])
            .collect::<Result<_, _>>()
            .map_err(|e| KeystoreError::Tls(e.to_string()))?;

        if cert_chain.is_empty() {
            return Err(KeystoreError::Tls("no certificates found in PEM".into()));
        }

        let private_key = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|e| KeystoreError::Tls(e.to_string()))?
            .ok_or_else(|| KeystoreError::Tls("no private key found in PEM".into()))?;

        Ok(Self {
            cert_chain,
            private_key,
        })
    }

    /// Parses PEM material already loaded into memory from disk.
    pub fn from_files(
        cert_path: &std::path::Path,
        key_path: &std::path::Path,
    ) -> Result<Self, KeystoreError> {
        let cert_pem = std::fs::read(cert_path)?;
        let key_pem = std::fs::read(key_path)?;
        Self::from_pem_bytes(&cert_pem, &key_pem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // Generates a throwaway self-signed certificate/key pair with `rcgen`-free
    // tooling isn't available here, so this test only exercises the parse
    // failure path; round-trip coverage against real certs lives in
    // fc-transport's integration tests where a cert is generated once and
    // reused across the TLS acceptor/connector pair.
    #[test]
    fn empty_pem_is_rejected() {
        let mut cert_file = tempfile::NamedTempFile::new().unwrap();
        let mut key_file = tempfile::NamedTempFile::new().unwrap();
        cert_file.write_all(b"").unwrap();
        key_file.write_all(b"").unwrap();

        let result = TlsMaterial::from_files(cert_file.path(), key_file.path());
        assert!(result.is_err());
    }
}
