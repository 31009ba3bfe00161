use fc_keystore::{NodeIdentity, PublicIdentity};
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::peer::SerializedPeer;

/// The application-level message schema gossiped between peers once the
/// handshake has established a signing identity for the link.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "message_type", content = "content")]
pub enum Message {
    #[serde(rename = "PEERS_REQUEST")]
    PeersRequest,
    #[serde(rename = "PEERS_SHARING")]
    PeersSharing { peers: Vec<SerializedPeer> },
    #[serde(rename = "APPLICATION")]
    Application { data: String },
}

impl Message {
    pub fn application(data: impl Into<String>) -> Self {
        Message::Application { data: data.into() }
    }
}

/// A signed, not-yet-parsed frame payload: the fixed-width RSA-PSS
/// signature followed by the JSON-encoded [`Message`].
pub struct RawMessage {
    pub signature: Vec<u8>,
    pub payload: Vec<u8>,
}

impl RawMessage {
    /// Signs `message` with `identity`, producing a frame ready to be
    /// length-delimited and sent.
    pub fn sign(message: &Message, identity: &NodeIdentity) -> Result<Self, TransportError> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| TransportError::MalformedFrame(e.to_string()))?;
        let signature = identity.sign(&payload)?;
        Ok(Self { signature, payload })
    }

    /// Concatenates signature and payload into the bytes that go on the
    /// wire (before separator delimiting).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.signature.len() + self.payload.len());
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Splits a raw frame back into its signature and payload at the fixed
    /// signature width.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TransportError> {
        if data.len() < fc_keystore::SIGNATURE_SIZE {
            return Err(TransportError::MalformedFrame(
                "frame shorter than one signature".into(),
            ));
        }
        let (signature, payload) = data.split_at(fc_keystore::SIGNATURE_SIZE);
        Ok(Self {
            signature: signature.to_vec(),
            payload: payload.to_vec(),
        })
    }

    /// Verifies the signature against `public_key`, returning the decoded
    /// message only once the signature checks out.
    pub fn verify_and_decode(&self, public_key: &PublicIdentity) -> Result<Message, TransportError> {
        public_key
            .verify(&self.payload, &self.signature)
            .map_err(|_| TransportError::InvalidSignature("signature mismatch".into()))?;

        let message: Message = serde_json::from_slice(&self.payload)
            .map_err(|e| TransportError::MalformedFrame(e.to_string()))?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let identity = NodeIdentity::generate().unwrap();
        let message = Message::application("hello peer");
        let raw = RawMessage::sign(&message, &identity).unwrap();

        let bytes = raw.to_bytes();
        let parsed = RawMessage::from_bytes(&bytes).unwrap();
        let decoded = parsed.verify_and_decode(&identity.public()).unwrap();

        match decoded {
            Message::Application { data } => assert_eq!(data, "hello peer"),
            other => panic!("unexpected message variant: {other:?}"),
        }
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let identity = NodeIdentity::generate().unwrap();
        let raw = RawMessage::sign(&Message::PeersRequest, &identity).unwrap();
        let mut bytes = raw.to_bytes();
        *bytes.last_mut().unwrap() ^= 0xff;

        let parsed = RawMessage::from_bytes(&bytes).unwrap();
        assert!(parsed.verify_and_decode(&identity.public()).is_err());
    }
}
