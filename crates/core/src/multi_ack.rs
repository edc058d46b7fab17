//! Multiplexed acknowledgements, carrying one result per application
//! a packet was delivered to.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use ibc_core_channel_types::acknowledgement::{Acknowledgement, AcknowledgementStatus};
use prost::Message;
use sha2::{Digest, Sha256};

/// Status of the receipt of a packet by one application.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PacketStatus {
    /// Default value, never written by a well behaved application.
    Unspecified = 0,
    /// The packet was received successfully.
    Success = 1,
    /// The packet could not be received.
    Failure = 2,
    /// The acknowledgement will be written at a later time.
    Async = 3,
}

/// Outcome of the receipt of a packet by one application.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RecvPacketResult {
    #[prost(enumeration = "PacketStatus", tag = "1")]
    pub status: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub acknowledgement: Vec<u8>,
}

/// Receipt result tagged with the application it belongs to.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct AcknowledgementResult {
    #[prost(string, tag = "1")]
    pub app_name: String,
    #[prost(message, optional, tag = "2")]
    pub recv_packet_result: Option<RecvPacketResult>,
}

/// Envelope of the results of every application a packet was
/// delivered to.
#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct MultiAcknowledgement {
    #[prost(message, repeated, tag = "1")]
    pub acknowledgement_results: Vec<AcknowledgementResult>,
}

impl MultiAcknowledgement {
    /// Check if the first application the packet was delivered to
    /// received it successfully.
    pub fn is_successful(&self) -> bool {
        self.acknowledgement_results
            .first()
            .and_then(|result| result.recv_packet_result.as_ref())
            .is_some_and(|result| result.has_status(PacketStatus::Success))
    }
}

impl RecvPacketResult {
    /// Check if the result carries the given `status`.
    #[inline]
    pub fn has_status(&self, status: PacketStatus) -> bool {
        self.status == status as i32
    }
}

/// Acknowledgement written by a single application.
pub trait AppAcknowledgement {
    /// Bytes of the acknowledgement, as committed on chain.
    fn acknowledgement_bytes(&self) -> Vec<u8>;

    /// Check if the acknowledgement signals a successful receipt.
    fn is_successful(&self) -> bool;
}

impl AppAcknowledgement for AcknowledgementStatus {
    fn acknowledgement_bytes(&self) -> Vec<u8> {
        Acknowledgement::from(self.clone()).as_bytes().to_vec()
    }

    #[inline]
    fn is_successful(&self) -> bool {
        AcknowledgementStatus::is_successful(self)
    }
}

/// Opaque acknowledgements are only successful if they are
/// JSON encoded [`AcknowledgementStatus`] results.
impl AppAcknowledgement for Acknowledgement {
    fn acknowledgement_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn is_successful(&self) -> bool {
        serde_json::from_slice::<AcknowledgementStatus>(self.as_bytes())
            .is_ok_and(|status| status.is_successful())
    }
}

/// Adapter turning an acknowledgement written by a single application
/// into a [`MultiAcknowledgement`] envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyMultiAck {
    multi_ack: MultiAcknowledgement,
}

impl LegacyMultiAck {
    /// Wrap `ack`, written by the application `app_name`.
    pub fn new<A>(ack: &A, app_name: impl Into<String>) -> Self
    where
        A: AppAcknowledgement + ?Sized,
    {
        let status = if ack.is_successful() {
            PacketStatus::Success
        } else {
            PacketStatus::Failure
        };

        Self {
            multi_ack: MultiAcknowledgement {
                acknowledgement_results: vec![AcknowledgementResult {
                    app_name: app_name.into(),
                    recv_packet_result: Some(RecvPacketResult {
                        status: status as i32,
                        acknowledgement: ack.acknowledgement_bytes(),
                    }),
                }],
            },
        }
    }

    /// Decode an envelope from its binary encoding.
    pub fn decode(bytes: &[u8]) -> Result<Self, prost::DecodeError> {
        MultiAcknowledgement::decode(bytes).map(|multi_ack| Self { multi_ack })
    }

    /// Return a reference to the wrapped envelope.
    pub fn multi_acknowledgement(&self) -> &MultiAcknowledgement {
        &self.multi_ack
    }

    /// Return the wrapped envelope.
    pub fn into_inner(self) -> MultiAcknowledgement {
        self.multi_ack
    }
}

impl From<LegacyMultiAck> for MultiAcknowledgement {
    fn from(ack: LegacyMultiAck) -> Self {
        ack.multi_ack
    }
}

impl AppAcknowledgement for LegacyMultiAck {
    fn acknowledgement_bytes(&self) -> Vec<u8> {
        self.multi_ack.encode_to_vec()
    }

    #[inline]
    fn is_successful(&self) -> bool {
        self.multi_ack.is_successful()
    }
}

/// Commitment of a [`MultiAcknowledgement`]: the SHA-256 digest of
/// its binary encoding.
pub fn commit_acknowledgement(multi_ack: &MultiAcknowledgement) -> [u8; 32] {
    Sha256::digest(multi_ack.encode_to_vec()).into()
}
