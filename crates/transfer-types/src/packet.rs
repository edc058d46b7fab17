//! Transfer packet payloads.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use ibc_core_host_types::identifiers::PortId;
use ibc_middleware_core::packet_data::PacketDataProvider;
use serde::{Deserialize, Deserializer, Serialize};

use crate::amount::validate_amount;
use crate::codec::get_custom_packet_data;
use crate::denom::{extract_denom_from_path, Denom, Hop};
use crate::error::TransferError;
use crate::{MAXIMUM_MEMO_LENGTH, MAXIMUM_NUMBER_OF_FORWARDING_HOPS};

/// Payload of a V1 transfer packet.
///
/// The trace of the token is embedded in `denom`, e.g.
/// `transfer/channel-0/uatom`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
#[serde(default)]
pub struct FungibleTokenPacketData {
    #[serde(deserialize_with = "nullable_string")]
    pub denom: String,
    #[serde(deserialize_with = "nullable_string")]
    pub amount: String,
    #[serde(deserialize_with = "nullable_string")]
    pub sender: String,
    #[serde(deserialize_with = "nullable_string")]
    pub receiver: String,
    #[serde(
        deserialize_with = "nullable_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub memo: String,
}

/// Deserialize a JSON string, reading `null` as the empty string.
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl FungibleTokenPacketData {
    /// Validate the payload, without checking the format of
    /// the addresses.
    pub fn validate_basic(&self) -> Result<(), TransferError> {
        validate_amount(&self.amount)?;
        validate_addresses(&self.sender, &self.receiver)?;
        extract_denom_from_path(&self.denom).validate()
    }
}

impl PacketDataProvider for FungibleTokenPacketData {
    fn packet_sender(&self, _source_port: &PortId) -> String {
        self.sender.clone()
    }

    fn custom_packet_data(&self, key: &str) -> Option<serde_json::Value> {
        get_custom_packet_data(&self.memo, key)
    }
}

/// A single token of a V2 transfer packet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub struct Token {
    pub denom: Denom,
    pub amount: String,
}

impl Token {
    pub fn validate(&self) -> Result<(), TransferError> {
        self.denom.validate()?;
        validate_amount(&self.amount)
    }
}

/// Path a packet is yet to be forwarded through, after being
/// received by this chain.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub struct ForwardingPacketData {
    /// Memo delivered to the final destination of the packet.
    pub destination_memo: String,
    pub hops: Vec<Hop>,
}

impl ForwardingPacketData {
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.hops.len() > MAXIMUM_NUMBER_OF_FORWARDING_HOPS {
            return Err(TransferError::InvalidForwarding {
                description: format!(
                    "number of hops in forwarding path cannot exceed \
                     {MAXIMUM_NUMBER_OF_FORWARDING_HOPS}"
                ),
            });
        }

        self.hops.iter().try_for_each(Hop::validate)?;

        if self.destination_memo.len() > MAXIMUM_MEMO_LENGTH {
            return Err(TransferError::InvalidMemo {
                description: format!(
                    "destination memo must not exceed {MAXIMUM_MEMO_LENGTH} bytes"
                ),
            });
        }

        if self.hops.is_empty() && !self.destination_memo.is_empty() {
            return Err(TransferError::InvalidForwarding {
                description: "destination memo specified without forwarding hops".into(),
            });
        }

        Ok(())
    }
}

/// Payload of a V2 transfer packet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub struct FungibleTokenPacketDataV2 {
    pub tokens: Vec<Token>,
    pub sender: String,
    pub receiver: String,
    pub memo: String,
    pub forwarding: ForwardingPacketData,
}

impl FungibleTokenPacketDataV2 {
    /// Validate the payload, without checking the format of
    /// the addresses. The first violation found is returned.
    pub fn validate_basic(&self) -> Result<(), TransferError> {
        validate_addresses(&self.sender, &self.receiver)?;

        if self.tokens.is_empty() {
            return Err(TransferError::InvalidAmount {
                description: "tokens cannot be empty".into(),
            });
        }
        self.tokens.iter().try_for_each(Token::validate)?;

        if self.memo.len() > MAXIMUM_MEMO_LENGTH {
            return Err(TransferError::InvalidMemo {
                description: format!("memo must not exceed {MAXIMUM_MEMO_LENGTH} bytes"),
            });
        }

        self.forwarding.validate()?;

        // the memo of forwarded packets lives in the forwarding path
        if self.has_forwarding() && !self.memo.is_empty() {
            return Err(TransferError::InvalidMemo {
                description: "memo must be empty if forwarding path hops is not empty".into(),
            });
        }

        Ok(())
    }

    /// Check if the packet should be forwarded to another hop.
    #[inline]
    pub fn has_forwarding(&self) -> bool {
        !self.forwarding.hops.is_empty()
    }
}

impl PacketDataProvider for FungibleTokenPacketDataV2 {
    fn packet_sender(&self, _source_port: &PortId) -> String {
        self.sender.clone()
    }

    fn custom_packet_data(&self, key: &str) -> Option<serde_json::Value> {
        get_custom_packet_data(&self.memo, key)
    }
}

fn validate_addresses(sender: &str, receiver: &str) -> Result<(), TransferError> {
    if sender.trim().is_empty() {
        return Err(TransferError::InvalidAddress {
            description: "sender address cannot be blank".into(),
        });
    }
    if receiver.trim().is_empty() {
        return Err(TransferError::InvalidAddress {
            description: "receiver address cannot be blank".into(),
        });
    }
    Ok(())
}
