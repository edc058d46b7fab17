//! Callback metadata, and its resolution from packet data.

use alloc::string::{String, ToString};
use core::fmt;

use ibc_core_channel_types::packet::Packet;
use ibc_core_host_types::identifiers::{ChannelId, PortId, Sequence};
use ibc_middleware_core::gas::Gas;
use ibc_middleware_core::packet_data::PacketDataProvider;
use serde::{Deserialize, Serialize};

use crate::context::PacketDataUnmarshaler;
use crate::error::CallbackDataError;

/// Key of the source callback metadata in the packet memo.
pub const SOURCE_CALLBACK_KEY: &str = "src_callback";

/// Key of the destination callback metadata in the packet memo.
pub const DESTINATION_CALLBACK_KEY: &str = "dest_callback";

/// Key of the address of the contract to call back.
pub const CALLBACK_ADDRESS_KEY: &str = "address";

/// Key of the gas limit requested by the callback actor.
pub const USER_DEFINED_GAS_LIMIT_KEY: &str = "gas_limit";

/// Defaults of the [`CallbacksMiddleware`](crate::CallbacksMiddleware).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub struct CallbacksConfig {
    /// Maximum amount of gas a callback actor can ask the relayer
    /// to pay for.
    pub max_callback_gas: Gas,
}

impl Default for CallbacksConfig {
    fn default() -> Self {
        Self {
            max_callback_gas: 1_000_000,
        }
    }
}

/// Lifecycle event a callback is triggered by.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallbackType {
    SendPacket,
    Acknowledgement,
    TimeoutPacket,
    WriteAcknowledgement,
}

impl CallbackType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SendPacket => "send_packet",
            Self::Acknowledgement => "acknowledgement_packet",
            Self::TimeoutPacket => "timeout_packet",
            Self::WriteAcknowledgement => "write_acknowledgement",
        }
    }

    /// Check if the callback runs on the chain that sent the packet.
    pub const fn is_source_callback(&self) -> bool {
        !matches!(self, Self::WriteAcknowledgement)
    }
}

impl fmt::Display for CallbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback requested by a packet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub struct CallbackData {
    /// Address of the contract to call back. Empty if no callback
    /// was requested.
    pub contract_address: String,
    /// Address of the sender of the packet. Only known by source
    /// callbacks.
    pub sender_address: String,
    /// Gas the callback is allowed to consume in this execution.
    pub execution_gas_limit: Gas,
    /// Gas the callback actor asked the relayer to provide.
    pub commit_gas_limit: Gas,
}

impl CallbackData {
    #[inline]
    pub fn has_callback(&self) -> bool {
        !self.contract_address.is_empty()
    }

    /// Check if running out of gas should abort the whole
    /// transaction, such that the relayer may retry it with
    /// a higher gas limit.
    #[inline]
    pub fn allows_retry(&self) -> bool {
        self.execution_gas_limit < self.commit_gas_limit
    }
}

/// Packet a callback is dispatched for.
///
/// Packets being sent do not know their destination yet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CallbackPacket<'pkt> {
    pub sequence: Sequence,
    pub source_port: &'pkt PortId,
    pub source_channel: &'pkt ChannelId,
    pub destination: Option<(&'pkt PortId, &'pkt ChannelId)>,
    pub data: &'pkt [u8],
}

impl<'pkt> From<&'pkt Packet> for CallbackPacket<'pkt> {
    fn from(packet: &'pkt Packet) -> Self {
        Self {
            sequence: packet.seq_on_a,
            source_port: &packet.port_id_on_a,
            source_channel: &packet.chan_id_on_a,
            destination: Some((&packet.port_id_on_b, &packet.chan_id_on_b)),
            data: &packet.data,
        }
    }
}

/// Resolve the source callback of `packet`, from the memo of its
/// packet data.
pub fn get_source_callback_data<U>(
    app: &U,
    packet: &CallbackPacket<'_>,
    gas_remaining: Gas,
    max_callback_gas: Gas,
) -> Result<CallbackData, CallbackDataError>
where
    U: PacketDataUnmarshaler + ?Sized,
{
    let packet_data = app
        .unmarshal_packet_data(packet.source_port, packet.source_channel, packet.data)
        .map_err(|err| CallbackDataError::UnmarshalPacketData(err.to_string()))?;

    let mut callback_data = get_callback_data(
        &packet_data,
        SOURCE_CALLBACK_KEY,
        gas_remaining,
        max_callback_gas,
    )?;
    callback_data.sender_address = packet_data.packet_sender(packet.source_port);

    Ok(callback_data)
}

/// Resolve the destination callback of `packet`, from the memo of its
/// packet data.
pub fn get_dest_callback_data<U>(
    app: &U,
    packet: &CallbackPacket<'_>,
    gas_remaining: Gas,
    max_callback_gas: Gas,
) -> Result<CallbackData, CallbackDataError>
where
    U: PacketDataUnmarshaler + ?Sized,
{
    let (port_id, channel_id) = packet
        .destination
        .ok_or(CallbackDataError::UnknownDestination)?;

    let packet_data = app
        .unmarshal_packet_data(port_id, channel_id, packet.data)
        .map_err(|err| CallbackDataError::UnmarshalPacketData(err.to_string()))?;

    get_callback_data(
        &packet_data,
        DESTINATION_CALLBACK_KEY,
        gas_remaining,
        max_callback_gas,
    )
}

fn get_callback_data<P>(
    packet_data: &P,
    callback_key: &str,
    gas_remaining: Gas,
    max_callback_gas: Gas,
) -> Result<CallbackData, CallbackDataError>
where
    P: PacketDataProvider + ?Sized,
{
    let Some(serde_json::Value::Object(callback)) = packet_data.custom_packet_data(callback_key)
    else {
        return Err(CallbackDataError::CallbackKeyNotFound {
            key: callback_key.into(),
        });
    };

    // unparsable limits fall back to the maximum
    let user_gas_limit = callback
        .get(USER_DEFINED_GAS_LIMIT_KEY)
        .and_then(serde_json::Value::as_str)
        .and_then(|gas_limit| gas_limit.parse::<Gas>().ok())
        .unwrap_or(0);

    let commit_gas_limit = if user_gas_limit == 0 || user_gas_limit > max_callback_gas {
        max_callback_gas
    } else {
        user_gas_limit
    };
    let execution_gas_limit = commit_gas_limit.min(gas_remaining);

    let contract_address = callback
        .get(CALLBACK_ADDRESS_KEY)
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .into();

    Ok(CallbackData {
        contract_address,
        sender_address: String::new(),
        execution_gas_limit,
        commit_gas_limit,
    })
}
