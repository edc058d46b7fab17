//! ICS-20 fungible token transfer packet data.
//!
//! Packets are decoded into [`FungibleTokenPacketDataV2`] regardless of
//! the version they were sent with. V1 payloads are JSON encoded and
//! carry a single token, whose trace is embedded in its denomination
//! string. V2 payloads are protobuf encoded, may carry multiple tokens
//! and a forwarding path.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod amount;
mod codec;
mod denom;
mod error;
mod packet;
pub mod proto;

#[doc(inline)]
pub use self::codec::{
    encode_packet_data_v1, encode_packet_data_v2, get_custom_packet_data, packet_data_v1_to_v2,
    unmarshal_packet_data,
};
#[doc(inline)]
pub use self::denom::{extract_denom_from_path, Denom, Hop};
#[doc(inline)]
pub use self::error::TransferError;
#[doc(inline)]
pub use self::packet::{
    FungibleTokenPacketData, FungibleTokenPacketDataV2, ForwardingPacketData, Token,
};

/// Version of the ICS-20 protocol with JSON encoded, single token packets.
pub const V1: &str = ibc_app_transfer_types::VERSION;

/// Version of the ICS-20 protocol with protobuf encoded, multi token packets.
pub const V2: &str = "ics20-2";

/// Name of the transfer application, as found in multiplexed
/// acknowledgements.
pub const MODULE_ID_STR: &str = ibc_app_transfer_types::MODULE_ID_STR;

/// Maximum length of the memo of a packet, in bytes.
pub const MAXIMUM_MEMO_LENGTH: usize = 32768;

/// Maximum number of hops a packet may still be forwarded through.
pub const MAXIMUM_NUMBER_OF_FORWARDING_HOPS: usize = 8;

/// Prefix of the denominations of tokens that arrived through IBC.
pub const DENOM_PREFIX: &str = "ibc";
