//! Defines the transfer packet data error type.

use alloc::string::String;

use displaydoc::Display;

/// Errors raised while decoding or validating transfer packet data.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum TransferError {
    /// invalid amount: {description}
    InvalidAmount { description: String },
    /// invalid address: {description}
    InvalidAddress { description: String },
    /// invalid denomination: {description}
    InvalidDenom { description: String },
    /// invalid hop `{hop}`: {description}
    InvalidHop { hop: String, description: String },
    /// invalid memo: {description}
    InvalidMemo { description: String },
    /// invalid forwarding path: {description}
    InvalidForwarding { description: String },
    /// unsupported ICS-20 version `{version}`
    UnsupportedVersion { version: String },
    /// cannot unmarshal `{version}` transfer packet data: {description}
    DecodePacketData { version: String, description: String },
    /// cannot marshal transfer packet data: {description}
    EncodePacketData { description: String },
}

impl core::error::Error for TransferError {}
