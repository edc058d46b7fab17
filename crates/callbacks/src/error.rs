//! Errors raised by the callbacks middleware.

use alloc::string::{String, ToString};

use displaydoc::Display;
use ibc_core_channel_types::error::PacketError;
use ibc_middleware_core::gas::OutOfGas;
use ibc_middleware_core::BoxError;

/// Error returned by a contract callback.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum CallbackError {
    /// callback ran out of gas: {0}
    OutOfGas(OutOfGas),
    /// callback store error: {0}
    Store(String),
    /// contract error: {0}
    Contract(String),
}

impl core::error::Error for CallbackError {}

impl From<OutOfGas> for CallbackError {
    fn from(err: OutOfGas) -> Self {
        Self::OutOfGas(err)
    }
}

impl From<BoxError> for CallbackError {
    fn from(err: BoxError) -> Self {
        Self::Store(err.to_string())
    }
}

/// Failure to determine which callback a packet requested.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum CallbackDataError {
    /// cannot unmarshal packet data: {0}
    UnmarshalPacketData(String),
    /// no callback metadata found under key `{key}`
    CallbackKeyNotFound { key: String },
    /// the destination of the packet is unknown
    UnknownDestination,
}

impl core::error::Error for CallbackDataError {}

/// Why a callback aborted the enclosing transaction.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum AbortReason {
    /// out of gas, retry with a higher gas limit: {0}
    OutOfGas(OutOfGas),
    /// failed to commit the state written by the callback: {0}
    Commit(String),
}

impl core::error::Error for AbortReason {}

/// Error returned by the packet handlers of the callbacks middleware.
#[derive(Debug, Display)]
pub enum CallbacksError {
    /// underlying application error: {0}
    Application(String),
    /// underlying application packet error: {0}
    Packet(PacketError),
    /// packet rejected by callback: {0}
    CallbackRejected(CallbackError),
    /// callback aborted the transaction: {0}
    FatalAbort(AbortReason),
}

impl core::error::Error for CallbacksError {}
