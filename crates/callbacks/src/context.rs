//! Capabilities required from the application wrapped by the
//! [`CallbacksMiddleware`](crate::CallbacksMiddleware), and from
//! the contracts it calls back.

use core::fmt;

use ibc_core_channel_types::acknowledgement::Acknowledgement;
use ibc_core_channel_types::packet::Packet;
use ibc_core_channel_types::timeout::{TimeoutHeight, TimeoutTimestamp};
use ibc_core_channel_types::Version;
use ibc_core_host_types::identifiers::{ChannelId, PortId, Sequence};
use ibc_middleware_core::gas::{BasicGasMeter, Gas, GasMeter, OutOfGas};
use ibc_middleware_core::multi_ack::AppAcknowledgement;
use ibc_middleware_core::packet_data::PacketDataProvider;
use ibc_middleware_core::store::{CachedStore, NamespacedStore, PendingWrites, Store};
use ibc_primitives::Signer;

use crate::error::{CallbackDataError, CallbackError};
use crate::types::{get_dest_callback_data, get_source_callback_data, CallbackData, CallbackPacket};

/// ICS-04 packet transport, sitting below the middleware.
pub trait Ics4Wrapper {
    /// Error returned by fallible operations.
    type Error: fmt::Display;

    /// Commit a packet to be relayed, returning its [`Sequence`].
    fn send_packet(
        &mut self,
        port_id_on_a: &PortId,
        chan_id_on_a: &ChannelId,
        timeout_height_on_b: &TimeoutHeight,
        timeout_timestamp_on_b: &TimeoutTimestamp,
        data: &[u8],
    ) -> Result<Sequence, Self::Error>;

    /// Commit the `acknowledgement` of a received `packet`.
    fn write_acknowledgement(
        &mut self,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
    ) -> Result<(), Self::Error>;

    /// Version of the application running on the given channel.
    fn get_app_version(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<Version>;
}

/// Decoding of the packet data of an application.
pub trait PacketDataUnmarshaler {
    /// Decoded packet data.
    type PacketData: PacketDataProvider;

    /// Error returned when decoding fails.
    type UnmarshalError: fmt::Display;

    /// Decode `data`, carried by a packet on the local end of the
    /// given channel.
    fn unmarshal_packet_data(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        data: &[u8],
    ) -> Result<Self::PacketData, Self::UnmarshalError>;
}

/// Context data required by the [`CallbacksMiddleware`](crate::CallbacksMiddleware).
pub trait CallbacksContext: Ics4Wrapper + PacketDataUnmarshaler {
    /// State of the chain.
    fn store(&self) -> &dyn Store;

    /// Mutable state of the chain.
    fn store_mut(&mut self) -> &mut dyn Store;

    /// Gas meter of the transaction being executed.
    fn gas_meter(&self) -> &dyn GasMeter;

    /// Mutable gas meter of the transaction being executed.
    fn gas_meter_mut(&mut self) -> &mut dyn GasMeter;

    /// Check if an acknowledgement written synchronously by the
    /// wrapped application signals a successful receipt.
    ///
    /// Only JSON encoded acknowledgement statuses are recognized by
    /// default. Hosts writing other acknowledgement formats, such as
    /// multi-acknowledgement envelopes, must override this.
    fn is_successful_acknowledgement(&self, acknowledgement: &Acknowledgement) -> bool {
        AppAcknowledgement::is_successful(acknowledgement)
    }

    /// Resolve the callback to run on the chain that sent `packet`.
    fn source_callback_data(
        &self,
        packet: &CallbackPacket<'_>,
        max_callback_gas: Gas,
    ) -> Result<CallbackData, CallbackDataError> {
        get_source_callback_data(
            self,
            packet,
            self.gas_meter().gas_remaining(),
            max_callback_gas,
        )
    }

    /// Resolve the callback to run on the chain that received `packet`.
    fn dest_callback_data(
        &self,
        packet: &CallbackPacket<'_>,
        max_callback_gas: Gas,
    ) -> Result<CallbackData, CallbackDataError> {
        get_dest_callback_data(
            self,
            packet,
            self.gas_meter().gas_remaining(),
            max_callback_gas,
        )
    }
}

/// Isolated context a contract callback runs in.
///
/// Writes land in an overlay over the chain state, and gas is charged
/// to a meter bounded by the execution gas limit of the callback.
#[derive(Debug)]
pub struct CallbackExecutionContext<'parent> {
    store: CachedStore<'parent>,
    gas_meter: BasicGasMeter,
}

impl<'parent> CallbackExecutionContext<'parent> {
    pub(crate) fn new(parent: &'parent dyn Store, execution_gas_limit: Gas) -> Self {
        Self {
            store: CachedStore::new(parent),
            gas_meter: BasicGasMeter::new(execution_gas_limit),
        }
    }

    pub fn store(&self) -> &CachedStore<'parent> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CachedStore<'parent> {
        &mut self.store
    }

    /// Store whose keys are namespaced under `contract_address`.
    pub fn contract_store<'ctx>(
        &'ctx mut self,
        contract_address: &'ctx str,
    ) -> NamespacedStore<'ctx, &'ctx mut CachedStore<'parent>> {
        NamespacedStore::new(contract_address, &mut self.store)
    }

    pub fn gas_meter(&self) -> &BasicGasMeter {
        &self.gas_meter
    }

    pub fn consume_gas(&mut self, amount: Gas, descriptor: &str) -> Result<(), OutOfGas> {
        self.gas_meter.consume_gas(amount, descriptor)
    }

    pub(crate) fn into_parts(self) -> (PendingWrites, BasicGasMeter) {
        (self.store.into_pending_writes(), self.gas_meter)
    }
}

/// Executor of contract callbacks.
///
/// Errors returned by the entry points of source callbacks other than
/// [`ContractKeeper::ibc_send_packet_callback`], and by destination
/// callbacks, never fail the packet lifecycle event. Running out of gas
/// must be reported with [`CallbackError::OutOfGas`].
pub trait ContractKeeper {
    /// Called after a packet has been sent. Returning an error
    /// rejects the send.
    #[allow(clippy::too_many_arguments)]
    fn ibc_send_packet_callback(
        &self,
        ctx: &mut CallbackExecutionContext<'_>,
        source_port: &PortId,
        source_channel: &ChannelId,
        timeout_height: &TimeoutHeight,
        timeout_timestamp: &TimeoutTimestamp,
        packet_data: &[u8],
        contract_address: &str,
        packet_sender_address: &str,
    ) -> Result<(), CallbackError>;

    /// Called after the acknowledgement of a packet was processed
    /// by the application.
    fn ibc_on_acknowledgement_packet_callback(
        &self,
        ctx: &mut CallbackExecutionContext<'_>,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
        relayer: &Signer,
        contract_address: &str,
        packet_sender_address: &str,
    ) -> Result<(), CallbackError>;

    /// Called after the timeout of a packet was processed by the
    /// application.
    fn ibc_on_timeout_packet_callback(
        &self,
        ctx: &mut CallbackExecutionContext<'_>,
        packet: &Packet,
        relayer: &Signer,
        contract_address: &str,
        packet_sender_address: &str,
    ) -> Result<(), CallbackError>;

    /// Called after a successful acknowledgement was written for a
    /// received packet.
    fn ibc_write_acknowledgement_callback(
        &self,
        ctx: &mut CallbackExecutionContext<'_>,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
        contract_address: &str,
    ) -> Result<(), CallbackError>;
}
