//! Rust implementation of the IBC callbacks middleware.
//!
//! Packets may request a contract to be called back, on the chain
//! that sent them (under the `src_callback` key of their memo) or on
//! the chain that received them (under `dest_callback`). Callbacks run
//! after the wrapped application handled the packet, in an isolated
//! context whose writes are only committed if the callback succeeds.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod context;
mod dispatcher;
mod error;
mod types;

use alloc::string::ToString;

use ibc_core_channel_types::acknowledgement::Acknowledgement;
use ibc_core_channel_types::channel::{Counterparty, Order};
use ibc_core_channel_types::error::{ChannelError, PacketError};
use ibc_core_channel_types::packet::Packet;
use ibc_core_channel_types::timeout::{TimeoutHeight, TimeoutTimestamp};
use ibc_core_channel_types::Version;
use ibc_core_host_types::identifiers::{ChannelId, ConnectionId, PortId, Sequence};
use ibc_core_router::module::Module as IbcCoreModule;
use ibc_core_router_types::module::ModuleExtras;
use ibc_middleware_core::gas::Gas;
use ibc_primitives::Signer;

#[doc(inline)]
pub use self::context::{
    CallbackExecutionContext, CallbacksContext, ContractKeeper, Ics4Wrapper,
    PacketDataUnmarshaler,
};
#[doc(inline)]
pub use self::dispatcher::{
    event_attribute, process_callback, CallbackOutcome, DESTINATION_CALLBACK_EVENT,
    SOURCE_CALLBACK_EVENT,
};
#[doc(inline)]
pub use self::error::{AbortReason, CallbackDataError, CallbackError, CallbacksError};
#[doc(inline)]
pub use self::types::{
    get_dest_callback_data, get_source_callback_data, CallbackData, CallbackPacket,
    CallbackType, CallbacksConfig, CALLBACK_ADDRESS_KEY, DESTINATION_CALLBACK_KEY,
    SOURCE_CALLBACK_KEY, USER_DEFINED_GAS_LIMIT_KEY,
};

/// Callbacks middleware entrypoint, which runs contract callbacks
/// requested by the packets handled by the wrapped application.
#[derive(Debug)]
pub struct CallbacksMiddleware<M, K> {
    next: M,
    contract_keeper: K,
    max_callback_gas: Gas,
}

impl<M, K> CallbacksMiddleware<M, K> {
    /// Wrap an existing middleware, calling back the contracts managed
    /// by `contract_keeper`.
    pub const fn wrap(next: M, contract_keeper: K, max_callback_gas: Gas) -> Self {
        Self {
            next,
            contract_keeper,
            max_callback_gas,
        }
    }

    /// Wrap an existing middleware, using the given configuration.
    pub const fn with_config(next: M, contract_keeper: K, config: CallbacksConfig) -> Self {
        Self::wrap(next, contract_keeper, config.max_callback_gas)
    }

    /// Return an immutable ref to the next middleware.
    pub fn next(&self) -> &M {
        &self.next
    }

    /// Return a mutable ref to the next middleware.
    pub fn next_mut(&mut self) -> &mut M {
        &mut self.next
    }

    pub fn contract_keeper(&self) -> &K {
        &self.contract_keeper
    }

    /// Maximum amount of gas a single callback may be charged.
    pub const fn max_callback_gas(&self) -> Gas {
        self.max_callback_gas
    }

    /// Unwrap the next middleware.
    pub fn into_inner(self) -> M {
        self.next
    }
}

impl<M, K> CallbacksMiddleware<M, K>
where
    M: IbcCoreModule + CallbacksContext,
    K: ContractKeeper,
{
    /// Send a packet through the next middleware, then run the source
    /// callback it requested. A failed callback rejects the send.
    pub fn send_packet_execute(
        &mut self,
        source_port: &PortId,
        source_channel: &ChannelId,
        timeout_height: &TimeoutHeight,
        timeout_timestamp: &TimeoutTimestamp,
        data: &[u8],
    ) -> (ModuleExtras, Result<Sequence, CallbacksError>) {
        let mut extras = ModuleExtras::empty();

        let sequence = match self.next.send_packet(
            source_port,
            source_channel,
            timeout_height,
            timeout_timestamp,
            data,
        ) {
            Ok(sequence) => sequence,
            Err(err) => return (extras, Err(CallbacksError::Application(err.to_string()))),
        };

        let packet = CallbackPacket {
            sequence,
            source_port,
            source_channel,
            destination: None,
            data,
        };
        let max_callback_gas = self.max_callback_gas;
        let contract_keeper = &self.contract_keeper;

        let outcome = process_callback(
            &mut self.next,
            &mut extras,
            &packet,
            CallbackType::SendPacket,
            |ctx| ctx.source_callback_data(&packet, max_callback_gas),
            |ctx, contract_address, packet_sender_address| {
                contract_keeper.ibc_send_packet_callback(
                    ctx,
                    source_port,
                    source_channel,
                    timeout_height,
                    timeout_timestamp,
                    data,
                    contract_address,
                    packet_sender_address,
                )
            },
        );

        (extras, outcome.into_send_result().map(|()| sequence))
    }

    /// Write the acknowledgement of an asynchronously processed packet,
    /// then run the destination callback it requested.
    pub fn write_acknowledgement(
        &mut self,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
    ) -> (ModuleExtras, Result<(), CallbacksError>) {
        let mut extras = ModuleExtras::empty();

        if let Err(err) = self.next.write_acknowledgement(packet, acknowledgement) {
            return (extras, Err(CallbacksError::Application(err.to_string())));
        }

        let outcome = self.dispatch_write_acknowledgement_callback(
            &mut extras,
            packet,
            acknowledgement,
        );

        (extras, outcome.into_receive_result())
    }

    /// Receive a packet with the next middleware. Successful synchronous
    /// acknowledgements trigger the destination callback of the packet.
    ///
    /// Failing callbacks do not alter the acknowledgement.
    pub fn on_recv_packet_execute(
        &mut self,
        packet: &Packet,
        relayer: &Signer,
    ) -> (ModuleExtras, Result<Option<Acknowledgement>, CallbacksError>) {
        let (mut extras, maybe_ack) = self.next.on_recv_packet_execute(packet, relayer);

        let Some(acknowledgement) = maybe_ack else {
            // NB: async acks run the callback once they are written
            return (extras, Ok(None));
        };
        if !self.next.is_successful_acknowledgement(&acknowledgement) {
            return (extras, Ok(Some(acknowledgement)));
        }

        let outcome = self.dispatch_write_acknowledgement_callback(
            &mut extras,
            packet,
            &acknowledgement,
        );

        (
            extras,
            outcome.into_receive_result().map(|()| Some(acknowledgement)),
        )
    }

    pub fn on_acknowledgement_packet_validate(
        &self,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
        relayer: &Signer,
    ) -> Result<(), PacketError> {
        self.next
            .on_acknowledgement_packet_validate(packet, acknowledgement, relayer)
    }

    /// Process the acknowledgement of a packet with the next middleware,
    /// then run the source callback of the packet.
    pub fn on_acknowledgement_packet_execute(
        &mut self,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
        relayer: &Signer,
    ) -> (ModuleExtras, Result<(), CallbacksError>) {
        let (mut extras, result) =
            self.next
                .on_acknowledgement_packet_execute(packet, acknowledgement, relayer);

        if let Err(err) = result {
            return (extras, Err(CallbacksError::Packet(err)));
        }

        let callback_packet = CallbackPacket::from(packet);
        let max_callback_gas = self.max_callback_gas;
        let contract_keeper = &self.contract_keeper;

        let outcome = process_callback(
            &mut self.next,
            &mut extras,
            &callback_packet,
            CallbackType::Acknowledgement,
            |ctx| ctx.source_callback_data(&callback_packet, max_callback_gas),
            |ctx, contract_address, packet_sender_address| {
                contract_keeper.ibc_on_acknowledgement_packet_callback(
                    ctx,
                    packet,
                    acknowledgement,
                    relayer,
                    contract_address,
                    packet_sender_address,
                )
            },
        );

        (extras, outcome.into_receive_result())
    }

    pub fn on_timeout_packet_validate(
        &self,
        packet: &Packet,
        relayer: &Signer,
    ) -> Result<(), PacketError> {
        self.next.on_timeout_packet_validate(packet, relayer)
    }

    /// Process the timeout of a packet with the next middleware,
    /// then run the source callback of the packet.
    pub fn on_timeout_packet_execute(
        &mut self,
        packet: &Packet,
        relayer: &Signer,
    ) -> (ModuleExtras, Result<(), CallbacksError>) {
        let (mut extras, result) = self.next.on_timeout_packet_execute(packet, relayer);

        if let Err(err) = result {
            return (extras, Err(CallbacksError::Packet(err)));
        }

        let callback_packet = CallbackPacket::from(packet);
        let max_callback_gas = self.max_callback_gas;
        let contract_keeper = &self.contract_keeper;

        let outcome = process_callback(
            &mut self.next,
            &mut extras,
            &callback_packet,
            CallbackType::TimeoutPacket,
            |ctx| ctx.source_callback_data(&callback_packet, max_callback_gas),
            |ctx, contract_address, packet_sender_address| {
                contract_keeper.ibc_on_timeout_packet_callback(
                    ctx,
                    packet,
                    relayer,
                    contract_address,
                    packet_sender_address,
                )
            },
        );

        (extras, outcome.into_receive_result())
    }

    fn dispatch_write_acknowledgement_callback(
        &mut self,
        extras: &mut ModuleExtras,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
    ) -> CallbackOutcome {
        let callback_packet = CallbackPacket::from(packet);
        let max_callback_gas = self.max_callback_gas;
        let contract_keeper = &self.contract_keeper;

        process_callback(
            &mut self.next,
            extras,
            &callback_packet,
            CallbackType::WriteAcknowledgement,
            |ctx| ctx.dest_callback_data(&callback_packet, max_callback_gas),
            |ctx, contract_address, _| {
                contract_keeper.ibc_write_acknowledgement_callback(
                    ctx,
                    packet,
                    acknowledgement,
                    contract_address,
                )
            },
        )
    }

    // =========================================================================
    // the calls below are simply forwarded to the next middleware
    // =========================================================================

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn get_app_version(&self, port_id: &PortId, channel_id: &ChannelId) -> Option<Version> {
        self.next.get_app_version(port_id, channel_id)
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn unmarshal_packet_data(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        data: &[u8],
    ) -> Result<M::PacketData, M::UnmarshalError> {
        self.next.unmarshal_packet_data(port_id, channel_id, data)
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_open_init_validate(
        &self,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        version: &Version,
    ) -> Result<Version, ChannelError> {
        self.next.on_chan_open_init_validate(
            order,
            connection_hops,
            port_id,
            channel_id,
            counterparty,
            version,
        )
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_open_init_execute(
        &mut self,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        version: &Version,
    ) -> Result<(ModuleExtras, Version), ChannelError> {
        self.next.on_chan_open_init_execute(
            order,
            connection_hops,
            port_id,
            channel_id,
            counterparty,
            version,
        )
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_open_try_validate(
        &self,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        counterparty_version: &Version,
    ) -> Result<Version, ChannelError> {
        self.next.on_chan_open_try_validate(
            order,
            connection_hops,
            port_id,
            channel_id,
            counterparty,
            counterparty_version,
        )
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_open_try_execute(
        &mut self,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        counterparty_version: &Version,
    ) -> Result<(ModuleExtras, Version), ChannelError> {
        self.next.on_chan_open_try_execute(
            order,
            connection_hops,
            port_id,
            channel_id,
            counterparty,
            counterparty_version,
        )
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_open_ack_validate(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty_version: &Version,
    ) -> Result<(), ChannelError> {
        self.next
            .on_chan_open_ack_validate(port_id, channel_id, counterparty_version)
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_open_ack_execute(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty_version: &Version,
    ) -> Result<ModuleExtras, ChannelError> {
        self.next
            .on_chan_open_ack_execute(port_id, channel_id, counterparty_version)
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_open_confirm_validate(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), ChannelError> {
        self.next.on_chan_open_confirm_validate(port_id, channel_id)
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_open_confirm_execute(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<ModuleExtras, ChannelError> {
        self.next.on_chan_open_confirm_execute(port_id, channel_id)
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_close_init_validate(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), ChannelError> {
        self.next.on_chan_close_init_validate(port_id, channel_id)
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_close_init_execute(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<ModuleExtras, ChannelError> {
        self.next.on_chan_close_init_execute(port_id, channel_id)
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_close_confirm_validate(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), ChannelError> {
        self.next
            .on_chan_close_confirm_validate(port_id, channel_id)
    }

    #[cfg_attr(coverage_nightly, coverage(off))]
    pub fn on_chan_close_confirm_execute(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<ModuleExtras, ChannelError> {
        self.next.on_chan_close_confirm_execute(port_id, channel_id)
    }
}
