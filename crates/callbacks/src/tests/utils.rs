use std::cell::RefCell;
use std::collections::HashSet;

use ibc_core_channel_types::acknowledgement::{AcknowledgementStatus, StatusValue};
use ibc_middleware_core::gas::{BasicGasMeter, GasMeter};
use ibc_middleware_core::multi_ack::{AppAcknowledgement, LegacyMultiAck};
use ibc_middleware_core::store::Store;
use ibc_middleware_core::test_utils::MockStore;
use ibc_middleware_transfer_types::{
    encode_packet_data_v1, encode_packet_data_v2, unmarshal_packet_data, Denom, Hop,
    FungibleTokenPacketData, FungibleTokenPacketDataV2, ForwardingPacketData, Token,
    TransferError, MODULE_ID_STR, V1,
};
use ibc_testkit::testapp::ibc::applications::transfer::types::DummyTransferModule;

use super::*;

pub mod addresses {
    pub const SENDER: &str = "a1arndt";
    pub const RECEIVER: &str = "b1bertha";
    pub const CONTRACT: &str = "a1contract";
    pub const RELAYER: &str = "RELAYER";
}

pub trait StrExt {
    fn signer(&self) -> Signer;
}

impl StrExt for str {
    fn signer(&self) -> Signer {
        self.to_string().into()
    }
}

// NOTE: Packets are sent from chain A to chain B.
pub mod channels {
    pub const AB: u64 = 0;
    pub const BA: u64 = 1;
}

/// Outer gas available to the transactions run by tests.
pub const TX_GAS_LIMIT: u64 = 10_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FailurePoint {
    SendPacket,
    WriteAcknowledgement,
    OnAcknowledgementPacket,
    OnTimeoutPacket,
}

/// Acknowledgement written by [`TestApp`] when receiving packets.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecvAck {
    Success,
    Failure,
    Async,
}

/// Format of the acknowledgements written by [`TestApp`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AckEncoding {
    Json,
    MultiAck,
}

#[derive(Debug)]
pub struct TestApp {
    app: DummyTransferModule,
    failure_injections: HashSet<FailurePoint>,
    pub recv_ack: RecvAck,
    pub ack_encoding: AckEncoding,
    pub app_version: String,
    pub store: MockStore,
    pub gas_meter: BasicGasMeter,
    pub sent_packets: Vec<(PortId, ChannelId, Vec<u8>)>,
    pub written_acks: Vec<(Packet, Acknowledgement)>,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            app: DummyTransferModule::new(),
            failure_injections: HashSet::new(),
            recv_ack: RecvAck::Success,
            ack_encoding: AckEncoding::Json,
            app_version: V1.to_string(),
            store: MockStore::default(),
            gas_meter: BasicGasMeter::new(TX_GAS_LIMIT),
            sent_packets: Vec::new(),
            written_acks: Vec::new(),
        }
    }

    pub fn inject_failure(&mut self, point: FailurePoint) {
        self.failure_injections.insert(point);
    }

    /// Encode `ack` with the configured [`AckEncoding`].
    pub fn encode_ack(&self, ack: Acknowledgement) -> Acknowledgement {
        match self.ack_encoding {
            AckEncoding::Json => ack,
            AckEncoding::MultiAck => multi_ack(&ack),
        }
    }

    fn check_failure_injection(&self, point: FailurePoint) -> Result<(), String> {
        if !self.failure_injections.contains(&point) {
            Ok(())
        } else {
            Err(failure_injection_err_msg(point))
        }
    }
}

impl IbcCoreModule for TestApp {
    fn on_chan_open_init_validate(
        &self,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        version: &Version,
    ) -> Result<Version, ChannelError> {
        self.app.on_chan_open_init_validate(
            order,
            connection_hops,
            port_id,
            channel_id,
            counterparty,
            version,
        )
    }

    fn on_chan_open_init_execute(
        &mut self,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        version: &Version,
    ) -> Result<(ModuleExtras, Version), ChannelError> {
        self.app.on_chan_open_init_execute(
            order,
            connection_hops,
            port_id,
            channel_id,
            counterparty,
            version,
        )
    }

    fn on_chan_open_try_validate(
        &self,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        counterparty_version: &Version,
    ) -> Result<Version, ChannelError> {
        self.app.on_chan_open_try_validate(
            order,
            connection_hops,
            port_id,
            channel_id,
            counterparty,
            counterparty_version,
        )
    }

    fn on_chan_open_try_execute(
        &mut self,
        order: Order,
        connection_hops: &[ConnectionId],
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty: &Counterparty,
        counterparty_version: &Version,
    ) -> Result<(ModuleExtras, Version), ChannelError> {
        self.app.on_chan_open_try_execute(
            order,
            connection_hops,
            port_id,
            channel_id,
            counterparty,
            counterparty_version,
        )
    }

    fn on_chan_open_ack_validate(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty_version: &Version,
    ) -> Result<(), ChannelError> {
        self.app
            .on_chan_open_ack_validate(port_id, channel_id, counterparty_version)
    }

    fn on_chan_open_ack_execute(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty_version: &Version,
    ) -> Result<ModuleExtras, ChannelError> {
        self.app
            .on_chan_open_ack_execute(port_id, channel_id, counterparty_version)
    }

    fn on_chan_open_confirm_validate(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), ChannelError> {
        self.app.on_chan_open_confirm_validate(port_id, channel_id)
    }

    fn on_chan_open_confirm_execute(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<ModuleExtras, ChannelError> {
        self.app.on_chan_open_confirm_execute(port_id, channel_id)
    }

    fn on_chan_close_init_validate(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), ChannelError> {
        self.app.on_chan_close_init_validate(port_id, channel_id)
    }

    fn on_chan_close_init_execute(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<ModuleExtras, ChannelError> {
        self.app.on_chan_close_init_execute(port_id, channel_id)
    }

    fn on_chan_close_confirm_validate(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), ChannelError> {
        self.app.on_chan_close_confirm_validate(port_id, channel_id)
    }

    fn on_chan_close_confirm_execute(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<ModuleExtras, ChannelError> {
        self.app.on_chan_close_confirm_execute(port_id, channel_id)
    }

    fn on_recv_packet_execute(
        &mut self,
        packet: &Packet,
        relayer: &Signer,
    ) -> (ModuleExtras, Option<Acknowledgement>) {
        let (extras, _) = self.app.on_recv_packet_execute(packet, relayer);

        let ack = match self.recv_ack {
            RecvAck::Success => Some(success_ack()),
            RecvAck::Failure => Some(error_ack("oh no")),
            RecvAck::Async => None,
        };

        (extras, ack.map(|ack| self.encode_ack(ack)))
    }

    fn on_acknowledgement_packet_validate(
        &self,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
        relayer: &Signer,
    ) -> Result<(), PacketError> {
        self.app
            .on_acknowledgement_packet_validate(packet, acknowledgement, relayer)
    }

    fn on_acknowledgement_packet_execute(
        &mut self,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
        relayer: &Signer,
    ) -> (ModuleExtras, Result<(), PacketError>) {
        if let Err(description) =
            self.check_failure_injection(FailurePoint::OnAcknowledgementPacket)
        {
            return (ModuleExtras::empty(), Err(PacketError::Other { description }));
        }

        self.app
            .on_acknowledgement_packet_execute(packet, acknowledgement, relayer)
    }

    fn on_timeout_packet_validate(
        &self,
        packet: &Packet,
        relayer: &Signer,
    ) -> Result<(), PacketError> {
        self.app.on_timeout_packet_validate(packet, relayer)
    }

    fn on_timeout_packet_execute(
        &mut self,
        packet: &Packet,
        relayer: &Signer,
    ) -> (ModuleExtras, Result<(), PacketError>) {
        if let Err(description) = self.check_failure_injection(FailurePoint::OnTimeoutPacket) {
            return (ModuleExtras::empty(), Err(PacketError::Other { description }));
        }

        self.app.on_timeout_packet_execute(packet, relayer)
    }
}

impl Ics4Wrapper for TestApp {
    type Error = String;

    fn send_packet(
        &mut self,
        port_id_on_a: &PortId,
        chan_id_on_a: &ChannelId,
        _timeout_height_on_b: &TimeoutHeight,
        _timeout_timestamp_on_b: &TimeoutTimestamp,
        data: &[u8],
    ) -> Result<Sequence, Self::Error> {
        self.check_failure_injection(FailurePoint::SendPacket)?;
        self.sent_packets
            .push((port_id_on_a.clone(), chan_id_on_a.clone(), data.to_vec()));
        Ok(Sequence::from(self.sent_packets.len() as u64))
    }

    fn write_acknowledgement(
        &mut self,
        packet: &Packet,
        acknowledgement: &Acknowledgement,
    ) -> Result<(), Self::Error> {
        self.check_failure_injection(FailurePoint::WriteAcknowledgement)?;
        self.written_acks
            .push((packet.clone(), acknowledgement.clone()));
        Ok(())
    }

    fn get_app_version(&self, _port_id: &PortId, _channel_id: &ChannelId) -> Option<Version> {
        Some(Version::new(self.app_version.clone()))
    }
}

impl PacketDataUnmarshaler for TestApp {
    type PacketData = FungibleTokenPacketDataV2;
    type UnmarshalError = TransferError;

    fn unmarshal_packet_data(
        &self,
        _port_id: &PortId,
        _channel_id: &ChannelId,
        data: &[u8],
    ) -> Result<Self::PacketData, Self::UnmarshalError> {
        unmarshal_packet_data(data, &self.app_version)
    }
}

impl CallbacksContext for TestApp {
    fn store(&self) -> &dyn Store {
        &self.store
    }

    fn store_mut(&mut self) -> &mut dyn Store {
        &mut self.store
    }

    fn gas_meter(&self) -> &dyn GasMeter {
        &self.gas_meter
    }

    fn gas_meter_mut(&mut self) -> &mut dyn GasMeter {
        &mut self.gas_meter
    }

    fn is_successful_acknowledgement(&self, acknowledgement: &Acknowledgement) -> bool {
        match self.ack_encoding {
            AckEncoding::Json => AppAcknowledgement::is_successful(acknowledgement),
            AckEncoding::MultiAck => LegacyMultiAck::decode(acknowledgement.as_bytes())
                .is_ok_and(|multi_ack| multi_ack.is_successful()),
        }
    }
}

/// What a [`TestContractKeeper`] does when called back.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContractBehavior {
    /// Write some state, and consume `gas`.
    Succeed { gas: u64 },
    /// Write some state, then fail.
    Fail,
    /// Write some state, then consume more gas than allowed.
    ExhaustGas,
    /// Consume more gas than allowed, but report success.
    IgnoreOutOfGas,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractCall {
    pub callback_type: CallbackType,
    pub contract_address: String,
    pub packet_sender_address: String,
}

#[derive(Debug)]
pub struct TestContractKeeper {
    pub behavior: ContractBehavior,
    pub calls: RefCell<Vec<ContractCall>>,
}

impl TestContractKeeper {
    pub fn new(behavior: ContractBehavior) -> Self {
        Self {
            behavior,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ContractCall> {
        self.calls.borrow().clone()
    }

    fn run(
        &self,
        ctx: &mut CallbackExecutionContext<'_>,
        callback_type: CallbackType,
        contract_address: &str,
        packet_sender_address: &str,
    ) -> Result<(), CallbackError> {
        self.calls.borrow_mut().push(ContractCall {
            callback_type,
            contract_address: contract_address.to_string(),
            packet_sender_address: packet_sender_address.to_string(),
        });

        let limit = ctx.gas_meter().limit();

        match self.behavior {
            ContractBehavior::Succeed { gas } => {
                ctx.contract_store(contract_address)
                    .write(callback_type.as_str(), &[1])?;
                ctx.consume_gas(gas, "contract execution")?;
                Ok(())
            }
            ContractBehavior::Fail => {
                ctx.contract_store(contract_address)
                    .write(callback_type.as_str(), &[1])?;
                Err(CallbackError::Contract("contract said no".to_string()))
            }
            ContractBehavior::ExhaustGas => {
                ctx.contract_store(contract_address)
                    .write(callback_type.as_str(), &[1])?;
                ctx.consume_gas(limit + 1, "contract execution")?;
                Ok(())
            }
            ContractBehavior::IgnoreOutOfGas => {
                _ = ctx.consume_gas(limit + 1, "contract execution");
                Ok(())
            }
        }
    }
}

impl ContractKeeper for TestContractKeeper {
    fn ibc_send_packet_callback(
        &self,
        ctx: &mut CallbackExecutionContext<'_>,
        _source_port: &PortId,
        _source_channel: &ChannelId,
        _timeout_height: &TimeoutHeight,
        _timeout_timestamp: &TimeoutTimestamp,
        _packet_data: &[u8],
        contract_address: &str,
        packet_sender_address: &str,
    ) -> Result<(), CallbackError> {
        self.run(
            ctx,
            CallbackType::SendPacket,
            contract_address,
            packet_sender_address,
        )
    }

    fn ibc_on_acknowledgement_packet_callback(
        &self,
        ctx: &mut CallbackExecutionContext<'_>,
        _packet: &Packet,
        _acknowledgement: &Acknowledgement,
        _relayer: &Signer,
        contract_address: &str,
        packet_sender_address: &str,
    ) -> Result<(), CallbackError> {
        self.run(
            ctx,
            CallbackType::Acknowledgement,
            contract_address,
            packet_sender_address,
        )
    }

    fn ibc_on_timeout_packet_callback(
        &self,
        ctx: &mut CallbackExecutionContext<'_>,
        _packet: &Packet,
        _relayer: &Signer,
        contract_address: &str,
        packet_sender_address: &str,
    ) -> Result<(), CallbackError> {
        self.run(
            ctx,
            CallbackType::TimeoutPacket,
            contract_address,
            packet_sender_address,
        )
    }

    fn ibc_write_acknowledgement_callback(
        &self,
        ctx: &mut CallbackExecutionContext<'_>,
        _packet: &Packet,
        _acknowledgement: &Acknowledgement,
        contract_address: &str,
    ) -> Result<(), CallbackError> {
        self.run(ctx, CallbackType::WriteAcknowledgement, contract_address, "")
    }
}

fn failure_injection_err_msg(point: FailurePoint) -> String {
    format!("Failure injection on {point:?}")
}

pub type DummyCallbacks = CallbacksMiddleware<TestApp, TestContractKeeper>;

pub const MAX_CALLBACK_GAS: u64 = 1_000;

pub fn get_dummy_callbacks(behavior: ContractBehavior) -> DummyCallbacks {
    CallbacksMiddleware::wrap(
        TestApp::new(),
        TestContractKeeper::new(behavior),
        MAX_CALLBACK_GAS,
    )
}

pub fn success_ack() -> Acknowledgement {
    AcknowledgementStatus::success(StatusValue::new("AQ==").unwrap()).into()
}

pub fn error_ack(message: &str) -> Acknowledgement {
    AcknowledgementStatus::error(StatusValue::new(message).unwrap()).into()
}

/// Wrap `ack` in a multi-acknowledgement envelope, written by the
/// transfer application.
pub fn multi_ack(ack: &Acknowledgement) -> Acknowledgement {
    Acknowledgement::try_from(LegacyMultiAck::new(ack, MODULE_ID_STR).acknowledgement_bytes())
        .unwrap()
}

/// Memo requesting a callback from [`addresses::CONTRACT`] under `key`.
pub fn callback_memo(key: &str, gas_limit: Option<u64>) -> String {
    let mut callback = serde_json::json!({ "address": addresses::CONTRACT });
    if let Some(gas_limit) = gas_limit {
        callback["gas_limit"] = gas_limit.to_string().into();
    }
    let mut memo = serde_json::Map::new();
    memo.insert(key.to_string(), callback);
    serde_json::Value::Object(memo).to_string()
}

pub fn get_dummy_packet_data(memo: String) -> FungibleTokenPacketData {
    FungibleTokenPacketData {
        denom: format!("transfer/channel-{}/uatom", channels::BA),
        amount: "100".to_string(),
        sender: addresses::SENDER.to_string(),
        receiver: addresses::RECEIVER.to_string(),
        memo,
    }
}

pub fn get_dummy_packet_data_v2(memo: String) -> FungibleTokenPacketDataV2 {
    FungibleTokenPacketDataV2 {
        tokens: vec![Token {
            denom: Denom::new("uatom", vec![Hop::new("transfer", "channel-1")]),
            amount: "100".to_string(),
        }],
        sender: addresses::SENDER.to_string(),
        receiver: addresses::RECEIVER.to_string(),
        memo,
        forwarding: ForwardingPacketData::default(),
    }
}

pub fn get_encoded_dummy_packet_data(memo: String) -> Vec<u8> {
    encode_packet_data_v1(&get_dummy_packet_data(memo)).unwrap()
}

pub fn get_encoded_dummy_packet_data_v2(memo: String) -> Vec<u8> {
    encode_packet_data_v2(&get_dummy_packet_data_v2(memo))
}

pub fn get_dummy_packet_with_data(seq: u64, data: Vec<u8>) -> Packet {
    Packet {
        data,
        seq_on_a: seq.into(),
        port_id_on_a: PortId::transfer(),
        chan_id_on_a: ChannelId::new(channels::AB),
        port_id_on_b: PortId::transfer(),
        chan_id_on_b: ChannelId::new(channels::BA),
        timeout_height_on_b: TimeoutHeight::Never,
        timeout_timestamp_on_b: TimeoutTimestamp::Never,
    }
}

pub fn get_dummy_packet(seq: u64, memo: String) -> Packet {
    get_dummy_packet_with_data(seq, get_encoded_dummy_packet_data(memo))
}
