//! Execution of contract callbacks in an isolated context.

use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use ibc_core_router_types::event::{ModuleEvent, ModuleEventAttribute};
use ibc_core_router_types::module::ModuleExtras;
use ibc_middleware_core::gas::{Gas, GasMeter, OutOfGas};
use tracing::debug;

use crate::context::{CallbackExecutionContext, CallbacksContext};
use crate::error::{AbortReason, CallbackDataError, CallbackError, CallbacksError};
use crate::types::{CallbackData, CallbackPacket, CallbackType};

/// Module name of the callbacks middleware.
pub(crate) const MODULE: &str = "ibccallbacks";

/// Event kind of callbacks running on the source chain of a packet.
pub const SOURCE_CALLBACK_EVENT: &str = "ibc_src_callback";

/// Event kind of callbacks running on the destination chain of a packet.
pub const DESTINATION_CALLBACK_EVENT: &str = "ibc_dest_callback";

/// Outcome of dispatching a callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The packet did not request a callback.
    NoCallback,
    /// The callback succeeded, and its writes were committed.
    Committed,
    /// The callback failed, and its writes were discarded.
    CallbackFailed(CallbackError),
    /// The enclosing transaction must be aborted.
    FatalAbort(AbortReason),
}

impl CallbackOutcome {
    /// Convert the outcome of a send callback into a result. Failed
    /// callbacks veto the send.
    pub fn into_send_result(self) -> Result<(), CallbacksError> {
        match self {
            Self::NoCallback | Self::Committed => Ok(()),
            Self::CallbackFailed(err) => Err(CallbacksError::CallbackRejected(err)),
            Self::FatalAbort(reason) => Err(CallbacksError::FatalAbort(reason)),
        }
    }

    /// Convert the outcome of a callback triggered by a packet being
    /// received or acknowledged into a result. Failed callbacks are
    /// ignored.
    pub fn into_receive_result(self) -> Result<(), CallbacksError> {
        match self {
            Self::NoCallback | Self::Committed | Self::CallbackFailed(_) => Ok(()),
            Self::FatalAbort(reason) => Err(CallbacksError::FatalAbort(reason)),
        }
    }

    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalAbort(_))
    }
}

/// Resolve the callback requested by `packet`, and run it.
///
/// The callback executes with `run` against a [`CallbackExecutionContext`]
/// limited to the execution gas limit of the callback. Its writes are
/// merged into the store of `ctx` only if it succeeds. Once the callback
/// has run, an event is emitted and the gas it consumed is charged to
/// `ctx`, regardless of the outcome.
pub fn process_callback<C, R, F>(
    ctx: &mut C,
    extras: &mut ModuleExtras,
    packet: &CallbackPacket<'_>,
    callback_type: CallbackType,
    resolve: R,
    run: F,
) -> CallbackOutcome
where
    C: CallbacksContext + ?Sized,
    R: FnOnce(&C) -> Result<CallbackData, CallbackDataError>,
    F: FnOnce(&mut CallbackExecutionContext<'_>, &str, &str) -> Result<(), CallbackError>,
{
    let callback_data = match resolve(&*ctx) {
        Ok(callback_data) => callback_data,
        Err(err) => {
            debug!(
                sequence = %packet.sequence,
                port_id = %packet.source_port,
                channel_id = %packet.source_channel,
                %err,
                "Failed to get callback data"
            );
            return CallbackOutcome::NoCallback;
        }
    };
    if !callback_data.has_callback() {
        debug!(
            sequence = %packet.sequence,
            port_id = %packet.source_port,
            channel_id = %packet.source_channel,
            "No {callback_type} callback found for packet"
        );
        return CallbackOutcome::NoCallback;
    }

    let mut sandbox =
        CallbackExecutionContext::new(ctx.store(), callback_data.execution_gas_limit);
    let result = run(
        &mut sandbox,
        &callback_data.contract_address,
        &callback_data.sender_address,
    );
    let (pending_writes, sandbox_gas_meter) = sandbox.into_parts();

    // crossing the limit is an out of gas error, whatever the callback returned
    let result = match result {
        Err(err @ CallbackError::OutOfGas(_)) => Err(err),
        _ if sandbox_gas_meter.gas_consumed() > sandbox_gas_meter.limit() => {
            Err(CallbackError::OutOfGas(OutOfGas {
                descriptor: format!("ibc {callback_type} callback execution"),
                consumed: sandbox_gas_meter.gas_consumed(),
                limit: sandbox_gas_meter.limit(),
            }))
        }
        result => result,
    };

    let outcome = match result {
        Ok(()) => match pending_writes.apply(ctx.store_mut()) {
            Ok(()) => CallbackOutcome::Committed,
            // the merge may be partial, so the host must revert the
            // whole transaction
            Err(err) => CallbackOutcome::FatalAbort(AbortReason::Commit(err.to_string())),
        },
        Err(CallbackError::OutOfGas(err)) if callback_data.allows_retry() => {
            debug!(
                sequence = %packet.sequence,
                %err,
                "Callback ran out of gas, allowing the relayer to retry"
            );
            CallbackOutcome::FatalAbort(AbortReason::OutOfGas(err))
        }
        Err(err) => CallbackOutcome::CallbackFailed(err),
    };

    finalize_callback(
        ctx,
        extras,
        packet,
        callback_type,
        &callback_data,
        sandbox_gas_meter.gas_consumed_to_limit(),
        outcome,
    )
}

/// Record the outcome of a callback that ran. This must happen exactly
/// once per callback execution.
fn finalize_callback<C>(
    ctx: &mut C,
    extras: &mut ModuleExtras,
    packet: &CallbackPacket<'_>,
    callback_type: CallbackType,
    callback_data: &CallbackData,
    gas_consumed: Gas,
    outcome: CallbackOutcome,
) -> CallbackOutcome
where
    C: CallbacksContext + ?Sized,
{
    let error = match &outcome {
        CallbackOutcome::NoCallback | CallbackOutcome::Committed => None,
        CallbackOutcome::CallbackFailed(err) => Some(err.to_string()),
        CallbackOutcome::FatalAbort(reason) => Some(reason.to_string()),
    };

    emit_callback_event(extras, packet, callback_type, callback_data, error.as_deref());
    if let Some(err) = &error {
        extras.log.push(format!(
            "{MODULE}: {callback_type} callback of contract {} failed: {err}",
            callback_data.contract_address
        ));
    }

    let charged = ctx
        .gas_meter_mut()
        .consume_gas(gas_consumed, &format!("ibc {callback_type} callback"));

    match (charged, outcome) {
        (Err(err), outcome) if !outcome.is_fatal() => {
            CallbackOutcome::FatalAbort(AbortReason::OutOfGas(err))
        }
        (_, outcome) => outcome,
    }
}

fn emit_callback_event(
    extras: &mut ModuleExtras,
    packet: &CallbackPacket<'_>,
    callback_type: CallbackType,
    callback_data: &CallbackData,
    error: Option<&str>,
) {
    let mut attributes = Vec::with_capacity(11);

    push_event_attr(&mut attributes, "module", MODULE);
    push_event_attr(&mut attributes, "callback_trigger", callback_type.as_str());
    push_event_attr(
        &mut attributes,
        "callback_address",
        callback_data.contract_address.as_str(),
    );
    push_event_attr(
        &mut attributes,
        "callback_exec_gas_limit",
        callback_data.execution_gas_limit.to_string(),
    );
    push_event_attr(
        &mut attributes,
        "callback_commit_gas_limit",
        callback_data.commit_gas_limit.to_string(),
    );
    push_event_attr(
        &mut attributes,
        "packet_sequence",
        packet.sequence.to_string(),
    );

    let kind = if callback_type.is_source_callback() {
        push_event_attr(
            &mut attributes,
            "packet_src_port",
            packet.source_port.to_string(),
        );
        push_event_attr(
            &mut attributes,
            "packet_src_channel",
            packet.source_channel.to_string(),
        );
        SOURCE_CALLBACK_EVENT
    } else {
        // destination callbacks always know their destination
        if let Some((port_id, channel_id)) = packet.destination {
            push_event_attr(&mut attributes, "packet_dest_port", port_id.to_string());
            push_event_attr(
                &mut attributes,
                "packet_dest_channel",
                channel_id.to_string(),
            );
        }
        DESTINATION_CALLBACK_EVENT
    };

    match error {
        None => push_event_attr(&mut attributes, "callback_result", "success"),
        Some(err) => {
            push_event_attr(&mut attributes, "callback_result", "failure");
            push_event_attr(&mut attributes, "callback_error", err);
        }
    }

    emit_event_with_attrs(extras, kind, attributes);
}

#[inline]
fn event_attr<K, V>(key: K, value: V) -> ModuleEventAttribute
where
    K: Into<String>,
    V: Into<String>,
{
    ModuleEventAttribute {
        key: key.into(),
        value: value.into(),
    }
}

#[inline]
fn push_event_attr<K, V>(attributes: &mut Vec<ModuleEventAttribute>, key: K, value: V)
where
    K: Into<String>,
    V: Into<String>,
{
    attributes.push(event_attr(key, value));
}

#[inline]
fn emit_event_with_attrs(
    extras: &mut ModuleExtras,
    kind: &str,
    attributes: Vec<ModuleEventAttribute>,
) {
    extras.events.push(ModuleEvent {
        kind: kind.to_owned(),
        attributes,
    });
}

/// Find the value of the attribute `key` of `event`.
pub fn event_attribute<'ev>(event: &'ev ModuleEvent, key: &str) -> Option<&'ev str> {
    event
        .attributes
        .iter()
        .find_map(|attr| (attr.key == key).then_some(attr.value.as_str()))
}
