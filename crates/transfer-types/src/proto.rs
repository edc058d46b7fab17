//! Protobuf wire types of V2 transfer packets.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use prost::encoding::{decode_key, decode_varint, WireType};

use crate::denom::{Denom, Hop};
use crate::packet::{ForwardingPacketData, FungibleTokenPacketDataV2, Token};

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RawHop {
    #[prost(string, tag = "1")]
    pub port_id: String,
    #[prost(string, tag = "2")]
    pub channel_id: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RawDenom {
    #[prost(string, tag = "1")]
    pub base: String,
    #[prost(message, repeated, tag = "3")]
    pub trace: Vec<RawHop>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RawToken {
    #[prost(message, optional, tag = "1")]
    pub denom: Option<RawDenom>,
    #[prost(string, tag = "2")]
    pub amount: String,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RawForwardingPacketData {
    #[prost(string, tag = "1")]
    pub destination_memo: String,
    #[prost(message, repeated, tag = "2")]
    pub hops: Vec<RawHop>,
}

#[derive(Clone, PartialEq, Eq, ::prost::Message)]
pub struct RawFungibleTokenPacketDataV2 {
    #[prost(message, repeated, tag = "1")]
    pub tokens: Vec<RawToken>,
    #[prost(string, tag = "2")]
    pub sender: String,
    #[prost(string, tag = "3")]
    pub receiver: String,
    #[prost(string, tag = "4")]
    pub memo: String,
    #[prost(message, optional, tag = "5")]
    pub forwarding: Option<RawForwardingPacketData>,
}

impl From<RawHop> for Hop {
    fn from(raw: RawHop) -> Self {
        Hop {
            port_id: raw.port_id,
            channel_id: raw.channel_id,
        }
    }
}

impl From<Hop> for RawHop {
    fn from(hop: Hop) -> Self {
        RawHop {
            port_id: hop.port_id,
            channel_id: hop.channel_id,
        }
    }
}

impl From<RawDenom> for Denom {
    fn from(raw: RawDenom) -> Self {
        Denom {
            base: raw.base,
            trace: raw.trace.into_iter().map(Hop::from).collect(),
        }
    }
}

impl From<Denom> for RawDenom {
    fn from(denom: Denom) -> Self {
        RawDenom {
            base: denom.base,
            trace: denom.trace.into_iter().map(RawHop::from).collect(),
        }
    }
}

impl From<RawToken> for Token {
    fn from(raw: RawToken) -> Self {
        Token {
            denom: raw.denom.map(Denom::from).unwrap_or_default(),
            amount: raw.amount,
        }
    }
}

// Embedded messages are always encoded, even when empty.
impl From<Token> for RawToken {
    fn from(token: Token) -> Self {
        RawToken {
            denom: Some(token.denom.into()),
            amount: token.amount,
        }
    }
}

impl From<RawForwardingPacketData> for ForwardingPacketData {
    fn from(raw: RawForwardingPacketData) -> Self {
        ForwardingPacketData {
            destination_memo: raw.destination_memo,
            hops: raw.hops.into_iter().map(Hop::from).collect(),
        }
    }
}

impl From<ForwardingPacketData> for RawForwardingPacketData {
    fn from(forwarding: ForwardingPacketData) -> Self {
        RawForwardingPacketData {
            destination_memo: forwarding.destination_memo,
            hops: forwarding.hops.into_iter().map(RawHop::from).collect(),
        }
    }
}

impl From<RawFungibleTokenPacketDataV2> for FungibleTokenPacketDataV2 {
    fn from(raw: RawFungibleTokenPacketDataV2) -> Self {
        FungibleTokenPacketDataV2 {
            tokens: raw.tokens.into_iter().map(Token::from).collect(),
            sender: raw.sender,
            receiver: raw.receiver,
            memo: raw.memo,
            forwarding: raw.forwarding.map(Into::into).unwrap_or_default(),
        }
    }
}

impl From<FungibleTokenPacketDataV2> for RawFungibleTokenPacketDataV2 {
    fn from(data: FungibleTokenPacketDataV2) -> Self {
        RawFungibleTokenPacketDataV2 {
            tokens: data.tokens.into_iter().map(RawToken::from).collect(),
            sender: data.sender,
            receiver: data.receiver,
            memo: data.memo,
            forwarding: Some(data.forwarding.into()),
        }
    }
}

/// Kind of value a field of a [`Schema`] holds on the wire.
#[derive(Copy, Clone)]
enum FieldKind {
    String,
    Message(&'static Schema),
}

/// Field numbers known by a message.
struct Schema {
    name: &'static str,
    fields: &'static [(u32, FieldKind)],
}

impl Schema {
    fn field(&self, tag: u32) -> Option<FieldKind> {
        self.fields
            .iter()
            .find_map(|&(field_tag, kind)| (field_tag == tag).then_some(kind))
    }
}

const HOP_SCHEMA: Schema = Schema {
    name: "Hop",
    fields: &[(1, FieldKind::String), (2, FieldKind::String)],
};

const DENOM_SCHEMA: Schema = Schema {
    name: "Denom",
    fields: &[(1, FieldKind::String), (3, FieldKind::Message(&HOP_SCHEMA))],
};

const TOKEN_SCHEMA: Schema = Schema {
    name: "Token",
    fields: &[(1, FieldKind::Message(&DENOM_SCHEMA)), (2, FieldKind::String)],
};

const FORWARDING_SCHEMA: Schema = Schema {
    name: "ForwardingPacketData",
    fields: &[(1, FieldKind::String), (2, FieldKind::Message(&HOP_SCHEMA))],
};

const PACKET_DATA_V2_SCHEMA: Schema = Schema {
    name: "FungibleTokenPacketDataV2",
    fields: &[
        (1, FieldKind::Message(&TOKEN_SCHEMA)),
        (2, FieldKind::String),
        (3, FieldKind::String),
        (4, FieldKind::String),
        (5, FieldKind::Message(&FORWARDING_SCHEMA)),
    ],
};

/// Reject encoded V2 packet data carrying fields unknown to this
/// version of the protocol, at any nesting level, or known fields
/// encoded with an unexpected wire type.
pub(crate) fn reject_unknown_fields(bytes: &[u8]) -> Result<(), String> {
    reject_unknown_fields_in(bytes, &PACKET_DATA_V2_SCHEMA)
}

fn reject_unknown_fields_in(mut buf: &[u8], schema: &Schema) -> Result<(), String> {
    while !buf.is_empty() {
        let (tag, wire_type) = decode_key(&mut buf).map_err(|err| format!("{err}"))?;

        let Some(kind) = schema.field(tag) else {
            return Err(format!(
                "unknown field with tag {tag} in message {}",
                schema.name
            ));
        };

        if wire_type != WireType::LengthDelimited {
            return Err(format!(
                "field with tag {tag} in message {} has wire type {wire_type:?}, \
                 expected LengthDelimited",
                schema.name
            ));
        }

        let len = decode_varint(&mut buf).map_err(|err| format!("{err}"))?;
        let payload = usize::try_from(len)
            .ok()
            .and_then(|len| buf.get(..len))
            .ok_or_else(|| {
                format!(
                    "field with tag {tag} in message {} overruns the buffer",
                    schema.name
                )
            })?;

        if let FieldKind::Message(nested) = kind {
            reject_unknown_fields_in(payload, nested)?;
        }

        buf = &buf[payload.len()..];
    }

    Ok(())
}
