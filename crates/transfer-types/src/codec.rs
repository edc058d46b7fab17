//! Encoding and decoding of transfer packet data.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Write;

use prost::Message;

use crate::denom::extract_denom_from_path;
use crate::error::TransferError;
use crate::packet::{ForwardingPacketData, FungibleTokenPacketData, FungibleTokenPacketDataV2, Token};
use crate::proto::{reject_unknown_fields, RawFungibleTokenPacketDataV2};
use crate::{V1, V2};

/// Decode the packet data of a transfer sent with `version` of the
/// protocol.
///
/// V1 payloads are converted to V2 payloads. The payload is always
/// validated before being returned.
pub fn unmarshal_packet_data(
    bytes: &[u8],
    version: &str,
) -> Result<FungibleTokenPacketDataV2, TransferError> {
    // NB: the payload encoding is implied by the version
    match version {
        V1 => {
            let data: FungibleTokenPacketData =
                serde_json::from_slice(bytes).map_err(|err| TransferError::DecodePacketData {
                    version: V1.into(),
                    description: err.to_string(),
                })?;
            packet_data_v1_to_v2(data)
        }
        V2 => {
            let decode_err = |description| TransferError::DecodePacketData {
                version: V2.into(),
                description,
            };

            reject_unknown_fields(bytes).map_err(decode_err)?;
            let raw = RawFungibleTokenPacketDataV2::decode(bytes)
                .map_err(|err| decode_err(err.to_string()))?;

            let data = FungibleTokenPacketDataV2::from(raw);
            data.validate_basic()?;
            Ok(data)
        }
        _ => Err(TransferError::UnsupportedVersion {
            version: version.into(),
        }),
    }
}

/// Encode V1 packet data as JSON. The memo is left out when empty.
///
/// The output matches the encoding of Go's `encoding/json`, so HTML
/// special characters are escaped.
pub fn encode_packet_data_v1(data: &FungibleTokenPacketData) -> Result<Vec<u8>, TransferError> {
    let json = serde_json::to_string(data).map_err(|err| TransferError::EncodePacketData {
        description: err.to_string(),
    })?;
    Ok(escape_html(&json).into_bytes())
}

/// Escape `<`, `>`, `&`, U+2028 and U+2029. Outside of string literals,
/// none of these appear in a JSON document.
fn escape_html(json: &str) -> String {
    let mut escaped = String::with_capacity(json.len());

    for ch in json.chars() {
        match ch {
            '<' | '>' | '&' | '\u{2028}' | '\u{2029}' => {
                // writing to a string never fails
                _ = write!(escaped, "\\u{:04x}", ch as u32);
            }
            ch => escaped.push(ch),
        }
    }

    escaped
}

/// Encode V2 packet data as protobuf.
pub fn encode_packet_data_v2(data: &FungibleTokenPacketDataV2) -> Vec<u8> {
    RawFungibleTokenPacketDataV2::from(data.clone()).encode_to_vec()
}

/// Convert validated V1 packet data into V2 packet data, carrying a
/// single token and no forwarding path.
pub fn packet_data_v1_to_v2(
    data: FungibleTokenPacketData,
) -> Result<FungibleTokenPacketDataV2, TransferError> {
    data.validate_basic()?;

    Ok(FungibleTokenPacketDataV2 {
        tokens: vec![Token {
            denom: extract_denom_from_path(&data.denom),
            amount: data.amount,
        }],
        sender: data.sender,
        receiver: data.receiver,
        memo: data.memo,
        forwarding: ForwardingPacketData::default(),
    })
}

/// Interpret `memo` as a JSON object, and return the value stored
/// under `key`.
///
/// An empty memo, a memo that is not a JSON object, or a missing key
/// all yield `None`.
pub fn get_custom_packet_data(memo: &str, key: &str) -> Option<serde_json::Value> {
    if memo.is_empty() {
        return None;
    }

    let serde_json::Value::Object(mut object) = serde_json::from_str(memo).ok()? else {
        return None;
    };

    object.remove(key)
}
