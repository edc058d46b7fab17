//! Denomination traces: the path a token traveled before reaching
//! this chain.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use ibc_core_host_types::validate::{
    validate_identifier_chars, validate_identifier_length, validate_port_identifier,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TransferError;
use crate::DENOM_PREFIX;

/// A port and channel pair a token was sent through.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub struct Hop {
    pub port_id: String,
    pub channel_id: String,
}

impl Hop {
    pub fn new(port_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            port_id: port_id.into(),
            channel_id: channel_id.into(),
        }
    }

    /// Validate the identifiers of this [`Hop`].
    ///
    /// Channel identifiers are not required to follow the `channel-{N}`
    /// format, since counterparty chains may name their channels
    /// differently.
    pub fn validate(&self) -> Result<(), TransferError> {
        let invalid_hop = |err: &dyn fmt::Display| TransferError::InvalidHop {
            hop: self.to_string(),
            description: err.to_string(),
        };

        validate_port_identifier(&self.port_id).map_err(|err| invalid_hop(&err))?;
        validate_identifier_chars(&self.channel_id).map_err(|err| invalid_hop(&err))?;
        validate_identifier_length(&self.channel_id, 8, 64).map_err(|err| invalid_hop(&err))?;

        Ok(())
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.port_id, self.channel_id)
    }
}

/// A token denomination together with its trace.
///
/// An empty trace means the token is native to this chain. Hops are
/// ordered from the most recent to the oldest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub struct Denom {
    pub base: String,
    pub trace: Vec<Hop>,
}

impl Denom {
    pub fn new(base: impl Into<String>, trace: Vec<Hop>) -> Self {
        Self {
            base: base.into(),
            trace,
        }
    }

    /// Create a [`Denom`] native to this chain.
    pub fn native(base: impl Into<String>) -> Self {
        Self::new(base, Vec::new())
    }

    /// Check if this token is native to this chain.
    #[inline]
    pub fn is_native(&self) -> bool {
        self.trace.is_empty()
    }

    /// Validate the base denomination and every hop of the trace.
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.base.trim().is_empty() {
            return Err(TransferError::InvalidDenom {
                description: "base denomination cannot be blank".into(),
            });
        }

        self.trace.iter().try_for_each(Hop::validate)
    }

    /// Full path of the denomination, such as
    /// `transfer/channel-0/transfer/channel-1/uatom`.
    pub fn path(&self) -> String {
        if self.is_native() {
            return self.base.clone();
        }

        let mut path = String::new();
        for hop in &self.trace {
            path.push_str(&hop.port_id);
            path.push('/');
            path.push_str(&hop.channel_id);
            path.push('/');
        }
        path.push_str(&self.base);
        path
    }

    /// SHA-256 hash of the [full path](Denom::path) of the denomination.
    pub fn hash(&self) -> [u8; 32] {
        Sha256::digest(self.path().as_bytes()).into()
    }

    /// Denomination under which the token is stored on this chain.
    ///
    /// Native tokens keep their base denomination. Tokens with a trace
    /// are stored as `ibc/{HASH}`, the uppercase hex encoding of
    /// [`Denom::hash`].
    pub fn ibc_denom(&self) -> String {
        if self.is_native() {
            return self.base.clone();
        }

        format!("{DENOM_PREFIX}/{}", hex::encode_upper(self.hash()))
    }

    /// Check if the most recent hop of the trace matches the given
    /// port and channel.
    pub fn has_prefix(&self, port_id: &str, channel_id: &str) -> bool {
        self.trace
            .first()
            .is_some_and(|hop| hop.port_id == port_id && hop.channel_id == channel_id)
    }
}

impl fmt::Display for Denom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Split a full denomination path into its trace and base denomination.
///
/// Leading `{port}/{channel}` pairs are consumed as hops only while the
/// channel part is a valid `channel-{N}` identifier; the remainder is the
/// base denomination, which may itself contain slashes.
pub fn extract_denom_from_path(full_path: &str) -> Denom {
    let segments: Vec<&str> = full_path.split('/').collect();

    if segments.len() == 1 {
        return Denom::native(full_path);
    }

    let length = segments.len();
    let mut trace = Vec::new();
    let mut base_start = length;

    let mut i = 0;
    while i < length {
        let is_hop = i < length - 1 && length > 2 && is_channel_id_format(segments[i + 1]);

        if !is_hop {
            base_start = i;
            break;
        }

        trace.push(Hop::new(segments[i], segments[i + 1]));
        i += 2;
    }

    Denom::new(segments[base_start..].join("/"), trace)
}

/// Check if `id` is a `channel-{N}` identifier, as assigned by
/// the channel handshake.
fn is_channel_id_format(id: &str) -> bool {
    id.strip_prefix("channel-").is_some_and(|sequence| {
        (1..=20).contains(&sequence.len())
            && sequence.bytes().all(|b| b.is_ascii_digit())
            && sequence.parse::<u64>().is_ok()
    })
}
