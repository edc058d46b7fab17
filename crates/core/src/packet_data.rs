//! Structured views over decoded packet payloads.

use alloc::string::String;

use ibc_core_host_types::identifiers::PortId;

/// Application level packet data, as seen by middlewares that need
/// to inspect it without knowing its concrete type.
pub trait PacketDataProvider {
    /// Return the address that sent the packet from `source_port`.
    fn packet_sender(&self, source_port: &PortId) -> String;

    /// Look up the custom metadata stored under `key`.
    ///
    /// Absent, malformed or non-object data yields `None`. This is
    /// never a validation failure.
    fn custom_packet_data(&self, key: &str) -> Option<serde_json::Value>;
}

impl<P: PacketDataProvider + ?Sized> PacketDataProvider for &P {
    #[inline]
    fn packet_sender(&self, source_port: &PortId) -> String {
        (**self).packet_sender(source_port)
    }

    #[inline]
    fn custom_packet_data(&self, key: &str) -> Option<serde_json::Value> {
        (**self).custom_packet_data(key)
    }
}
