//! Core crate defining IBC middleware types and traits.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod gas;
pub mod multi_ack;
pub mod packet_data;
pub mod store;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use alloc::boxed::Box;

/// Opaque error returned by host provided primitives, such as
/// a [`Store`](store::Store) implementation.
pub type BoxError = Box<dyn core::error::Error + Send + Sync>;
