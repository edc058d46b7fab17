//! Gas accounting primitives.

use alloc::string::String;
use core::cmp;

use displaydoc::Display;
use tracing::trace;

/// Unit of gas.
pub type Gas = u64;

#[derive(Clone, Debug, PartialEq, Eq, Display)]
/// out of gas in location `{descriptor}`: consumed `{consumed}`, limit `{limit}`
pub struct OutOfGas {
    /// What the gas was being charged for.
    pub descriptor: String,
    /// Gas consumed, including the charge that crossed the limit.
    pub consumed: Gas,
    /// Limit of the meter.
    pub limit: Gas,
}

impl core::error::Error for OutOfGas {}

/// Host provided gas meter.
pub trait GasMeter {
    /// Maximum amount of gas this meter allows to be consumed.
    fn limit(&self) -> Gas;

    /// Gas consumed so far. May exceed [`GasMeter::limit`] after
    /// a charge failed with [`OutOfGas`].
    fn gas_consumed(&self) -> Gas;

    /// Charge `amount` of gas. Crossing the limit must fail
    /// with [`OutOfGas`].
    fn consume_gas(&mut self, amount: Gas, descriptor: &str) -> Result<(), OutOfGas>;

    /// Gas consumed so far, capped at the limit.
    #[inline]
    fn gas_consumed_to_limit(&self) -> Gas {
        cmp::min(self.gas_consumed(), self.limit())
    }

    /// Gas left before the meter runs out.
    #[inline]
    fn gas_remaining(&self) -> Gas {
        self.limit().saturating_sub(self.gas_consumed())
    }

    /// Check if no gas remains.
    #[inline]
    fn is_out_of_gas(&self) -> bool {
        self.gas_consumed() >= self.limit()
    }
}

impl<G: GasMeter + ?Sized> GasMeter for &mut G {
    #[inline]
    fn limit(&self) -> Gas {
        (**self).limit()
    }

    #[inline]
    fn gas_consumed(&self) -> Gas {
        (**self).gas_consumed()
    }

    #[inline]
    fn consume_gas(&mut self, amount: Gas, descriptor: &str) -> Result<(), OutOfGas> {
        (**self).consume_gas(amount, descriptor)
    }
}

/// Gas meter with a fixed limit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "borsh",
    derive(borsh::BorshSerialize, borsh::BorshDeserialize)
)]
pub struct BasicGasMeter {
    limit: Gas,
    consumed: Gas,
}

impl BasicGasMeter {
    /// Create a new meter allowing `limit` gas to be consumed.
    pub const fn new(limit: Gas) -> Self {
        Self { limit, consumed: 0 }
    }
}

impl GasMeter for BasicGasMeter {
    #[inline]
    fn limit(&self) -> Gas {
        self.limit
    }

    #[inline]
    fn gas_consumed(&self) -> Gas {
        self.consumed
    }

    fn consume_gas(&mut self, amount: Gas, descriptor: &str) -> Result<(), OutOfGas> {
        self.consumed = self.consumed.saturating_add(amount);
        trace!(amount, consumed = self.consumed, descriptor, "Consumed gas");

        if self.consumed > self.limit {
            return Err(OutOfGas {
                descriptor: descriptor.into(),
                consumed: self.consumed,
                limit: self.limit,
            });
        }

        Ok(())
    }
}
