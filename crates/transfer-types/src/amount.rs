use alloc::format;

use primitive_types::U256;

use crate::error::TransferError;

/// Check that `amount` is the decimal representation of a strictly
/// positive 256-bit integer.
pub(crate) fn validate_amount(amount: &str) -> Result<(), TransferError> {
    let parsed = U256::from_dec_str(amount).map_err(|_| TransferError::InvalidAmount {
        description: format!("unable to parse transfer amount ({amount}) into an integer"),
    })?;

    if parsed.is_zero() {
        return Err(TransferError::InvalidAmount {
            description: format!("amount must be strictly positive: got {parsed}"),
        });
    }

    Ok(())
}
