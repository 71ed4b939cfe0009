//! Constant-product swap quoting.

use serde::Serialize;

use crate::error::{ClientError, ClientResult};

const BPS: u128 = 10_000;

/// Outcome of swapping `amount_in` against a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapQuote {
    pub amount_in: u64,
    pub fee_amount: u64,
    pub amount_out: u64,
    /// Shortfall against the spot price, in basis points.
    pub price_impact_bps: u64,
    /// Lowest acceptable output under the slippage tolerance.
    pub minimum_out: u64,
}

/// Quote `amount_in` against reserves `(reserve_in, reserve_out)`.
///
/// `out = reserve_out * in_after_fee / (reserve_in + in_after_fee)`, with
/// all arithmetic in `u128` and rounding down.
pub fn quote_swap(
    reserve_in: u64,
    reserve_out: u64,
    amount_in: u64,
    fee_bps: u16,
    slippage_bps: u16,
) -> ClientResult<SwapQuote> {
    if reserve_in == 0 || reserve_out == 0 {
        return Err(ClientError::InvalidInput("pool has an empty reserve".into()));
    }
    if amount_in == 0 {
        return Err(ClientError::InvalidInput("swap amount must be greater than zero".into()));
    }
    if u128::from(fee_bps) > BPS || u128::from(slippage_bps) > BPS {
        return Err(ClientError::InvalidInput(
            "fee and slippage must be at most 10000 bps".into(),
        ));
    }

    let reserve_in = u128::from(reserve_in);
    let reserve_out = u128::from(reserve_out);
    let amount = u128::from(amount_in);

    let fee = amount * u128::from(fee_bps) / BPS;
    let in_after_fee = amount - fee;
    let out = reserve_out * in_after_fee / (reserve_in + in_after_fee);
    if out == 0 {
        return Err(ClientError::InvalidInput(
            "swap amount too small to produce any output".into(),
        ));
    }

    let spot_out = reserve_out * in_after_fee / reserve_in;
    let price_impact_bps = if spot_out == 0 {
        0
    } else {
        (spot_out - out) * BPS / spot_out
    };
    let minimum_out = out * (BPS - u128::from(slippage_bps)) / BPS;

    Ok(SwapQuote {
        amount_in,
        fee_amount: narrow(fee)?,
        amount_out: narrow(out)?,
        price_impact_bps: narrow(price_impact_bps)?,
        minimum_out: narrow(minimum_out)?,
    })
}

fn narrow(value: u128) -> ClientResult<u64> {
    u64::try_from(value).map_err(|_| ClientError::InvalidInput("quote overflows u64".into()))
}
