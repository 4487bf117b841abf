use crate::RESOLUTION;
use crate::error::MathError;
use crate::math::math_helpers::{div_rounding_up, mul_div, mul_div_rounding_up};
use crate::Q96;
use alloy_primitives::{I256, U256};

/// Core helper for computing the token0 amount delta between two
/// sqrt prices for a given liquidity, optionally rounding up.
pub fn get_amount_0_delta_base(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, MathError> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };

    if sqrt_ratio_a_x96.is_zero() {
        return Err(MathError::DivisionByZero);
    }

    let numerator1 = U256::from(liquidity) << RESOLUTION;
    let numerator2 = sqrt_ratio_b_x96 - sqrt_ratio_a_x96;

    if round_up {
        Ok(div_rounding_up(
            mul_div_rounding_up(numerator1, numerator2, sqrt_ratio_b_x96)?,
            sqrt_ratio_a_x96,
        ))
    } else {
        Ok(mul_div(numerator1, numerator2, sqrt_ratio_b_x96)? / sqrt_ratio_a_x96)
    }
}

/// Core helper for computing the token1 amount delta between two
/// sqrt prices for a given liquidity, optionally rounding up.
pub fn get_amount_1_delta_base(
    mut sqrt_ratio_a_x96: U256,
    mut sqrt_ratio_b_x96: U256,
    liquidity: u128,
    round_up: bool,
) -> Result<U256, MathError> {
    if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96) = (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    };
    let liquidity = U256::from(liquidity);

    if round_up {
        mul_div_rounding_up(liquidity, sqrt_ratio_b_x96 - sqrt_ratio_a_x96, Q96)
    } else {
        mul_div(liquidity, sqrt_ratio_b_x96 - sqrt_ratio_a_x96, Q96)
    }
}

/// Signed token0 amount delta between two sqrt prices for a signed
/// liquidity change. Positive liquidity rounds against the position
/// (up), negative rounds toward it (down), matching the contracts.
pub fn get_amount_0_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, MathError> {
    if liquidity < 0 {
        Ok(-I256::from_raw(get_amount_0_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?))
    } else {
        Ok(I256::from_raw(get_amount_0_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity as u128,
            true,
        )?))
    }
}

/// Signed token1 amount delta between two sqrt prices for a signed
/// liquidity change. Rounding as in [`get_amount_0_delta`].
pub fn get_amount_1_delta(
    sqrt_ratio_a_x96: U256,
    sqrt_ratio_b_x96: U256,
    liquidity: i128,
) -> Result<I256, MathError> {
    if liquidity < 0 {
        Ok(-I256::from_raw(get_amount_1_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity.unsigned_abs(),
            false,
        )?))
    } else {
        Ok(I256::from_raw(get_amount_1_delta_base(
            sqrt_ratio_a_x96,
            sqrt_ratio_b_x96,
            liquidity as u128,
            true,
        )?))
    }
}
