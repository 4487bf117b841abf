use crate::Q96;
use crate::RESOLUTION;
use crate::error::MathError;
use crate::math::math_helpers::{mul_div, mul_div_rounding_up};
use alloy_primitives::{I256, Sign, U256};

const FEE_UNITS: U256 = U256::from_limbs([100_000, 0, 0, 0]);
const TWO_FEE_UNITS: U256 = U256::from_limbs([200_000, 0, 0, 0]);

#[inline(always)]
fn safe_add(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

#[inline(always)]
fn safe_sub(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_sub(b).ok_or(MathError::Overflow)
}

#[inline(always)]
fn safe_mul(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

#[inline(always)]
fn to_int256(amount: U256) -> Result<I256, MathError> {
    I256::checked_from_sign_and_abs(Sign::Positive, amount).ok_or(MathError::Overflow)
}

#[inline(always)]
fn to_neg_int256(amount: U256) -> Result<I256, MathError> {
    I256::checked_from_sign_and_abs(Sign::Negative, amount).ok_or(MathError::Overflow)
}

/// Computes a single swap step against combined base and reinvestment
/// liquidity, returning `(sqrt_ratio_next_x96, amount_in, amount_out,
/// delta_l)`.
///
/// `amount_remaining >= 0` means the input side is specified (exact
/// input); a negative value specifies the output side. The swap fee is
/// not returned separately: it compounds into the pool as `delta_l`,
/// the reinvestment-liquidity growth of this step. `amount_in` and
/// `amount_out` are positive magnitudes of the input and output token
/// amounts regardless of which side was specified.
///
/// The step either consumes the whole remaining amount (final price
/// derived from the amount) or lands exactly on the target price
/// (amount derived from the price), whichever is reached first.
pub fn compute_swap_step(
    sqrt_ratio_current_x96: U256,
    sqrt_ratio_target_x96: U256,
    liquidity: U256,
    amount_remaining: I256,
    fee_units: u32,
) -> Result<(U256, U256, U256, U256), MathError> {
    if sqrt_ratio_current_x96 == sqrt_ratio_target_x96 {
        return Ok((sqrt_ratio_current_x96, U256::ZERO, U256::ZERO, U256::ZERO));
    }

    let fee = U256::from(fee_units);
    let exact_input = amount_remaining >= I256::ZERO;
    let price_down = sqrt_ratio_target_x96 < sqrt_ratio_current_x96;
    // the specified side is token0 when selling it exact-in or buying it exact-out
    let is_token0 = price_down == exact_input;

    let mut used_amount = calc_reach_amount(
        liquidity,
        sqrt_ratio_current_x96,
        sqrt_ratio_target_x96,
        fee,
        exact_input,
        is_token0,
    )?;

    let mut sqrt_ratio_next_x96 = U256::ZERO;
    if exact_input && used_amount >= amount_remaining {
        used_amount = amount_remaining;
    } else if !exact_input && used_amount <= amount_remaining {
        used_amount = amount_remaining;
    } else {
        sqrt_ratio_next_x96 = sqrt_ratio_target_x96;
    }

    let abs_delta = used_amount.unsigned_abs();

    let delta_l = if sqrt_ratio_next_x96.is_zero() {
        // the remaining amount is exhausted before the target price
        let delta_l = estimate_incremental_liquidity(
            abs_delta,
            liquidity,
            sqrt_ratio_current_x96,
            fee,
            exact_input,
            is_token0,
        )?;
        sqrt_ratio_next_x96 = calc_final_price(
            abs_delta,
            liquidity,
            delta_l,
            sqrt_ratio_current_x96,
            exact_input,
            is_token0,
        )?;
        delta_l
    } else {
        calc_incremental_liquidity(
            abs_delta,
            liquidity,
            sqrt_ratio_current_x96,
            sqrt_ratio_next_x96,
            exact_input,
            is_token0,
        )?
    };

    let returned_amount = calc_returned_amount(
        liquidity,
        sqrt_ratio_current_x96,
        sqrt_ratio_next_x96,
        delta_l,
        exact_input,
        is_token0,
    )?;

    let (amount_in, amount_out) = if exact_input {
        (abs_delta, returned_amount.unsigned_abs())
    } else {
        (returned_amount.unsigned_abs(), abs_delta)
    };

    Ok((sqrt_ratio_next_x96, amount_in, amount_out, delta_l))
}

/// Amount of the specified token that moves the price exactly to the
/// target. Positive for exact input, negative for exact output.
fn calc_reach_amount(
    liquidity: U256,
    current: U256,
    target: U256,
    fee: U256,
    exact_input: bool,
    is_token0: bool,
) -> Result<I256, MathError> {
    let abs_price_diff = if current >= target {
        current - target
    } else {
        target - current
    };

    if exact_input {
        // round down so the consumed input never exceeds the true amount
        // needed to reach the target
        let amount = if is_token0 {
            let denominator = safe_sub(safe_mul(TWO_FEE_UNITS, target)?, safe_mul(fee, current)?)?;
            let numerator = mul_div(
                liquidity,
                safe_mul(TWO_FEE_UNITS, abs_price_diff)?,
                denominator,
            )?;
            mul_div(numerator, Q96, current)?
        } else {
            let denominator = safe_sub(safe_mul(TWO_FEE_UNITS, current)?, safe_mul(fee, target)?)?;
            let numerator = mul_div(
                liquidity,
                safe_mul(TWO_FEE_UNITS, abs_price_diff)?,
                denominator,
            )?;
            mul_div(numerator, current, Q96)?
        };
        to_int256(amount)
    } else {
        // round down so the pool later demands no less input; the
        // specified side is the output, hence the negation
        let amount = if is_token0 {
            let denominator = safe_sub(safe_mul(TWO_FEE_UNITS, current)?, safe_mul(fee, target)?)?;
            let numerator = safe_sub(denominator, safe_mul(fee, current)?)?;
            let numerator = mul_div(
                liquidity
                    .checked_shl(RESOLUTION as usize)
                    .ok_or(MathError::Overflow)?,
                numerator,
                denominator,
            )?;
            mul_div(numerator, abs_price_diff, current)?
                .checked_div(target)
                .ok_or(MathError::DivisionByZero)?
        } else {
            let denominator = safe_sub(safe_mul(TWO_FEE_UNITS, target)?, safe_mul(fee, current)?)?;
            let numerator = safe_sub(denominator, safe_mul(fee, target)?)?;
            let numerator = mul_div(liquidity, numerator, denominator)?;
            mul_div(numerator, abs_price_diff, Q96)?
        };
        to_neg_int256(amount)
    }
}

/// Reinvestment-liquidity growth when the remaining amount is exhausted
/// before the target price.
///
/// For exact output the growth is the smaller root of a quadratic in
/// deltaL; a zero fee adds no liquidity and would degenerate that
/// quadratic, so it short-circuits.
fn estimate_incremental_liquidity(
    abs_delta: U256,
    liquidity: U256,
    current: U256,
    fee: U256,
    exact_input: bool,
    is_token0: bool,
) -> Result<U256, MathError> {
    if fee.is_zero() {
        return Ok(U256::ZERO);
    }

    if exact_input {
        if is_token0 {
            // deltaL = fee * absDelta * currentSqrtP / (2 * FEE_UNITS * Q96)
            mul_div(
                current,
                safe_mul(abs_delta, fee)?,
                safe_mul(Q96, TWO_FEE_UNITS)?,
            )
        } else {
            // deltaL = fee * absDelta / (2 * FEE_UNITS * currentSqrtP)
            mul_div(
                Q96,
                safe_mul(abs_delta, fee)?,
                safe_mul(current, TWO_FEE_UNITS)?,
            )
        }
    } else {
        // smaller root of: fee * x^2 - 2 * b * x + c = 0
        let a = fee;
        let mut b = safe_mul(safe_sub(FEE_UNITS, fee)?, liquidity)?;
        let mut c = safe_mul(safe_mul(fee, liquidity)?, abs_delta)?;
        if is_token0 {
            b = safe_sub(b, mul_div(safe_mul(FEE_UNITS, abs_delta)?, current, Q96)?)?;
            c = mul_div(c, current, Q96)?;
        } else {
            b = safe_sub(b, mul_div(safe_mul(FEE_UNITS, abs_delta)?, Q96, current)?)?;
            c = mul_div(c, Q96, current)?;
        }
        get_smaller_root_of_quad_eqn(a, b, c)
    }
}

/// Reinvestment-liquidity growth when the step lands exactly on the
/// target price. Rounded to its minimum.
fn calc_incremental_liquidity(
    abs_delta: U256,
    liquidity: U256,
    current: U256,
    next: U256,
    exact_input: bool,
    is_token0: bool,
) -> Result<U256, MathError> {
    let tmp3 = if is_token0 {
        let tmp1 = mul_div(liquidity, Q96, current)?;
        let tmp2 = if exact_input {
            safe_add(tmp1, abs_delta)?
        } else {
            safe_sub(tmp1, abs_delta)?
        };
        mul_div(next, tmp2, Q96)?
    } else {
        let tmp1 = mul_div(liquidity, current, Q96)?;
        let tmp2 = if exact_input {
            safe_add(tmp1, abs_delta)?
        } else {
            safe_sub(tmp1, abs_delta)?
        };
        mul_div(tmp2, Q96, next)?
    };

    // rounding can leave the product below the pre-step liquidity for
    // tiny amounts
    Ok(if tmp3 > liquidity {
        tmp3 - liquidity
    } else {
        U256::ZERO
    })
}

/// Final sqrt price when the remaining amount runs out between ticks.
/// Rounds against the price move (up when the price falls, down when
/// it rises) so the pool keeps the rounding dust.
fn calc_final_price(
    abs_delta: U256,
    liquidity: U256,
    delta_l: U256,
    current: U256,
    exact_input: bool,
    is_token0: bool,
) -> Result<U256, MathError> {
    if is_token0 {
        let tmp = mul_div(abs_delta, current, Q96)?;
        if exact_input {
            mul_div_rounding_up(safe_add(liquidity, delta_l)?, current, safe_add(liquidity, tmp)?)
        } else {
            mul_div(safe_add(liquidity, delta_l)?, current, safe_sub(liquidity, tmp)?)
        }
    } else if exact_input {
        let tmp = mul_div(abs_delta, Q96, current)?;
        mul_div(safe_add(liquidity, tmp)?, current, safe_add(liquidity, delta_l)?)
    } else {
        let tmp = mul_div_rounding_up(abs_delta, Q96, current)?;
        mul_div_rounding_up(safe_sub(liquidity, tmp)?, current, safe_add(liquidity, delta_l)?)
    }
}

/// Counter-side amount for the step. Negative when the pool pays it out
/// (exact input), positive when the pool collects it (exact output).
fn calc_returned_amount(
    liquidity: U256,
    current: U256,
    next: U256,
    delta_l: U256,
    exact_input: bool,
    is_token0: bool,
) -> Result<I256, MathError> {
    let returned = if is_token0 {
        if exact_input {
            // minimise the token1 paid out
            let grown = to_int256(mul_div_rounding_up(delta_l, next, Q96)?)?;
            let moved = to_neg_int256(mul_div(liquidity, safe_sub(current, next)?, Q96)?)?;
            grown.checked_add(moved).ok_or(MathError::Overflow)?
        } else {
            // maximise the token1 collected
            let grown = to_int256(mul_div_rounding_up(delta_l, next, Q96)?)?;
            let moved = to_int256(mul_div_rounding_up(liquidity, safe_sub(next, current)?, Q96)?)?;
            grown.checked_add(moved).ok_or(MathError::Overflow)?
        }
    } else {
        // token0 side: (liquidity + deltaL) / nextSqrtP - liquidity / currentSqrtP
        let grown = to_int256(mul_div_rounding_up(safe_add(liquidity, delta_l)?, Q96, next)?)?;
        let held = to_neg_int256(mul_div(liquidity, Q96, current)?)?;
        grown.checked_add(held).ok_or(MathError::Overflow)?
    };

    // ceiling the growth term can leave a stray wei on exact input
    Ok(if exact_input && returned == I256::ONE {
        I256::ZERO
    } else {
        returned
    })
}

/// Smaller root of `a*x^2 - 2*b*x + c = 0` with `b > 0`, by the
/// integer square root.
fn get_smaller_root_of_quad_eqn(a: U256, b: U256, c: U256) -> Result<U256, MathError> {
    let discriminant = safe_sub(safe_mul(b, b)?, safe_mul(a, c)?)?;
    safe_sub(b, sqrt(discriminant))?
        .checked_div(a)
        .ok_or(MathError::DivisionByZero)
}

/// Integer square root, floor (babylonian method).
fn sqrt(y: U256) -> U256 {
    const TWO: U256 = U256::from_limbs([2, 0, 0, 0]);
    const THREE: U256 = U256::from_limbs([3, 0, 0, 0]);

    if y > THREE {
        let mut z = y;
        let mut x = y / TWO + U256::ONE;
        while x < z {
            z = x;
            x = (y / x + x) / TWO;
        }
        z
    } else if !y.is_zero() {
        U256::ONE
    } else {
        U256::ZERO
    }
}
