use crate::error::{Error, MathError, PoolError, TickListError};
use crate::math::liquidity_math::add_delta;
use crate::math::sqrt_price_math::{get_amount_0_delta, get_amount_1_delta};
use crate::math::swap_math::compute_swap_step;
use crate::math::tick_math::{
    MAX_SQRT_RATIO, MAX_TICK, MIN_SQRT_RATIO, MIN_TICK, get_sqrt_ratio_at_tick,
    get_tick_at_sqrt_ratio,
};
use crate::pool::state::PoolState;
use crate::pool::tick_list::{TICK_SEARCH_DISTANCE, TickList};
use alloy_primitives::{I256, Sign, U256};

/// Flat gas cost of a pool swap call.
pub const SWAP_BASE_GAS: u64 = 21_000;
/// Additional gas per loop step (tick traversal) of a swap.
pub const TICK_CROSS_GAS: u64 = 24_000;

/// Gas estimate for a swap that took `tick_count` loop steps, as
/// reported by [`SwapOutput::tick_count`].
pub fn swap_gas_estimate(tick_count: u32) -> u64 {
    SWAP_BASE_GAS + TICK_CROSS_GAS * tick_count as u64
}

/// Which side of the trade the amounts denominate.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SwapSide {
    /// Amounts are exact inputs; quotes return the output received.
    Sell,
    /// Amounts are exact outputs; quotes return the input owed.
    Buy,
}

/// One simulated swap: the accumulated counter-amount (output received
/// for exact input, input owed for exact output) and the number of
/// loop steps taken, a gas proxy for [`swap_gas_estimate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SwapOutput {
    pub output: U256,
    pub tick_count: u32,
}

/// Batch quote over several amounts in one direction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuoteResult {
    pub outputs: Vec<U256>,
    pub tick_counts: Vec<u32>,
}

// the top level state of the swap, tracked across steps
struct SwapState {
    // the amount remaining to be swapped in/out of the specified asset
    amount_specified_remaining: I256,
    // the counter amount accumulated so far
    amount_calculated: U256,
    // current sqrt(price)
    sqrt_price_x96: U256,
    // the tick associated with the current price
    tick: i32,
    // active base liquidity from positions
    base_liquidity: u128,
    // reinvestment liquidity, grows by delta_l each step
    reinvest_liquidity: U256,
}

struct StepComputations {
    // the price at the beginning of the step
    sqrt_price_start_x96: U256,
    // the next tick to swap to from the current tick in the swap direction
    tick_next: i32,
    // whether tick_next is initialized
    initialized: bool,
    // sqrt(price) for the next tick (unclamped by the price limit)
    sqrt_price_next_x96: U256,
    // how much is being swapped in during this step
    amount_in: U256,
    // how much is being swapped out
    amount_out: U256,
    // reinvestment liquidity grown from the fee taken on this step
    delta_l: U256,
}

impl Default for StepComputations {
    fn default() -> Self {
        Self {
            sqrt_price_start_x96: U256::ZERO,
            tick_next: 0,
            initialized: false,
            sqrt_price_next_x96: U256::ZERO,
            amount_in: U256::ZERO,
            amount_out: U256::ZERO,
            delta_l: U256::ZERO,
        }
    }
}

fn check_ticks(tick_lower: i32, tick_upper: i32) -> Result<(), PoolError> {
    if tick_lower >= tick_upper || tick_lower < MIN_TICK || tick_upper > MAX_TICK {
        return Err(PoolError::InvalidPositionBounds);
    }
    Ok(())
}

impl PoolState {
    /// Quotes a batch of amounts in one direction against this
    /// snapshot. `Sell` amounts are exact inputs, `Buy` amounts exact
    /// outputs; each entry yields the counter-amount and the step count
    /// at the matching index.
    ///
    /// Pure: the snapshot is only read.
    pub fn quote(
        &self,
        zero_for_one: bool,
        amounts: &[U256],
        side: SwapSide,
    ) -> Result<QuoteResult, Error> {
        let mut outputs = Vec::with_capacity(amounts.len());
        let mut tick_counts = Vec::with_capacity(amounts.len());

        for &amount in amounts {
            let sign = match side {
                SwapSide::Sell => Sign::Positive,
                SwapSide::Buy => Sign::Negative,
            };
            let amount_specified = I256::checked_from_sign_and_abs(sign, amount)
                .ok_or(MathError::Overflow)?;

            let swapped = self.swap(zero_for_one, amount_specified, None)?;
            outputs.push(swapped.output);
            tick_counts.push(swapped.tick_count);
        }

        Ok(QuoteResult {
            outputs,
            tick_counts,
        })
    }

    /// Simulates one swap against this snapshot. Positive
    /// `amount_specified` is an exact input, negative an exact output.
    ///
    /// The price limit defaults to the protocol bound for the
    /// direction; a caller-supplied limit must lie strictly between the
    /// current price and that bound. Walking off the cached tick range
    /// mid-loop is a defined partial result: zero output with the step
    /// count accumulated so far.
    pub fn swap(
        &self,
        zero_for_one: bool,
        amount_specified: I256,
        sqrt_price_limit_x96: Option<U256>,
    ) -> Result<SwapOutput, Error> {
        let sqrt_price_limit_x96 = sqrt_price_limit_x96.unwrap_or(if zero_for_one {
            MIN_SQRT_RATIO + U256::ONE
        } else {
            MAX_SQRT_RATIO - U256::ONE
        });

        let limit_in_bounds = if zero_for_one {
            sqrt_price_limit_x96 < self.sqrt_price_x96 && sqrt_price_limit_x96 > MIN_SQRT_RATIO
        } else {
            sqrt_price_limit_x96 > self.sqrt_price_x96 && sqrt_price_limit_x96 < MAX_SQRT_RATIO
        };
        if !limit_in_bounds {
            return Err(Error::PoolError(PoolError::PriceLimitOutOfBounds));
        }

        let exact_input = amount_specified >= I256::ZERO;
        let tick_list = TickList::new(&self.ticks);

        let mut state = SwapState {
            amount_specified_remaining: amount_specified,
            amount_calculated: U256::ZERO,
            sqrt_price_x96: self.sqrt_price_x96,
            tick: self.current_tick,
            base_liquidity: self.liquidity,
            reinvest_liquidity: U256::from(self.reinvest_liquidity),
        };
        let mut tick_count: u32 = 0;

        while !state.amount_specified_remaining.is_zero()
            && state.sqrt_price_x96 != sqrt_price_limit_x96
        {
            let mut step = StepComputations {
                sqrt_price_start_x96: state.sqrt_price_x96,
                ..StepComputations::default()
            };

            match tick_list.next_initialized_within_distance(
                state.tick,
                zero_for_one,
                TICK_SEARCH_DISTANCE,
            ) {
                Ok((tick_next, initialized)) => {
                    step.tick_next = tick_next;
                    step.initialized = initialized;
                }
                // the cached range is exhausted: defined partial result
                Err(TickListError::OutOfSearchRange) => {
                    state.amount_specified_remaining = I256::ZERO;
                    state.amount_calculated = U256::ZERO;
                    break;
                }
                Err(err) => return Err(err.into()),
            }

            step.tick_next = step.tick_next.clamp(MIN_TICK, MAX_TICK);

            step.sqrt_price_next_x96 = get_sqrt_ratio_at_tick(step.tick_next)?;

            (
                state.sqrt_price_x96,
                step.amount_in,
                step.amount_out,
                step.delta_l,
            ) = compute_swap_step(
                state.sqrt_price_x96,
                if zero_for_one {
                    if step.sqrt_price_next_x96 < sqrt_price_limit_x96 {
                        sqrt_price_limit_x96
                    } else {
                        step.sqrt_price_next_x96
                    }
                } else if step.sqrt_price_next_x96 > sqrt_price_limit_x96 {
                    sqrt_price_limit_x96
                } else {
                    step.sqrt_price_next_x96
                },
                U256::from(state.base_liquidity) + state.reinvest_liquidity,
                state.amount_specified_remaining,
                self.fee.fee_units(),
            )?;

            state.reinvest_liquidity = state
                .reinvest_liquidity
                .checked_add(step.delta_l)
                .ok_or(MathError::Overflow)?;

            if exact_input {
                state.amount_specified_remaining -= I256::from_raw(step.amount_in);
                state.amount_calculated += step.amount_out;
            } else {
                state.amount_specified_remaining += I256::from_raw(step.amount_out);
                state.amount_calculated += step.amount_in;
            }

            if state.sqrt_price_x96 == step.sqrt_price_next_x96 {
                if step.initialized {
                    let mut liquidity_net = tick_list.tick(step.tick_next)?.liquidity_net;
                    if zero_for_one {
                        liquidity_net = -liquidity_net;
                    }
                    state.base_liquidity = add_delta(state.base_liquidity, liquidity_net)?;
                }
                state.tick = if zero_for_one {
                    step.tick_next - 1
                } else {
                    step.tick_next
                };
            } else {
                state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }
            tick_count += 1;
        }

        Ok(SwapOutput {
            output: state.amount_calculated,
            tick_count,
        })
    }

    /// Replays a trade event against this snapshot, walking the same
    /// loop as [`PoolState::swap`] but driven by the authoritative
    /// post-trade values the event reports, then writing those values
    /// back. Returns the accumulated output amount.
    ///
    /// The search is not shielded here: exhausting the cached tick
    /// range fails with `OutOfSearchRange` so the caller resynchronizes.
    pub fn replay_swap(
        &mut self,
        new_sqrt_price_x96: U256,
        new_tick: i32,
        new_liquidity: u128,
        zero_for_one: bool,
    ) -> Result<U256, Error> {
        let tick_list = TickList::new(&self.ticks);

        let mut state = SwapState {
            // the event does not carry the trader's amount; the loop
            // needs it only as an upper bound
            amount_specified_remaining: I256::MAX,
            amount_calculated: U256::ZERO,
            sqrt_price_x96: self.sqrt_price_x96,
            tick: self.current_tick,
            base_liquidity: self.liquidity,
            reinvest_liquidity: U256::from(self.reinvest_liquidity),
        };

        while state.tick != new_tick && state.sqrt_price_x96 != new_sqrt_price_x96 {
            let mut step = StepComputations {
                sqrt_price_start_x96: state.sqrt_price_x96,
                ..StepComputations::default()
            };

            (step.tick_next, step.initialized) = tick_list.next_initialized_within_distance(
                state.tick,
                zero_for_one,
                TICK_SEARCH_DISTANCE,
            )?;

            step.tick_next = step.tick_next.clamp(MIN_TICK, MAX_TICK);

            step.sqrt_price_next_x96 = get_sqrt_ratio_at_tick(step.tick_next)?;

            (
                state.sqrt_price_x96,
                step.amount_in,
                step.amount_out,
                step.delta_l,
            ) = compute_swap_step(
                state.sqrt_price_x96,
                if zero_for_one {
                    if step.sqrt_price_next_x96 < new_sqrt_price_x96 {
                        new_sqrt_price_x96
                    } else {
                        step.sqrt_price_next_x96
                    }
                } else if step.sqrt_price_next_x96 > new_sqrt_price_x96 {
                    new_sqrt_price_x96
                } else {
                    step.sqrt_price_next_x96
                },
                U256::from(state.base_liquidity) + state.reinvest_liquidity,
                state.amount_specified_remaining,
                self.fee.fee_units(),
            )?;

            state.reinvest_liquidity = state
                .reinvest_liquidity
                .checked_add(step.delta_l)
                .ok_or(MathError::Overflow)?;

            state.amount_specified_remaining -= I256::from_raw(step.amount_in);
            state.amount_calculated += step.amount_out;

            if state.sqrt_price_x96 == step.sqrt_price_next_x96 {
                if step.initialized {
                    let mut liquidity_net = tick_list.tick(step.tick_next)?.liquidity_net;
                    if zero_for_one {
                        liquidity_net = -liquidity_net;
                    }
                    state.base_liquidity = add_delta(state.base_liquidity, liquidity_net)?;
                }
                state.tick = if zero_for_one {
                    step.tick_next - 1
                } else {
                    step.tick_next
                };
            } else if state.sqrt_price_x96 != step.sqrt_price_start_x96 {
                state.tick = get_tick_at_sqrt_ratio(state.sqrt_price_x96)?;
            }
        }

        // the reported values are authoritative; the loop-local
        // reinvestment estimate is discarded
        self.sqrt_price_x96 = new_sqrt_price_x96;
        self.current_tick = new_tick;
        self.liquidity = new_liquidity;

        Ok(state.amount_calculated)
    }

    /// Applies a signed liquidity delta over `[tick_lower, tick_upper)`
    /// and returns the signed token amounts owed: positive amounts are
    /// owed to the pool (mint), negative to the position owner (burn).
    ///
    /// Updates the tick map at both bounds and, when the current tick
    /// is inside the range, the active base liquidity.
    pub fn modify_position(
        &mut self,
        tick_lower: i32,
        tick_upper: i32,
        liquidity_delta: i128,
    ) -> Result<(I256, I256), Error> {
        check_ticks(tick_lower, tick_upper)?;

        let mut amount0 = I256::ZERO;
        let mut amount1 = I256::ZERO;

        if liquidity_delta != 0 {
            self.update_tick(tick_lower, liquidity_delta, false)?;
            self.update_tick(tick_upper, liquidity_delta, true)?;

            if self.current_tick < tick_lower {
                // the range is entirely above: only token0 backs it
                amount0 = get_amount_0_delta(
                    get_sqrt_ratio_at_tick(tick_lower)?,
                    get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?;
            } else if self.current_tick < tick_upper {
                amount0 = get_amount_0_delta(
                    self.sqrt_price_x96,
                    get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?;
                amount1 = get_amount_1_delta(
                    get_sqrt_ratio_at_tick(tick_lower)?,
                    self.sqrt_price_x96,
                    liquidity_delta,
                )?;

                self.liquidity = add_delta(self.liquidity, liquidity_delta)?;
            } else {
                // the range is entirely below: only token1 backs it
                amount1 = get_amount_1_delta(
                    get_sqrt_ratio_at_tick(tick_lower)?,
                    get_sqrt_ratio_at_tick(tick_upper)?,
                    liquidity_delta,
                )?;
            }
        }

        Ok((amount0, amount1))
    }
}
