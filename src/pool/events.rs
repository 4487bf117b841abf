use crate::error::{Error, MathError};
use crate::pool::state::PoolState;
use alloy_primitives::{I256, U256};
use tracing::error;

/// A decoded pool log, field-for-field as the pool contract emits it.
/// Amounts are pool deltas: positive flows into the pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PoolEvent {
    /// A trade; carries the authoritative post-trade pool state.
    Swap {
        amount0: I256,
        amount1: I256,
        sqrt_price_x96: U256,
        tick: i32,
        liquidity: u128,
    },
    /// Liquidity added over a tick range.
    Mint {
        tick_lower: i32,
        tick_upper: i32,
        qty: u128,
    },
    /// Liquidity removed over a tick range.
    Burn {
        tick_lower: i32,
        tick_upper: i32,
        qty: u128,
    },
    /// Any log the tracker does not decode.
    Unknown,
}

impl PoolState {
    /// Advances this snapshot by one decoded log.
    ///
    /// `Unknown` events pass through untouched. A swap reporting no
    /// positive delta on either side is logged and marks the snapshot
    /// invalid instead of failing, so the owner refreshes it from
    /// chain. Everything else flows through [`PoolState::replay_swap`]
    /// or [`PoolState::modify_position`] and fails the way they do.
    pub fn apply_event(mut self, event: &PoolEvent) -> Result<PoolState, Error> {
        match *event {
            PoolEvent::Swap {
                amount0,
                amount1,
                sqrt_price_x96,
                tick,
                liquidity,
            } => {
                if amount0 <= I256::ZERO && amount1 <= I256::ZERO {
                    error!(
                        pool = %self.pool,
                        %amount0,
                        %amount1,
                        "swap event without a positive amount, invalidating the snapshot"
                    );
                    self.is_valid = false;
                    return Ok(self);
                }

                let zero_for_one = amount0 > I256::ZERO;
                self.replay_swap(sqrt_price_x96, tick, liquidity, zero_for_one)?;
                Ok(self)
            }
            PoolEvent::Mint {
                tick_lower,
                tick_upper,
                qty,
            } => {
                let delta = i128::try_from(qty).map_err(|_| MathError::Overflow)?;
                self.modify_position(tick_lower, tick_upper, delta)?;
                Ok(self)
            }
            PoolEvent::Burn {
                tick_lower,
                tick_upper,
                qty,
            } => {
                let delta = i128::try_from(qty).map_err(|_| MathError::Overflow)?;
                self.modify_position(tick_lower, tick_upper, -delta)?;
                Ok(self)
            }
            PoolEvent::Unknown => Ok(self),
        }
    }
}
