use crate::error::FetchError;
use crate::math::tick_math::MIN_TICK;
use crate::pool::state::{FeeTier, PoolState, TickInfo};
use alloy_primitives::{Address, BlockNumber, U256};
use async_trait::async_trait;

/// Page size for tick-range reads, matching the reader contract's
/// practical return limit.
pub const TICK_PAGE_LEN: usize = 1000;

/// The pool's price slot: `getPoolState()`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStateSample {
    pub sqrt_price_x96: U256,
    pub current_tick: i32,
    /// Reentrancy flag; a locked pool was sampled mid-transaction and
    /// its snapshot cannot be trusted.
    pub locked: bool,
}

/// The pool's liquidity slot: `getLiquidityState()`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LiquiditySample {
    pub base: u128,
    pub reinvest: u128,
}

/// Source of pool state, abstracted over the transport.
///
/// The five primitive reads map one-to-one onto factory, pool and
/// tick-reader contract calls; [`StateFetcher::fetch_full_state`] is
/// provided on top of them. `block` pins reads to a height, `None`
/// reads latest.
#[async_trait]
pub trait StateFetcher: Send + Sync {
    /// Asks the factory for the pool of a sorted pair and fee tier.
    /// Returns `Address::ZERO` when no such pool was deployed.
    async fn resolve_pool_address(
        &self,
        token0: Address,
        token1: Address,
        fee: FeeTier,
    ) -> Result<Address, FetchError>;

    async fn fetch_pool_state(
        &self,
        pool: Address,
        block: Option<BlockNumber>,
    ) -> Result<PoolStateSample, FetchError>;

    async fn fetch_liquidity_state(
        &self,
        pool: Address,
        block: Option<BlockNumber>,
    ) -> Result<LiquiditySample, FetchError>;

    /// Reads up to `page_len` initialized tick indices starting at
    /// `start_tick`, ascending. Short or zero-padded pages mean the
    /// range is exhausted.
    async fn fetch_tick_range(
        &self,
        pool: Address,
        start_tick: i32,
        page_len: usize,
        block: Option<BlockNumber>,
    ) -> Result<Vec<i32>, FetchError>;

    async fn fetch_tick_details(
        &self,
        pool: Address,
        ticks: &[i32],
        block: Option<BlockNumber>,
    ) -> Result<Vec<TickInfo>, FetchError>;

    /// Assembles a complete snapshot: pages through the tick reader
    /// from the bottom of the tick range, then reads the price and
    /// liquidity slots and the per-tick details.
    ///
    /// The snapshot comes back invalid when the pool was locked at the
    /// sampled height.
    async fn fetch_full_state(
        &self,
        pool: Address,
        fee: FeeTier,
        block: Option<BlockNumber>,
    ) -> Result<PoolState, FetchError> {
        let mut start_tick = MIN_TICK;
        let mut tick_indices: Vec<i32> = Vec::new();
        loop {
            let page = self
                .fetch_tick_range(pool, start_tick, TICK_PAGE_LEN, block)
                .await?;
            let exhausted = page.len() < TICK_PAGE_LEN || page.last() == Some(&0);
            // the reader zero-pads the tail of the last page
            tick_indices.extend(page.into_iter().filter(|tick| *tick != 0));
            if exhausted {
                break;
            }
            match tick_indices.last() {
                Some(&last) => start_tick = last + 1,
                None => break,
            }
        }

        let price_slot = self.fetch_pool_state(pool, block).await?;
        let liquidity_slot = self.fetch_liquidity_state(pool, block).await?;
        let details = self.fetch_tick_details(pool, &tick_indices, block).await?;

        let mut state = PoolState::new(pool, fee);
        state.sqrt_price_x96 = price_slot.sqrt_price_x96;
        state.current_tick = price_slot.current_tick;
        state.is_valid = !price_slot.locked;
        state.liquidity = liquidity_slot.base;
        state.reinvest_liquidity = liquidity_slot.reinvest;
        for info in details {
            state.ticks.insert(info.index, info);
        }

        Ok(state)
    }
}
