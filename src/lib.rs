//! KyberSwap-Elastic-style concentrated liquidity simulation in pure Rust.
//!
//! This crate exposes:
//! - Low-level math primitives (`math::*`) for ticks, prices and swap steps,
//!   including the reinvestment-liquidity fee model.
//! - An in-memory [`PoolState`] snapshot that quotes swaps, replays trade
//!   events and applies position changes.
//! - A [`PoolStore`] that caches snapshots per pool and keeps them current
//!   from decoded logs, over a pluggable [`StateFetcher`].
//! - Optional `onchain` helpers to hydrate snapshots from deployed pools.
//!
//! # Examples
//!
//! ## Pure math
//! ```no_run
//! use elastic_sim::{math::tick_math, RESOLUTION, U256};
//!
//! let sqrt_price = tick_math::get_sqrt_ratio_at_tick(0).unwrap();
//! assert!(sqrt_price > U256::ZERO);
//! assert_eq!(RESOLUTION, 96);
//! ```
//!
//! ## Quoting against an in-memory snapshot
//! ```no_run
//! use elastic_sim::{
//!     math::tick_math::get_sqrt_ratio_at_tick,
//!     FeeTier, PoolState, SwapSide, U256,
//! };
//!
//! # let pool_address = elastic_sim::Address::ZERO;
//! let mut pool = PoolState::new(pool_address, FeeTier::Medium);
//! pool.sqrt_price_x96 = get_sqrt_ratio_at_tick(0).unwrap();
//! pool.current_tick = 0;
//! pool.liquidity = 1_000_000_000_000_000_000u128;
//!
//! let amounts = [U256::from(1_000_000_000_000_000u64)];
//! let quote = pool.quote(true, &amounts, SwapSide::Sell).unwrap();
//! println!("out: {}, steps: {}", quote.outputs[0], quote.tick_counts[0]);
//! ```

pub use alloy_primitives::{Address, I256, U256};

pub mod error;
mod hash;
pub mod math;

pub use hash::FastMap;

pub mod pool;

pub use pool::events::PoolEvent;
pub use pool::fetch::StateFetcher;
pub use pool::state::{FeeTier, PoolKey, PoolState, TickInfo};
pub use pool::store::PoolStore;
pub use pool::swap::{QuoteResult, SwapOutput, SwapSide, swap_gas_estimate};

pub const RESOLUTION: u8 = 96;
pub const Q96: U256 = U256::from_limbs([0, 4294967296, 0, 0]);
// fees are expressed in hundred-thousandths, not the usual millionths
pub const FEE_UNITS: u32 = 100_000;
