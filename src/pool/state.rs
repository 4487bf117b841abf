use crate::FastMap;
use crate::error::MathError;
use crate::math::liquidity_math::add_delta;
use alloy_primitives::{Address, U160, U256};
use std::fmt;

/// Fee tiers deployed by the Elastic factory, in units of 1/100_000
/// (`FEE_UNITS`), each with its fixed tick spacing.
///
/// `Zero` is not a factory tier; it exists so fee-free pools can be
/// simulated through the same quoting path and is excluded from
/// [`FeeTier::ALL`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FeeTier {
    Zero,
    Stable,
    Lowest,
    Low,
    Medium,
    High,
}

impl FeeTier {
    /// The deployable tiers, used when scanning a token pair for pools.
    pub const ALL: [FeeTier; 5] = [
        FeeTier::Stable,
        FeeTier::Lowest,
        FeeTier::Low,
        FeeTier::Medium,
        FeeTier::High,
    ];

    /// Swap fee in `FEE_UNITS` (1/100_000).
    pub const fn fee_units(self) -> u32 {
        match self {
            FeeTier::Zero => 0,
            FeeTier::Stable => 8,
            FeeTier::Lowest => 10,
            FeeTier::Low => 40,
            FeeTier::Medium => 300,
            FeeTier::High => 1000,
        }
    }

    /// Tick spacing enforced for positions in this tier.
    pub const fn tick_spacing(self) -> i32 {
        match self {
            FeeTier::Zero | FeeTier::Stable | FeeTier::Lowest => 1,
            FeeTier::Low => 8,
            FeeTier::Medium => 60,
            FeeTier::High => 200,
        }
    }

    /// Maps a raw on-chain fee value back to its tier. Returns `None`
    /// for fees the factory never deployed.
    pub fn from_fee_units(fee: u32) -> Option<FeeTier> {
        match fee {
            0 => Some(FeeTier::Zero),
            8 => Some(FeeTier::Stable),
            10 => Some(FeeTier::Lowest),
            40 => Some(FeeTier::Low),
            300 => Some(FeeTier::Medium),
            1000 => Some(FeeTier::High),
            _ => None,
        }
    }
}

/// Converts an `Address` into its `U160` numeric representation.
///
/// This is mainly used to compare or sort addresses by value.
#[inline(always)]
pub fn address_to_u160(address: Address) -> U160 {
    address.into()
}

/// Returns the token pair sorted by numeric address, the canonical
/// `(token0, token1)` ordering the factory uses.
pub fn sort_tokens(token0: Address, token1: Address) -> (Address, Address) {
    if address_to_u160(token0) < address_to_u160(token1) {
        (token0, token1)
    } else {
        (token1, token0)
    }
}

/// Identity of a pool: the sorted token pair plus the fee tier.
///
/// Formats as `token0_token1_fee` in lowercase hex, the string form
/// used for cache keys and log lines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolKey {
    pub token0: Address,
    pub token1: Address,
    pub fee: FeeTier,
}

impl PoolKey {
    /// Builds a key from a token pair in either order.
    pub fn new(token_a: Address, token_b: Address, fee: FeeTier) -> Self {
        let (token0, token1) = sort_tokens(token_a, token_b);
        Self { token0, token1, fee }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#x}_{:#x}_{}",
            self.token0,
            self.token1,
            self.fee.fee_units()
        )
    }
}

/// Per-tick state, shaped like the on-chain `ticks(int24)` getter.
///
/// Only `liquidity_net` (and `initialized`) drive the swap math; the
/// fee growth and seconds-per-liquidity snapshots are carried opaquely.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickInfo {
    pub index: i32,
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
    pub fee_growth_outside: U256,
    pub seconds_per_liquidity_outside: u128,
    pub initialized: bool,
}

impl TickInfo {
    /// An empty (never-referenced) tick at the given index.
    pub fn new(index: i32) -> Self {
        Self {
            index,
            liquidity_gross: 0,
            liquidity_net: 0,
            fee_growth_outside: U256::ZERO,
            seconds_per_liquidity_outside: 0,
            initialized: false,
        }
    }
}

/// Full off-chain snapshot of one Elastic pool at a block height.
///
/// `liquidity` is the base (positions-only) liquidity; the pool also
/// holds `reinvest_liquidity` grown from compounded fees, and swaps run
/// against the sum of the two. `is_valid` is false while the snapshot
/// is known stale (locked pool, rejected event, failed refresh) and
/// gates quoting until a refetch.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolState {
    pub pool: Address,
    pub fee: FeeTier,
    pub tick_spacing: i32,
    pub sqrt_price_x96: U256,
    pub current_tick: i32,
    pub liquidity: u128,
    pub reinvest_liquidity: u128,
    pub ticks: FastMap<i32, TickInfo>,
    pub is_valid: bool,
}

impl PoolState {
    /// Constructs an empty snapshot for manual population (tests and
    /// fetchers fill in price, liquidity and ticks).
    pub fn new(pool: Address, fee: FeeTier) -> Self {
        Self {
            pool,
            fee,
            tick_spacing: fee.tick_spacing(),
            sqrt_price_x96: U256::ZERO,
            current_tick: 0,
            liquidity: 0,
            reinvest_liquidity: 0,
            ticks: FastMap::default(),
            is_valid: true,
        }
    }

    /// Applies a liquidity delta to one position bound, keeping the
    /// tick's gross/net bookkeeping and the sparse map consistent.
    /// A tick whose gross liquidity drains to zero leaves the map.
    pub(crate) fn update_tick(
        &mut self,
        tick: i32,
        delta: i128,
        upper: bool,
    ) -> Result<(), MathError> {
        let info = self
            .ticks
            .entry(tick)
            .or_insert_with(|| TickInfo::new(tick));

        info.liquidity_gross = add_delta(info.liquidity_gross, delta)?;
        // lower bounds add liquidity entering from below, upper bounds
        // remove it when crossed upward
        info.liquidity_net = if upper {
            info.liquidity_net
                .checked_sub(delta)
                .ok_or(MathError::Overflow)?
        } else {
            info.liquidity_net
                .checked_add(delta)
                .ok_or(MathError::Overflow)?
        };
        info.initialized = info.liquidity_gross != 0;

        if info.liquidity_gross == 0 {
            self.ticks.remove(&tick);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    // --- sort_tokens -------------------------------------------------------------

    #[test]
    fn sort_tokens_orders_by_numeric_value() {
        let a = address!("0x0000000000000000000000000000000000000001");
        let b = address!("0x0000000000000000000000000000000000000002");

        // already sorted
        let (t0, t1) = sort_tokens(a, b);
        assert_eq!(t0, a);
        assert_eq!(t1, b);

        // reversed input still sorts
        let (t0, t1) = sort_tokens(b, a);
        assert_eq!(t0, a);
        assert_eq!(t1, b);
    }

    #[test]
    fn sort_tokens_handles_equal_addresses() {
        let a = address!("0x0000000000000000000000000000000000000001");
        let (t0, t1) = sort_tokens(a, a);

        assert_eq!(t0, a);
        assert_eq!(t1, a);
    }

    // --- FeeTier -----------------------------------------------------------------

    #[test]
    fn fee_tier_tables_match_the_factory() {
        assert_eq!(FeeTier::Stable.fee_units(), 8);
        assert_eq!(FeeTier::Lowest.fee_units(), 10);
        assert_eq!(FeeTier::Low.fee_units(), 40);
        assert_eq!(FeeTier::Medium.fee_units(), 300);
        assert_eq!(FeeTier::High.fee_units(), 1000);

        assert_eq!(FeeTier::Stable.tick_spacing(), 1);
        assert_eq!(FeeTier::Lowest.tick_spacing(), 1);
        assert_eq!(FeeTier::Low.tick_spacing(), 8);
        assert_eq!(FeeTier::Medium.tick_spacing(), 60);
        assert_eq!(FeeTier::High.tick_spacing(), 200);
    }

    #[test]
    fn fee_tier_round_trips_through_raw_units() {
        for tier in FeeTier::ALL {
            assert_eq!(FeeTier::from_fee_units(tier.fee_units()), Some(tier));
        }
        assert_eq!(FeeTier::from_fee_units(0), Some(FeeTier::Zero));
        assert_eq!(FeeTier::from_fee_units(500), None);
        assert_eq!(FeeTier::from_fee_units(3000), None);
    }

    #[test]
    fn zero_tier_is_not_deployable() {
        assert!(!FeeTier::ALL.contains(&FeeTier::Zero));
        assert_eq!(FeeTier::Zero.fee_units(), 0);
        assert_eq!(FeeTier::Zero.tick_spacing(), 1);
    }

    // --- PoolKey -----------------------------------------------------------------

    #[test]
    fn pool_key_sorts_the_pair() {
        let hi = address!("0x00000000000000000000000000000000000000ff");
        let lo = address!("0x0000000000000000000000000000000000000001");

        let key = PoolKey::new(hi, lo, FeeTier::Medium);
        assert_eq!(key.token0, lo);
        assert_eq!(key.token1, hi);
        assert_eq!(key, PoolKey::new(lo, hi, FeeTier::Medium));
    }

    #[test]
    fn pool_key_formats_lowercase_with_fee_suffix() {
        let a = address!("0x00000000000000000000000000000000000000ab");
        let b = address!("0x0000000000000000000000000000000000000001");

        let key = PoolKey::new(a, b, FeeTier::Low);
        assert_eq!(
            key.to_string(),
            "0x0000000000000000000000000000000000000001_0x00000000000000000000000000000000000000ab_40"
        );
    }

    // --- PoolState / update_tick -------------------------------------------------

    fn empty_pool() -> PoolState {
        PoolState::new(
            address!("0x1000000000000000000000000000000000000000"),
            FeeTier::Medium,
        )
    }

    #[test]
    fn new_pool_derives_spacing_from_the_tier() {
        let pool = empty_pool();
        assert_eq!(pool.tick_spacing, 60);
        assert_eq!(pool.liquidity, 0);
        assert_eq!(pool.reinvest_liquidity, 0);
        assert!(pool.is_valid);
        assert!(pool.ticks.is_empty());
    }

    #[test]
    fn a_tick_map_built_with_the_exported_alias_seeds_a_pool() {
        let mut ticks: crate::FastMap<i32, TickInfo> = crate::FastMap::default();
        ticks.insert(
            -60,
            TickInfo {
                liquidity_gross: 500,
                liquidity_net: 500,
                initialized: true,
                ..TickInfo::new(-60)
            },
        );

        let mut pool = empty_pool();
        pool.ticks = ticks;

        assert_eq!(pool.ticks.len(), 1);
        assert!(pool.ticks[&-60].initialized);
    }

    #[test]
    fn update_tick_tracks_gross_and_net_per_bound() {
        let mut pool = empty_pool();

        pool.update_tick(-60, 500, false).unwrap();
        pool.update_tick(60, 500, true).unwrap();

        let lower = &pool.ticks[&-60];
        assert_eq!(lower.liquidity_gross, 500);
        assert_eq!(lower.liquidity_net, 500);
        assert!(lower.initialized);

        let upper = &pool.ticks[&60];
        assert_eq!(upper.liquidity_gross, 500);
        assert_eq!(upper.liquidity_net, -500);
        assert!(upper.initialized);
    }

    #[test]
    fn update_tick_accumulates_overlapping_positions() {
        let mut pool = empty_pool();

        pool.update_tick(0, 300, false).unwrap();
        pool.update_tick(0, 200, true).unwrap();

        let info = &pool.ticks[&0];
        assert_eq!(info.liquidity_gross, 500);
        // +300 entering from below, -200 leaving above
        assert_eq!(info.liquidity_net, 100);
    }

    #[test]
    fn draining_a_tick_removes_it_from_the_map() {
        let mut pool = empty_pool();

        pool.update_tick(120, 700, false).unwrap();
        assert!(pool.ticks.contains_key(&120));

        pool.update_tick(120, -700, false).unwrap();
        assert!(!pool.ticks.contains_key(&120));
    }

    #[test]
    fn burning_more_than_gross_liquidity_fails() {
        let mut pool = empty_pool();

        pool.update_tick(0, 100, false).unwrap();
        let err = pool.update_tick(0, -101, false).unwrap_err();
        assert!(matches!(err, MathError::LiquidityUnderflow));
    }
}
