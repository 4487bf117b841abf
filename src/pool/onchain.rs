use crate::error::FetchError;
use crate::pool::events::PoolEvent;
use crate::pool::fetch::{LiquiditySample, PoolStateSample, StateFetcher};
use crate::pool::state::{FeeTier, TickInfo};
use alloy_primitives::aliases::{I24, U24};
use alloy_primitives::{Address, BlockNumber, Log, U256};
use alloy_provider::Provider;
use alloy_sol_macro::sol;
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use std::sync::Arc;

sol! {
    #[sol(rpc)]
    interface IFactory {
        function getPool(address tokenA, address tokenB, uint24 swapFeeUnits)
            external
            view
            returns (address pool);
    }

    #[sol(rpc)]
    interface IPool {
        event Swap(
            address indexed sender,
            address indexed recipient,
            int256 deltaQty0,
            int256 deltaQty1,
            uint160 sqrtP,
            uint128 liquidity,
            int24 currentTick
        );
        event Mint(
            address sender,
            address indexed owner,
            int24 indexed tickLower,
            int24 indexed tickUpper,
            uint128 qty,
            uint256 qty0,
            uint256 qty1
        );
        event Burn(
            address indexed owner,
            int24 indexed tickLower,
            int24 indexed tickUpper,
            uint128 qty,
            uint256 qty0,
            uint256 qty1
        );

        function getPoolState() external view returns (
            uint160 sqrtP,
            int24 currentTick,
            int24 nearestCurrentTick,
            bool locked
        );
        function getLiquidityState() external view returns (
            uint128 baseL,
            uint128 reinvestL,
            uint128 reinvestLLast
        );
        function ticks(int24 tick) external view returns (
            uint128 liquidityGross,
            int128 liquidityNet,
            uint256 feeGrowthOutside,
            uint128 secondsPerLiquidityOutside
        );
    }

    #[sol(rpc)]
    interface ITicksFeesReader {
        function getTicksInRange(address pool, int24 startTick, uint32 length)
            external
            view
            returns (int24[] allTicks);
    }
}

sol! {
    struct Call {
        address target;
        bytes callData;
    }

    #[sol(rpc)]
    interface IMulticall {
        function aggregate(Call[] calls)
            external
            view
            returns (uint256 blockNumber, bytes[] returnData);
    }
}

pub type OnchainProvider<P> = Arc<P>;

/// Translates a raw pool log into a [`PoolEvent`]. Logs the tracker
/// does not follow (reinvestment token mints, flashes) come back as
/// [`PoolEvent::Unknown`].
pub fn decode_pool_event(log: &Log) -> PoolEvent {
    if let Ok(swap) = IPool::Swap::decode_log_data(&log.data) {
        return PoolEvent::Swap {
            amount0: swap.deltaQty0,
            amount1: swap.deltaQty1,
            sqrt_price_x96: U256::from(swap.sqrtP),
            tick: swap.currentTick.as_i32(),
            liquidity: swap.liquidity,
        };
    }
    if let Ok(mint) = IPool::Mint::decode_log_data(&log.data) {
        return PoolEvent::Mint {
            tick_lower: mint.tickLower.as_i32(),
            tick_upper: mint.tickUpper.as_i32(),
            qty: mint.qty,
        };
    }
    if let Ok(burn) = IPool::Burn::decode_log_data(&log.data) {
        return PoolEvent::Burn {
            tick_lower: burn.tickLower.as_i32(),
            tick_upper: burn.tickUpper.as_i32(),
            qty: burn.qty,
        };
    }
    PoolEvent::Unknown
}

/// [`StateFetcher`] backed by JSON-RPC through the factory, pool and
/// tick-reader contracts, batching per-tick reads through a multicall.
pub struct OnchainFetcher<P> {
    factory: IFactory::IFactoryInstance<OnchainProvider<P>>,
    reader: ITicksFeesReader::ITicksFeesReaderInstance<OnchainProvider<P>>,
    multicall: IMulticall::IMulticallInstance<OnchainProvider<P>>,
    provider: OnchainProvider<P>,
}

impl<P> OnchainFetcher<P>
where
    P: Provider + Send + Sync + 'static,
{
    /// Binds the fetcher to the deployed factory, tick reader and
    /// multicall contracts for one network.
    pub fn new(
        factory: Address,
        ticks_fees_reader: Address,
        multicall: Address,
        provider: OnchainProvider<P>,
    ) -> Self {
        Self {
            factory: IFactory::IFactoryInstance::new(factory, provider.clone()),
            reader: ITicksFeesReader::ITicksFeesReaderInstance::new(
                ticks_fees_reader,
                provider.clone(),
            ),
            multicall: IMulticall::IMulticallInstance::new(multicall, provider.clone()),
            provider,
        }
    }
}

#[async_trait]
impl<P> StateFetcher for OnchainFetcher<P>
where
    P: Provider + Send + Sync + 'static,
{
    async fn resolve_pool_address(
        &self,
        token0: Address,
        token1: Address,
        fee: FeeTier,
    ) -> Result<Address, FetchError> {
        self.factory
            .getPool(token0, token1, U24::from(fee.fee_units()))
            .call()
            .await
            .map_err(|e| FetchError::ResolvePool(e.to_string()))
    }

    async fn fetch_pool_state(
        &self,
        pool: Address,
        block: Option<BlockNumber>,
    ) -> Result<PoolStateSample, FetchError> {
        let contract = IPool::IPoolInstance::new(pool, self.provider.clone());
        let mut call = contract.getPoolState();

        if let Some(bn) = block {
            call = call.block(bn.into());
        }

        let state = call
            .call()
            .await
            .map_err(|e| FetchError::PoolState(e.to_string()))?;

        Ok(PoolStateSample {
            sqrt_price_x96: U256::from(state.sqrtP),
            current_tick: state.currentTick.as_i32(),
            locked: state.locked,
        })
    }

    async fn fetch_liquidity_state(
        &self,
        pool: Address,
        block: Option<BlockNumber>,
    ) -> Result<LiquiditySample, FetchError> {
        let contract = IPool::IPoolInstance::new(pool, self.provider.clone());
        let mut call = contract.getLiquidityState();

        if let Some(bn) = block {
            call = call.block(bn.into());
        }

        let liquidity = call
            .call()
            .await
            .map_err(|e| FetchError::LiquidityState(e.to_string()))?;

        Ok(LiquiditySample {
            base: liquidity.baseL,
            reinvest: liquidity.reinvestL,
        })
    }

    async fn fetch_tick_range(
        &self,
        pool: Address,
        start_tick: i32,
        page_len: usize,
        block: Option<BlockNumber>,
    ) -> Result<Vec<i32>, FetchError> {
        let start = I24::try_from(start_tick)
            .map_err(|e| FetchError::TickRange(e.to_string()))?;
        let mut call = self.reader.getTicksInRange(pool, start, page_len as u32);

        if let Some(bn) = block {
            call = call.block(bn.into());
        }

        let ticks = call
            .call()
            .await
            .map_err(|e| FetchError::TickRange(e.to_string()))?;

        Ok(ticks.into_iter().map(|tick| tick.as_i32()).collect())
    }

    async fn fetch_tick_details(
        &self,
        pool: Address,
        ticks: &[i32],
        block: Option<BlockNumber>,
    ) -> Result<Vec<TickInfo>, FetchError> {
        if ticks.is_empty() {
            return Ok(Vec::new());
        }

        let contract = IPool::IPoolInstance::new(pool, self.provider.clone());

        let mut tick_calls: Vec<Call> = Vec::with_capacity(ticks.len());
        for &tick in ticks {
            let call_data = contract
                .ticks(I24::try_from(tick).unwrap())
                .calldata()
                .to_owned();
            tick_calls.push(Call {
                target: pool,
                callData: call_data,
            });
        }

        let mut agg = self.multicall.aggregate(tick_calls);

        if let Some(bn) = block {
            agg = agg.block(bn.into());
        }

        let return_data = agg
            .call()
            .await
            .map_err(|e| FetchError::TickDetails(e.to_string()))?;

        let mut details: Vec<TickInfo> = Vec::with_capacity(ticks.len());

        for (i, raw) in return_data.returnData.into_iter().enumerate() {
            let decoded = contract
                .ticks(I24::try_from(ticks[i]).unwrap())
                .decode_output(raw)
                .map_err(|e| FetchError::TickDetails(e.to_string()))?;

            details.push(TickInfo {
                index: ticks[i],
                liquidity_gross: decoded.liquidityGross,
                liquidity_net: decoded.liquidityNet,
                fee_growth_outside: decoded.feeGrowthOutside,
                seconds_per_liquidity_outside: decoded.secondsPerLiquidityOutside,
                initialized: true,
            });
        }

        Ok(details)
    }
}
