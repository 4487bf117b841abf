use crate::error::{Error, PoolError};
use crate::pool::events::PoolEvent;
use crate::pool::fetch::StateFetcher;
use crate::pool::state::{FeeTier, PoolKey, PoolState};
use crate::pool::swap::{QuoteResult, SwapSide};
use alloy_primitives::{Address, BlockNumber, U256};
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, warn};

// cached entry per pool key; a slot with no state is a pool the
// factory reported as nonexistent, cached so the pair is not resolved
// again
struct PoolSlot {
    state: Option<Arc<PoolState>>,
    // ticket of the fetch or event fold that wrote the state; later
    // tickets win when writes race
    last_fetch: u64,
}

/// Concurrent cache of pool snapshots over a [`StateFetcher`].
///
/// Snapshots are shared immutably behind `Arc`; events fold into a
/// clone and swap the slot, so readers always see a complete state.
/// Any event the snapshot cannot absorb (or a snapshot that comes back
/// flagged invalid) triggers a refetch at the offending block.
pub struct PoolStore<F> {
    fetcher: Arc<F>,
    pools: DashMap<PoolKey, PoolSlot>,
    seq: AtomicU64,
}

fn fold_events(base: &PoolState, events: &[PoolEvent]) -> Result<PoolState, Error> {
    let mut state = base.clone();
    for event in events {
        state = state.apply_event(event)?;
    }
    Ok(state)
}

enum FoldOutcome {
    Applied,
    Invalidated,
    Rejected(Error),
}

impl<F: StateFetcher> PoolStore<F> {
    pub fn new(fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            pools: DashMap::new(),
            seq: AtomicU64::new(0),
        }
    }

    fn next_ticket(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Current snapshot for a tracked pool, without touching the chain.
    pub fn snapshot(&self, key: &PoolKey) -> Result<Arc<PoolState>, Error> {
        let slot = self.pools.get(key).ok_or(PoolError::PoolNotFound)?;
        match &slot.state {
            Some(state) => Ok(Arc::clone(state)),
            None => Err(PoolError::PoolNotFound.into()),
        }
    }

    /// Resolves and loads the pool for a token pair and fee tier,
    /// reusing the cached snapshot when present. A pair the factory
    /// never deployed is remembered as missing and fails fast from
    /// then on.
    pub async fn ensure_pool(
        &self,
        token_a: Address,
        token_b: Address,
        fee: FeeTier,
        block: Option<BlockNumber>,
    ) -> Result<Arc<PoolState>, Error> {
        let key = PoolKey::new(token_a, token_b, fee);

        if let Some(slot) = self.pools.get(&key) {
            return match &slot.state {
                Some(state) => Ok(Arc::clone(state)),
                None => Err(PoolError::PoolNotFound.into()),
            };
        }

        let address = self
            .fetcher
            .resolve_pool_address(key.token0, key.token1, fee)
            .await?;
        if address == Address::ZERO {
            self.pools.entry(key).or_insert(PoolSlot {
                state: None,
                last_fetch: 0,
            });
            return Err(PoolError::PoolNotFound.into());
        }

        self.fetch_and_store(key, address, block).await
    }

    /// Loads every pool deployed for the given pairs and fee tiers.
    /// Missing pools and failed loads are skipped; the keys that did
    /// load come back.
    pub async fn preload(
        &self,
        pairs: &[(Address, Address)],
        fees: &[FeeTier],
        block: Option<BlockNumber>,
    ) -> Vec<PoolKey> {
        let mut loaded = Vec::new();
        for &(token_a, token_b) in pairs {
            for &fee in fees {
                let key = PoolKey::new(token_a, token_b, fee);
                match self.ensure_pool(token_a, token_b, fee, block).await {
                    Ok(_) => loaded.push(key),
                    Err(Error::PoolError(PoolError::PoolNotFound)) => {
                        debug!(pool = %key, "no pool deployed for pair at this tier");
                    }
                    Err(err) => {
                        warn!(pool = %key, error = %err, "pool preload failed, skipping");
                    }
                }
            }
        }
        loaded
    }

    /// Refetches a tracked pool from chain, racing politely with any
    /// concurrent refetch.
    pub async fn resync(
        &self,
        key: &PoolKey,
        block: Option<BlockNumber>,
    ) -> Result<Arc<PoolState>, Error> {
        let address = {
            let slot = self.pools.get(key).ok_or(PoolError::PoolNotFound)?;
            match &slot.state {
                Some(state) => state.pool,
                None => return Err(PoolError::PoolNotFound.into()),
            }
        };
        self.fetch_and_store(*key, address, block).await
    }

    async fn fetch_and_store(
        &self,
        key: PoolKey,
        address: Address,
        block: Option<BlockNumber>,
    ) -> Result<Arc<PoolState>, Error> {
        let ticket = self.next_ticket();
        let state = Arc::new(self.fetcher.fetch_full_state(address, key.fee, block).await?);

        let mut slot = self.pools.entry(key).or_insert(PoolSlot {
            state: None,
            last_fetch: 0,
        });
        if slot.last_fetch < ticket {
            slot.state = Some(Arc::clone(&state));
            slot.last_fetch = ticket;
            return Ok(state);
        }
        // a fetch that started later already landed; keep its result
        match &slot.state {
            Some(current) => Ok(Arc::clone(current)),
            None => Err(PoolError::PoolNotFound.into()),
        }
    }

    /// Folds one block's decoded logs into the cached snapshot.
    ///
    /// An event the snapshot cannot absorb, or a fold that leaves the
    /// snapshot flagged invalid, discards the local state and refetches
    /// at the same block, mirroring what the on-chain state must be.
    pub async fn apply_block(
        &self,
        key: &PoolKey,
        block: BlockNumber,
        events: &[PoolEvent],
    ) -> Result<(), Error> {
        let outcome = {
            let mut slot = self.pools.get_mut(key).ok_or(PoolError::PoolNotFound)?;
            let base = match &slot.state {
                Some(state) => Arc::clone(state),
                None => return Err(PoolError::PoolNotFound.into()),
            };

            match fold_events(base.as_ref(), events) {
                Ok(state) if state.is_valid => {
                    slot.state = Some(Arc::new(state));
                    slot.last_fetch = self.next_ticket();
                    FoldOutcome::Applied
                }
                Ok(_) => FoldOutcome::Invalidated,
                Err(err) => FoldOutcome::Rejected(err),
            }
            // the slot lock drops here, before any refetch awaits
        };

        match outcome {
            FoldOutcome::Applied => Ok(()),
            FoldOutcome::Invalidated => {
                warn!(pool = %key, block, "snapshot invalid after events, refetching");
                self.resync(key, Some(block)).await?;
                Ok(())
            }
            FoldOutcome::Rejected(err) if err.requires_resync() => {
                warn!(
                    pool = %key,
                    block,
                    "events walked off the cached tick range, refetching"
                );
                self.resync(key, Some(block)).await?;
                Ok(())
            }
            FoldOutcome::Rejected(err) => {
                error!(pool = %key, block, error = %err, "event application failed, refetching");
                self.resync(key, Some(block)).await?;
                Ok(())
            }
        }
    }

    /// Quotes against the cached snapshot, refreshing it first if it
    /// was flagged invalid. Still-invalid state after a refresh fails
    /// with [`PoolError::SnapshotInvalid`].
    pub async fn quote(
        &self,
        key: &PoolKey,
        zero_for_one: bool,
        amounts: &[U256],
        side: SwapSide,
    ) -> Result<QuoteResult, Error> {
        let mut state = self.snapshot(key)?;
        if !state.is_valid {
            debug!(pool = %key, "snapshot invalid, refreshing before quoting");
            state = self.resync(key, None).await?;
            if !state.is_valid {
                return Err(PoolError::SnapshotInvalid.into());
            }
        }
        state.quote(zero_for_one, amounts, side)
    }
}
