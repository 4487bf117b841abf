use thiserror::Error;

#[derive(Debug, Error)]
pub enum MathError {
    #[error("Math error - overflow")]
    Overflow,
    #[error("Math error - division by zero")]
    DivisionByZero,
    #[error("Math error - tick or sqrt price out of range")]
    TickOutOfRange,
    #[error("Math error - liquidity underflow")]
    LiquidityUnderflow,
}

#[derive(Debug, Error)]
pub enum TickListError {
    #[error("Tick list error - no initialized tick left in the cached range")]
    OutOfSearchRange,
    #[error("Tick list error - tick {0} is not in the list")]
    TickNotFound(i32),
}

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Pool error - no pool deployed for the requested pair and fee")]
    PoolNotFound,
    #[error("Pool error - invalid position bounds")]
    InvalidPositionBounds,
    #[error("Pool error - price limit out of bounds")]
    PriceLimitOutOfBounds,
    #[error("Pool error - snapshot is not valid for quoting")]
    SnapshotInvalid,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Fetch error - failed to resolve pool address: {0}")]
    ResolvePool(String),
    #[error("Fetch error - failed to get pool state: {0}")]
    PoolState(String),
    #[error("Fetch error - failed to get liquidity state: {0}")]
    LiquidityState(String),
    #[error("Fetch error - failed to get tick range: {0}")]
    TickRange(String),
    #[error("Fetch error - failed to get tick details: {0}")]
    TickDetails(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    MathError(#[from] crate::error::MathError),

    #[error(transparent)]
    TickListError(#[from] crate::error::TickListError),

    #[error(transparent)]
    PoolError(#[from] crate::error::PoolError),

    #[error(transparent)]
    FetchError(#[from] crate::error::FetchError),
}

impl Error {
    /// True for the one failure class that means the cached snapshot fell
    /// behind the chain and a refetch clears the condition. Everything else
    /// is an invariant violation in the snapshot or the event data.
    pub fn requires_resync(&self) -> bool {
        matches!(
            self,
            Error::TickListError(TickListError::OutOfSearchRange)
        )
    }
}
