pub mod events;
pub mod fetch;
#[cfg(feature = "onchain")]
pub mod onchain;
pub mod state;
pub mod store;
pub mod swap;
pub mod tick_list;
