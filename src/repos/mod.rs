//! Repos is a module responsible for interacting with postgres db

pub mod error;
pub mod executor;
#[cfg(test)]
mod mocks;
pub mod transactions;
pub mod types;
pub mod wallets;

pub use self::error::*;
pub use self::executor::*;
#[cfg(test)]
pub use self::mocks::*;
pub use self::transactions::*;
pub use self::types::*;
pub use self::wallets::*;
