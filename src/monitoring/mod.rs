//! Periodic reconciliation tasks.
//!
//! Ingestion monitors pull transactions of tracked wallets from the blockchain gateway into
//! the ledger, dispatch monitors forward matured transactions to downstream services, the
//! balance monitor reports low platform balances. All of them are driven by `Scheduler`.

mod check_platform_wallets;
mod check_transactions;
mod check_wallet;
mod cycle;
mod error;
mod scheduler;
mod send_to_exchanger;
mod send_to_transaction_service;

use std::fmt;
use std::time::Duration;

pub use self::check_platform_wallets::CheckPlatformWalletsMonitor;
pub use self::check_transactions::CheckTransactionsMonitor;
pub use self::check_wallet::CheckWalletMonitor;
pub use self::cycle::LockedCycle;
pub use self::error::*;
pub use self::scheduler::Scheduler;
pub use self::send_to_exchanger::SendToExchangerMonitor;
pub use self::send_to_transaction_service::SendToTransactionServiceMonitor;
use prelude::*;

/// Outcome of one cycle, logged by the scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Entities selected for the cycle
    pub entities: usize,
    /// Rows inserted or updated
    pub written: usize,
    /// Entities locked by someone else, or whose lock expired before the write
    pub skipped: usize,
    /// Entities whose processing failed
    pub failed: usize,
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "entities: {}, written: {}, skipped: {}, failed: {}",
            self.entities, self.written, self.skipped, self.failed
        )
    }
}

pub trait Monitor: Send + Sync + 'static {
    fn name(&self) -> &'static str;
    /// Sleep between two cycles
    fn period(&self) -> Duration;
    fn run_cycle(&self) -> Box<Future<Item = CycleReport, Error = Error> + Send>;
}
