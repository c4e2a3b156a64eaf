//! Shared test harnesses for E2E and adversarial tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use paystream_core::constants::{DEFAULT_APY_PERCENT, DEFAULT_INACTIVITY_WINDOW};
use paystream_core::token::{MemoryToken, TokenLedger};
use paystream_core::types::AccountId;
use paystream_payback::PaybackLedger;
use paystream_rewards::StreamLedger;

/// Fixture epoch; an arbitrary recent Unix timestamp.
pub const START: u64 = 1_700_000_000;

/// Account id from a seed byte.
pub fn account(seed: u8) -> AccountId {
    AccountId([seed; 32])
}

/// The privileged account used by both harnesses.
pub fn owner() -> AccountId {
    account(0x01)
}

/// A controllable clock shared between a harness and its ledger.
#[derive(Clone)]
pub struct TestClock(Arc<AtomicU64>);

impl TestClock {
    pub fn new(start: u64) -> Self {
        Self(Arc::new(AtomicU64::new(start)))
    }

    pub fn now(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn advance(&self, seconds: u64) {
        self.0.fetch_add(seconds, Ordering::Relaxed);
    }

    pub fn reader(&self) -> impl Fn() -> u64 + Send + Sync + 'static {
        let inner = self.0.clone();
        move || inner.load(Ordering::Relaxed)
    }
}

/// A payback ledger wired to an in-memory token and a test clock.
///
/// The owner is minted a large balance and has approved the custody
/// account, so `refill_pool` works out of the box.
pub struct PaybackHarness {
    pub ledger: PaybackLedger,
    pub token: Arc<MemoryToken>,
    pub clock: TestClock,
    pub custody: AccountId,
}

impl PaybackHarness {
    pub fn new() -> Self {
        Self::with_apy(DEFAULT_APY_PERCENT)
    }

    pub fn with_apy(apy_percent: u64) -> Self {
        let token = Arc::new(MemoryToken::new());
        let clock = TestClock::new(START);
        let custody = account(0xFD);
        let ledger = PaybackLedger::with_clock(
            apy_percent,
            token.clone() as Arc<dyn TokenLedger>,
            custody,
            owner(),
            DEFAULT_INACTIVITY_WINDOW,
            clock.reader(),
        )
        .unwrap();
        token.mint(&owner(), 1_000_000_000).unwrap();
        token.approve(&owner(), &custody, u64::MAX);
        Self {
            ledger,
            token,
            clock,
            custody,
        }
    }
}

impl Default for PaybackHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A streaming ledger wired to an in-memory token and a test clock.
///
/// The owner and a handful of staker accounts are funded and have
/// approved the custody account.
pub struct StreamHarness {
    pub ledger: StreamLedger,
    pub token: Arc<MemoryToken>,
    pub clock: TestClock,
    pub custody: AccountId,
}

impl StreamHarness {
    pub fn new(stake_limit: u64, pool_limit: u64) -> Self {
        let token = Arc::new(MemoryToken::new());
        let clock = TestClock::new(START);
        let custody = account(0xFE);
        let ledger = StreamLedger::with_clock(
            token.clone() as Arc<dyn TokenLedger>,
            custody,
            owner(),
            stake_limit,
            pool_limit,
            clock.reader(),
        );
        for seed in [0x01, 0x02, 0x03, 0x04, 0x05] {
            token.mint(&account(seed), 1_000_000_000).unwrap();
            token.approve(&account(seed), &custody, u64::MAX);
        }
        Self {
            ledger,
            token,
            clock,
            custody,
        }
    }
}
