//! Wager Engine - Randomized Wagering Settlement
//!
//! Users stake a fungible balance on an outcome, a pluggable randomness
//! source is consulted, and stakes are paid out by a deterministic formula
//! that also mints a host fee and a protocol fee.
//!
//! Four variants share one settlement core: coin flip, roulette and
//! roll-over keep one pending entry per owner ([`SingleEntryGame`]); crash
//! runs shared rounds with deferred claims ([`CrashGame`]). Randomness comes
//! from a self-computed hash chain, a VRF oracle or an entropy service
//! ([`randomness::Strategy`]), one active at a time.

pub mod common;
pub mod config;
pub mod controller;
pub mod entry_store;
pub mod errors;
pub mod events;
pub mod games;
pub mod ledger;
pub mod math;
pub mod randomness;
pub mod round;
pub mod settlement;
pub mod stats;

pub use common::traits::{Credit, Ledger};
pub use common::types::{Address, Entropy, RequestId, TxContext};
pub use config::{ConfigLoader, EngineConfig, GameConfig, RandomnessConfig};
pub use controller::{
    BatchResolveReport, CoinFlipGame, GameCore, Resolution, Roles, RollOverGame, RouletteGame,
    SingleEntryGame,
};
pub use entry_store::{Entry, EntryParams, EntryStatus};
pub use errors::{LedgerError, WagerError, WagerResult};
pub use events::{EventLog, WagerEvent};
pub use games::{
    CoinChoice, CoinFlip, Crash, GameKind, PpvMode, RollOver, Roulette, Variant, VariantRules,
};
pub use ledger::InMemoryLedger;
pub use math::WAD;
pub use randomness::{Delivery, Strategy};
pub use round::{ClaimReport, ClaimableEntry, CrashGame, Round, RoundOutcome, RoundStatus};
pub use settlement::{Edge, Settlement};
pub use stats::GameStats;
