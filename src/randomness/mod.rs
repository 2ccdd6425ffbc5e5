//! Randomness resolution
//!
//! Every entry or round asks the active strategy for one value. Requests are
//! keyed by `(strategy, id)` and stamped with the router epoch; switching the
//! active strategy bumps the epoch, so a request issued under one strategy can
//! never be completed by another one, nor revived by switching back.

pub mod entropy_service;
pub mod hash_chain;
pub mod vrf;

pub use entropy_service::{EntropyServiceProvider, EntropyServiceSim};
pub use hash_chain::HashChainProvider;
pub use vrf::{verify_vrf_proof, VrfOracle, VrfProof, VrfProvider};

use crate::common::types::{Address, Entropy, RequestId, TxContext};
use crate::config::RandomnessConfig;
use crate::errors::{WagerError, WagerResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Pluggable randomness source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    HashChain,
    Vrf,
    EntropyService,
}

impl Strategy {
    fn slot(self) -> usize {
        match self {
            Strategy::HashChain => 0,
            Strategy::Vrf => 1,
            Strategy::EntropyService => 2,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::HashChain => write!(f, "hash_chain"),
            Strategy::Vrf => write!(f, "vrf"),
            Strategy::EntropyService => write!(f, "entropy_service"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "hash_chain" | "hashchain" => Ok(Strategy::HashChain),
            "vrf" => Ok(Strategy::Vrf),
            "entropy_service" | "entropy" => Ok(Strategy::EntropyService),
            other => Err(format!("unknown randomness strategy '{}'", other)),
        }
    }
}

/// What a request will settle once its value arrives
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestTarget {
    Entry(Address),
    Round(u64),
}

/// Outstanding randomness request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    pub id: RequestId,
    pub strategy: Strategy,
    pub target: RequestTarget,
    pub epoch: u64,
    pub block_number: u64,
    /// Message the VRF oracle must sign; empty for other strategies
    pub input: Vec<u8>,
}

/// Strategy-specific payload of a fulfilment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Hash chain values are computed in place; nothing is delivered
    HashChain,
    Vrf(VrfProof),
    EntropyService(Entropy),
}

impl Delivery {
    pub fn strategy(&self) -> Strategy {
        match self {
            Delivery::HashChain => Strategy::HashChain,
            Delivery::Vrf(_) => Strategy::Vrf,
            Delivery::EntropyService(_) => Strategy::EntropyService,
        }
    }
}

/// One randomness strategy and its parameters
#[derive(Clone, Debug)]
pub enum RandomnessProvider {
    HashChain(HashChainProvider),
    Vrf(VrfProvider),
    EntropyService(EntropyServiceProvider),
}

impl RandomnessProvider {
    pub fn strategy(&self) -> Strategy {
        match self {
            RandomnessProvider::HashChain(_) => Strategy::HashChain,
            RandomnessProvider::Vrf(_) => Strategy::Vrf,
            RandomnessProvider::EntropyService(_) => Strategy::EntropyService,
        }
    }

    pub fn is_configured(&self) -> bool {
        match self {
            RandomnessProvider::HashChain(_) => true,
            RandomnessProvider::Vrf(p) => p.is_configured(),
            RandomnessProvider::EntropyService(p) => p.is_configured(),
        }
    }

    fn mint_id(&mut self) -> RequestId {
        match self {
            RandomnessProvider::HashChain(p) => p.mint_id(),
            RandomnessProvider::Vrf(p) => p.mint_id(),
            RandomnessProvider::EntropyService(p) => p.mint_id(),
        }
    }

    /// Authenticate and verify a delivery, producing the entropy it carries
    pub fn resolve(&self, ctx: &TxContext, request: &PendingRequest, delivery: &Delivery) -> WagerResult<Entropy> {
        match (self, delivery) {
            (RandomnessProvider::HashChain(p), Delivery::HashChain) => Ok(p.entropy_for(request.id, ctx)),
            (RandomnessProvider::Vrf(p), Delivery::Vrf(proof)) => p.resolve(ctx, &request.input, proof),
            (RandomnessProvider::EntropyService(p), Delivery::EntropyService(value)) => p.resolve(ctx, value),
            _ => Err(WagerError::RequestNotInProgress(request.id)),
        }
    }

    fn absorb(&mut self, entropy: &Entropy) {
        if let RandomnessProvider::HashChain(p) = self {
            p.absorb(entropy);
        }
    }
}

/// Routes requests to the active strategy and tracks outstanding ones
#[derive(Clone, Debug)]
pub struct RandomnessRouter {
    active: Strategy,
    epoch: u64,
    providers: [RandomnessProvider; 3],
    outstanding: HashMap<(Strategy, RequestId), PendingRequest>,
}

impl RandomnessRouter {
    pub fn new(config: &RandomnessConfig) -> WagerResult<Self> {
        config.validate()?;
        let public_key = config.vrf_public_key.as_deref().map(decode_public_key).transpose()?;

        Ok(Self {
            active: config.strategy,
            epoch: 0,
            providers: [
                RandomnessProvider::HashChain(HashChainProvider::new()),
                RandomnessProvider::Vrf(VrfProvider::new(config.vrf_coordinator, public_key)),
                RandomnessProvider::EntropyService(EntropyServiceProvider::new(config.entropy_provider)),
            ],
            outstanding: HashMap::new(),
        })
    }

    pub fn active(&self) -> Strategy {
        self.active
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn provider(&self, strategy: Strategy) -> &RandomnessProvider {
        &self.providers[strategy.slot()]
    }

    /// Make `strategy` the active one; outstanding requests of every other
    /// strategy become unresolvable
    pub fn set_strategy(&mut self, strategy: Strategy) -> WagerResult<()> {
        if !self.provider(strategy).is_configured() {
            return Err(WagerError::RandomnessNotConfigured(strategy));
        }
        if strategy == self.active {
            return Ok(());
        }
        let previous = self.active;
        self.active = strategy;
        self.epoch += 1;
        tracing::info!(from = %previous, to = %strategy, epoch = self.epoch, "Randomness strategy switched");
        Ok(())
    }

    pub fn configure_vrf(&mut self, coordinator: Address, public_key_hex: &str) -> WagerResult<()> {
        let public_key = decode_public_key(public_key_hex)?;
        if let RandomnessProvider::Vrf(p) = &mut self.providers[Strategy::Vrf.slot()] {
            p.configure(coordinator, public_key);
        }
        Ok(())
    }

    pub fn configure_entropy_service(&mut self, provider: Address) {
        if let RandomnessProvider::EntropyService(p) = &mut self.providers[Strategy::EntropyService.slot()] {
            p.configure(provider);
        }
    }

    /// Issue a request under the active strategy
    pub fn request(&mut self, ctx: &TxContext, target: RequestTarget) -> WagerResult<PendingRequest> {
        let strategy = self.active;
        let provider = &mut self.providers[strategy.slot()];
        if !provider.is_configured() {
            return Err(WagerError::RandomnessNotConfigured(strategy));
        }

        let id = provider.mint_id();
        let input = match strategy {
            Strategy::Vrf => VrfProvider::request_input(id, ctx),
            _ => Vec::new(),
        };
        let request = PendingRequest {
            id,
            strategy,
            target,
            epoch: self.epoch,
            block_number: ctx.block_number,
            input,
        };
        self.outstanding.insert((strategy, id), request.clone());

        tracing::debug!(request_id = %id, strategy = %strategy, ?target, "Randomness requested");
        Ok(request)
    }

    /// Outstanding request that may still be completed right now
    pub fn resolvable(&self, strategy: Strategy, id: RequestId) -> WagerResult<&PendingRequest> {
        match self.outstanding.get(&(strategy, id)) {
            Some(request) if strategy == self.active && request.epoch == self.epoch => Ok(request),
            _ => Err(WagerError::RequestNotInProgress(id)),
        }
    }

    /// Check a delivery without consuming the request
    pub fn resolve(&self, ctx: &TxContext, id: RequestId, delivery: &Delivery) -> WagerResult<(PendingRequest, Entropy)> {
        let request = self.resolvable(delivery.strategy(), id)?;
        let entropy = self.provider(request.strategy).resolve(ctx, request, delivery)?;
        Ok((request.clone(), entropy))
    }

    /// Consume a request after its value has been applied
    pub fn complete(&mut self, strategy: Strategy, id: RequestId, entropy: &Entropy) -> Option<PendingRequest> {
        let request = self.outstanding.remove(&(strategy, id))?;
        self.providers[strategy.slot()].absorb(entropy);
        Some(request)
    }

    /// Drop a request without a value (timeout refund)
    pub fn cancel(&mut self, strategy: Strategy, id: RequestId) -> Option<PendingRequest> {
        self.outstanding.remove(&(strategy, id))
    }

    /// Owner of an outstanding request
    pub fn target_of(&self, strategy: Strategy, id: RequestId) -> Option<RequestTarget> {
        self.outstanding.get(&(strategy, id)).map(|r| r.target)
    }

    pub fn outstanding_count(&self) -> usize {
        self.outstanding.len()
    }

    /// Current hash chain seed, for callers that derive several links at once
    pub fn hash_chain_seed(&self) -> [u8; 32] {
        match &self.providers[Strategy::HashChain.slot()] {
            RandomnessProvider::HashChain(p) => p.seed(),
            _ => [0u8; 32],
        }
    }
}

fn decode_public_key(value: &str) -> WagerResult<[u8; 32]> {
    let bytes = hex::decode(value.strip_prefix("0x").unwrap_or(value))
        .map_err(|e| WagerError::invalid_config("vrf_public_key", e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| WagerError::invalid_config("vrf_public_key", "must be 32 bytes"))
}
