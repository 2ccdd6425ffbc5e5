//! Oracle-callback hardware entropy service
//!
//! The service's own trust mechanics are external; the engine only checks that
//! the delivery comes from the configured provider and treats the value as
//! opaque.

use crate::common::types::{Address, Entropy, RequestId, TxContext};
use crate::errors::{WagerError, WagerResult};
use rand::RngCore;

#[derive(Clone, Debug, Default)]
pub struct EntropyServiceProvider {
    provider: Option<Address>,
    next_id: u64,
}

impl EntropyServiceProvider {
    pub fn new(provider: Option<Address>) -> Self {
        Self { provider, next_id: 1 }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn configure(&mut self, provider: Address) {
        self.provider = Some(provider);
    }

    pub fn provider(&self) -> Option<Address> {
        self.provider
    }

    pub(crate) fn mint_id(&mut self) -> RequestId {
        let id = RequestId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    pub(crate) fn resolve(&self, ctx: &TxContext, value: &Entropy) -> WagerResult<Entropy> {
        let provider = self
            .provider
            .ok_or(WagerError::RandomnessNotConfigured(super::Strategy::EntropyService))?;
        if ctx.caller != provider {
            return Err(WagerError::Unauthorized(ctx.caller));
        }
        Ok(*value)
    }
}

/// Stand-in for the external service: draws values from the OS generator
pub struct EntropyServiceSim {
    pub address: Address,
}

impl EntropyServiceSim {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    pub fn draw(&self) -> Entropy {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Entropy(bytes)
    }
}
