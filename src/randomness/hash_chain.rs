//! Self-computed hash chain
//!
//! Lowest-trust strategy with no external step, used as the liveness
//! fallback: `seed' = SHA-256(seed || id || block_number || block_hash)`.

use crate::common::types::{Entropy, RequestId, TxContext};
use sha2::{Digest, Sha256};

const GENESIS_DOMAIN: &[u8] = b"wager-engine:hash-chain:genesis";

#[derive(Clone, Debug)]
pub struct HashChainProvider {
    seed: [u8; 32],
    next_id: u64,
}

impl HashChainProvider {
    pub fn new() -> Self {
        Self::with_seed(Sha256::digest(GENESIS_DOMAIN).into())
    }

    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self { seed, next_id: 1 }
    }

    pub fn seed(&self) -> [u8; 32] {
        self.seed
    }

    pub(crate) fn mint_id(&mut self) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Next link of the chain for `id` at the delivering transaction's block
    pub fn derive(seed: &[u8; 32], id: RequestId, ctx: &TxContext) -> Entropy {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(id.0.to_be_bytes());
        hasher.update(ctx.block_number.to_be_bytes());
        hasher.update(ctx.block_hash);
        Entropy(hasher.finalize().into())
    }

    pub(crate) fn entropy_for(&self, id: RequestId, ctx: &TxContext) -> Entropy {
        Self::derive(&self.seed, id, ctx)
    }

    /// Advance the chain once a derived value has been consumed
    pub(crate) fn absorb(&mut self, entropy: &Entropy) {
        self.seed = entropy.0;
    }
}

impl Default for HashChainProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Address;

    #[test]
    fn test_chain_depends_on_id_and_block() {
        let provider = HashChainProvider::new();
        let ctx = TxContext::new(Address::from_byte(1), 10);

        let a = provider.entropy_for(RequestId(1), &ctx);
        assert_eq!(a, provider.entropy_for(RequestId(1), &ctx));
        assert_ne!(a, provider.entropy_for(RequestId(2), &ctx));
        assert_ne!(a, provider.entropy_for(RequestId(1), &TxContext::new(Address::from_byte(1), 11)));
    }

    #[test]
    fn test_absorb_advances_seed() {
        let mut provider = HashChainProvider::new();
        let ctx = TxContext::new(Address::from_byte(1), 10);
        let first = provider.entropy_for(RequestId(1), &ctx);

        provider.absorb(&first);
        assert_eq!(provider.seed(), first.0);
        assert_ne!(provider.entropy_for(RequestId(1), &ctx), first);
    }
}
