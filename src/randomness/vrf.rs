//! Oracle-callback verifiable random function
//!
//! The oracle signs the request input with a schnorrkel keypair; the VRF
//! output is the SHA-256 of that signature and the signature is the proof.
//! The engine only accepts deliveries from the configured coordinator and
//! checks the proof against the configured public key.

use crate::common::types::{Address, Entropy, RequestId, TxContext};
use crate::errors::{WagerError, WagerResult};
use schnorrkel::{context::SigningContext, Keypair, PublicKey, Signature};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const VRF_SIGNING_CONTEXT: &[u8] = b"wager-engine:vrf";

/// Output and proof delivered by the VRF oracle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VrfProof {
    pub output: [u8; 32],
    pub proof: [u8; 64],
}

#[derive(Clone, Debug, Default)]
pub struct VrfProvider {
    coordinator: Option<Address>,
    public_key: Option<[u8; 32]>,
    next_id: u64,
}

impl VrfProvider {
    pub fn new(coordinator: Option<Address>, public_key: Option<[u8; 32]>) -> Self {
        Self {
            coordinator,
            public_key,
            next_id: 1,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.coordinator.is_some() && self.public_key.is_some()
    }

    pub fn configure(&mut self, coordinator: Address, public_key: [u8; 32]) {
        self.coordinator = Some(coordinator);
        self.public_key = Some(public_key);
    }

    pub fn coordinator(&self) -> Option<Address> {
        self.coordinator
    }

    pub(crate) fn mint_id(&mut self) -> RequestId {
        let id = RequestId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        id
    }

    /// Deterministic message the oracle must sign for a request
    pub fn request_input(id: RequestId, ctx: &TxContext) -> Vec<u8> {
        format!(
            "request:{}:block:{}:{}",
            id.0,
            ctx.block_number,
            hex::encode(ctx.block_hash)
        )
        .into_bytes()
    }

    pub(crate) fn resolve(&self, ctx: &TxContext, input: &[u8], delivery: &VrfProof) -> WagerResult<Entropy> {
        let coordinator = self
            .coordinator
            .ok_or(WagerError::RandomnessNotConfigured(super::Strategy::Vrf))?;
        if ctx.caller != coordinator {
            return Err(WagerError::Unauthorized(ctx.caller));
        }
        let public_key = self
            .public_key
            .ok_or(WagerError::RandomnessNotConfigured(super::Strategy::Vrf))?;

        if !verify_vrf_proof(&public_key, input, delivery)? {
            return Err(WagerError::InvalidRandomnessProof(
                "signature or output does not match the request input".to_string(),
            ));
        }
        Ok(Entropy(delivery.output))
    }
}

/// Verify a delivery against the request input (public verification function)
pub fn verify_vrf_proof(public_key: &[u8; 32], input: &[u8], delivery: &VrfProof) -> WagerResult<bool> {
    let public_key = PublicKey::from_bytes(public_key)
        .map_err(|e| WagerError::InvalidRandomnessProof(format!("Invalid public key: {:?}", e)))?;
    let signature = Signature::from_bytes(&delivery.proof)
        .map_err(|e| WagerError::InvalidRandomnessProof(format!("Invalid signature: {:?}", e)))?;

    let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
    if public_key.verify(ctx.bytes(input), &signature).is_err() {
        return Ok(false);
    }

    // Output must be derived from the signature
    let computed: [u8; 32] = Sha256::digest(delivery.proof).into();
    Ok(computed == delivery.output)
}

/// Oracle side of the VRF strategy
pub struct VrfOracle {
    keypair: Arc<Keypair>,
}

impl VrfOracle {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Oracle with a random keypair (for testing)
    pub fn new_random() -> Self {
        use rand_core::OsRng;
        Self::new(Keypair::generate_with(OsRng))
    }

    /// Sign a request input, producing the output and its proof
    pub fn fulfill(&self, input: &[u8]) -> VrfProof {
        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        let signature = self.keypair.sign(ctx.bytes(input));
        let proof = signature.to_bytes();
        let output: [u8; 32] = Sha256::digest(proof).into();
        VrfProof { output, proof }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public.to_bytes()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(caller: Address) -> TxContext {
        TxContext::new(caller, 5)
    }

    #[test]
    fn test_vrf_generation_and_verification() {
        let oracle = VrfOracle::new_random();
        let input = VrfProvider::request_input(RequestId(1), &ctx(Address::ZERO));

        let delivery = oracle.fulfill(&input);
        assert!(verify_vrf_proof(&oracle.public_key(), &input, &delivery).unwrap());
        assert!(!verify_vrf_proof(&oracle.public_key(), b"other input", &delivery).unwrap());
    }

    #[test]
    fn test_vrf_tamper_detection() {
        let oracle = VrfOracle::new_random();
        let input = b"request:1".to_vec();

        let mut delivery = oracle.fulfill(&input);
        delivery.output = [0xff; 32];
        assert!(!verify_vrf_proof(&oracle.public_key(), &input, &delivery).unwrap());
    }

    #[test]
    fn test_provider_checks_coordinator_and_key() {
        let oracle = VrfOracle::new_random();
        let coordinator = Address::from_byte(0xc0);
        let provider = VrfProvider::new(Some(coordinator), Some(oracle.public_key()));
        let input = b"request:7".to_vec();
        let delivery = oracle.fulfill(&input);

        let stranger = Address::from_byte(0x01);
        assert_eq!(
            provider.resolve(&ctx(stranger), &input, &delivery),
            Err(WagerError::Unauthorized(stranger))
        );
        assert_eq!(
            provider.resolve(&ctx(coordinator), &input, &delivery).unwrap(),
            Entropy(delivery.output)
        );

        let impostor = VrfOracle::new_random().fulfill(&input);
        assert!(matches!(
            provider.resolve(&ctx(coordinator), &input, &impostor),
            Err(WagerError::InvalidRandomnessProof(_))
        ));
    }
}
