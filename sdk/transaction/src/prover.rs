//! Prover Client
//!
//! Proof generation is delegated to an external service that consumes the
//! circuit witness and returns verifier calldata.
//!
//! ```text
//!   TransactionAssembler ── ProofInputs ──▶ Prover::prove()
//!                                               │
//!                                               │ HTTP POST /prove
//!                                               ▼
//!                                        Prover service
//!                                               │
//!   TransactCall ◀── Proof { calldata, public_inputs }
//! ```

use std::future::Future;
use std::time::Duration;

use obscura_ledger::Felt;
use obscura_privacy::field::{Field, serde_decimal};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::ProverError;
use crate::witness::ProofInputs;

// ============================================================================
// Proof
// ============================================================================

/// Verifier calldata plus the public signals it was generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    pub calldata: Vec<Felt>,
    #[serde(with = "serde_decimal::vec")]
    pub public_inputs: Vec<Field>,
}

/// Async proof generation.
pub trait Prover: Send + Sync {
    fn prove(
        &self,
        inputs: &ProofInputs,
    ) -> impl Future<Output = Result<Proof, ProverError>> + Send;
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct HttpProverConfig {
    /// Base URL of the prover service (e.g., "http://localhost:8080")
    pub url: String,
    /// Timeout for a single proof (default: 5 minutes)
    pub timeout: Duration,
}

impl Default for HttpProverConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

// ============================================================================
// API Types
// ============================================================================

/// API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApiResponse<T> {
    Success {
        data: T,
    },
    Error {
        message: String,
        code: Option<String>,
    },
}

// ============================================================================
// HTTP Prover
// ============================================================================

pub struct HttpProver {
    config: HttpProverConfig,
    client: reqwest::Client,
}

impl HttpProver {
    pub fn new(config: HttpProverConfig) -> Result<Self, ProverError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpProverConfig {
        &self.config
    }

    /// Check if the prover service is reachable
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.config.url.trim_end_matches('/'));
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!("Prover health check failed: {}", e);
                false
            }
        }
    }

    async fn request_proof(&self, inputs: &ProofInputs) -> Result<Proof, ProverError> {
        let url = format!("{}/prove", self.config.url.trim_end_matches('/'));
        let response = self.client.post(&url).json(inputs).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProverError::Http { status, body });
        }

        let api_response: ApiResponse<Proof> = response.json().await?;
        match api_response {
            ApiResponse::Success { data } => Ok(data),
            ApiResponse::Error { message, code } => Err(ProverError::Rejected {
                code: code.unwrap_or_else(|| "unknown".to_string()),
                message,
            }),
        }
    }
}

impl Prover for HttpProver {
    async fn prove(&self, inputs: &ProofInputs) -> Result<Proof, ProverError> {
        let start = std::time::Instant::now();
        info!(
            "Requesting proof ({} inputs, {} outputs)",
            inputs.input_count(),
            inputs.output_count()
        );

        let proof = timeout(self.config.timeout, self.request_proof(inputs))
            .await
            .map_err(|_| ProverError::Timeout(self.config.timeout))??;

        if proof.public_inputs != inputs.public_signals() {
            return Err(ProverError::InvalidResponse(
                "public inputs do not match the witness".into(),
            ));
        }

        info!(
            "Proof received in {:?} ({} calldata felts)",
            start.elapsed(),
            proof.calldata.len()
        );
        Ok(proof)
    }
}

// ============================================================================
// Mock Prover
// ============================================================================

/// Deterministic fake prover: calldata is a BLAKE3 stretch of the public signals.
pub struct MockProver {
    calldata_len: usize,
}

impl MockProver {
    pub fn new() -> Self {
        Self { calldata_len: 8 }
    }

    pub fn with_calldata_len(calldata_len: usize) -> Self {
        Self { calldata_len }
    }

    fn calldata_for(&self, public_inputs: &[Field]) -> Vec<Felt> {
        let mut hasher = blake3::Hasher::new_derive_key("obscura-mock-proof-v1");
        for signal in public_inputs {
            hasher.update(&obscura_privacy::field::to_be_bytes(signal));
        }

        let mut stream = vec![0u8; self.calldata_len * 16];
        hasher.finalize_xof().fill(&mut stream);
        stream
            .chunks_exact(16)
            .map(|chunk| {
                let mut word = [0u8; 16];
                word.copy_from_slice(chunk);
                Felt::from(u128::from_be_bytes(word))
            })
            .collect()
    }

    /// Check a proof against the witness it claims to prove.
    pub fn verify(&self, proof: &Proof, inputs: &ProofInputs) -> bool {
        let signals = inputs.public_signals();
        proof.public_inputs == signals && proof.calldata == self.calldata_for(&signals)
    }
}

impl Default for MockProver {
    fn default() -> Self {
        Self::new()
    }
}

impl Prover for MockProver {
    async fn prove(&self, inputs: &ProofInputs) -> Result<Proof, ProverError> {
        let public_inputs = inputs.public_signals();
        let calldata = self.calldata_for(&public_inputs);
        debug!(felts = calldata.len(), "mock proof generated");
        Ok(Proof {
            calldata,
            public_inputs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(root: u64) -> ProofInputs {
        ProofInputs {
            root: Field::from(root),
            input_nullifiers: vec![Field::from(2u64), Field::from(3u64)],
            output_commitment: vec![Field::from(4u64), Field::from(5u64)],
            public_amount: Field::from(0u64),
            ext_data_hash: Field::from(6u64),
            in_amount: vec![],
            in_private_key: vec![],
            in_blinding: vec![],
            in_path_indices: vec![],
            in_path_elements: vec![],
            out_amount: vec![],
            out_blinding: vec![],
            out_pubkey: vec![],
        }
    }

    #[tokio::test]
    async fn test_mock_prover_is_deterministic() {
        let prover = MockProver::new();
        let a = prover.prove(&inputs(1)).await.unwrap();
        let b = prover.prove(&inputs(1)).await.unwrap();
        let c = prover.prove(&inputs(2)).await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a.calldata, c.calldata);
        assert_eq!(a.calldata.len(), 8);
        assert!(prover.verify(&a, &inputs(1)));
        assert!(!prover.verify(&a, &inputs(2)));
    }

    #[test]
    fn test_api_response_tags() {
        let ok: ApiResponse<u32> =
            serde_json::from_str(r#"{"status":"success","data":7}"#).unwrap();
        assert!(matches!(ok, ApiResponse::Success { data: 7 }));

        let err: ApiResponse<u32> =
            serde_json::from_str(r#"{"status":"error","message":"bad witness"}"#).unwrap();
        match err {
            ApiResponse::Error { message, code } => {
                assert_eq!(message, "bad witness");
                assert!(code.is_none());
            }
            _ => panic!("expected error variant"),
        }
    }
}
