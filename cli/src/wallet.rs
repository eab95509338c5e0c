use anyhow::{Context, Result, anyhow};
use obscura_config::{InputPaddingToml, ObscuraConfig, ProverModeToml};
use obscura_ledger::{
    EventFilter, Felt, RpcConfig, StarknetRpcLedger, fetch_commitment_events, lookup_public_key,
    scan_unspent,
};
use obscura_privacy::{Keypair, NoteValue};
use obscura_transaction::{
    HttpProver, HttpProverConfig, InputPadding, MockProver, Proof, ProofInputs, Prover,
    ProverError, TransactCall, TransactOptions, TransactionRequest, plan_deposit, plan_transfer,
    plan_withdrawal, transact,
};
use rand::rngs::OsRng;

/// Prover selected by config.
pub enum WalletProver {
    Mock(MockProver),
    Http(HttpProver),
}

impl WalletProver {
    pub fn from_config(config: &ObscuraConfig) -> Result<Self> {
        Ok(match config.prover.mode {
            ProverModeToml::Mock => {
                log::warn!("Using mock prover, calls will not verify on-chain");
                WalletProver::Mock(MockProver::new())
            }
            ProverModeToml::Http => WalletProver::Http(HttpProver::new(HttpProverConfig {
                url: config.prover.url.clone(),
                timeout: config.prover.timeout(),
            })?),
        })
    }
}

impl Prover for WalletProver {
    async fn prove(&self, inputs: &ProofInputs) -> Result<Proof, ProverError> {
        match self {
            WalletProver::Mock(prover) => prover.prove(inputs).await,
            WalletProver::Http(prover) => prover.prove(inputs).await,
        }
    }
}

/// A keypair bound to the configured pool.
pub struct Wallet {
    config: ObscuraConfig,
    ledger: StarknetRpcLedger,
    keypair: Keypair,
}

impl Wallet {
    pub fn new(config: ObscuraConfig, keypair: Keypair) -> Result<Self> {
        let contract = Felt::from_hex(&config.ledger.contract_address)
            .with_context(|| format!("Invalid contract address: {}", config.ledger.contract_address))?;
        let ledger = StarknetRpcLedger::new(RpcConfig::new(config.ledger.rpc_url.clone(), contract))?;
        Ok(Self {
            config,
            ledger,
            keypair,
        })
    }

    fn filter(&self) -> EventFilter {
        let filter = EventFilter::default().chunk_size(self.config.ledger.chunk_size);
        match self.config.ledger.from_block {
            Some(block) => filter.from_block(block),
            None => filter,
        }
    }

    fn options(&self) -> TransactOptions {
        TransactOptions {
            filter: self.filter(),
            depth: self.config.tree.depth,
            padding: match self.config.tree.input_padding {
                InputPaddingToml::MinimumTwo => InputPadding::MinimumTwo,
                InputPaddingToml::CircuitArity => InputPadding::CircuitArity,
            },
        }
    }

    pub async fn balance(&self) -> Result<()> {
        println!("🔎 Scanning commitment events...");
        let events = fetch_commitment_events(&self.ledger, &self.filter()).await?;
        let scan = scan_unspent(&self.ledger, &self.keypair, &events).await?;

        for note in &scan.notes {
            println!(
                "  • note #{:<6} amount {}",
                note.index().unwrap_or_default(),
                note.amount()
            );
        }
        println!(
            "💰 Balance: {} across {} unspent note(s) ({} events scanned)",
            scan.balance,
            scan.notes.len(),
            events.len()
        );
        Ok(())
    }

    /// Recipient as a public identity string, or as a registered ledger owner.
    async fn resolve_recipient(&self, recipient: &str) -> Result<Keypair> {
        if let Ok(keypair) = Keypair::from_public_string(recipient) {
            return Ok(keypair);
        }

        let owner = Felt::from_hex(recipient)
            .map_err(|_| anyhow!("Recipient is neither a shielded address nor an account: {recipient}"))?;
        lookup_public_key(&self.ledger, &self.filter(), owner)
            .await?
            .ok_or_else(|| anyhow!("Could not find a registered key for account {recipient}"))
    }

    async fn spendable(&self) -> Result<Vec<obscura_privacy::Note>> {
        let events = fetch_commitment_events(&self.ledger, &self.filter()).await?;
        Ok(scan_unspent(&self.ledger, &self.keypair, &events).await?.notes)
    }

    pub async fn transfer(&self, amount: u128, recipient: &str, fee: u128) -> Result<TransactCall> {
        let recipient = self.resolve_recipient(recipient).await?;
        let notes = self.spendable().await?;
        let request = plan_transfer(
            &self.keypair,
            &notes,
            &recipient,
            NoteValue::new(amount),
            NoteValue::new(fee),
            &mut OsRng,
        )?;
        self.submit(request).await
    }

    pub async fn withdraw(&self, amount: u128, to: &str, fee: u128) -> Result<TransactCall> {
        let to = Felt::from_hex(to).with_context(|| format!("Invalid withdrawal address: {to}"))?;
        let notes = self.spendable().await?;
        let request = plan_withdrawal(
            &self.keypair,
            &notes,
            to,
            NoteValue::new(amount),
            NoteValue::new(fee),
            &mut OsRng,
        )?;
        self.submit(request).await
    }

    pub async fn deposit(&self, amount: u128, owner: &str) -> Result<TransactCall> {
        let owner = Felt::from_hex(owner).with_context(|| format!("Invalid account address: {owner}"))?;
        let request = plan_deposit(&self.keypair, owner, NoteValue::new(amount), &mut OsRng);
        self.submit(request).await
    }

    async fn submit(&self, request: TransactionRequest) -> Result<TransactCall> {
        let prover = WalletProver::from_config(&self.config)?;
        println!(
            "⚙️  Preparing transaction ({} input(s), {} output(s))...",
            request.inputs.len(),
            request.outputs.len()
        );
        let call = transact(&self.ledger, &prover, request, &self.options(), &mut OsRng).await?;
        println!("✅ Proof ready, {} calldata felts", call.to_calldata().len());
        Ok(call)
    }

    pub fn contract(&self) -> Felt {
        self.ledger.config().contract_address
    }
}
