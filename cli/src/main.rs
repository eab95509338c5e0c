mod keyfile;
mod wallet;

use anyhow::{Context, Result, anyhow};
use obscura_config::ObscuraConfig;
use obscura_privacy::Keypair;
use obscura_transaction::TransactCall;
use rand::rngs::OsRng;
use std::env;
use std::path::PathBuf;

use wallet::Wallet;

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cmd = &args[1];

    let result = match cmd.as_str() {
        "keygen" => keygen(args.get(2).map(PathBuf::from)),
        "address" => address(args.get(2).map(PathBuf::from)),
        "balance" => balance().await,
        "transfer" | "withdraw" => match parse_spend_args(&args[2..]) {
            Ok(spend) => spend_command(cmd, spend).await,
            Err(e) => {
                println!("Usage: {} <amount> <{}> [--fee <amount>]", cmd, target_name(cmd));
                Err(e)
            }
        },
        "deposit" => {
            if args.len() < 4 {
                println!("Usage: deposit <amount> <account>");
                println!("  amount   - Amount to shield, in base units");
                println!("  account  - Ledger account that registers the shielded key");
                return;
            }
            deposit(&args[2], &args[3]).await
        }
        "config" => {
            print!("{}", ObscuraConfig::generate_sample());
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn print_usage() {
    println!("Obscura CLI - Shielded Pool Wallet");
    println!();
    println!("USAGE:");
    println!("  obscura <command> [args]");
    println!();
    println!("KEY COMMANDS:");
    println!("  keygen [file]                       Generate a new spending key");
    println!("  address [file]                      Show the shielded address for a key");
    println!();
    println!("WALLET COMMANDS:");
    println!("  balance                             Scan the pool for unspent notes");
    println!("  transfer <amount> <recipient>       Send shielded value (address or account)");
    println!("  withdraw <amount> <address>         Move value out of the pool");
    println!("  deposit <amount> <account>          Shield value and register the key");
    println!();
    println!("OTHER COMMANDS:");
    println!("  config                              Print a sample config.toml");
    println!("  help                                Show this help message");
    println!();
    println!("SPEND OPTIONS:");
    println!("  --fee <amount>                      Relayer fee (default: 0)");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  OBSCURA_CONFIG       Config file path");
    println!("  OBSCURA_RPC_URL      Ledger JSON-RPC endpoint");
    println!("  OBSCURA_CONTRACT     Pool contract address");
    println!("  OBSCURA_PROVER_URL   Prover service (enables the HTTP prover)");
    println!("  OBSCURA_KEY_PATH     Spending key file");
    println!("  RUST_LOG             Log level (debug/info/warn/error)");
}

#[derive(Debug, PartialEq, Eq)]
struct SpendArgs {
    amount: u128,
    target: String,
    fee: u128,
}

fn parse_spend_args(args: &[String]) -> Result<SpendArgs> {
    let mut positional = Vec::new();
    let mut fee = 0u128;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--fee" => {
                let value = args.get(i + 1).ok_or_else(|| anyhow!("--fee needs a value"))?;
                fee = value
                    .parse()
                    .map_err(|_| anyhow!("Fee must be a valid number"))?;
                i += 1;
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let [amount, target] = <[String; 2]>::try_from(positional)
        .map_err(|_| anyhow!("Expected an amount and a target"))?;
    let amount = amount
        .parse()
        .map_err(|_| anyhow!("Amount must be a valid number"))?;

    Ok(SpendArgs { amount, target, fee })
}

fn target_name(cmd: &str) -> &'static str {
    if cmd == "withdraw" { "address" } else { "recipient" }
}

fn key_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    explicit
        .or_else(|| ObscuraConfig::global().key_path())
        .ok_or_else(|| anyhow!("Could not determine home directory"))
}

fn keygen(path: Option<PathBuf>) -> Result<()> {
    let key_path = key_path(path)?;

    println!("🔐 Generating new spending key...");
    let keypair = Keypair::generate(&mut OsRng);
    keyfile::write_new(&key_path, &keypair)?;

    println!("✅ Wrote new spending key to {}", key_path.display());
    println!("🔑 Shielded address: {}", keypair.address());
    Ok(())
}

fn address(path: Option<PathBuf>) -> Result<()> {
    let keypair = keyfile::load(&key_path(path)?)?;
    println!("{}", keypair.address());
    Ok(())
}

fn open_wallet() -> Result<Wallet> {
    let config = ObscuraConfig::global().clone();
    let key_path = key_path(None)?;
    println!("🔑 Loading spending key from {}...", key_path.display());
    let keypair = keyfile::load(&key_path)?;
    Wallet::new(config, keypair)
}

async fn balance() -> Result<()> {
    open_wallet()?.balance().await
}

async fn spend_command(cmd: &str, spend: SpendArgs) -> Result<()> {
    let wallet = open_wallet()?;
    let call = if cmd == "withdraw" {
        wallet.withdraw(spend.amount, &spend.target, spend.fee).await?
    } else {
        wallet.transfer(spend.amount, &spend.target, spend.fee).await?
    };
    print_call(&wallet, &call)
}

async fn deposit(amount: &str, account: &str) -> Result<()> {
    let amount: u128 = amount
        .parse()
        .map_err(|_| anyhow!("Amount must be a valid number"))?;
    let wallet = open_wallet()?;
    let call = wallet.deposit(amount, account).await?;
    print_call(&wallet, &call)
}

fn print_call(wallet: &Wallet, call: &TransactCall) -> Result<()> {
    let output = serde_json::json!({
        "entrypoint": call.entrypoint.name(),
        "call": serde_json::to_value(call.to_call(wallet.contract()))?,
        "ext_data": serde_json::to_value(&call.ext_data)?,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("Failed to render call")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_spend_args() {
        let spend = parse_spend_args(&args(&["60", "0xabc"])).unwrap();
        assert_eq!(
            spend,
            SpendArgs {
                amount: 60,
                target: "0xabc".into(),
                fee: 0
            }
        );

        let spend = parse_spend_args(&args(&["--fee", "2", "60", "0xabc"])).unwrap();
        assert_eq!(spend.fee, 2);
        assert_eq!(spend.amount, 60);
    }

    #[test]
    fn test_parse_spend_args_errors() {
        assert!(parse_spend_args(&args(&["60"])).is_err());
        assert!(parse_spend_args(&args(&["sixty", "0xabc"])).is_err());
        assert!(parse_spend_args(&args(&["60", "0xabc", "--fee"])).is_err());
        assert!(parse_spend_args(&args(&["60", "0xabc", "extra"])).is_err());
    }
}
