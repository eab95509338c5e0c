use anyhow::{Context, Result, anyhow};
use obscura_privacy::{Keypair, SpendingKey};
use std::io::Write;
use std::path::Path;
use std::{fs, fs::OpenOptions};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Write a fresh spending key as hex; refuses to overwrite.
pub fn write_new(key_path: &Path, keypair: &Keypair) -> Result<()> {
    let hex = keypair
        .spending_key_hex()
        .ok_or_else(|| anyhow!("Cannot save a read-only keypair"))?;

    if let Some(dir) = key_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            println!("📁 Created directory: {}", dir.display());

            #[cfg(unix)]
            {
                // rwx------
                let mut perms = fs::metadata(dir)?.permissions();
                perms.set_mode(0o700);
                fs::set_permissions(dir, perms)?;
            }
        }
    }

    if key_path.exists() {
        return Err(anyhow!(
            "File {} already exists. Remove it first or use a different filename.",
            key_path.display()
        ));
    }

    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(key_path)?;

    #[cfg(unix)]
    {
        // rw-------
        let mut perms = f.metadata()?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(key_path, perms)?;
    }

    f.write_all(hex.as_bytes())?;
    f.write_all(b"\n")?;
    Ok(())
}

pub fn load(key_path: &Path) -> Result<Keypair> {
    let contents = fs::read_to_string(key_path)
        .with_context(|| format!("Failed to read key file: {}", key_path.display()))?;
    parse(&contents).with_context(|| format!("Invalid key file: {}", key_path.display()))
}

fn parse(contents: &str) -> Result<Keypair> {
    let trimmed = contents.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits)?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow!("expected 32 key bytes, found {}", b.len()))?;
    Ok(Keypair::from_spending_key(SpendingKey::from_bytes(bytes)))
}
