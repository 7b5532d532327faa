use std::fs;
use std::path::Path;

use crate::ledger::{Amount, Ledger, LedgerSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state file already exists: {0}")]
    AlreadyExists(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed state file: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("state file merkle root mismatch (stored {stored}, computed {computed})")]
    RootMismatch { stored: String, computed: String },
    #[error("state file breaks conservation: balances sum to {balances}, total supply {total_supply}")]
    Conservation { balances: u128, total_supply: Amount },
    #[error("state file total supply {total_supply} exceeds max supply {max_supply}")]
    SupplyAboveCap {
        total_supply: Amount,
        max_supply: Amount,
    },
}

/// Writes the initial state file; refuses to clobber an existing ledger.
pub fn init(path: &Path, ledger: &Ledger) -> Result<(), StoreError> {
    if path.exists() {
        return Err(StoreError::AlreadyExists(path.display().to_string()));
    }
    save(path, ledger)
}

/// Persists a snapshot of the ledger as pretty JSON.
pub fn save(path: &Path, ledger: &Ledger) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let snapshot = ledger.snapshot();
    let json = serde_json::to_vec_pretty(&snapshot)?;
    fs::write(path, json)?;
    Ok(())
}

/// Loads a ledger from a state file. The merkle root is recomputed to
/// reject files edited out of band; the root is unkeyed, so the ledger
/// invariants are re-checked as well, since a crafted file can carry a
/// self-consistent root over inconsistent numbers.
pub fn load(path: &Path) -> Result<Ledger, StoreError> {
    let bytes = fs::read(path)?;
    let snapshot: LedgerSnapshot = serde_json::from_slice(&bytes)?;
    let balances: u128 = snapshot.balances.values().map(|&a| a as u128).sum();
    if balances != snapshot.total_supply as u128 {
        return Err(StoreError::Conservation {
            balances,
            total_supply: snapshot.total_supply,
        });
    }
    if snapshot.total_supply > snapshot.max_supply {
        return Err(StoreError::SupplyAboveCap {
            total_supply: snapshot.total_supply,
            max_supply: snapshot.max_supply,
        });
    }
    let stored = snapshot.merkle_root;
    let ledger = Ledger::restore(snapshot);
    let computed = ledger.merkle_root();
    if computed != stored {
        return Err(StoreError::RootMismatch {
            stored: hex::encode(stored),
            computed: hex::encode(computed),
        });
    }
    Ok(ledger)
}
