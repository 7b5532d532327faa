mod ledger;
mod store;

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::{rngs::OsRng, RngCore};

use crate::ledger::{AccountId, Amount, Ledger, LedgerError, DEFAULT_MAX_SUPPLY};
use crate::store::StoreError;

#[derive(Parser)]
#[command(name = "token-ledger", version, about = "Capped-supply fungible token ledger")]
struct Cli {
    /// Ledger state file.
    #[arg(long, global = true, default_value = "ledger.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new ledger state file.
    Init {
        #[arg(long)]
        name: String,
        #[arg(long)]
        symbol: String,
        /// Deployer account; becomes the owner.
        #[arg(long)]
        owner: AccountId,
        #[arg(long, default_value_t = DEFAULT_MAX_SUPPLY)]
        max_supply: Amount,
    },
    /// Mint tokens to an account (owner only).
    Mint {
        #[arg(long)]
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    /// Burn tokens from the caller's own balance.
    Burn {
        #[arg(long)]
        from: AccountId,
        amount: Amount,
    },
    /// Move tokens from the caller to another account.
    Transfer {
        #[arg(long)]
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    /// Set the caller's allowance for a spender (overwrites).
    Approve {
        #[arg(long)]
        from: AccountId,
        spender: AccountId,
        amount: Amount,
    },
    /// Spend an allowance: the caller moves tokens out of `owner`.
    TransferFrom {
        #[arg(long)]
        from: AccountId,
        owner: AccountId,
        to: AccountId,
        amount: Amount,
    },
    /// Stop all value-moving operations (owner only).
    Pause {
        #[arg(long)]
        from: AccountId,
    },
    /// Resume after a pause (owner only).
    Unpause {
        #[arg(long)]
        from: AccountId,
    },
    /// Hand the owner role to another account (owner only).
    TransferOwnership {
        #[arg(long)]
        from: AccountId,
        new_owner: AccountId,
    },
    /// Print an account balance.
    BalanceOf { account: AccountId },
    /// Print a remaining allowance.
    Allowance {
        owner: AccountId,
        spender: AccountId,
    },
    /// Print the circulating supply.
    TotalSupply,
    /// Print metadata, owner, pause state, and the state root.
    Info,
    /// Generate an Ed25519 keypair; the account id is the verifying key.
    Keygen {
        #[arg(long)]
        out_dir: PathBuf,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn run(cli: Cli) -> Result<(), CliError> {
    let state = cli.state;
    match cli.command {
        Command::Init {
            name,
            symbol,
            owner,
            max_supply,
        } => {
            let ledger = Ledger::new(&name, &symbol, owner, max_supply);
            store::init(&state, &ledger)?;
            println!("ledger initialized → {}", state.display());
        }
        Command::Mint { from, to, amount } => {
            let mut ledger = store::load(&state)?;
            ledger.mint(from, to, amount)?;
            store::save(&state, &ledger)?;
            println!("minted {} → {}", amount, to);
        }
        Command::Burn { from, amount } => {
            let mut ledger = store::load(&state)?;
            ledger.burn(from, amount)?;
            store::save(&state, &ledger)?;
            println!("burned {} from {}", amount, from);
        }
        Command::Transfer { from, to, amount } => {
            let mut ledger = store::load(&state)?;
            ledger.transfer(from, to, amount)?;
            store::save(&state, &ledger)?;
            println!("transferred {}: {} → {}", amount, from, to);
        }
        Command::Approve {
            from,
            spender,
            amount,
        } => {
            let mut ledger = store::load(&state)?;
            ledger.approve(from, spender, amount)?;
            store::save(&state, &ledger)?;
            println!("approved {} for {}", amount, spender);
        }
        Command::TransferFrom {
            from,
            owner,
            to,
            amount,
        } => {
            let mut ledger = store::load(&state)?;
            ledger.transfer_from(from, owner, to, amount)?;
            store::save(&state, &ledger)?;
            println!("transferred {} (allowance): {} → {}", amount, owner, to);
        }
        Command::Pause { from } => {
            let mut ledger = store::load(&state)?;
            ledger.pause(from)?;
            store::save(&state, &ledger)?;
            println!("ledger paused");
        }
        Command::Unpause { from } => {
            let mut ledger = store::load(&state)?;
            ledger.unpause(from)?;
            store::save(&state, &ledger)?;
            println!("ledger unpaused");
        }
        Command::TransferOwnership { from, new_owner } => {
            let mut ledger = store::load(&state)?;
            ledger.transfer_ownership(from, new_owner)?;
            store::save(&state, &ledger)?;
            println!("ownership transferred → {}", new_owner);
        }
        Command::BalanceOf { account } => {
            let ledger = store::load(&state)?;
            println!("{}", ledger.balance_of(account));
        }
        Command::Allowance { owner, spender } => {
            let ledger = store::load(&state)?;
            println!("{}", ledger.allowance_of(owner, spender));
        }
        Command::TotalSupply => {
            let ledger = store::load(&state)?;
            println!("{}", ledger.total_supply());
        }
        Command::Info => {
            let ledger = store::load(&state)?;
            println!("name:         {}", ledger.name());
            println!("symbol:       {}", ledger.symbol());
            println!("total supply: {}", ledger.total_supply());
            println!("max supply:   {}", ledger.max_supply());
            println!("owner:        {}", ledger.owner());
            println!("paused:       {}", ledger.is_paused());
            println!("state root:   {}", hex::encode(ledger.merkle_root()));
        }
        Command::Keygen { out_dir } => {
            let mut sk_bytes = [0u8; 32];
            OsRng.fill_bytes(&mut sk_bytes);
            let sk = SigningKey::from_bytes(&sk_bytes);
            let account = AccountId(sk.verifying_key().to_bytes());
            fs::create_dir_all(&out_dir)?;
            fs::write(out_dir.join("sk.hex"), hex::encode(sk_bytes))?;
            fs::write(out_dir.join("account.hex"), account.to_string())?;
            println!("keypair written → {} (account {})", out_dir.display(), account);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(2);
    }
}
