use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

pub type Amount = u64;

/// Cap carried over from the original deployment: 1e18 minimal units.
pub const DEFAULT_MAX_SUPPLY: Amount = 1_000_000_000_000_000_000;

/// 32-byte account identifier. The all-zero id is a reserved sentinel that
/// can never hold a balance or receive transfers, mints, or approvals.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub const ZERO: AccountId = AccountId([0u8; 32]);

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("account id must be 32 bytes of hex (64 chars)")]
pub struct ParseAccountError;

impl FromStr for AccountId {
    type Err = ParseAccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|_| ParseAccountError)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| ParseAccountError)?;
        Ok(AccountId(arr))
    }
}

// Hex-string form so account ids can be JSON map keys.
impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }
}

/// Every failure mode of a ledger operation. Messages are fixed wire-level
/// strings; callers and tests match on them verbatim.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Ownable: caller is not the owner")]
    NotOwner,
    #[error("Ownable: new owner is the zero address")]
    NewOwnerIsZero,
    #[error("Pausable: paused")]
    Paused,
    #[error("Pausable: not paused")]
    NotPaused,
    #[error("ERC20: mint to the zero address")]
    MintToZero,
    #[error("ERC20: transfer to the zero address")]
    TransferToZero,
    #[error("ERC20: approve to the zero address")]
    ApproveToZero,
    #[error("ERC20: transfer amount exceeds balance")]
    InsufficientBalance,
    #[error("ERC20: burn amount exceeds balance")]
    BurnExceedsBalance,
    #[error("ERC20: transfer amount exceeds allowance")]
    InsufficientAllowance,
    #[error("Maximum number of tokens")]
    SupplyCapExceeded,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: Amount,
    },
    Approval {
        owner: AccountId,
        spender: AccountId,
        amount: Amount,
    },
    Mint {
        to: AccountId,
        amount: Amount,
    },
    Burn {
        from: AccountId,
        amount: Amount,
    },
    Paused {
        by: AccountId,
    },
    Unpaused {
        by: AccountId,
    },
    OwnershipTransferred {
        previous: AccountId,
        new: AccountId,
    },
}

/// Full ledger state plus a merkle commitment, suitable for persistence.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub name: String,
    pub symbol: String,
    pub max_supply: Amount,
    pub owner: AccountId,
    pub paused: bool,
    pub total_supply: Amount,
    pub balances: BTreeMap<AccountId, Amount>,
    pub allowances: BTreeMap<AccountId, BTreeMap<AccountId, Amount>>,
    pub events: Vec<LedgerEvent>,
    pub merkle_root: [u8; 32],
}

/// The token ledger state machine.
///
/// Every mutating operation evaluates all of its guards before the first
/// write, so a call either fully applies or fails with no state change.
/// The invariant `sum(balances) == total_supply <= max_supply` holds after
/// every successful call.
#[derive(Debug)]
pub struct Ledger {
    name: String,
    symbol: String,
    max_supply: Amount,
    owner: AccountId,
    paused: bool,
    total_supply: Amount,
    balances: BTreeMap<AccountId, Amount>,
    allowances: BTreeMap<AccountId, BTreeMap<AccountId, Amount>>,
    events: Vec<LedgerEvent>,
}

impl Ledger {
    /// Creates an empty ledger. The deployer becomes the owner; supply and
    /// balances start at zero, unpaused.
    pub fn new(name: &str, symbol: &str, owner: AccountId, max_supply: Amount) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            max_supply,
            owner,
            paused: false,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    //-------- guards --------//

    fn require_not_paused(&self) -> Result<(), LedgerError> {
        if self.paused {
            return Err(LedgerError::Paused);
        }
        Ok(())
    }

    fn require_owner(&self, caller: AccountId) -> Result<(), LedgerError> {
        if caller != self.owner {
            return Err(LedgerError::NotOwner);
        }
        Ok(())
    }

    //-------- mutating operations --------//

    /// Owner-only issuance. Guard order: pause, ownership, zero address,
    /// supply cap.
    pub fn mint(
        &mut self,
        caller: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.require_not_paused()?;
        self.require_owner(caller)?;
        if to.is_zero() {
            return Err(LedgerError::MintToZero);
        }
        let next_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::SupplyCapExceeded)?;
        if next_supply > self.max_supply {
            return Err(LedgerError::SupplyCapExceeded);
        }
        self.credit(to, amount);
        self.total_supply = next_supply;
        self.events.push(LedgerEvent::Mint { to, amount });
        Ok(())
    }

    /// Burns from the caller's own balance.
    pub fn burn(&mut self, caller: AccountId, amount: Amount) -> Result<(), LedgerError> {
        self.require_not_paused()?;
        if self.balance_of(caller) < amount {
            return Err(LedgerError::BurnExceedsBalance);
        }
        self.debit(caller, amount);
        self.total_supply -= amount;
        self.events.push(LedgerEvent::Burn {
            from: caller,
            amount,
        });
        Ok(())
    }

    pub fn transfer(
        &mut self,
        caller: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.require_not_paused()?;
        if to.is_zero() {
            return Err(LedgerError::TransferToZero);
        }
        if self.balance_of(caller) < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        self.debit(caller, amount);
        self.credit(to, amount);
        self.events.push(LedgerEvent::Transfer {
            from: caller,
            to,
            amount,
        });
        Ok(())
    }

    /// Sets (not adds to) the caller's allowance for `spender`. Approvals
    /// stay enabled while paused: they move no value.
    pub fn approve(
        &mut self,
        caller: AccountId,
        spender: AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        if spender.is_zero() {
            return Err(LedgerError::ApproveToZero);
        }
        self.set_allowance(caller, spender, amount);
        self.events.push(LedgerEvent::Approval {
            owner: caller,
            spender,
            amount,
        });
        Ok(())
    }

    /// Delegated transfer; the caller spends its allowance from `from`.
    /// Guard order: pause, allowance, balance, zero address.
    pub fn transfer_from(
        &mut self,
        caller: AccountId,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.require_not_paused()?;
        let allowance = self.allowance_of(from, caller);
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance);
        }
        if self.balance_of(from) < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        if to.is_zero() {
            return Err(LedgerError::TransferToZero);
        }
        self.set_allowance(from, caller, allowance - amount);
        self.debit(from, amount);
        self.credit(to, amount);
        self.events.push(LedgerEvent::Transfer { from, to, amount });
        Ok(())
    }

    /// Owner-only emergency stop. The ownership check runs before the
    /// pause-state check.
    pub fn pause(&mut self, caller: AccountId) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if self.paused {
            return Err(LedgerError::Paused);
        }
        self.paused = true;
        self.events.push(LedgerEvent::Paused { by: caller });
        Ok(())
    }

    pub fn unpause(&mut self, caller: AccountId) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if !self.paused {
            return Err(LedgerError::NotPaused);
        }
        self.paused = false;
        self.events.push(LedgerEvent::Unpaused { by: caller });
        Ok(())
    }

    pub fn transfer_ownership(
        &mut self,
        caller: AccountId,
        new_owner: AccountId,
    ) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        if new_owner.is_zero() {
            return Err(LedgerError::NewOwnerIsZero);
        }
        let previous = self.owner;
        self.owner = new_owner;
        self.events.push(LedgerEvent::OwnershipTransferred {
            previous,
            new: new_owner,
        });
        Ok(())
    }

    //-------- read accessors (never fail, available while paused) --------//

    pub fn balance_of(&self, account: AccountId) -> Amount {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    pub fn allowance_of(&self, owner: AccountId, spender: AccountId) -> Amount {
        self.allowances
            .get(&owner)
            .and_then(|per_owner| per_owner.get(&spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn max_supply(&self) -> Amount {
        self.max_supply
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    //-------- balance/allowance bookkeeping --------//

    // Callers guarantee sufficiency before debiting; entries that decay to
    // zero are dropped from the table.

    fn credit(&mut self, account: AccountId, amount: Amount) {
        *self.balances.entry(account).or_insert(0) += amount;
    }

    fn debit(&mut self, account: AccountId, amount: Amount) {
        if let Some(balance) = self.balances.get_mut(&account) {
            *balance -= amount;
            if *balance == 0 {
                self.balances.remove(&account);
            }
        }
    }

    fn set_allowance(&mut self, owner: AccountId, spender: AccountId, amount: Amount) {
        if amount == 0 {
            if let Some(per_owner) = self.allowances.get_mut(&owner) {
                per_owner.remove(&spender);
                if per_owner.is_empty() {
                    self.allowances.remove(&owner);
                }
            }
        } else {
            self.allowances
                .entry(owner)
                .or_default()
                .insert(spender, amount);
        }
    }

    //-------- snapshots --------//

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            max_supply: self.max_supply,
            owner: self.owner,
            paused: self.paused,
            total_supply: self.total_supply,
            balances: self.balances.clone(),
            allowances: self.allowances.clone(),
            events: self.events.clone(),
            merkle_root: self.merkle_root(),
        }
    }

    /// Rebuilds a ledger from a snapshot. The stored merkle root is not
    /// trusted here; `store::load` recomputes and compares it.
    pub fn restore(snapshot: LedgerSnapshot) -> Self {
        Self {
            name: snapshot.name,
            symbol: snapshot.symbol,
            max_supply: snapshot.max_supply,
            owner: snapshot.owner,
            paused: snapshot.paused,
            total_supply: snapshot.total_supply,
            balances: snapshot.balances,
            allowances: snapshot.allowances,
            events: snapshot.events,
        }
    }

    /// Deterministic commitment over metadata, balances, and allowances.
    pub fn merkle_root(&self) -> [u8; 32] {
        let mut leaves: Vec<[u8; 32]> = Vec::new();

        let mut hasher = Sha256::new();
        hasher.update(b"meta");
        hasher.update(self.name.as_bytes());
        hasher.update(self.symbol.as_bytes());
        hasher.update(self.max_supply.to_le_bytes());
        hasher.update(self.owner.as_bytes());
        hasher.update([self.paused as u8]);
        hasher.update(self.total_supply.to_le_bytes());
        leaves.push(hasher.finalize().into());

        for (account, balance) in &self.balances {
            let mut hasher = Sha256::new();
            hasher.update(b"bal");
            hasher.update(account.as_bytes());
            hasher.update(balance.to_le_bytes());
            leaves.push(hasher.finalize().into());
        }
        for (owner, per_owner) in &self.allowances {
            for (spender, amount) in per_owner {
                let mut hasher = Sha256::new();
                hasher.update(b"allow");
                hasher.update(owner.as_bytes());
                hasher.update(spender.as_bytes());
                hasher.update(amount.to_le_bytes());
                leaves.push(hasher.finalize().into());
            }
        }
        build_merkle(leaves)
    }
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"token-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity((leaves.len() + 1) / 2);
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            if chunk.len() == 2 {
                hasher.update(chunk[1]);
            } else {
                hasher.update(chunk[0]);
            }
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}
