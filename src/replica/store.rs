//! In-memory account store held by each replica
//!
//! The account map sits behind a read-write lock that is only held long
//! enough to find (or insert) an entry. Every account carries its own mutex,
//! so at most one balance mutation is in flight per account while different
//! accounts are mutated concurrently.

use crate::common::{validate_email, Account, Error, Result, Value, DEFAULT_INITIAL_BALANCE};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

type AccountSlot = Arc<Mutex<Account>>;

/// Authoritative balances and tags for one replica.
#[derive(Debug)]
pub struct AccountStore {
    accounts: RwLock<HashMap<String, AccountSlot>>,
    /// Balance given to accounts activated from now on
    initial_balance: AtomicI64,
    /// Value `reset` restores `initial_balance` to
    default_balance: i64,
}

impl Default for AccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            initial_balance: AtomicI64::new(DEFAULT_INITIAL_BALANCE),
            default_balance: DEFAULT_INITIAL_BALANCE,
        }
    }

    /// Store whose built-in initial balance is `balance` instead of 100.
    pub fn with_initial_balance(balance: i64) -> Result<Self> {
        if balance < 0 {
            return Err(Error::BadInit(balance));
        }
        Ok(Self {
            accounts: RwLock::new(HashMap::new()),
            initial_balance: AtomicI64::new(balance),
            default_balance: balance,
        })
    }

    pub fn initial_balance(&self) -> i64 {
        self.initial_balance.load(Ordering::SeqCst)
    }

    /// Change the balance given to accounts activated from now on.
    pub fn set_initial_balance(&self, balance: i64) -> Result<()> {
        if balance < 0 {
            return Err(Error::BadInit(balance));
        }
        self.initial_balance.store(balance, Ordering::SeqCst);
        tracing::debug!("Initial balance set to {}", balance);
        Ok(())
    }

    /// Create the account if absent. Returns `false` when it already existed.
    pub fn activate(&self, email: &str) -> Result<bool> {
        validate_email(email)?;

        let mut accounts = self.accounts.write();
        if accounts.contains_key(email) {
            return Ok(false);
        }
        let account = Account::new(email, self.initial_balance());
        tracing::debug!("Activated {} with {} points", email, account.balance);
        accounts.insert(email.to_string(), Arc::new(Mutex::new(account)));
        Ok(true)
    }

    pub fn contains(&self, email: &str) -> bool {
        self.accounts.read().contains_key(email)
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    /// Current balance and tag
    pub fn get_balance(&self, email: &str) -> Result<Value> {
        let slot = self.slot(email)?;
        let account = slot.lock();
        Ok(account.value())
    }

    /// Add `amount` points and return the new balance.
    pub fn credit(&self, email: &str, amount: i64) -> Result<i64> {
        if amount <= 0 {
            return Err(Error::InvalidPoints(format!(
                "points to add must be positive, got {}",
                amount
            )));
        }
        let slot = self.slot(email)?;
        let mut account = slot.lock();
        let balance = account.balance.checked_add(amount).ok_or_else(|| {
            Error::InvalidPoints(format!("adding {} overflows the balance", amount))
        })?;
        account.balance = balance;
        Ok(balance)
    }

    /// Take `amount` points away and return the new balance.
    ///
    /// The account is left untouched when the balance would go negative.
    pub fn debit(&self, email: &str, amount: i64) -> Result<i64> {
        if amount <= 0 {
            return Err(Error::InvalidPoints(format!(
                "points to spend must be positive, got {}",
                amount
            )));
        }
        let slot = self.slot(email)?;
        let mut account = slot.lock();
        let balance = account.balance - amount;
        if balance < 0 {
            return Err(Error::NotEnoughBalance {
                balance: account.balance,
                requested: amount,
            });
        }
        account.balance = balance;
        Ok(balance)
    }

    /// Overwrite balance and tag. No comparison against the stored tag.
    pub fn write(&self, email: &str, value: Value) -> Result<()> {
        let slot = self.slot(email)?;
        let mut account = slot.lock();
        if value.balance < 0 {
            return Err(Error::NotEnoughBalance {
                balance: account.balance,
                requested: account.balance.saturating_sub(value.balance),
            });
        }
        account.balance = value.balance;
        account.tag = value.tag;
        Ok(())
    }

    /// Drop every account and restore the built-in initial balance.
    pub fn reset(&self) {
        self.accounts.write().clear();
        self.initial_balance
            .store(self.default_balance, Ordering::SeqCst);
        tracing::debug!("Account store cleared");
    }

    fn slot(&self, email: &str) -> Result<AccountSlot> {
        validate_email(email)?;
        self.accounts
            .read()
            .get(email)
            .cloned()
            .ok_or_else(|| Error::InvalidEmail(format!("unknown account '{}'", email)))
    }
}
