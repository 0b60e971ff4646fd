//! Credit accounting.
//!
//! Every paid operation checks the balance before any external work starts
//! and deducts only after the operation has succeeded.

use crate::error::{FortellError, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

/// A user account with its credit balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub name: String,
    pub credit_balance: i64,
}

/// Trait for credit ledgers.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Look up a user.
    async fn get_user(&self, user_id: &str) -> Result<UserAccount>;

    /// Create a user with an initial balance.
    async fn create_user(&self, id: &str, name: &str, balance: i64) -> Result<UserAccount>;

    /// Deduct credits; fails without deducting if the balance is too low.
    /// Returns the new balance.
    async fn deduct(&self, user_id: &str, amount: i64) -> Result<i64>;

    /// Add credits to a user. Returns the new balance.
    async fn add_credits(&self, user_id: &str, amount: i64) -> Result<i64>;
}

/// Reject before paid work starts when the balance cannot cover the cost.
pub fn ensure_balance(user: &UserAccount, required: i64) -> Result<()> {
    if user.credit_balance < required {
        return Err(FortellError::InsufficientCredits {
            required,
            available: user.credit_balance,
        });
    }
    Ok(())
}

/// SQLite-backed credit ledger.
pub struct SqliteCreditLedger {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    credit_balance INTEGER NOT NULL
);
"#;

impl SqliteCreditLedger {
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized credit ledger at {:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory ledger (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FortellError::Credits(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl CreditLedger for SqliteCreditLedger {
    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<UserAccount> {
        let conn = self.lock()?;
        let user = conn.query_row(
            "SELECT id, name, credit_balance FROM users WHERE id = ?1",
            params![user_id],
            |row| {
                Ok(UserAccount {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    credit_balance: row.get(2)?,
                })
            },
        );

        match user {
            Ok(user) => Ok(user),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(FortellError::UserNotFound(user_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    async fn create_user(&self, id: &str, name: &str, balance: i64) -> Result<UserAccount> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users (id, name, credit_balance) VALUES (?1, ?2, ?3)",
            params![id, name, balance],
        )?;
        Ok(UserAccount {
            id: id.to_string(),
            name: name.to_string(),
            credit_balance: balance,
        })
    }

    #[instrument(skip(self))]
    async fn deduct(&self, user_id: &str, amount: i64) -> Result<i64> {
        let conn = self.lock()?;

        // Deduct only when the balance covers the amount, in one statement,
        // so concurrent deductions cannot drive the balance negative.
        let updated = conn.execute(
            "UPDATE users SET credit_balance = credit_balance - ?1
             WHERE id = ?2 AND credit_balance >= ?1",
            params![amount, user_id],
        )?;

        if updated == 0 {
            let balance: std::result::Result<i64, _> = conn.query_row(
                "SELECT credit_balance FROM users WHERE id = ?1",
                params![user_id],
                |row| row.get(0),
            );
            return match balance {
                Ok(available) => Err(FortellError::InsufficientCredits {
                    required: amount,
                    available,
                }),
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    Err(FortellError::UserNotFound(user_id.to_string()))
                }
                Err(e) => Err(e.into()),
            };
        }

        let balance: i64 = conn.query_row(
            "SELECT credit_balance FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;

        debug!("Deducted {} credits from {}: {} left", amount, user_id, balance);
        Ok(balance)
    }

    #[instrument(skip(self))]
    async fn add_credits(&self, user_id: &str, amount: i64) -> Result<i64> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE users SET credit_balance = credit_balance + ?1 WHERE id = ?2",
            params![amount, user_id],
        )?;
        if updated == 0 {
            return Err(FortellError::UserNotFound(user_id.to_string()));
        }

        let balance: i64 = conn.query_row(
            "SELECT credit_balance FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(balance)
    }
}

/// In-memory credit ledger for tests.
#[derive(Default)]
pub struct MemoryCreditLedger {
    users: Mutex<HashMap<String, UserAccount>>,
}

impl MemoryCreditLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor seeding one user.
    pub fn with_user(id: &str, balance: i64) -> Self {
        let ledger = Self::new();
        {
            let mut users = ledger.users.lock().unwrap_or_else(|p| p.into_inner());
            users.insert(
                id.to_string(),
                UserAccount {
                    id: id.to_string(),
                    name: id.to_string(),
                    credit_balance: balance,
                },
            );
        }
        ledger
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, UserAccount>> {
        self.users.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl CreditLedger for MemoryCreditLedger {
    async fn get_user(&self, user_id: &str) -> Result<UserAccount> {
        self.lock()
            .get(user_id)
            .cloned()
            .ok_or_else(|| FortellError::UserNotFound(user_id.to_string()))
    }

    async fn create_user(&self, id: &str, name: &str, balance: i64) -> Result<UserAccount> {
        let user = UserAccount {
            id: id.to_string(),
            name: name.to_string(),
            credit_balance: balance,
        };
        self.lock().insert(id.to_string(), user.clone());
        Ok(user)
    }

    async fn deduct(&self, user_id: &str, amount: i64) -> Result<i64> {
        let mut users = self.lock();
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| FortellError::UserNotFound(user_id.to_string()))?;
        if user.credit_balance < amount {
            return Err(FortellError::InsufficientCredits {
                required: amount,
                available: user.credit_balance,
            });
        }
        user.credit_balance -= amount;
        Ok(user.credit_balance)
    }

    async fn add_credits(&self, user_id: &str, amount: i64) -> Result<i64> {
        let mut users = self.lock();
        let user = users
            .get_mut(user_id)
            .ok_or_else(|| FortellError::UserNotFound(user_id.to_string()))?;
        user.credit_balance += amount;
        Ok(user.credit_balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_ledger_deduct() {
        let ledger = SqliteCreditLedger::in_memory().unwrap();
        ledger.create_user("u1", "Test User", 5).await.unwrap();

        assert_eq!(ledger.deduct("u1", 2).await.unwrap(), 3);
        assert_eq!(ledger.deduct("u1", 2).await.unwrap(), 1);

        let err = ledger.deduct("u1", 2).await.unwrap_err();
        assert!(matches!(
            err,
            FortellError::InsufficientCredits {
                required: 2,
                available: 1
            }
        ));

        // Balance untouched by the failed deduction
        assert_eq!(ledger.get_user("u1").await.unwrap().credit_balance, 1);
    }

    #[tokio::test]
    async fn test_sqlite_ledger_unknown_user() {
        let ledger = SqliteCreditLedger::in_memory().unwrap();
        assert!(matches!(
            ledger.get_user("ghost").await.unwrap_err(),
            FortellError::UserNotFound(_)
        ));
        assert!(matches!(
            ledger.deduct("ghost", 1).await.unwrap_err(),
            FortellError::UserNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_add_credits() {
        let ledger = SqliteCreditLedger::in_memory().unwrap();
        ledger.create_user("u1", "Test User", 0).await.unwrap();
        assert_eq!(ledger.add_credits("u1", 10).await.unwrap(), 10);
    }

    #[test]
    fn test_ensure_balance() {
        let user = UserAccount {
            id: "u".into(),
            name: "u".into(),
            credit_balance: 1,
        };
        assert!(ensure_balance(&user, 1).is_ok());
        assert!(ensure_balance(&user, 2).is_err());
    }
}
