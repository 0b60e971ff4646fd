//! User command - manage accounts and credit balances.

use crate::cli::{Output, UserAction};
use crate::config::Settings;
use crate::credits::{CreditLedger, SqliteCreditLedger};

/// Run a user management action.
pub async fn run_user(action: &UserAction, settings: Settings) -> anyhow::Result<()> {
    let ledger = SqliteCreditLedger::new(&settings.sqlite_path())?;

    match action {
        UserAction::Add { id, name, credits } => {
            let name = name.clone().unwrap_or_else(|| id.clone());
            let user = ledger.create_user(id, &name, *credits).await?;
            Output::success(&format!(
                "Created user {} with {} credits",
                user.id, user.credit_balance
            ));
        }

        UserAction::Show { id } => {
            let user = ledger.get_user(id).await?;
            Output::header(&format!("User {}", user.id));
            Output::kv("Name", &user.name);
            Output::kv("Credits", &user.credit_balance.to_string());
        }

        UserAction::Topup { id, amount } => {
            let balance = ledger.add_credits(id, *amount).await?;
            Output::success(&format!("New balance for {}: {}", id, balance));
        }
    }

    Ok(())
}
