//! Account credential resolution
//!
//! Token acquisition and refresh live outside this service; the
//! accounts table is read-only from here.

use std::sync::Arc;

use crate::data::{Account, Database};
use crate::error::AppError;

/// Credentials for one account, resolved once per sync or publish
/// attempt
#[derive(Debug, Clone)]
pub struct Credentials {
    pub instagram_user_id: String,
    pub access_token: String,
}

/// Account lookup service
pub struct AccountService {
    db: Arc<Database>,
}

impl AccountService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn get_account(&self, account_id: &str) -> Result<Account, AppError> {
        self.db
            .get_account(account_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        self.db.list_accounts().await
    }

    pub async fn get_access_token(&self, account_id: &str) -> Result<String, AppError> {
        Ok(self.get_account(account_id).await?.access_token)
    }

    pub async fn get_instagram_user_id(&self, account_id: &str) -> Result<String, AppError> {
        Ok(self.get_account(account_id).await?.instagram_user_id)
    }

    /// Resolve both credential parts with a single lookup
    pub async fn credentials(&self, account_id: &str) -> Result<Credentials, AppError> {
        let account = self.get_account(account_id).await?;
        Ok(Credentials {
            instagram_user_id: account.instagram_user_id,
            access_token: account.access_token,
        })
    }
}
