//! Process-local stores used by tests and local runs without PostgreSQL.
//!
//! Same observable behaviour as the SQL stores: unique emails, versioned
//! updates, hashed token lookup restricted to unexpired tokens.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::TokenRepository;
use crate::domain::user::ports::UserRepository;
use crate::domain::user::tokens::hash_token;
use crate::domain::user::tokens::ActivationToken;
use crate::domain::user::tokens::TokenScope;
use crate::user::errors::UserError;

#[derive(Debug, Clone)]
struct StoredToken {
    hash: Vec<u8>,
    user_id: UserId,
    expiry: DateTime<Utc>,
    scope: TokenScope,
}

/// Token store; cheap to clone, clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenRepository {
    tokens: Arc<RwLock<Vec<StoredToken>>>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn owner_of(&self, scope: TokenScope, plaintext: &str) -> Option<UserId> {
        let hash = hash_token(plaintext);
        let now = Utc::now();
        self.tokens
            .read()
            .await
            .iter()
            .find(|t| t.hash == hash && t.scope == scope && t.expiry > now)
            .map(|t| t.user_id)
    }

    /// Number of stored tokens for `user_id`.
    pub async fn count_for_user(&self, user_id: UserId) -> usize {
        self.tokens
            .read()
            .await
            .iter()
            .filter(|t| t.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn create(&self, token: &ActivationToken) -> Result<(), UserError> {
        self.tokens.write().await.push(StoredToken {
            hash: token.hash.clone(),
            user_id: token.user_id,
            expiry: token.expiry,
            scope: token.scope,
        });
        Ok(())
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: UserId,
    ) -> Result<(), UserError> {
        self.tokens
            .write()
            .await
            .retain(|t| !(t.scope == scope && t.user_id == user_id));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct UserTable {
    next_id: i64,
    rows: HashMap<UserId, User>,
}

/// User store joined against an [`InMemoryTokenRepository`] for token lookups.
#[derive(Debug, Clone)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<UserTable>>,
    tokens: InMemoryTokenRepository,
}

impl InMemoryUserRepository {
    pub fn new(tokens: InMemoryTokenRepository) -> Self {
        Self {
            table: Arc::new(RwLock::new(UserTable::default())),
            tokens,
        }
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, UserError> {
        let mut table = self.table.write().await;

        if table.rows.values().any(|u| u.email == user.email) {
            return Err(UserError::DuplicateEmail(user.email.to_string()));
        }

        table.next_id += 1;
        let created = User {
            id: UserId(table.next_id),
            name: user.name,
            email: user.email,
            picture: user.picture,
            password: user.password,
            activated: user.activated,
            auth_provider: user.auth_provider,
            version: 1,
            created_at: Utc::now(),
        };
        table.rows.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update(&self, mut user: User) -> Result<User, UserError> {
        let mut table = self.table.write().await;

        match table.rows.get(&user.id) {
            Some(current) if current.version == user.version => {}
            _ => return Err(UserError::EditConflict(user.id.0)),
        }

        if table
            .rows
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(UserError::DuplicateEmail(user.email.to_string()));
        }

        user.version += 1;
        table.rows.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        Ok(self
            .table
            .read()
            .await
            .rows
            .values()
            .find(|u| u.email == *email)
            .cloned())
    }

    async fn find_by_token(
        &self,
        scope: TokenScope,
        plaintext: &str,
    ) -> Result<Option<User>, UserError> {
        match self.tokens.owner_of(scope, plaintext).await {
            Some(user_id) => self.find_by_id(user_id).await,
            None => Ok(None),
        }
    }
}
