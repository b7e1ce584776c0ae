use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::user::models::UserId;
use crate::domain::user::ports::TokenRepository;
use crate::domain::user::tokens::ActivationToken;
use crate::domain::user::tokens::TokenScope;
use crate::user::errors::UserError;

pub struct PostgresTokenRepository {
    pool: PgPool,
}

impl PostgresTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn create(&self, token: &ActivationToken) -> Result<(), UserError> {
        sqlx::query(
            r#"
            INSERT INTO tokens (hash, user_id, expiry, scope)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&token.hash)
        .bind(token.user_id.0)
        .bind(token.expiry)
        .bind(token.scope.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: UserId,
    ) -> Result<(), UserError> {
        sqlx::query(
            r#"
            DELETE FROM tokens
            WHERE scope = $1 AND user_id = $2
            "#,
        )
        .bind(scope.as_str())
        .bind(user_id.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
