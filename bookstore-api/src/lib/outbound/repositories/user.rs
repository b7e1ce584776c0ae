use async_trait::async_trait;
use auth::PasswordCredential;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::UserName;
use crate::domain::user::ports::UserRepository;
use crate::domain::user::tokens::hash_token;
use crate::domain::user::tokens::TokenScope;
use crate::user::errors::UserError;

const USER_COLUMNS: &str =
    "users.id, users.created_at, users.name, users.email, users.picture, \
     users.password_hash, users.activated, users.auth_provider, users.version";

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    created_at: DateTime<Utc>,
    name: String,
    email: String,
    picture: Option<String>,
    password_hash: String,
    activated: bool,
    auth_provider: String,
    version: i32,
}

impl TryFrom<UserRow> for User {
    type Error = UserError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let id = r.id;
        let corrupt = |field: &str, e: String| {
            UserError::DatabaseError(format!("user {} has invalid {}: {}", id, field, e))
        };

        Ok(User {
            id: UserId(id),
            name: UserName::new(r.name).map_err(|e| corrupt("name", e.to_string()))?,
            email: EmailAddress::new(r.email)
                .map_err(|e| corrupt("email", e.to_string()))?,
            picture: r.picture,
            password: PasswordCredential::from_hash(r.password_hash),
            activated: r.activated,
            auth_provider: r
                .auth_provider
                .parse()
                .map_err(|e: crate::user::errors::AuthProviderError| {
                    corrupt("auth_provider", e.to_string())
                })?,
            version: r.version,
            created_at: r.created_at,
        })
    }
}

fn map_write_error(e: sqlx::Error, email: &EmailAddress) -> UserError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
            return UserError::DuplicateEmail(email.as_str().to_string());
        }
    }
    UserError::DatabaseError(e.to_string())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, UserError> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (name, email, picture, password_hash, activated, auth_provider)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.name.as_str())
        .bind(user.email.as_str())
        .bind(user.picture.as_deref())
        .bind(user.password.hash())
        .bind(user.activated)
        .bind(user.auth_provider.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &user.email))?;

        row.try_into()
    }

    async fn update(&self, user: User) -> Result<User, UserError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET name = $1, email = $2, picture = $3, password_hash = $4,
                activated = $5, auth_provider = $6, version = version + 1
            WHERE id = $7 AND version = $8
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.name.as_str())
        .bind(user.email.as_str())
        .bind(user.picture.as_deref())
        .bind(user.password.hash())
        .bind(user.activated)
        .bind(user.auth_provider.as_str())
        .bind(user.id.0)
        .bind(user.version)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &user.email))?;

        match row {
            Some(r) => r.try_into(),
            None => Err(UserError::EditConflict(user.id.0)),
        }
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, UserError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE id = $1
            "#
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, UserError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE email = $1
            "#
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_token(
        &self,
        scope: TokenScope,
        plaintext: &str,
    ) -> Result<Option<User>, UserError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            INNER JOIN tokens ON users.id = tokens.user_id
            WHERE tokens.hash = $1 AND tokens.scope = $2 AND tokens.expiry > $3
            "#
        ))
        .bind(hash_token(plaintext))
        .bind(scope.as_str())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}
