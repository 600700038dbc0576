//! Auth Service - login, refresh-token rotation and logout

use chrono::{DateTime, Duration, Utc};
use sea_orm::*;
use serde::Serialize;

use super::{in_transaction, now_rfc3339};
use crate::auth::{
    create_access_token, generate_refresh_token, hash_refresh_token, verify_password,
};
use crate::config::Config;
use crate::domain::{DomainError, StudentStatus, UserRole};
use crate::models::admin::{self, Entity as Admin};
use crate::models::refresh_token::{self, Entity as RefreshToken};
use crate::models::student::{self, Entity as Student};
use crate::models::user::{self, Entity as User};

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: user::Model,
}

/// The authenticated user with their role profile
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    #[serde(flatten)]
    pub user: user::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student: Option<student::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<admin::Model>,
}

const INVALID_CREDENTIALS: &str = "Invalid credentials";

fn ensure_can_sign_in(account: &user::Model) -> Result<(), DomainError> {
    match account.status {
        StudentStatus::Blocked => Err(DomainError::Forbidden("account is blocked".into())),
        StudentStatus::Inactive => Err(DomainError::Forbidden("account is inactive".into())),
        StudentStatus::Pending | StudentStatus::Active => Ok(()),
    }
}

/// Issue an access token and persist a fresh refresh token for `account`.
async fn issue_pair<C: ConnectionTrait>(
    conn: &C,
    config: &Config,
    account: user::Model,
) -> Result<TokenPair, DomainError> {
    let (access_token, expires_in) = create_access_token(
        account.id,
        &account.username,
        account.role,
        &config.jwt_secret,
        config.access_token_ttl_minutes,
    )
    .map_err(DomainError::Internal)?;

    let refresh_token = generate_refresh_token();
    let expires_at = Utc::now() + Duration::days(config.refresh_token_ttl_days);

    refresh_token::ActiveModel {
        user_id: Set(account.id),
        token_hash: Set(hash_refresh_token(&refresh_token)),
        expires_at: Set(expires_at.to_rfc3339()),
        revoked: Set(false),
        created_at: Set(now_rfc3339()),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer",
        expires_in,
        user: account,
    })
}

pub async fn login(
    db: &DatabaseConnection,
    config: &Config,
    username: &str,
    password: &str,
) -> Result<TokenPair, DomainError> {
    tracing::info!("Login attempt for user: {}", username);

    let Some(account) = User::find()
        .filter(user::Column::Username.eq(username.trim()))
        .one(db)
        .await?
    else {
        tracing::warn!("User not found: {}", username);
        return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.into()));
    };

    if !verify_password(password, &account.password_hash).map_err(DomainError::Internal)? {
        tracing::warn!("Password verification failed for user: {}", account.username);
        return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.into()));
    }

    ensure_can_sign_in(&account)?;

    let pair = issue_pair(db, config, account).await?;
    tracing::info!(user_id = pair.user.id, "User signed in");
    Ok(pair)
}

/// Exchange a refresh token for a new pair. The presented token is revoked.
pub async fn refresh(
    db: &DatabaseConnection,
    config: &Config,
    token: &str,
) -> Result<TokenPair, DomainError> {
    let token_hash = hash_refresh_token(token.trim());
    let config = config.clone();

    in_transaction(db, move |txn| {
        Box::pin(async move {
            let stored = RefreshToken::find()
                .filter(refresh_token::Column::TokenHash.eq(token_hash))
                .lock_exclusive()
                .one(txn)
                .await?
                .ok_or_else(|| DomainError::Unauthorized("Unknown refresh token".into()))?;

            if stored.revoked {
                tracing::warn!(user_id = stored.user_id, "Revoked refresh token presented");
                return Err(DomainError::Unauthorized("Refresh token revoked".into()));
            }

            let expired = DateTime::parse_from_rfc3339(&stored.expires_at)
                .map(|at| at.with_timezone(&Utc) <= Utc::now())
                .unwrap_or(true);
            if expired {
                return Err(DomainError::Unauthorized("Refresh token expired".into()));
            }

            let account = User::find_by_id(stored.user_id)
                .one(txn)
                .await?
                .ok_or_else(|| DomainError::Unauthorized("Account no longer exists".into()))?;
            ensure_can_sign_in(&account)?;

            let mut active: refresh_token::ActiveModel = stored.into();
            active.revoked = Set(true);
            active.update(txn).await?;

            issue_pair(txn, &config, account).await
        })
    })
    .await
}

/// Logout. Unknown or already revoked tokens are accepted silently.
pub async fn revoke(db: &DatabaseConnection, token: &str) -> Result<(), DomainError> {
    let result = RefreshToken::update_many()
        .set(refresh_token::ActiveModel {
            revoked: Set(true),
            ..Default::default()
        })
        .filter(refresh_token::Column::TokenHash.eq(hash_refresh_token(token.trim())))
        .exec(db)
        .await?;

    tracing::debug!("Revoked {} refresh token(s)", result.rows_affected);
    Ok(())
}

pub async fn current_user(db: &DatabaseConnection, user_id: i32) -> Result<CurrentUser, DomainError> {
    let account = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or(DomainError::NotFound("user"))?;

    let (student, admin) = match account.role {
        UserRole::Student => (
            Student::find()
                .filter(student::Column::UserId.eq(account.id))
                .one(db)
                .await?,
            None,
        ),
        UserRole::Admin => (
            None,
            Admin::find()
                .filter(admin::Column::UserId.eq(account.id))
                .one(db)
                .await?,
        ),
    };

    Ok(CurrentUser {
        user: account,
        student,
        admin,
    })
}
