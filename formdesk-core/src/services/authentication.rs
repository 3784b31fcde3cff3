/// Authentication service
///
/// Three ways in, all by full scan of the Users table:
///
/// - access ID + password: verifies the Argon2id hash, issues a new session token
/// - session token: exact match, refreshes `lastLoginAt`, keeps the token
/// - remember token: matches the stored SHA-256 digest, issues a new session token
///
/// Plus remember-token management (issue, save, invalidate). Every write goes
/// through a conditional commit addressed at the matched row only.
///
/// Neither session nor remember tokens expire; a session token lives until the
/// next password or remember-token login replaces it.

use super::context::{require_header, StoreContext};
use crate::auth::password::verify_password;
use crate::auth::token::{digest_remember_token, new_remember_token, new_session_token, token_prefix};
use crate::error::{report, ServiceError, ServiceResult};
use crate::models::UserRecord;
use crate::schema::users;
use crate::store::{Cell, Mutation, Plan, TableSnapshot};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Result of a password login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordLogin {
    pub session_id: String,
    pub email: String,
    pub last_login: DateTime<Utc>,
}

/// Result of a session login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionLogin {
    pub user_id: String,
    pub email: String,
    pub last_login: DateTime<Utc>,
}

/// Result of a remember-token login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RememberLogin {
    pub user_id: String,
    pub session_id: String,
    pub email: String,
    pub last_login: DateTime<Utc>,
}

/// A freshly issued remember token, shown to the client once
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub user_id: String,
    pub remember_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    context: StoreContext,
}

/// Column of the remember token, resolved by header label
fn remember_column(snapshot: &TableSnapshot) -> ServiceResult<usize> {
    snapshot
        .column_index(users::REMEMBER_TOKEN_LABEL)
        .ok_or_else(|| ServiceError::Schema("Users table has no rememberToken column".to_string()))
}

impl AuthService {
    pub fn new(context: StoreContext) -> Self {
        Self { context }
    }

    /// Logs in with access ID and password
    ///
    /// On success the user's session token is replaced and `lastLoginAt`
    /// updated. A wrong password writes nothing.
    pub async fn authenticate_by_password(
        &self,
        access_id: &str,
        password: &str,
    ) -> ServiceResult<PasswordLogin> {
        report(
            "authenticate_by_password",
            self.password_login(access_id, password).await,
        )
    }

    async fn password_login(&self, access_id: &str, password: &str) -> ServiceResult<PasswordLogin> {
        if access_id.is_empty() || password.is_empty() {
            return Err(ServiceError::validation("access ID and password are required"));
        }

        let store_id = self.context.store_id().await?;
        let session_id = new_session_token();
        let now = Utc::now();

        // Verification is expensive; skip it on retries if the hash is unchanged.
        let mut verified_hash: Option<String> = None;

        let email = self
            .context
            .table(&store_id, users::TABLE)
            .transact(|snapshot| -> ServiceResult<Plan<String>> {
                require_header(snapshot, users::TABLE)?;
                if !snapshot.has_data() {
                    return Err(ServiceError::NoUsers);
                }

                let user = UserRecord::scan(snapshot)
                    .find(|user| user.access_id == access_id)
                    .ok_or_else(|| {
                        warn!(access_id, "Login failed: unknown access ID");
                        ServiceError::InvalidCredentials
                    })?;

                if verified_hash.as_deref() != Some(user.password_hash.as_str()) {
                    let matches = verify_password(password, &user.password_hash).map_err(|e| {
                        ServiceError::system(format!("unreadable password hash for {}: {}", access_id, e))
                    })?;
                    if !matches {
                        warn!(access_id, "Login failed: wrong password");
                        return Err(ServiceError::InvalidCredentials);
                    }
                    verified_hash = Some(user.password_hash.clone());
                }

                Ok(Plan::Commit(
                    vec![
                        Mutation::set(user.row_number, users::SESSION_TOKEN, session_id.as_str()),
                        Mutation::set(user.row_number, users::LAST_LOGIN_AT, now),
                    ],
                    user.account,
                ))
            })
            .await?;

        info!(access_id, session = token_prefix(&session_id), "Password login succeeded");
        Ok(PasswordLogin {
            session_id,
            email,
            last_login: now,
        })
    }

    /// Resumes a session
    ///
    /// Only `lastLoginAt` is touched; the token stays the same.
    pub async fn authenticate_by_session(&self, session_id: &str) -> ServiceResult<SessionLogin> {
        report(
            "authenticate_by_session",
            self.session_login(session_id).await,
        )
    }

    async fn session_login(&self, session_id: &str) -> ServiceResult<SessionLogin> {
        if session_id.is_empty() {
            return Err(ServiceError::validation("session ID is required"));
        }

        let store_id = self.context.store_id().await?;
        let now = Utc::now();

        let user = self
            .context
            .table(&store_id, users::TABLE)
            .transact(|snapshot| -> ServiceResult<Plan<UserRecord>> {
                require_header(snapshot, users::TABLE)?;

                let user = UserRecord::scan(snapshot)
                    .find(|user| !user.session_token.is_empty() && user.session_token == session_id)
                    .ok_or_else(|| {
                        warn!(session = token_prefix(session_id), "Session login failed: unknown session");
                        ServiceError::InvalidSession
                    })?;

                Ok(Plan::Commit(
                    vec![Mutation::set(user.row_number, users::LAST_LOGIN_AT, now)],
                    user,
                ))
            })
            .await?;

        info!(access_id = %user.access_id, "Session login succeeded");
        Ok(SessionLogin {
            user_id: user.access_id,
            email: user.account,
            last_login: now,
        })
    }

    /// Logs in with a remember token and starts a new session
    pub async fn authenticate_by_remember_token(&self, token: &str) -> ServiceResult<RememberLogin> {
        report(
            "authenticate_by_remember_token",
            self.remember_login(token).await,
        )
    }

    async fn remember_login(&self, token: &str) -> ServiceResult<RememberLogin> {
        if token.is_empty() {
            return Err(ServiceError::validation("remember token is required"));
        }

        let store_id = self.context.store_id().await?;
        let digest = digest_remember_token(token);
        let session_id = new_session_token();
        let now = Utc::now();

        let user = self
            .context
            .table(&store_id, users::TABLE)
            .transact(|snapshot| -> ServiceResult<Plan<UserRecord>> {
                require_header(snapshot, users::TABLE)?;
                remember_column(snapshot)?;

                let user = UserRecord::scan(snapshot)
                    .find(|user| !user.remember_digest.is_empty() && user.remember_digest == digest)
                    .ok_or_else(|| {
                        warn!(token = token_prefix(token), "Remember login failed: unknown token");
                        ServiceError::InvalidToken
                    })?;

                Ok(Plan::Commit(
                    vec![
                        Mutation::set(user.row_number, users::SESSION_TOKEN, session_id.as_str()),
                        Mutation::set(user.row_number, users::LAST_LOGIN_AT, now),
                    ],
                    user,
                ))
            })
            .await?;

        info!(access_id = %user.access_id, session = token_prefix(&session_id), "Remember login succeeded");
        Ok(RememberLogin {
            user_id: user.access_id,
            session_id,
            email: user.account,
            last_login: now,
        })
    }

    /// Stores the digest of `token` as the user's remember token
    pub async fn save_remember_token(&self, user_id: &str, token: &str) -> ServiceResult<()> {
        if token.is_empty() {
            return report(
                "save_remember_token",
                Err(ServiceError::validation("remember token is required")),
            );
        }
        let digest = digest_remember_token(token);
        report(
            "save_remember_token",
            self.write_remember_cell(user_id, Cell::text(digest)).await,
        )
    }

    /// Clears the user's remember token
    pub async fn invalidate_remember_token(&self, user_id: &str) -> ServiceResult<()> {
        report(
            "invalidate_remember_token",
            self.write_remember_cell(user_id, Cell::Empty).await,
        )
    }

    /// Generates a remember token for the user, saves it, and returns it
    pub async fn issue_remember_token(&self, user_id: &str) -> ServiceResult<IssuedToken> {
        let token = new_remember_token();
        let result = self
            .write_remember_cell(user_id, Cell::text(digest_remember_token(&token)))
            .await
            .map(|()| IssuedToken {
                user_id: user_id.to_string(),
                remember_token: token,
            });
        report("issue_remember_token", result)
    }

    async fn write_remember_cell(&self, user_id: &str, value: Cell) -> ServiceResult<()> {
        if user_id.is_empty() {
            return Err(ServiceError::validation("user ID is required"));
        }

        let store_id = self.context.store_id().await?;
        let clearing = value.is_blank();

        self.context
            .table(&store_id, users::TABLE)
            .transact(|snapshot| -> ServiceResult<Plan<()>> {
                require_header(snapshot, users::TABLE)?;
                let col = remember_column(snapshot)?;

                let user = UserRecord::scan(snapshot)
                    .find(|user| user.access_id == user_id)
                    .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))?;

                Ok(Plan::Commit(
                    vec![Mutation::set(user.row_number, col, value.clone())],
                    (),
                ))
            })
            .await?;

        if clearing {
            info!(access_id = user_id, "Remember token invalidated");
        } else {
            info!(access_id = user_id, "Remember token saved");
        }
        Ok(())
    }
}
