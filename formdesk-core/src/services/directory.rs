/// User directory
///
/// Registration and user lookups over the Users table. The uniqueness scan and
/// the append happen in one conditional commit, so two concurrent
/// registrations of the same email cannot both succeed: the loser re-reads the
/// table, finds the winner's row and fails with `Duplicate`.

use super::context::{require_header, StoreContext};
use crate::auth::credentials::{generate_access_id, generate_password, ACCESS_ID_LENGTH, PASSWORD_LENGTH};
use crate::auth::password::hash_password;
use crate::error::{report, ServiceError, ServiceResult};
use crate::models::UserRecord;
use crate::schema::users;
use crate::store::{Mutation, Plan};
use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{debug, error, info, warn};

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid regex"))
}

/// Whether `email` has the local@domain.tld shape
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// Credentials handed out at registration
///
/// The password is returned here once and only stored hashed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub access_id: String,
    pub password: String,
}

#[derive(Clone)]
pub struct UserDirectory {
    context: StoreContext,
}

impl UserDirectory {
    pub fn new(context: StoreContext) -> Self {
        Self { context }
    }

    /// Registers a new user under `email`
    ///
    /// # Errors
    ///
    /// - `Validation` if the email is empty or malformed
    /// - `NotInitialized` if no store has been set up
    /// - `Schema` if the Users table is missing
    /// - `Duplicate` if the email is already registered
    /// - `System` on storage failures or an access ID collision
    pub async fn register(&self, email: &str) -> ServiceResult<Registration> {
        report("register", self.register_user(email).await)
    }

    async fn register_user(&self, email: &str) -> ServiceResult<Registration> {
        if email.is_empty() {
            return Err(ServiceError::validation("email is required"));
        }
        if !is_valid_email(email) {
            return Err(ServiceError::validation("email address is malformed"));
        }

        let store_id = self.context.store_id().await?;

        let access_id = generate_access_id(ACCESS_ID_LENGTH);
        let password = generate_password(PASSWORD_LENGTH);
        let password_hash = hash_password(&password, &self.context.config().password)
            .map_err(|e| ServiceError::system(e.to_string()))?;
        let row = UserRecord::new_row(&access_id, &password_hash, email, Utc::now());

        self.context
            .table(&store_id, users::TABLE)
            .transact(|snapshot| -> ServiceResult<Plan<()>> {
                require_header(snapshot, users::TABLE)?;

                for user in UserRecord::scan(snapshot) {
                    if user.account == email {
                        warn!(row = user.row_number, "Registration rejected: email already registered");
                        return Err(ServiceError::Duplicate(email.to_string()));
                    }
                    if user.access_id == access_id {
                        error!(access_id = %access_id, "Generated access ID collides with an existing user");
                        return Err(ServiceError::system("generated access ID is already taken"));
                    }
                }

                debug!(users = snapshot.rows.len() - 1, "Uniqueness scan passed");
                Ok(Plan::Commit(vec![Mutation::Append(row.clone())], ()))
            })
            .await?;

        info!(access_id = %access_id, "Registered user");
        Ok(Registration {
            access_id,
            password,
        })
    }

    /// User holding `session_id`, if any
    ///
    /// Empty session cells never match.
    pub(crate) async fn find_by_session(
        &self,
        store_id: &str,
        session_id: &str,
    ) -> ServiceResult<Option<UserRecord>> {
        let snapshot = self.context.table(store_id, users::TABLE).snapshot().await?;
        require_header(&snapshot, users::TABLE)?;

        let user = UserRecord::scan(&snapshot)
            .find(|user| !user.session_token.is_empty() && user.session_token == session_id);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PasswordParams, ServiceConfig};
    use crate::schema::setup_store;
    use crate::services::AuthService;
    use crate::store::MemoryRowStore;
    use std::sync::Arc;

    async fn directory() -> (UserDirectory, StoreContext, String) {
        let config = ServiceConfig::default().with_password_params(PasswordParams::fast());
        let context = StoreContext::new(Arc::new(MemoryRowStore::new()), config);
        let report = setup_store(context.store(), None, &PasswordParams::fast())
            .await
            .unwrap();
        context.set_store_id(report.store_id.clone()).await;
        (UserDirectory::new(context.clone()), context, report.store_id)
    }

    #[tokio::test]
    async fn test_find_by_session_skips_empty_tokens() {
        let (directory, context, store_id) = directory().await;
        let registration = directory.register("a@example.com").await.unwrap();

        // Fresh registrations have an empty session cell
        assert!(directory.find_by_session(&store_id, "").await.unwrap().is_none());
        assert!(directory
            .find_by_session(&store_id, "unknown")
            .await
            .unwrap()
            .is_none());

        let login = AuthService::new(context)
            .authenticate_by_password(&registration.access_id, &registration.password)
            .await
            .unwrap();
        let user = directory
            .find_by_session(&store_id, &login.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.access_id, registration.access_id);
    }

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("a@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co.jp"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("a@example"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("a@@example.com"));
        assert!(!is_valid_email("a@example."));
    }
}
