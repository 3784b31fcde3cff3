/// User rows
///
/// Columns 1-7 sit at fixed positions; the remember-token column is located by
/// header label and passed in by the caller.

use crate::schema::users;
use crate::store::{Cell, Row, TableSnapshot};
use chrono::{DateTime, Utc};

/// One decoded Users row
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    /// 1-indexed row number in the Users table
    pub row_number: usize,

    /// Generated login name
    pub access_id: String,

    /// Argon2id PHC string (legacy stores may still hold plaintext until setup runs)
    pub password_hash: String,

    /// Email address
    pub account: String,

    pub registered_at: Option<DateTime<Utc>>,

    pub last_login_at: Option<DateTime<Utc>>,

    /// Stored but never acted upon
    pub auto_login: bool,

    /// Current session token, empty when logged out
    pub session_token: String,

    /// SHA-256 hex digest of the remember token, empty when none is set
    pub remember_digest: String,
}

impl UserRecord {
    /// Decodes one row
    pub fn from_row(row_number: usize, row: &Row, remember_col: Option<usize>) -> Self {
        let text = |col: usize| {
            row.get(col - 1)
                .map(|cell| cell.as_str().to_string())
                .unwrap_or_default()
        };
        let timestamp = |col: usize| row.get(col - 1).and_then(Cell::as_timestamp);

        Self {
            row_number,
            access_id: text(users::ACCESS_ID),
            password_hash: text(users::PASSWORD),
            account: text(users::ACCOUNT),
            registered_at: timestamp(users::REGISTERED_AT),
            last_login_at: timestamp(users::LAST_LOGIN_AT),
            auto_login: row
                .get(users::AUTO_LOGIN - 1)
                .and_then(Cell::as_bool)
                .unwrap_or(false),
            session_token: text(users::SESSION_TOKEN),
            remember_digest: remember_col.map(text).unwrap_or_default(),
        }
    }

    /// Decodes every data row of a Users snapshot
    pub fn scan(snapshot: &TableSnapshot) -> impl Iterator<Item = UserRecord> + '_ {
        let remember_col = snapshot.column_index(users::REMEMBER_TOKEN_LABEL);
        snapshot
            .data_rows()
            .map(move |(row_number, row)| UserRecord::from_row(row_number, row, remember_col))
    }

    /// Row for a freshly registered user
    ///
    /// Session and remember token cells start empty; `lastLoginAt` equals
    /// `registeredAt`.
    pub fn new_row(access_id: &str, password_hash: &str, account: &str, now: DateTime<Utc>) -> Row {
        vec![
            Cell::text(access_id),
            Cell::text(password_hash),
            Cell::text(account),
            Cell::Timestamp(now),
            Cell::Timestamp(now),
            Cell::Bool(false),
            Cell::text(""),
            Cell::text(""),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::header_row;

    #[test]
    fn test_new_row_round_trip() {
        let now = Utc::now();
        let row = UserRecord::new_row("AB12C", "$argon2id$x", "a@example.com", now);
        assert_eq!(row.len(), users::HEADER.len());

        let user = UserRecord::from_row(2, &row, Some(8));
        assert_eq!(user.row_number, 2);
        assert_eq!(user.access_id, "AB12C");
        assert_eq!(user.account, "a@example.com");
        assert_eq!(user.registered_at, Some(now));
        assert_eq!(user.last_login_at, Some(now));
        assert!(!user.auto_login);
        assert!(user.session_token.is_empty());
        assert!(user.remember_digest.is_empty());
    }

    #[test]
    fn test_short_legacy_row() {
        let row = vec![Cell::text("AB12C"), Cell::text("pw123"), Cell::text("a@example.com")];
        let user = UserRecord::from_row(3, &row, None);
        assert_eq!(user.password_hash, "pw123");
        assert!(user.registered_at.is_none());
        assert!(user.session_token.is_empty());
    }

    #[test]
    fn test_scan_uses_header_for_remember_column() {
        let mut header = header_row(&users::HEADER[..7]);
        header.push(Cell::text("notes"));
        header.push(Cell::text(users::REMEMBER_TOKEN_LABEL));

        let mut row = UserRecord::new_row("AB12C", "h", "a@example.com", Utc::now());
        row.truncate(7);
        row.push(Cell::text("n"));
        row.push(Cell::text("digest"));

        let snapshot = TableSnapshot {
            revision: 1,
            rows: vec![header, row],
        };
        let users: Vec<UserRecord> = UserRecord::scan(&snapshot).collect();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].row_number, 2);
        assert_eq!(users[0].remember_digest, "digest");
    }
}
