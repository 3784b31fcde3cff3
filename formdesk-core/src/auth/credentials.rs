/// Generated login credentials
///
/// Registration hands every user a short access ID (their login name) and a
/// short password, each drawn uniformly from a fixed 36-character alphabet.
/// Collisions are not checked here; the user directory detects them when it
/// commits the new row.
///
/// # Example
///
/// ```
/// use formdesk_core::auth::credentials::{generate_access_id, generate_password, ACCESS_ID_LENGTH};
///
/// let id = generate_access_id(ACCESS_ID_LENGTH);
/// assert_eq!(id.len(), 5);
/// assert!(id.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
///
/// let password = generate_password(8);
/// assert_eq!(password.len(), 8);
/// ```

use rand::Rng;

/// Length of generated access IDs
pub const ACCESS_ID_LENGTH: usize = 5;

/// Length of generated passwords
pub const PASSWORD_LENGTH: usize = 5;

const ACCESS_ID_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const PASSWORD_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Random access ID of `length` characters from `[A-Z0-9]`
pub fn generate_access_id(length: usize) -> String {
    random_string(ACCESS_ID_CHARSET, length)
}

/// Random password of `length` characters from `[a-z0-9]`
pub fn generate_password(length: usize) -> String {
    random_string(PASSWORD_CHARSET, length)
}

fn random_string(charset: &[u8], length: usize) -> String {
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..charset.len());
            charset[idx] as char
        })
        .collect()
}
