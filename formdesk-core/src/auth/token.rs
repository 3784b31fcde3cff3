/// Session and remember tokens
///
/// Both are random UUID v4 strings. Session tokens are stored as-is because
/// they are replaced on every credential login; remember tokens live
/// indefinitely, so only their SHA-256 digest is stored.
///
/// # Example
///
/// ```
/// use formdesk_core::auth::token::{digest_remember_token, new_remember_token};
///
/// let token = new_remember_token();
/// let digest = digest_remember_token(&token);
/// assert_eq!(digest.len(), 64);
/// assert_eq!(digest, digest_remember_token(&token));
/// ```

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Characters of a token that may appear in logs
const LOG_PREFIX_LENGTH: usize = 8;

/// Fresh session token
pub fn new_session_token() -> String {
    Uuid::new_v4().to_string()
}

/// Fresh remember token, returned to the client once
pub fn new_remember_token() -> String {
    Uuid::new_v4().to_string()
}

/// Hex-encoded SHA-256 of a remember token, the form kept in the Users table
pub fn digest_remember_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether a stored remember cell already holds a digest
///
/// Digests are 64 lowercase hex characters; anything else is a plaintext
/// token written before digests were introduced.
pub fn is_remember_digest(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Leading characters of a token, safe for log fields
pub fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(LOG_PREFIX_LENGTH) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_tokens_are_uuids() {
        let token = new_session_token();
        assert!(Uuid::parse_str(&token).is_ok());
        assert_ne!(token, new_session_token());
    }

    #[test]
    fn test_remember_digest() {
        // sha256("abc")
        assert_eq!(
            digest_remember_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(digest_remember_token("abc"), digest_remember_token("abd"));
    }

    #[test]
    fn test_remember_digest_shape() {
        assert!(is_remember_digest(&digest_remember_token("abc")));
        assert!(!is_remember_digest(&new_remember_token()));
        assert!(!is_remember_digest(&digest_remember_token("abc").to_uppercase()));
        assert!(!is_remember_digest(""));
    }

    #[test]
    fn test_token_prefix() {
        assert_eq!(token_prefix("0123456789abcdef"), "01234567");
        assert_eq!(token_prefix("abc"), "abc");
        assert_eq!(token_prefix(""), "");
    }
}
