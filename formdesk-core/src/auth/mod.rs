/// Credential primitives
///
/// # Modules
///
/// - [`credentials`]: random access IDs and passwords handed out at registration
/// - [`password`]: Argon2id hashing of the generated passwords
/// - [`token`]: session and remember tokens, remember-token digests
///
/// Nothing in here touches the row store; the services combine these with
/// table scans.

pub mod credentials;
pub mod password;
pub mod token;
