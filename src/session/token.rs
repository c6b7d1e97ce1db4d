//! Session token generation.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

use crate::error::StoreError;

/// Bytes of entropy drawn per token (256 bits).
pub const TOKEN_ENTROPY_BYTES: usize = 32;

/// Characters kept from the encoded entropy.
pub const TOKEN_LENGTH: usize = 32;

/// Generate an opaque, URL-safe session token.
///
/// Draws straight from the operating system so concurrent callers never
/// contend on a shared generator. If the OS source fails the token is not
/// produced at all.
pub fn generate_session_token() -> Result<String, StoreError> {
    let mut buffer = [0u8; TOKEN_ENTROPY_BYTES];
    OsRng
        .try_fill_bytes(&mut buffer)
        .map_err(|e| StoreError::EntropyUnavailable(e.to_string()))?;

    let mut token = URL_SAFE_NO_PAD.encode(buffer);
    token.truncate(TOKEN_LENGTH);
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_token_shape() {
        let token = generate_session_token().unwrap();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..1000)
            .map(|_| generate_session_token().unwrap())
            .collect();
        assert_eq!(tokens.len(), 1000);
    }
}
