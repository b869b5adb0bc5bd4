//! Session identifier generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;

/// Number of random bytes behind each identifier (256 bits).
const ID_BYTES: usize = 32;

/// Generate a fresh, unguessable session identifier.
///
/// The output only uses `A-Z a-z 0-9 - _`, so it can be placed in a cookie
/// value without quoting.
#[must_use]
pub fn generate() -> String {
    let mut bytes = [0u8; ID_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_id_is_cookie_safe() {
        let id = generate();
        assert_eq!(id.len(), 43);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
