// Secret fingerprints for logs

use base64::Engine;
use sha2::{Digest, Sha256};

const FINGERPRINT_CHARS: usize = 12;

/// SHA-256 base64 digest (STANDARD).
pub fn sha256_base64(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    let digest = hasher.finalize();
    base64::engine::general_purpose::STANDARD.encode(digest)
}

/// Short, stable label for a secret so log lines can tell two entries apart without
/// revealing either. The raw secret is never stored.
pub fn secret_fingerprint(secret: &str) -> String {
    if secret.is_empty() {
        return "<empty>".to_string();
    }
    let digest = sha256_base64(secret.as_bytes());
    format!("sha256:{}", &digest[..FINGERPRINT_CHARS])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_and_hides_secret() {
        let a = secret_fingerprint("hunter2");
        assert_eq!(a, secret_fingerprint("hunter2"));
        assert_ne!(a, secret_fingerprint("hunter3"));
        assert!(a.starts_with("sha256:"));
        assert!(!a.contains("hunter2"));
    }

    #[test]
    fn empty_secret_has_placeholder() {
        assert_eq!(secret_fingerprint(""), "<empty>");
    }
}
