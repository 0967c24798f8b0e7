use hmac::{Hmac, Mac};
use regex::Regex;
use sha2::Sha256;

/// Base64-encoded HMAC-SHA256 of `data` under `secret`. Both webhook signature schemes use this.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(data);
    base64::encode(mac.finalize().into_bytes())
}

/// Postal codes must be 5 digits, or ZIP+4, and not the all-zero placeholder.
pub fn validate_postal_code(postal_code: &str) -> bool {
    let cleaned: String = postal_code.chars().filter(|c| !c.is_whitespace()).collect();
    let re = Regex::new(r"^\d{5}(-\d{4})?$").unwrap();
    if !re.is_match(&cleaned) {
        return false;
    }
    cleaned != "00000" && cleaned != "00000-0000"
}

#[cfg(test)]
mod test {
    use super::validate_postal_code;

    #[test]
    fn postal_codes() {
        assert!(validate_postal_code("44600"));
        assert!(validate_postal_code("44600-1234"));
        assert!(validate_postal_code(" 44600 "));
        assert!(!validate_postal_code("00000"));
        assert!(!validate_postal_code("00000-0000"));
        assert!(!validate_postal_code("4460"));
        assert!(!validate_postal_code("abcde"));
        assert!(!validate_postal_code("44600-12"));
    }
}
