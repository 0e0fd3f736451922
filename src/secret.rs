use rand::{rngs::OsRng, Rng};
use tracing::debug;

use crate::base32::{self, ALPHABET};

/// Length of secrets generated when the caller does not provide one.
pub const DEFAULT_SECRET_LENGTH: usize = 32;

/// Generates a random base32 secret of `length` symbols.
///
/// Every symbol is drawn independently from the operating system's CSPRNG.
pub fn generate_secret(length: usize) -> String {
    let alphabet = ALPHABET.as_bytes();
    let secret: String = (0..length)
        .map(|_| char::from(alphabet[OsRng.gen_range(0..alphabet.len())]))
        .collect();

    debug_assert!(
        length % 8 != 0
            || base32::decode(&secret).map(|bytes| base32::encode(&bytes)).ok() == Some(secret.clone()),
        "generated secret does not survive a base32 round trip"
    );
    debug!(length, "generated secret");

    secret
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{base32, Config, Totp};

    #[rstest]
    #[case(0)]
    #[case(16)]
    #[case(32)]
    #[case(37)]
    fn has_requested_length(#[case] length: usize) {
        let secret = super::generate_secret(length);

        assert_eq!(length, secret.len());
        assert!(secret.chars().all(|c| base32::ALPHABET.contains(c)));
    }

    #[test]
    fn default_length_secret_drives_an_engine() {
        let secret = super::generate_secret(super::DEFAULT_SECRET_LENGTH);

        assert_eq!(20, base32::decode(&secret).unwrap().len());
        assert!(Totp::new(&secret, Config::default()).is_ok());
    }

    #[test]
    fn secrets_do_not_repeat() {
        let secrets: HashSet<String> = (0..64).map(|_| super::generate_secret(32)).collect();

        assert_eq!(64, secrets.len());
    }
}
