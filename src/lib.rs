pub mod base32;
pub mod cache;
pub mod hotp;
pub mod options;
pub mod render;
pub mod secret;
pub mod totp;
pub(crate) mod uri_helper;

use core::num;
use std::{fmt::Display, str::FromStr, time::SystemTimeError};

use serde::Deserialize;
use zeroize::Zeroize;

pub use cache::{CacheStats, TimeStepCache};
pub use options::{Account, TotpOptions};
pub use render::UriRenderer;
pub use totp::{CodeSnapshot, Totp};
pub use uri_helper::{build_uri, parse_uri};

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("Invalid base32 character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigurationError),
    #[error("Invalid hashing algorithm, found {0}. Expected one of: SHA1, SHA256 or SHA512")]
    InvalidHashingAlgorithm(String),
    #[error("The provided URI is of type {0}. Expected: {1}")]
    InvalidUriType(String, String),
    #[error("The provided URI scheme is {0}, only otpauth is supported")]
    InvalidUriScheme(String),
    #[error("Could not parse the URI")]
    UriParseError(url::ParseError),
    #[error("Could not retrieve the secret from the URI")]
    UriMissingSecret,
    #[error("Could not parse an integer. Failed parsing: {1}")]
    IntegerParseError(num::ParseIntError, String),
    #[error("Failed to get the time since the unix epoch")]
    Time(#[from] SystemTimeError),
    #[error("Could not render the provisioning URI: {0}")]
    Render(String),
}

/// Reasons an engine refuses to be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("the period must be at least one second")]
    ZeroPeriod,
    #[error("digits must be between 6 and 10, found {0}")]
    DigitsOutOfRange(u32),
    #[error("the secret decodes to zero bytes")]
    EmptySecret,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum OtpHashAlgorithm {
    #[default]
    SHA1,
    SHA256,
    SHA512,
}

impl Display for OtpHashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SHA1 => write!(f, "SHA1"),
            Self::SHA256 => write!(f, "SHA256"),
            Self::SHA512 => write!(f, "SHA512"),
        }
    }
}

impl FromStr for OtpHashAlgorithm {
    type Err = OtpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_uppercase();

        match normalized.as_str() {
            "SHA1" => Ok(Self::SHA1),
            "SHA256" => Ok(Self::SHA256),
            "SHA512" => Ok(Self::SHA512),
            _ => Err(OtpError::InvalidHashingAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for OtpHashAlgorithm {
    type Error = OtpError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

pub const MIN_DIGITS: u32 = 6;
pub const MAX_DIGITS: u32 = 10;

/// Parameters shared by every code generated for one secret.
///
/// Defaults to SHA1, 6 digits, a 30 second period and a verification window of
/// one period on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub(crate) algorithm: OtpHashAlgorithm,
    pub(crate) digits: u32,
    pub(crate) period: u64,
    pub(crate) window: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: OtpHashAlgorithm::SHA1,
            digits: 6,
            period: 30,
            window: 1,
        }
    }
}

impl Config {
    ///  Sets hashing algorithm
    pub fn with_algorithm(mut self, algorithm: OtpHashAlgorithm) -> Self {
        self.algorithm = algorithm;

        self
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(mut self, digits: u32) -> Self {
        self.digits = digits;

        self
    }

    ///  Sets the period in seconds
    pub fn with_period(mut self, period: u64) -> Self {
        self.period = period;

        self
    }

    /// Sets how many adjacent periods are accepted on each side when verifying
    pub fn with_window(mut self, window: u64) -> Self {
        self.window = window;

        self
    }

    pub fn algorithm(&self) -> OtpHashAlgorithm {
        self.algorithm
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn window(&self) -> u64 {
        self.window
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        if self.period == 0 {
            return Err(ConfigurationError::ZeroPeriod);
        }

        if !(MIN_DIGITS..=MAX_DIGITS).contains(&self.digits) {
            return Err(ConfigurationError::DigitsOutOfRange(self.digits));
        }

        Ok(())
    }
}

/// The decoded shared secret. Wiped from memory on drop and never printed.
#[derive(Clone)]
pub struct Key(Vec<u8>);

impl Key {
    pub fn new(content: Vec<u8>) -> Self {
        Self(content)
    }

    /// Decodes an RFC4648 base32 secret
    pub fn from_base32(secret: &str) -> Result<Self, OtpError> {
        base32::decode(secret).map(Self)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Key([REDACTED])")
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OtpCode {
    code: u32,
    digits: u32,
}

impl OtpCode {
    pub fn integer(&self) -> u32 {
        self.code
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }
}

impl Display for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:0padding$}",
            self.code,
            padding = (self.digits as usize)
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{Config, ConfigurationError, Key, OtpCode, OtpHashAlgorithm};

    #[rstest]
    #[case("sha1", OtpHashAlgorithm::SHA1)]
    #[case("Sha256", OtpHashAlgorithm::SHA256)]
    #[case("SHA512", OtpHashAlgorithm::SHA512)]
    fn algorithm_from_str(#[case] input: &str, #[case] expected: OtpHashAlgorithm) {
        assert_eq!(expected, input.parse().unwrap());
    }

    #[test]
    fn algorithm_rejects_unknown_names() {
        assert!("MD5".parse::<OtpHashAlgorithm>().is_err());
    }

    #[rstest]
    #[case(7, 6, "000007")]
    #[case(94287082, 8, "94287082")]
    #[case(1234, 10, "0000001234")]
    fn code_is_zero_padded(#[case] code: u32, #[case] digits: u32, #[case] expected: &str) {
        assert_eq!(expected, OtpCode { code, digits }.to_string());
    }

    #[rstest]
    #[case(Config::default().with_period(0), ConfigurationError::ZeroPeriod)]
    #[case(Config::default().with_digits(5), ConfigurationError::DigitsOutOfRange(5))]
    #[case(Config::default().with_digits(11), ConfigurationError::DigitsOutOfRange(11))]
    fn config_validation(#[case] config: Config, #[case] expected: ConfigurationError) {
        assert_eq!(Err(expected), config.validate());
    }

    #[test]
    fn key_debug_is_redacted() {
        let key = Key::from_base32("JBSWY3DPEHPK3PXP").unwrap();
        assert_eq!("Key([REDACTED])", format!("{key:?}"));
    }
}
