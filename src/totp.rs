use std::time::SystemTime;

use tracing::debug;

use crate::{
    hotp::{self, find_match},
    Config, ConfigurationError, Key, OtpCode, OtpError,
};

/// A code together with how long it stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeSnapshot {
    pub code: OtpCode,
    pub remaining_seconds: u64,
    pub period: u64,
}

#[derive(Debug, Clone)]
pub struct Totp {
    secret: Key,
    config: Config,
}

impl Totp {
    /// Creates the engine for the [Time-based One-time Password Algorithm](http://en.wikipedia.org/wiki/Time-based_One-time_Password_Algorithm)
    /// (TOTP) given an RFC4648 base32 encoded secret.
    ///
    /// Fails if the secret is not base32, decodes to nothing, or `config` holds a
    /// zero period or a digit count outside `6..=10`.
    pub fn new(secret: &str, config: Config) -> Result<Self, OtpError> {
        Self::from_key(Key::from_base32(secret)?, config)
    }

    pub fn from_key(secret: Key, config: Config) -> Result<Self, OtpError> {
        config.validate()?;

        if secret.is_empty() {
            return Err(ConfigurationError::EmptySecret.into());
        }

        debug!(
            algorithm = %config.algorithm,
            digits = config.digits,
            period = config.period,
            window = config.window,
            "created totp engine"
        );

        Ok(Self { secret, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The HOTP counter for the given seconds since the UNIX epoch
    pub fn time_step(&self, seconds_since_epoch: u64) -> u64 {
        seconds_since_epoch / self.config.period
    }

    /// Generates a Totp from the provided seconds since the UNIX epoch
    /// truncated to the specified number of digits
    pub fn generate(&self, seconds_since_epoch: u64) -> OtpCode {
        self.generate_at_step(self.time_step(seconds_since_epoch))
    }

    pub fn generate_at_step(&self, time_step: u64) -> OtpCode {
        hotp::compute(
            self.secret.expose(),
            time_step,
            self.config.algorithm,
            self.config.digits,
        )
    }

    /// Checks `candidate` against the current time step and `window` steps on
    /// either side.
    ///
    /// Every step in the window is evaluated regardless of where a match is found.
    /// Steps before the epoch are skipped.
    pub fn verify(&self, candidate: &str, seconds_since_epoch: u64) -> bool {
        self.matching_step(candidate, seconds_since_epoch).is_some()
    }

    /// Like [`Totp::verify`], but returns the time step that matched
    pub fn matching_step(&self, candidate: &str, seconds_since_epoch: u64) -> Option<u64> {
        let current = self.time_step(seconds_since_epoch);
        let first = current.saturating_sub(self.config.window);
        let last = current.saturating_add(self.config.window);

        find_match(candidate, first..=last, |step| self.generate_at_step(step))
    }

    /// Seconds until the code for the given instant expires, always in `1..=period`
    pub fn remaining_seconds(&self, seconds_since_epoch: u64) -> u64 {
        self.config.period - seconds_since_epoch % self.config.period
    }

    pub fn snapshot(&self, seconds_since_epoch: u64) -> CodeSnapshot {
        CodeSnapshot {
            code: self.generate(seconds_since_epoch),
            remaining_seconds: self.remaining_seconds(seconds_since_epoch),
            period: self.config.period,
        }
    }

    pub fn generate_now(&self) -> Result<OtpCode, OtpError> {
        Ok(self.generate(now()?))
    }

    pub fn verify_now(&self, candidate: &str) -> Result<bool, OtpError> {
        Ok(self.verify(candidate, now()?))
    }

    pub fn snapshot_now(&self) -> Result<CodeSnapshot, OtpError> {
        Ok(self.snapshot(now()?))
    }
}

/// Seconds since the UNIX epoch according to the system clock
pub fn now() -> Result<u64, OtpError> {
    Ok(SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)?
        .as_secs())
}
