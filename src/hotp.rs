use hmac::{digest::KeyInit, Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use crate::{Config, ConfigurationError, Key, OtpCode, OtpError, OtpHashAlgorithm};

#[cfg(test)]
thread_local! {
    /// Number of HMAC evaluations performed on the current thread.
    pub(crate) static COMPUTATIONS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

type Signer = fn(&[u8], &[u8]) -> Vec<u8>;

impl OtpHashAlgorithm {
    fn signer(self) -> Signer {
        match self {
            Self::SHA1 => sign::<Hmac<Sha1>>,
            Self::SHA256 => sign::<Hmac<Sha256>>,
            Self::SHA512 => sign::<Hmac<Sha512>>,
        }
    }
}

/// Calculates the HMAC digest of `data` keyed with `key`.
///
/// # Panics
/// Never in practice, HMAC accepts keys of any length
fn sign<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = <M as KeyInit>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);

    mac.finalize().into_bytes().to_vec()
}

/// Encodes the HMAC digest into a truncated integer (RFC 4226, section 5.3).
fn truncate(digest: &[u8], digits: u32) -> u32 {
    // While sometimes this is a hardcoded 19
    // the last byte tells us the offset for any algorithm
    let offset = (digest[digest.len() - 1] & 0xf) as usize;

    let code_bytes = [
        digest[offset],
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ];
    let code = u64::from(u32::from_be_bytes(code_bytes) & 0x7fff_ffff);

    // 31 bits fit any modulus, so ten digits just keep the whole value
    match 10_u64.checked_pow(digits) {
        Some(modulus) => (code % modulus) as u32,
        None => code as u32,
    }
}

/// Computes the HOTP value of `counter` for the raw `secret`.
///
/// `digits` is expected to lie in `6..=10`, the engines validate it on
/// construction.
pub fn compute(secret: &[u8], counter: u64, algorithm: OtpHashAlgorithm, digits: u32) -> OtpCode {
    #[cfg(test)]
    COMPUTATIONS.with(|c| c.set(c.get() + 1));

    let digest = algorithm.signer()(secret, &counter.to_be_bytes());

    OtpCode {
        code: truncate(&digest, digits),
        digits,
    }
}

/// Scans every counter yielded by `counters` and returns the one whose code equals
/// `candidate`.
///
/// All counters are evaluated and compared in constant time, so the cost does
/// not depend on whether or where a match occurs.
pub(crate) fn find_match(
    candidate: &str,
    counters: impl IntoIterator<Item = u64>,
    generate: impl Fn(u64) -> OtpCode,
) -> Option<u64> {
    let mut found = Choice::from(0);
    let mut matched = 0_u64;

    for counter in counters {
        let expected = generate(counter).to_string();
        let equal = candidate.as_bytes().ct_eq(expected.as_bytes());

        matched.conditional_assign(&counter, equal & !found);
        found |= equal;
    }

    bool::from(found).then_some(matched)
}

#[derive(Debug, Clone)]
pub struct Hotp {
    secret: Key,
    algorithm: OtpHashAlgorithm,
    // How many digits to generate
    digits: u32,
}

impl Hotp {
    /// Creates the config for the [HMAC-based One-time Password Algorithm](http://en.wikipedia.org/wiki/HMAC-based_One-time_Password_Algorithm)
    /// (HOTP) given an RFC4648 base32 encoded secret.
    ///
    /// Only the algorithm and digits of `config` apply, counters carry no period.
    pub fn new(secret: &str, config: Config) -> Result<Self, OtpError> {
        Self::from_key(Key::from_base32(secret)?, config)
    }

    pub fn from_key(secret: Key, config: Config) -> Result<Self, OtpError> {
        config.validate()?;

        if secret.is_empty() {
            return Err(ConfigurationError::EmptySecret.into());
        }

        Ok(Self {
            secret,
            algorithm: config.algorithm,
            digits: config.digits,
        })
    }

    /// Generates a HOTP from the provided counter
    /// truncated to the specified number of digits
    pub fn generate(&self, counter: u64) -> OtpCode {
        compute(self.secret.expose(), counter, self.algorithm, self.digits)
    }

    /// Validates `candidate` against `counter` and up to `look_ahead` following
    /// counters, returning the counter that matched.
    ///
    /// Callers resynchronize by storing the returned counter plus one.
    pub fn verify(&self, candidate: &str, counter: u64, look_ahead: u64) -> Option<u64> {
        let last = counter.saturating_add(look_ahead);

        find_match(candidate, counter..=last, |c| self.generate(c))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{hotp::Hotp, Config, OtpHashAlgorithm};

    #[rstest]
    #[case(0, "755224")]
    #[case(1, "287082")]
    #[case(2, "359152")]
    #[case(3, "969429")]
    #[case(4, "338314")]
    #[case(5, "254676")]
    #[case(6, "287922")]
    #[case(7, "162583")]
    #[case(8, "399871")]
    #[case(9, "520489")]
    fn hotp(#[case] counter: u64, #[case] expected: &str) {
        let hotp = Hotp::new("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ", Config::default()).unwrap();

        assert_eq!(expected, hotp.generate(counter).to_string());
    }

    #[test]
    fn truncate_rfc4226_digest() {
        let digest = [
            0x1f, 0x86, 0x98, 0x69, 0x0e, 0x02, 0xca, 0x16, 0x61, 0x85, 0x50, 0xef, 0x7f, 0x19,
            0xda, 0x8e, 0x94, 0x5b, 0x55, 0x5a,
        ];

        assert_eq!(872_921, super::truncate(&digest, 6));
        assert_eq!(1_357_872_921, super::truncate(&digest, 10));
    }

    #[rstest]
    #[case(OtpHashAlgorithm::SHA1)]
    #[case(OtpHashAlgorithm::SHA256)]
    #[case(OtpHashAlgorithm::SHA512)]
    fn compute_is_deterministic(#[case] algorithm: OtpHashAlgorithm) {
        let first = super::compute(b"12345678901234567890", 42, algorithm, 8);
        let second = super::compute(b"12345678901234567890", 42, algorithm, 8);

        assert_eq!(first, second);
        assert_eq!(8, first.to_string().len());
    }

    #[test]
    fn verify_within_look_ahead() {
        let hotp = Hotp::new("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ", Config::default()).unwrap();

        assert_eq!(Some(3), hotp.verify("969429", 1, 2));
        assert_eq!(Some(1), hotp.verify("287082", 1, 0));
        assert_eq!(None, hotp.verify("969429", 1, 1));
        assert_eq!(None, hotp.verify("96942", 0, 9));
    }

    #[test]
    fn rejects_empty_secret() {
        assert!(Hotp::new("", Config::default()).is_err());
    }
}
