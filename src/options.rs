//! Configuration input and the provisioned account it resolves to.

use std::fmt;

use serde::Deserialize;

use crate::{
    cache::TimeStepCache,
    render::UriRenderer,
    secret::{generate_secret, DEFAULT_SECRET_LENGTH},
    uri_helper, Config, OtpError, OtpHashAlgorithm, Totp,
};

const DEFAULT_ISSUER: &str = "MyApp";
const DEFAULT_ACCOUNT_NAME: &str = "user@example.com";

/// Options as handed over by a config loader or command line front end.
///
/// Every key is optional. Keys use camel case (`accountName`) when deserialized.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TotpOptions {
    pub secret: Option<String>,
    pub issuer: Option<String>,
    pub account_name: Option<String>,
    pub algorithm: Option<OtpHashAlgorithm>,
    pub digits: Option<u32>,
    pub period: Option<u64>,
    pub window: Option<u64>,
}

impl TotpOptions {
    /// Applies the defaults and validates the result by building an engine once.
    ///
    /// A fresh secret is generated when none was given.
    pub fn into_account(self) -> Result<Account, OtpError> {
        let defaults = Config::default();
        let config = Config {
            algorithm: self.algorithm.unwrap_or(defaults.algorithm),
            digits: self.digits.unwrap_or(defaults.digits),
            period: self.period.unwrap_or(defaults.period),
            window: self.window.unwrap_or(defaults.window),
        };

        let account = Account {
            secret: self
                .secret
                .unwrap_or_else(|| generate_secret(DEFAULT_SECRET_LENGTH)),
            issuer: self.issuer.unwrap_or_else(|| DEFAULT_ISSUER.to_owned()),
            account_name: self
                .account_name
                .unwrap_or_else(|| DEFAULT_ACCOUNT_NAME.to_owned()),
            config,
        };

        account.engine()?;

        Ok(account)
    }
}

/// A secret with its labels and parameters, everything needed to provision an
/// authenticator app.
#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    /// The base32 secret, as it is shown to the user.
    pub secret: String,
    pub issuer: String,
    pub account_name: String,
    pub config: Config,
}

impl Account {
    pub fn engine(&self) -> Result<Totp, OtpError> {
        Totp::new(&self.secret, self.config)
    }

    pub fn cache(&self) -> Result<TimeStepCache, OtpError> {
        self.engine().map(TimeStepCache::new)
    }

    pub fn to_uri(&self) -> String {
        uri_helper::build_uri(&self.config, &self.secret, &self.issuer, &self.account_name)
    }

    /// Hands the provisioning URI to an external encoder, usually a QR code.
    pub fn render<R: UriRenderer>(&self, renderer: &R) -> Result<Vec<u8>, R::Error> {
        renderer.render(&self.to_uri())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("secret", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("account_name", &self.account_name)
            .field("config", &self.config)
            .finish()
    }
}
