use std::{borrow::Cow, str::FromStr};

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::debug;

use crate::{options::Account, Config, OtpError, OtpHashAlgorithm};

const OTPAUTH_SCHEME: &str = "otpauth";
const TOTP_TYPE: &str = "totp";

const URI_SECRET_QUERY: &str = "secret";
const URI_ISSUER_QUERY: &str = "issuer";
const URI_HASH_QUERY: &str = "algorithm";
const URI_PERIOD_QUERY: &str = "period";
const URI_DIGITS_QUERY: &str = "digits";

/// Characters escaped in URI components: everything but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode_component(input: &str) -> Cow<'_, str> {
    utf8_percent_encode(input, COMPONENT).into()
}

/// Builds the `otpauth://totp/` provisioning URI read by authenticator apps.
///
/// The secret is emitted exactly as given, it is never decoded.
pub fn build_uri(config: &Config, secret: &str, issuer: &str, account_name: &str) -> String {
    let issuer = encode_component(issuer);

    format!(
        "{OTPAUTH_SCHEME}://{TOTP_TYPE}/{issuer}:{account}?{URI_SECRET_QUERY}={secret}&{URI_ISSUER_QUERY}={issuer}&{URI_HASH_QUERY}={algorithm}&{URI_DIGITS_QUERY}={digits}&{URI_PERIOD_QUERY}={period}",
        account = encode_component(account_name),
        algorithm = config.algorithm,
        digits = config.digits,
        period = config.period,
    )
}

/// Parses a provisioning URI back into an [`Account`].
///
/// The `issuer` query parameter takes precedence over the label prefix. Missing
/// parameters fall back to the defaults of [`Config`]; the window is not part of
/// the URI and always takes the default.
pub fn parse_uri(uri: &str) -> Result<Account, OtpError> {
    let uri = url::Url::parse(uri).map_err(OtpError::UriParseError)?;

    if uri.scheme() != OTPAUTH_SCHEME {
        return Err(OtpError::InvalidUriScheme(uri.scheme().into()));
    }

    let otp_type = uri.host_str();
    if otp_type.is_none() || otp_type.is_some_and(|d| !d.eq_ignore_ascii_case(TOTP_TYPE)) {
        return Err(OtpError::InvalidUriType(
            otp_type.unwrap_or("None").into(),
            TOTP_TYPE.into(),
        ));
    }

    let mut secret = "".to_string();
    let mut issuer = None;
    let mut config = Config::default();

    for params in uri.query_pairs() {
        match params.0 {
            Cow::Borrowed(URI_SECRET_QUERY) => secret = params.1.to_string(),
            Cow::Borrowed(URI_ISSUER_QUERY) => issuer = Some(params.1.to_string()),
            Cow::Borrowed(URI_HASH_QUERY) => {
                config.algorithm = OtpHashAlgorithm::from_str(params.1.as_ref())?
            }
            Cow::Borrowed(URI_PERIOD_QUERY) => {
                config.period = u64::from_str(params.1.as_ref())
                    .map_err(|e| OtpError::IntegerParseError(e, URI_PERIOD_QUERY.into()))?
            }
            Cow::Borrowed(URI_DIGITS_QUERY) => {
                config.digits = u32::from_str(params.1.as_ref())
                    .map_err(|e| OtpError::IntegerParseError(e, URI_DIGITS_QUERY.into()))?
            }
            _ => (),
        }
    }

    if secret.is_empty() {
        return Err(OtpError::UriMissingSecret);
    }

    let path = uri.path();
    let label = path.strip_prefix('/').unwrap_or(path);
    let label = percent_decode_str(label).decode_utf8_lossy();

    // An issuer may itself contain ':', so prefer stripping the known one
    let known_prefix = issuer
        .as_deref()
        .and_then(|i| label.strip_prefix(i)?.strip_prefix(':'));

    let (label_issuer, account_name) = match (known_prefix, label.split_once(':')) {
        (Some(account), _) => (None, account),
        (None, Some((issuer, account))) => (Some(issuer.trim()), account.trim()),
        (None, None) => (None, label.trim()),
    };

    let issuer = issuer
        .or_else(|| label_issuer.map(ToOwned::to_owned))
        .unwrap_or_default();

    debug!(
        algorithm = %config.algorithm,
        digits = config.digits,
        period = config.period,
        "parsed provisioning uri"
    );

    Ok(Account {
        secret,
        issuer,
        account_name: account_name.to_owned(),
        config,
    })
}
