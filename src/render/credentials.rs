//! Base-map access tokens, resolved when a map is rendered.

use std::{fmt, io, path::PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Environment variable read by the default credential chain.
pub const DEFAULT_TOKEN_ENV: &str = "MAPBOX_ACCESS_TOKEN";

/// Token file read by the default credential chain.
pub const DEFAULT_TOKEN_FILE: &str = ".mapbox_token";

/// Somewhere an access token can be fetched from.
///
/// Sources are queried lazily: nothing is read until a figure is rendered.
/// A source that has no token returns `Error::Authentication`.
pub trait CredentialSource: fmt::Debug {
    fn token(&self) -> Result<String>;
}

/// Trim `raw` and reject empty tokens or tokens with inner whitespace.
fn validate(raw: &str, origin: &dyn fmt::Display) -> Result<String> {
    let token = raw.trim();
    if token.is_empty() {
        return Err(Error::Authentication(format!("{origin} is empty")));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(Error::Authentication(format!("{origin} is malformed (contains whitespace)")));
    }
    Ok(token.to_string())
}

/// Token held in an environment variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self { Self { var: var.into() } }
}

impl Default for EnvToken {
    fn default() -> Self { Self::new(DEFAULT_TOKEN_ENV) }
}

impl CredentialSource for EnvToken {
    fn token(&self) -> Result<String> {
        let raw = std::env::var(&self.var)
            .map_err(|_| Error::Authentication(format!("environment variable {} is not set", self.var)))?;
        validate(&raw, &format_args!("environment variable {}", self.var))
    }
}

/// Token stored as the contents of a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileToken {
    path: PathBuf,
}

impl FileToken {
    pub fn new(path: impl Into<PathBuf>) -> Self { Self { path: path.into() } }
}

impl CredentialSource for FileToken {
    fn token(&self) -> Result<String> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::Authentication(format!("token file {} does not exist", self.path.display())));
            }
            Err(e) => return Err(Error::unreadable(&self.path, e)),
        };
        validate(&raw, &format_args!("token file {}", self.path.display()))
    }
}

/// A token given directly, e.g. from a config file.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self { Self(token.into()) }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(..)")
    }
}

impl CredentialSource for StaticToken {
    fn token(&self) -> Result<String> {
        validate(&self.0, &"configured token")
    }
}

/// Ordered list of sources; the first one that yields a token wins.
///
/// Authentication failures move on to the next source. Any other error
/// (an unreadable token file, say) stops the search.
#[derive(Debug, Default)]
pub struct CredentialChain {
    sources: Vec<Box<dyn CredentialSource>>,
}

impl CredentialChain {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, source: impl CredentialSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    #[inline] pub fn len(&self) -> usize { self.sources.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.sources.is_empty() }
}

impl CredentialSource for CredentialChain {
    fn token(&self) -> Result<String> {
        let mut reasons = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            match source.token() {
                Ok(token) => {
                    debug!("[render::credentials] using token from {source:?}");
                    return Ok(token);
                }
                Err(Error::Authentication(reason)) => reasons.push(reason),
                Err(e) => return Err(e),
            }
        }
        if reasons.is_empty() {
            return Err(Error::Authentication("no credential source configured".into()));
        }
        Err(Error::Authentication(reasons.join("; ")))
    }
}
