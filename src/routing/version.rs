//! Protocol version negotiation.
//!
//! # Responsibilities
//! - Parse `major.minor` version tokens
//! - Hold the immutable set of versions this instance supports
//! - Pick the effective version of a request
//!
//! # Design Decisions
//! - No token → latest supported version
//! - A token must be an exact member of the set; no downgrade, no fuzzy match
//! - Only canonical tokens parse (`3.0`, never `3.00` or `03.0`)

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// Header carrying the client's requested version.
pub const VERSION_HEADER: &str = "cdi-version";

/// Version negotiation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The client asked for a version this instance does not serve.
    #[error("cdi-version {0} not supported")]
    Unsupported(String),

    #[error("malformed version '{0}'")]
    Malformed(String),

    #[error("supported version set is empty")]
    EmptySet,
}

/// A `major.minor` protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    major: u32,
    minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a canonical `major.minor` token.
    pub fn parse(token: &str) -> Option<Self> {
        let (major, minor) = token.split_once('.')?;
        Some(Self {
            major: parse_component(major)?,
            minor: parse_component(minor)?,
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }
}

fn parse_component(part: &str) -> Option<u32> {
    let canonical = !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && (part == "0" || !part.starts_with('0'));
    if canonical {
        part.parse().ok()
    } else {
        None
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Ordered, non-empty set of supported versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSet {
    versions: BTreeSet<ApiVersion>,
}

impl VersionSet {
    pub fn new(versions: impl IntoIterator<Item = ApiVersion>) -> Result<Self, VersionError> {
        let versions: BTreeSet<_> = versions.into_iter().collect();
        if versions.is_empty() {
            return Err(VersionError::EmptySet);
        }
        Ok(Self { versions })
    }

    /// Build from configuration tokens.
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, VersionError> {
        let versions = tokens
            .iter()
            .map(|token| {
                let token = token.as_ref();
                ApiVersion::parse(token).ok_or_else(|| VersionError::Malformed(token.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(versions)
    }

    /// Highest supported version.
    pub fn latest(&self) -> ApiVersion {
        // non-empty by construction
        *self.versions.iter().next_back().unwrap_or(&ApiVersion::new(0, 0))
    }

    pub fn contains(&self, version: &ApiVersion) -> bool {
        self.versions.contains(version)
    }

    /// Versions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &ApiVersion> {
        self.versions.iter()
    }

    /// Effective version for a request.
    pub fn negotiate(&self, requested: Option<&str>) -> Result<ApiVersion, VersionError> {
        let Some(token) = requested else {
            return Ok(self.latest());
        };
        ApiVersion::parse(token)
            .filter(|version| self.contains(version))
            .ok_or_else(|| VersionError::Unsupported(token.to_string()))
    }
}
