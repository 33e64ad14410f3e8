//! Channel paths and their validation.
//!
//! A [`Route`] is a channel path that has passed validation. Paths are
//! `/`-separated segments; each segment is drawn from ASCII alphanumerics and
//! the mark characters `- _ ! ~ ( ) $ @ .`. The final segment may instead be a
//! single-level (`*`) or deep (`**`) wildcard.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

use super::META_PREFIX;

/// Single-level wildcard segment
pub const WILD: &str = "*";

/// Multi-level wildcard segment
pub const DEEP_WILD: &str = "**";

lazy_static! {
    static ref SEGMENT_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9\-_!~()$@.]+$").expect("segment pattern compiles");

    /// Route of the handshake meta command
    pub static ref HANDSHAKE_ROUTE: Route = Route::trusted("/meta/handshake");
    /// Route of the connect meta command
    pub static ref CONNECT_ROUTE: Route = Route::trusted("/meta/connect");
    /// Route of the disconnect meta command
    pub static ref DISCONNECT_ROUTE: Route = Route::trusted("/meta/disconnect");
    /// Route of the subscribe meta command
    pub static ref SUBSCRIBE_ROUTE: Route = Route::trusted("/meta/subscribe");
    /// Route of the unsubscribe meta command
    pub static ref UNSUBSCRIBE_ROUTE: Route = Route::trusted("/meta/unsubscribe");
}

/// Reasons a channel path is rejected.
///
/// The `Display` text is echoed verbatim in the `error` field of responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Path is empty or does not begin with `/`.
    #[error("Channel path must start with '/'")]
    MissingLeadingSlash,

    /// Two consecutive slashes, or a trailing slash.
    #[error("Channel path contains an empty segment")]
    EmptySegment,

    /// A segment with characters outside the allowed set.
    #[error("Channel path contains an invalid segment '{0}'")]
    InvalidSegment(String),

    /// A wildcard anywhere but the final segment.
    #[error("Wildcards are only allowed as the final segment")]
    MisplacedWildcard,
}

/// A validated channel path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    path: String,
    segments: Vec<String>,
}

impl Route {
    /// Parse and validate a channel path.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let Some(rest) = path.strip_prefix('/') else {
            return Err(PathError::MissingLeadingSlash);
        };

        let segments: Vec<&str> = rest.split('/').collect();
        let last = segments.len() - 1;

        for (index, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(PathError::EmptySegment);
            }

            if *segment == WILD || *segment == DEEP_WILD {
                if index != last {
                    return Err(PathError::MisplacedWildcard);
                }
            } else if !SEGMENT_REGEX.is_match(segment) {
                return Err(PathError::InvalidSegment((*segment).to_string()));
            }
        }

        Ok(Self {
            path: path.to_string(),
            segments: segments.into_iter().map(str::to_string).collect(),
        })
    }

    // Only for the compile-time meta paths above.
    fn trusted(path: &str) -> Self {
        Self {
            path: path.to_string(),
            segments: path
                .trim_start_matches('/')
                .split('/')
                .map(str::to_string)
                .collect(),
        }
    }

    /// Full path string
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path segments, without separators
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; a valid route has at least one segment
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this is a `/meta/` route
    pub fn is_meta(&self) -> bool {
        self.path.starts_with(META_PREFIX)
    }

    /// Whether the final segment is `*`
    pub fn is_wild(&self) -> bool {
        self.segments.last().is_some_and(|s| s == WILD)
    }

    /// Whether the final segment is `**`
    pub fn is_deep_wild(&self) -> bool {
        self.segments.last().is_some_and(|s| s == DEEP_WILD)
    }

    /// Whether a publish on `target` reaches subscribers of this route.
    ///
    /// `*` matches exactly one trailing segment, `**` one or more.
    pub fn matches(&self, target: &Route) -> bool {
        let prefix = &self.segments[..self.segments.len() - 1];

        if self.is_deep_wild() {
            target.segments.len() > prefix.len() && target.segments.starts_with(prefix)
        } else if self.is_wild() {
            target.segments.len() == self.segments.len() && target.segments.starts_with(prefix)
        } else {
            self.path == target.path
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl std::str::FromStr for Route {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
