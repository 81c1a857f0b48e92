//! Channel URI parsing
//!
//! SSH clients pick an opaque type name when opening a channel. Hawser
//! interprets that name as a request URI:
//!
//! ```text
//! /echo
//! /repos/eliquious/hawser/issues/1/comments
//! /logs/tail?follow=true&lines=50
//! ```
//!
//! Absolute forms (`scheme://user@host/path`) parse but are refused by the
//! dispatcher: only the path and query components are meaningful to routing.

use crate::{Error, Result};

/// A parsed channel-type URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelUri {
    /// URI scheme, when the channel type is in absolute form
    pub scheme: Option<String>,
    /// User-info component of the authority, when present
    pub user_info: Option<String>,
    /// Host component of the authority, when present
    pub host: Option<String>,
    /// Path component; the routing key
    pub path: String,
    /// Raw query string without the leading `?`; empty if absent
    pub query: String,
}

impl ChannelUri {
    /// Parse a channel type string as a request URI.
    ///
    /// Accepted forms:
    /// - origin form: `/path`, `/path?query`
    /// - a bare relative path: `shell` (no scheme, no leading slash)
    /// - the asterisk form: `*`
    /// - absolute form: `scheme://[user@]host[:port]/path[?query]`
    ///
    /// A colon before any valid scheme characters (`:/route`) is an error,
    /// as are control bytes anywhere in the input.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::EmptyChannelType);
        }
        if raw.bytes().any(|b| b < 0x20 || b == 0x7f) {
            return Err(Error::ControlCharacter);
        }
        if raw == "*" {
            return Ok(Self {
                path: "*".to_string(),
                ..Default::default()
            });
        }

        let (scheme, rest) = split_scheme(raw)?;
        let Some(scheme) = scheme else {
            let (path, query) = split_query(rest);
            return Ok(Self {
                path: path.to_string(),
                query: query.to_string(),
                ..Default::default()
            });
        };

        if let Some(rest) = rest.strip_prefix("//") {
            // authority form: [userinfo@]host[:port], then path and query
            let end = rest
                .find(|c| c == '/' || c == '?')
                .unwrap_or(rest.len());
            let (authority, tail) = rest.split_at(end);
            let (user_info, host) = match authority.rfind('@') {
                Some(at) => (Some(authority[..at].to_string()), &authority[at + 1..]),
                None => (None, authority),
            };
            let (path, query) = split_query(tail);
            Ok(Self {
                scheme: Some(scheme.to_string()),
                user_info,
                host: (!host.is_empty()).then(|| host.to_string()),
                path: path.to_string(),
                query: query.to_string(),
            })
        } else {
            // opaque form (`mailto:user`); the remainder stands in for the
            // path so the dispatcher can still report it
            let (path, query) = split_query(rest);
            Ok(Self {
                scheme: Some(scheme.to_string()),
                user_info: None,
                host: None,
                path: path.to_string(),
                query: query.to_string(),
            })
        }
    }
}

impl std::fmt::Display for ChannelUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}:", scheme)?;
            if self.user_info.is_some() || self.host.is_some() {
                write!(f, "//")?;
            }
            if let Some(user) = &self.user_info {
                write!(f, "{}@", user)?;
            }
            if let Some(host) = &self.host {
                write!(f, "{}", host)?;
            }
        }
        write!(f, "{}", self.path)?;
        if !self.query.is_empty() {
            write!(f, "?{}", self.query)?;
        }
        Ok(())
    }
}

/// Split an optional scheme prefix off a channel type string.
///
/// A scheme is `ALPHA *(ALPHA / DIGIT / "+" / "-" / ".")` followed by `:`.
/// A leading `:` is an error; anything else means the whole input is a path.
fn split_scheme(raw: &str) -> Result<(Option<&str>, &str)> {
    for (i, c) in raw.char_indices() {
        match c {
            'a'..='z' | 'A'..='Z' => {}
            '0'..='9' | '+' | '-' | '.' if i > 0 => {}
            ':' => {
                if i == 0 {
                    return Err(Error::MissingScheme);
                }
                return Ok((Some(&raw[..i]), &raw[i + 1..]));
            }
            _ => return Ok((None, raw)),
        }
    }
    Ok((None, raw))
}

fn split_query(s: &str) -> (&str, &str) {
    match s.find('?') {
        Some(i) => (&s[..i], &s[i + 1..]),
        None => (s, ""),
    }
}
