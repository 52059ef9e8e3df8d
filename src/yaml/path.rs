// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 planflow contributors

//! YAML path segments
//!
//! A path is a `/`-separated list of segments. A segment is a mapping key or
//! a sequence index written as `3` or `[3]`. Whether a bare number is a key or
//! an index is decided by the node it is applied to.

use std::fmt;

/// One segment of a YAML path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    raw: String,
    index: Option<usize>,
}

impl PathSegment {
    fn parse(raw: &str) -> Self {
        let bracketed = raw
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .and_then(|s| s.parse::<usize>().ok());
        let index = bracketed.or_else(|| raw.parse::<usize>().ok());

        Self {
            raw: raw.to_string(),
            index,
        }
    }

    /// The segment as written, used as a mapping key
    pub fn key(&self) -> &str {
        &self.raw
    }

    /// The sequence index this segment denotes, if it looks like one
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}

/// Split a path into segments, ignoring empty parts
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    path.split('/')
        .filter(|part| !part.is_empty())
        .map(PathSegment::parse)
        .collect()
}

/// A segment after it has been resolved against a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Key(String),
    Index(usize),
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(k) => write!(f, "{}", k),
            Self::Index(i) => write!(f, "{}", i),
        }
    }
}

/// Render resolved segments as a canonical path (`/stages/0/steps/1`)
pub fn format_path(segments: &[Resolved]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(&segment.to_string());
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Construct kind of the position reached by `segments`
///
/// The last mapping key, singularised when the path ends on a sequence
/// element: `/stages/0` is a `stage`, `/stages/0/steps/2` is a `step`.
pub fn construct_kind(segments: &[Resolved]) -> String {
    match segments.last() {
        None => String::new(),
        Some(Resolved::Key(key)) => key.clone(),
        Some(Resolved::Index(_)) => segments
            .iter()
            .rev()
            .find_map(|s| match s {
                Resolved::Key(k) => Some(singular(k)),
                Resolved::Index(_) => None,
            })
            .unwrap_or_default(),
    }
}

fn singular(key: &str) -> String {
    match key.strip_suffix('s') {
        Some(stem) if !stem.is_empty() && !stem.ends_with('s') => stem.to_string(),
        _ => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_segments() {
        let segments = parse_path("/stages/[0]/steps/2/spec");
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[0].index(), None);
        assert_eq!(segments[1].index(), Some(0));
        assert_eq!(segments[3].index(), Some(2));
        assert_eq!(segments[4].key(), "spec");
    }

    #[test]
    fn test_parse_ignores_empty_parts() {
        assert_eq!(parse_path("stages//0/").len(), 2);
        assert!(parse_path("/").is_empty());
    }

    #[test]
    fn test_construct_kind() {
        let stage = vec![Resolved::Key("stages".into()), Resolved::Index(0)];
        assert_eq!(construct_kind(&stage), "stage");

        let pipeline = vec![Resolved::Key("pipeline".into())];
        assert_eq!(construct_kind(&pipeline), "pipeline");

        let branch = vec![Resolved::Key("parallel".into()), Resolved::Index(1)];
        assert_eq!(construct_kind(&branch), "parallel");

        assert_eq!(construct_kind(&[]), "");
    }

    #[test]
    fn test_format_path() {
        let segments = vec![
            Resolved::Key("stages".into()),
            Resolved::Index(0),
            Resolved::Key("steps".into()),
        ];
        assert_eq!(format_path(&segments), "/stages/0/steps");
        assert_eq!(format_path(&[]), "/");
    }
}
