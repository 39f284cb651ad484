//! Version range parsing and release selection.
//!
//! Ranges follow the loose npm-style syntax component manifests use
//! (`1.x`, `~1.2.0`, `1.0.0 - 2.0.0`, `>=1.0.0 <2.0.0`, `1.x || 2.x`, `*`).
//! Anything that is not a
//! semver range is treated as a literal git ref (a tag or branch name).

use semver::{Version, VersionReq};
use std::fmt;

/// A parsed version range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    /// A semver requirement matched against tag names.
    Semver(VersionReq),
    /// `||` alternatives; a version matches if any requirement does.
    AnyOf(Vec<VersionReq>),
    /// A literal ref such as `master` or `some-tag`.
    Ref(String),
}

impl VersionRange {
    /// Parse a range. Never fails: unparseable input becomes a `Ref`.
    pub fn parse(input: &str) -> Self {
        let alternatives: Option<Vec<VersionReq>> = input
            .split("||")
            .map(|alt| VersionReq::parse(&normalize_range(alt)).ok())
            .collect();

        match alternatives {
            Some(mut reqs) if reqs.len() == 1 => VersionRange::Semver(reqs.remove(0)),
            Some(reqs) => VersionRange::AnyOf(reqs),
            None => VersionRange::Ref(input.trim().to_string()),
        }
    }

    /// Whether this range accepts any version.
    pub fn is_any(&self) -> bool {
        match self {
            VersionRange::Semver(req) => *req == VersionReq::STAR,
            VersionRange::AnyOf(reqs) => reqs.iter().any(|req| *req == VersionReq::STAR),
            VersionRange::Ref(_) => false,
        }
    }

    fn matches(&self, version: &Version) -> bool {
        match self {
            VersionRange::Semver(req) => req.matches(version),
            VersionRange::AnyOf(reqs) => reqs.iter().any(|req| req.matches(version)),
            VersionRange::Ref(_) => false,
        }
    }

    /// Pick the tag that best satisfies this range.
    ///
    /// For semver ranges this is the highest matching version; tags that
    /// don't parse as versions are ignored. For refs it is an exact match.
    pub fn best_match<'a, I>(&self, tags: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        match self {
            VersionRange::Semver(_) | VersionRange::AnyOf(_) => tags
                .into_iter()
                .filter_map(|tag| parse_tag(tag).map(|v| (v, tag)))
                .filter(|(v, _)| self.matches(v))
                .max_by(|(a, _), (b, _)| a.cmp(b))
                .map(|(_, tag)| tag),
            VersionRange::Ref(name) => tags.into_iter().find(|tag| *tag == name.as_str()),
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRange::Semver(req) => req.fmt(f),
            VersionRange::AnyOf(reqs) => {
                for (i, req) in reqs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" || ")?;
                    }
                    req.fmt(f)?;
                }
                Ok(())
            }
            VersionRange::Ref(name) => f.write_str(name),
        }
    }
}

/// Parse a tag name as a version, accepting a leading `v`.
pub fn parse_tag(tag: &str) -> Option<Version> {
    let trimmed = tag.strip_prefix('v').unwrap_or(tag);
    Version::parse(trimmed).ok()
}

/// Rewrite npm-style range syntax into something `semver` accepts.
fn normalize_range(input: &str) -> String {
    let trimmed = input.trim();

    if trimmed.is_empty() || trimmed == "*" || trimmed == "latest" {
        return "*".to_string();
    }

    if let Some((low, high)) = trimmed.split_once(" - ") {
        return format!(">={}, <={}", low.trim(), high.trim());
    }

    // Space separated comparators are ANDed, as with `,` in semver.
    // An operator may be split from its version (`>= 1.0.0`).
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();
    for token in trimmed.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        if pending_op.is_empty() {
            comparators.push(normalize_comparator(token));
        } else {
            comparators.push(format!("{}{}", pending_op, token));
            pending_op.clear();
        }
    }
    if !pending_op.is_empty() || comparators.is_empty() {
        return trimmed.to_string();
    }

    comparators.join(", ")
}

/// Rewrite a single comparator. Anything with an operator passes through.
fn normalize_comparator(token: &str) -> String {
    let bare = token.strip_prefix('v').unwrap_or(token);
    if !bare.starts_with(|c: char| c.is_ascii_digit()) {
        return token.to_string();
    }

    // Bare versions: npm treats `1.2.3` as exact and `1`, `1.2`, `1.x` as
    // wildcards, whereas semver would read them as caret requirements.
    let parts: Vec<&str> = bare.splitn(3, '.').collect();
    let is_wildcard = |p: &str| matches!(p, "x" | "X" | "*");
    if parts.iter().any(|p| is_wildcard(p)) || parts.len() < 3 {
        let mut fixed: Vec<&str> = parts
            .iter()
            .take_while(|p| !is_wildcard(p))
            .copied()
            .collect();
        fixed.push("*");
        return fixed.join(".");
    }

    format!("={}", bare)
}
