//! Authorized-key set logic: parsing, normalization, and diffing.
//!
//! Pure functions only. The remote side of reconciliation lives in
//! `application::services::reconcile`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Key algorithms accepted in an authorized_keys line.
pub const KEY_TYPES: &[&str] = &[
    "ssh-ed25519",
    "ssh-rsa",
    "ssh-dss",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
    "sk-ssh-ed25519@openssh.com",
    "sk-ecdsa-sha2-nistp256@openssh.com",
];

// ── AuthorizedKey ─────────────────────────────────────────────────────────────

/// One public key line: `<type> <base64> [comment]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedKey {
    pub kind: String,
    pub material: String,
    pub comment: Option<String>,
}

impl FromStr for AuthorizedKey {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let kind = parts.next().ok_or("empty line")?;
        if !KEY_TYPES.contains(&kind) {
            return Err(format!("unknown key type '{kind}'"));
        }
        let material = parts.next().ok_or("missing key material")?;
        if !material
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '='))
        {
            return Err("key material is not base64".to_string());
        }
        let comment: Vec<&str> = parts.collect();
        Ok(Self {
            kind: kind.to_string(),
            material: material.to_string(),
            comment: (!comment.is_empty()).then(|| comment.join(" ")),
        })
    }
}

impl fmt::Display for AuthorizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.material)?;
        if let Some(comment) = &self.comment {
            write!(f, " {comment}")?;
        }
        Ok(())
    }
}

/// Parse an authorized_keys document into normalized key strings.
///
/// Blank lines and `#` comments are dropped. Lines that do not parse are
/// returned separately so the caller can report them.
#[must_use]
pub fn parse_key_document(body: &str) -> (Vec<String>, Vec<(usize, String)>) {
    let mut keys = Vec::new();
    let mut rejected = Vec::new();
    for (idx, line) in body.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.parse::<AuthorizedKey>() {
            Ok(key) => keys.push(key.to_string()),
            Err(reason) => rejected.push((idx + 1, reason)),
        }
    }
    (keys, rejected)
}

// ── KeySet ────────────────────────────────────────────────────────────────────

/// Desired authorized keys: duplicate-free and lexicographically sorted.
///
/// The same ordering is used for comparison and as the exact file content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeySet {
    keys: Vec<String>,
}

impl KeySet {
    /// Deduplicate (first occurrence wins) and sort.
    pub fn from_desired<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut keys: Vec<String> = keys
            .into_iter()
            .map(Into::into)
            .filter(|k| seen.insert(k.clone()))
            .collect();
        keys.sort();
        Self { keys }
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// `true` unless `current` matches element by element.
    #[must_use]
    pub fn differs_from(&self, current: &[String]) -> bool {
        current.len() != self.keys.len() || current.iter().zip(&self.keys).any(|(a, b)| a != b)
    }

    /// File content: newline-joined, no trailing blank line.
    #[must_use]
    pub fn render(&self) -> String {
        self.keys.join("\n")
    }
}

/// Split the current authorized_keys content into lines.
///
/// Surrounding newlines are trimmed; an empty file yields no lines.
#[must_use]
pub fn parse_current(content: &str) -> Vec<String> {
    let trimmed = content.trim_matches(|c| c == '\n' || c == '\r');
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split('\n')
        .map(|l| l.trim_end_matches('\r').to_string())
        .collect()
}
