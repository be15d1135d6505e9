//! Property-based tests for key-set normalization and elevation quoting.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use proptest::prelude::*;

use rpi_provisioner::domain::keys::{KeySet, parse_current};
use rpi_provisioner::domain::privilege::elevate;
use rpi_provisioner::domain::secret::{Secret, redact};

fn key_line() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["ssh-ed25519", "ssh-rsa", "ecdsa-sha2-nistp256"]),
        "[A-Za-z0-9+/]{16,40}",
        "[a-z]{1,8}@[a-z]{1,8}",
    )
        .prop_map(|(kind, material, comment)| format!("{kind} {material} {comment}"))
}

// ============================================================================
// KeySet normalization
// ============================================================================

proptest! {
    /// Normalized keys are sorted and unique.
    #[test]
    fn prop_key_set_sorted_and_unique(keys in prop::collection::vec(key_line(), 0..12)) {
        let set = KeySet::from_desired(keys.iter().cloned());
        let out = set.keys();
        prop_assert!(out.windows(2).all(|w| w[0] < w[1]), "not strictly sorted: {:?}", out);
        for key in &keys {
            prop_assert!(out.contains(key));
        }
    }

    /// Order and duplicates in the input never change the result.
    #[test]
    fn prop_key_set_ignores_order_and_duplicates(keys in prop::collection::vec(key_line(), 1..10)) {
        let mut shuffled: Vec<String> = keys.iter().rev().cloned().collect();
        shuffled.extend(keys.iter().cloned());
        prop_assert_eq!(
            KeySet::from_desired(keys.iter().cloned()),
            KeySet::from_desired(shuffled)
        );
    }

    /// Rendered content read back from disk compares equal, so a second
    /// reconciliation never rewrites the file.
    #[test]
    fn prop_rendered_keys_read_back_unchanged(keys in prop::collection::vec(key_line(), 1..10)) {
        let set = KeySet::from_desired(keys);
        let on_disk = format!("{}\n", set.render());
        prop_assert!(!set.differs_from(&parse_current(&on_disk)));
    }

    /// Dropping any key is always detected.
    #[test]
    fn prop_missing_key_detected(keys in prop::collection::vec(key_line(), 2..10)) {
        let set = KeySet::from_desired(keys);
        let current: Vec<String> = set.keys()[1..].to_vec();
        prop_assert!(set.differs_from(&current));
    }
}

// ============================================================================
// Elevation quoting
// ============================================================================

/// Undo POSIX single-quote escaping of one word as produced for `bash -c`.
fn unquote(word: &str) -> String {
    if !word.starts_with('\'') {
        return word.to_string();
    }
    let mut out = String::new();
    let mut quoted = false;
    let mut chars = word.chars();
    while let Some(c) = chars.next() {
        match c {
            '\'' => quoted = !quoted,
            '\\' if !quoted => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

proptest! {
    /// The inner command survives quoting byte for byte.
    #[test]
    fn prop_elevated_command_round_trips(command in "[ -~]{1,60}", password in "[a-zA-Z0-9!'$ ]{0,20}") {
        let text = elevate(&command, &Secret::new(password));
        let (_, inner) = text.split_once(" bash -c ").expect("bash -c present");
        prop_assert_eq!(unquote(inner), command);
    }

    /// Whatever the password, the sudo pipeline is intact.
    #[test]
    fn prop_password_cannot_break_out(password in "[ -~]{0,30}") {
        let text = elevate("whoami", &Secret::new(password.clone()));
        let (feed, rest) = text.split_once(" | sudo -S -p '' bash -c ").expect("pipeline");
        prop_assert_eq!(rest, "whoami");
        let quoted = feed.strip_prefix("printf '%s\\n' ").expect("printf prefix");
        prop_assert_eq!(unquote(quoted), password);
    }

    /// Redaction removes every occurrence of a non-empty secret.
    #[test]
    fn prop_redact_hides_secret(secret in "[a-zA-Z0-9!$]{4,20}", prefix in "[a-z ]{0,10}") {
        let text = format!("{prefix}{secret} and again {secret}");
        let redacted = redact(&text, &[Secret::new(secret.clone())]);
        prop_assert!(!redacted.contains(&secret));
    }
}
