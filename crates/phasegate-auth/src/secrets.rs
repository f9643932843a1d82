//! Secret strength assessment shared by the JWT and service secret checks.

use crate::policy::AuthPolicy;
use std::collections::HashSet;
use std::fmt;

/// Why a secret was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretIssue {
    Empty,
    /// On the placeholder deny-list
    Placeholder,
    TooShort { length: usize, minimum: usize },
    /// Drawn from a single character class, or too few distinct characters
    LowEntropy { classes: usize, distinct: usize },
}

impl fmt::Display for SecretIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("is empty"),
            Self::Placeholder => f.write_str("is a known placeholder value"),
            Self::TooShort { length, minimum } => {
                write!(f, "is too short ({length} characters, minimum {minimum})")
            }
            Self::LowEntropy { classes, distinct } => write!(
                f,
                "has low entropy ({classes} character class(es), {distinct} distinct characters)"
            ),
        }
    }
}

/// Character composition of an accepted secret
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretProfile {
    pub length: usize,
    pub classes: usize,
    pub distinct: usize,
    /// Entirely hexadecimal digits
    pub hex: bool,
}

/// Check `secret` against the deny-list, `minimum` length and entropy rules.
///
/// The deny-list is checked before length, so a placeholder is rejected
/// however long it is.
pub fn assess_secret(secret: &str, minimum: usize, policy: &AuthPolicy) -> Result<SecretProfile, SecretIssue> {
    let secret = secret.trim();
    if secret.is_empty() {
        return Err(SecretIssue::Empty);
    }
    if policy.is_placeholder(secret) {
        return Err(SecretIssue::Placeholder);
    }

    let length = secret.chars().count();
    if length < minimum {
        return Err(SecretIssue::TooShort { length, minimum });
    }

    let classes = [
        secret.chars().any(|c| c.is_ascii_lowercase()),
        secret.chars().any(|c| c.is_ascii_uppercase()),
        secret.chars().any(|c| c.is_ascii_digit()),
        secret.chars().any(|c| !c.is_ascii_alphanumeric()),
    ]
    .into_iter()
    .filter(|present| *present)
    .count();
    let distinct = secret.chars().collect::<HashSet<_>>().len();

    if classes < 2 || distinct < policy.min_distinct_chars {
        return Err(SecretIssue::LowEntropy { classes, distinct });
    }

    Ok(SecretProfile {
        length,
        classes,
        distinct,
        hex: secret.chars().all(|c| c.is_ascii_hexdigit()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn policy() -> AuthPolicy {
        AuthPolicy::default()
    }

    #[test]
    fn accepts_hex_and_mixed() {
        let hex = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";
        let profile = assess_secret(hex, 64, &policy()).unwrap();
        assert!(profile.hex);
        assert_eq!(profile.length, 64);

        let mixed = "k8Jf2nQ7vR4xT1wZ9bL6mC3pH5sD0gYa";
        assert_eq!(assess_secret(mixed, 32, &policy()).unwrap().classes, 3);
    }

    #[test]
    fn rejects_weak_secrets() {
        let p = policy();
        assert_eq!(assess_secret("  ", 32, &p), Err(SecretIssue::Empty));
        assert_eq!(
            assess_secret("abcDEF123456", 32, &p),
            Err(SecretIssue::TooShort {
                length: 12,
                minimum: 32
            })
        );
        assert!(matches!(
            assess_secret(&"a".repeat(40), 32, &p),
            Err(SecretIssue::LowEntropy { classes: 1, distinct: 1 })
        ));
        assert!(matches!(
            assess_secret(&"abcdefghij".repeat(4), 32, &p),
            Err(SecretIssue::LowEntropy { classes: 1, .. })
        ));
        assert!(matches!(
            assess_secret(&"ab12".repeat(10), 32, &p),
            Err(SecretIssue::LowEntropy { distinct: 4, .. })
        ));
    }

    proptest! {
        #[test]
        fn placeholders_rejected_at_any_padding(
            index in 0usize..18,
            left in 0usize..8,
            right in 0usize..8,
        ) {
            let p = policy();
            let placeholder = &p.placeholder_secrets[index % p.placeholder_secrets.len()];
            let padded = format!("{}{}{}", " ".repeat(left), placeholder.to_uppercase(), " ".repeat(right));
            prop_assert_eq!(assess_secret(&padded, 0, &p), Err(SecretIssue::Placeholder));
        }
    }
}
