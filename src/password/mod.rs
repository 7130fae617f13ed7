//! Password policy.
//!
//! At least 8 characters, one uppercase letter, one decimal digit and one
//! character that is neither a letter nor a digit. Checked locally before a
//! reset or change is submitted.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::RequestError;

/// Minimum password length, in characters.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Which requirements a password meets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PasswordPolicyStatus {
    pub length: bool,
    pub uppercase: bool,
    pub digit: bool,
    pub special: bool,
}

impl PasswordPolicyStatus {
    pub fn is_satisfied(&self) -> bool {
        self.length && self.uppercase && self.digit && self.special
    }

    /// Labels of the unmet requirements, as shown in the checklist.
    pub fn unmet(&self) -> Vec<String> {
        [
            (self.length, "8 caracteres"),
            (self.uppercase, "1 mayúscula"),
            (self.digit, "1 dígito"),
            (self.special, "1 carácter especial"),
        ]
        .into_iter()
        .filter(|(met, _)| !met)
        .map(|(_, label)| label.to_string())
        .collect()
    }
}

static UPPERCASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Lu}").expect("valid pattern"));
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{Nd}").expect("valid pattern"));
static SPECIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{Nd}]").expect("valid pattern"));

/// Evaluate each requirement.
pub fn evaluate_password_policy(password: &str) -> PasswordPolicyStatus {
    PasswordPolicyStatus {
        length: password.chars().count() >= MIN_PASSWORD_LENGTH,
        uppercase: UPPERCASE.is_match(password),
        digit: DIGIT.is_match(password),
        special: SPECIAL.is_match(password),
    }
}

/// Reject a password that misses any requirement.
pub fn check_password_policy(password: &str) -> Result<(), RequestError> {
    let status = evaluate_password_policy(password);
    if status.is_satisfied() {
        Ok(())
    } else {
        Err(RequestError::WeakPassword {
            unmet: status.unmet(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_password_passes() {
        assert!(check_password_policy("Southbay#2024").is_ok());
        assert!(check_password_policy("Ñandú-123").is_ok());
    }

    #[test]
    fn test_each_requirement_is_reported() {
        let status = evaluate_password_policy("abc");
        assert_eq!(
            status.unmet(),
            vec!["8 caracteres", "1 mayúscula", "1 dígito", "1 carácter especial"]
        );

        let status = evaluate_password_policy("Abcdefgh1");
        assert_eq!(status.unmet(), vec!["1 carácter especial"]);
    }

    #[test]
    fn test_weak_password_message() {
        let error = check_password_policy("password").unwrap_err();
        assert_eq!(
            error.to_string(),
            "La contraseña no cumple la política: 1 mayúscula, 1 dígito, 1 carácter especial"
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        assert!(!evaluate_password_policy("Ñ1-ñññ").length);
        assert!(evaluate_password_policy("Ñ1-ñññññ").length);
    }

    #[test]
    fn test_unicode_classes_are_honoured() {
        let status = evaluate_password_policy("ÉCOLE٣ ");
        assert!(status.uppercase);
        assert!(status.digit);
        assert!(status.special);

        let status = evaluate_password_policy("école");
        assert!(!status.uppercase && !status.digit && !status.special);
    }
}
