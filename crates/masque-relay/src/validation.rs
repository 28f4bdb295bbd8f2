//! Nickname content policy.

/// Decides whether a proposed nickname may be stored.
///
/// `Err` carries the message shown to the user verbatim.
pub trait NicknameValidator: Send + Sync {
    fn validate(&self, text: &str) -> Result<(), String>;
}

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 20;

/// Terms nobody may wear as a nickname. Matched case-insensitively as
/// substrings.
const RESTRICTED: &[&str] = &[
    // staff and system roles
    "admin", "moderator", "support", "system", "staff", "official", "operator", "root",
    "server", "superuser", "owner", "developer", "webmaster",
    // status impersonation
    "vip", "premium", "verified", "certified",
    // commands
    "sudo", "bash", "script", "database", "debug", "shutdown", "reboot", "delete", "config",
    // abuse
    "curse", "hate", "abuse", "insult", "suicide", "cocaine",
    // officials
    "president", "minister", "government", "parliament", "police", "army", "military",
    "embassy", "ambassador",
];

/// Length 3..=20 characters, no leading `/` or symbol, no restricted term.
#[derive(Debug, Clone, Default)]
pub struct DefaultNicknamePolicy;

impl NicknameValidator for DefaultNicknamePolicy {
    fn validate(&self, text: &str) -> Result<(), String> {
        let len = text.chars().count();
        if !(MIN_LEN..=MAX_LEN).contains(&len) {
            return Err(format!(
                "A nickname must be between {MIN_LEN} and {MAX_LEN} characters."
            ));
        }
        if text.starts_with('/') {
            return Err("A nickname can't start with '/'.".into());
        }
        if text
            .chars()
            .next()
            .is_some_and(|c| !(c.is_alphanumeric() || c == '_'))
        {
            return Err("A nickname can't start with a symbol.".into());
        }
        let lower = text.to_lowercase();
        if RESTRICTED.iter().any(|word| lower.contains(word)) {
            return Err("That nickname contains a restricted word.".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_ordinary_names() {
        let policy = DefaultNicknamePolicy;
        assert!(policy.validate("Rose").is_ok());
        assert!(policy.validate("night_owl 42").is_ok());
        assert!(policy.validate("Мария").is_ok());
    }

    #[test]
    fn test_rejections() {
        let policy = DefaultNicknamePolicy;
        assert!(policy.validate("ab").is_err());
        assert!(policy.validate(&"x".repeat(21)).is_err());
        assert!(policy.validate("/start").is_err());
        assert!(policy.validate("#tag").is_err());
        assert!(policy.validate("TheAdmin").is_err());
        assert!(policy.validate("support_desk").is_err());
    }
}
