//! Input rules for signup and profile fields.

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;

/// Trimmed, lower-cased email used for storage and lookup.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Shape check only: one `@`, non-empty local part, dotted domain, no spaces.
pub fn validate_email(email: &str) -> Result<(), String> {
    let e = email.trim();
    let invalid = || Err("invalid email address".to_string());
    if e.is_empty() || e.chars().any(char::is_whitespace) {
        return invalid();
    }
    let Some((local, domain)) = e.split_once('@') else {
        return invalid();
    };
    if local.is_empty() || domain.contains('@') {
        return invalid();
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return invalid();
    }
    Ok(())
}

/// Counted in characters, not bytes, so Korean names are measured fairly.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().chars().count() < MIN_NAME_LEN {
        return Err(format!("name must be at least {MIN_NAME_LEN} characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(validate_email("fan@fanplace.local").is_ok());
        assert!(validate_email("a.b+c@mail.example.co.kr").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@fanplace.com").is_err());
        assert!(validate_email("fan@localhost").is_err());
        assert!(validate_email("fan@@x.com").is_err());
        assert!(validate_email("fan @x.com").is_err());
        assert!(validate_email("fan@x..com").is_err());
    }

    #[test]
    fn password_and_name_lengths_count_chars() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_name("윤").is_err());
        assert!(validate_name("윤아").is_ok());
        assert!(validate_name("  a ").is_err());
    }

    #[test]
    fn email_normalization() {
        assert_eq!(normalize_email("  Fan@FanPlace.Local "), "fan@fanplace.local");
    }
}
