use crate::error::{AppError, Result};

/// Characters accepted as the "special" class of a password.
const PASSWORD_SPECIALS: &str = "@$!%*?&";

/// Validates a username.
///
/// Usernames are made of ASCII letters and digits and must contain at least
/// one of each.
pub fn validate_username(username: &str) -> Result<()> {
    if username.len() < 3 {
        return Err(AppError::Validation(
            "Username must be at least 3 characters long".to_string(),
        ));
    }

    if username.len() > 255 {
        return Err(AppError::Validation(
            "Username must be at most 255 characters".to_string(),
        ));
    }

    if !username.chars().all(|c| c.is_ascii_alphanumeric())
        || !username.chars().any(|c| c.is_ascii_alphabetic())
        || !username.chars().any(|c| c.is_ascii_digit())
    {
        return Err(AppError::Validation(
            "Username must be made of letters and numbers".to_string(),
        ));
    }

    Ok(())
}

/// Validates a password.
///
/// At least 8 characters with a lowercase letter, an uppercase letter, a
/// digit and one of `@$!%*?&`.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be at most 128 characters".to_string(),
        ));
    }

    let allowed = password
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(c));
    let complete = password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if !allowed || !complete {
        return Err(AppError::Validation(
            "Password needs an uppercase letter, a lowercase letter, a number and one of @$!%*?&"
                .to_string(),
        ));
    }

    Ok(())
}

pub fn validate_password_confirmation(password: &str, confirmation: &str) -> Result<()> {
    if password != confirmation {
        return Err(AppError::Validation(
            "Your password does not match".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_full_name(full_name: &str) -> Result<()> {
    let trimmed = full_name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Full name cannot be empty".to_string()));
    }
    if trimmed.len() > 255 {
        return Err(AppError::Validation(
            "Full name must be at most 255 characters".to_string(),
        ));
    }
    Ok(())
}

/// Digits only, with an optional leading `+`.
pub fn validate_telephone(telephone: &str) -> Result<()> {
    let digits = telephone.strip_prefix('+').unwrap_or(telephone);
    if digits.len() < 3 || digits.len() > 20 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Telephone must be a phone number".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    let invalid = || AppError::Validation("Your email is invalid".to_string());

    if email.len() > 255 || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(invalid());
    }
    Ok(())
}

/// Login only checks presence; the credential check does the rest.
pub fn validate_login(username: &str, password: &str) -> Result<()> {
    if username.is_empty() {
        return Err(AppError::Validation("Enter your username".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Enter your password".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("band42").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("onlyletters").is_err());
        assert!(validate_username("12345").is_err());
        assert!(validate_username("with_underscore1").is_err());
        assert!(validate_username("a1' OR '1'='1").is_err());
    }

    #[test]
    fn passwords() {
        assert!(validate_password("Str0ng!pw").is_ok());
        assert!(validate_password("Sh0rt!").is_err());
        assert!(validate_password("alllower1!").is_err());
        assert!(validate_password("NoDigits!!").is_err());
        assert!(validate_password("NoSpecial123").is_err());
        assert!(validate_password("Bad#Char123!").is_err());
    }

    #[test]
    fn confirmation() {
        assert!(validate_password_confirmation("Str0ng!pw", "Str0ng!pw").is_ok());
        assert!(validate_password_confirmation("Str0ng!pw", "Str0ng!pW").is_err());
    }

    #[test]
    fn contact_fields() {
        assert!(validate_telephone("081234567").is_ok());
        assert!(validate_telephone("+6281234567").is_ok());
        assert!(validate_telephone("call me").is_err());
        assert!(validate_email("a@b.co").is_ok());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("@b.co").is_err());
        assert!(validate_email("a b@c.co").is_err());
        assert!(validate_full_name("  ").is_err());
        assert!(validate_full_name("Freddie").is_ok());
    }
}
