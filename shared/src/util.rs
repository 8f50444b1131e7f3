/// Canonical form of an email for membership comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}
