/// Flattens converted resume text into a single line of plain tokens.
///
/// Anything outside ASCII alphanumerics and `@+./` becomes a space, line
/// breaks included, which keeps e-mail addresses, phone numbers and URLs
/// intact and apart from their neighbours.
pub fn clean_resume_text(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() => c,
            '@' | '+' | '.' | '/' => c,
            _ => ' ',
        })
        .collect()
}
