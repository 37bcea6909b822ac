/// Maximum stored length of a display name.
pub const NAME_MAX_LENGTH: usize = 20;

/// Strip every character outside [A-Za-z0-9] and bound the result. Over-long
/// names are truncated, not rejected; an empty result is the caller's problem.
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(NAME_MAX_LENGTH)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_whitespace() {
        assert_eq!(sanitize_name(" al ex "), "alex");
    }

    #[test]
    fn test_sanitize_strips_punctuation() {
        assert_eq!(sanitize_name("45spoons."), "45spoons");
        assert_eq!(sanitize_name("al-ex"), "alex");
        assert_eq!(sanitize_name("al!ex"), "alex");
        assert_eq!(sanitize_name("a_l/e\\x"), "alex");
    }

    #[test]
    fn test_sanitize_truncates_long_names() {
        let long = "a".repeat(NAME_MAX_LENGTH + 5);
        assert_eq!(sanitize_name(&long), "a".repeat(NAME_MAX_LENGTH));
    }

    #[test]
    fn test_sanitize_truncates_after_stripping() {
        let name = format!("--{}--", "b".repeat(NAME_MAX_LENGTH + 3));
        assert_eq!(sanitize_name(&name), "b".repeat(NAME_MAX_LENGTH));
    }

    #[test]
    fn test_sanitize_can_empty_a_name() {
        assert_eq!(sanitize_name("!!! ???"), "");
        assert_eq!(sanitize_name(""), "");
    }
}
