use crate::error::ZibError;
use std::path::Path;

pub const TITLE_MIN_LEN: usize = 3;
pub const TITLE_MAX_LEN: usize = 50;

pub fn normalize_title(title: &str) -> String {
    title.trim().to_string()
}

/// Filesystem-safe directory name for a title: spaces become `_`, everything
/// outside `[A-Za-z0-9_-]` is dropped, the rest is lowercased.
pub fn dir_name_for(title: &str) -> String {
    title
        .trim()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Checks a normalized title. Length is counted in bytes.
pub fn validate_title(title: &str) -> Result<(), ZibError> {
    let len = title.len();
    if !(TITLE_MIN_LEN..=TITLE_MAX_LEN).contains(&len) {
        return Err(ZibError::Validation(format!(
            "title must be between {TITLE_MIN_LEN} and {TITLE_MAX_LEN} bytes, got {len}"
        )));
    }
    if dir_name_for(title).is_empty() {
        return Err(ZibError::Validation(format!(
            "title `{title}` has no characters usable in a directory name"
        )));
    }
    Ok(())
}

/// Menu label derived from a manuscript filename: `01_the-beginning.md`
/// becomes `The beginning`.
pub fn guess_menu_label(full_filename: &str) -> String {
    let stem = Path::new(full_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(full_filename);

    let without_prefix = stem
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .trim_start_matches(['_', '-', ' ', '.']);
    let base = if without_prefix.is_empty() {
        stem
    } else {
        without_prefix
    };

    let spaced = base.replace(['_', '-'], " ");
    let words = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut chars = words.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => full_filename.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dir_name_strips_and_lowercases() {
        assert_eq!(dir_name_for("  My First Book! "), "my_first_book");
        assert_eq!(dir_name_for("Ça-va_bien 2"), "a-va_bien_2");
        assert_eq!(dir_name_for("???"), "");
    }

    #[test]
    fn title_length_bounds_are_inclusive() {
        assert!(validate_title("abc").is_ok());
        assert!(validate_title(&"x".repeat(50)).is_ok());
        assert!(matches!(
            validate_title("ab"),
            Err(ZibError::Validation(_))
        ));
        assert!(validate_title(&"x".repeat(51)).is_err());
    }

    #[test]
    fn title_without_slug_characters_is_rejected() {
        assert!(validate_title("!!!!").is_err());
    }

    #[test]
    fn menu_label_is_human_cased() {
        assert_eq!(guess_menu_label("01_the-beginning.md"), "The beginning");
        assert_eq!(guess_menu_label("intro.txt"), "Intro");
        assert_eq!(guess_menu_label("chapters/two  words.md"), "Two words");
        assert_eq!(guess_menu_label("2024.md"), "2024");
    }
}
