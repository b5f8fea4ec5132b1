//! Filesystem-safe names for upload directories and payload files.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("static regex is valid"));

/// Lowercase ASCII slug: keeps alphanumerics, `_` and `-`, turns whitespace
/// runs into a single `-`, trims `-`/`_` from both ends. Accented letters are
/// NFKD-decomposed down to their base letter; other non-ASCII characters are
/// dropped.
pub fn slugify(value: &str) -> String {
    let kept: String = value
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_ascii_whitespace())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    SEPARATORS
        .replace_all(kept.trim(), "-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}

/// `name` without its last extension. Dotfiles keep their leading dot.
pub fn stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// Reduces a client-supplied file name to one safe path component, or `None`
/// when nothing usable remains.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let last = raw.rsplit(&['/', '\\'][..]).next().unwrap_or(raw);
    let cleaned: String = last.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn homework_name_slug() {
        assert_eq!(slugify(stem("Math HW 1.pdf")), "math-hw-1");
    }

    #[test]
    fn punctuation_and_runs_collapse() {
        assert_eq!(slugify("  Report -- Card (Q1)!  "), "report-card-q1");
        assert_eq!(slugify("__draft__"), "draft");
        assert_eq!(slugify("snake_case name"), "snake_case-name");
    }

    #[test]
    fn accented_letters_keep_their_base() {
        assert_eq!(slugify("Tarea de español"), "tarea-de-espanol");
        assert_eq!(slugify(stem("Informe Matemáticas.pdf")), "informe-matematicas");
        assert_eq!(slugify("Ｍａｔｈ ＨＷ"), "math-hw");
    }

    #[test]
    fn scripts_without_ascii_base_are_dropped() {
        assert_eq!(slugify("数学"), "");
        assert_eq!(slugify("Домашка 5"), "5");
    }

    #[test]
    fn slug_is_deterministic() {
        let a = slugify(stem("Science Fair.v2.docx"));
        let b = slugify(stem("Science Fair.v2.docx"));
        assert_eq!(a, b);
        assert_eq!(a, "science-fairv2");
    }

    #[test]
    fn stem_keeps_dotfiles_and_extensionless_names() {
        assert_eq!(stem(".notes"), ".notes");
        assert_eq!(stem("README"), "README");
        assert_eq!(stem("a.tar.gz"), "a.tar");
    }

    #[test]
    fn file_names_lose_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_file_name("C:\\Users\\kid\\hw.png").as_deref(), Some("hw.png"));
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("  "), None);
    }
}
