use regex::Regex;
use std::sync::LazyLock;

static LEADING_BARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(^|\s)\|+").unwrap());
static TRAILING_BARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\|+(\s|$)").unwrap());
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Characters stripped from both ends. Brackets, `#` and `%` are kept
/// because part numbers and ratings use them.
const EDGE_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '\'', '"', '`', '~', '_', '-', '=', '*', '|', '/', '\\',
];

/// Tidy raw OCR output: drop stray `|` at word edges, collapse whitespace
/// and trim surrounding punctuation.
pub fn clean_ocr_text(raw: &str) -> String {
    let s = LEADING_BARS.replace_all(raw, "$1");
    let s = TRAILING_BARS.replace_all(&s, "$1");
    let s = WHITESPACE.replace_all(&s, " ");
    s.trim_matches(|c: char| c.is_whitespace() || EDGE_PUNCTUATION.contains(&c))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bars_at_word_edges_only() {
        assert_eq!(clean_ocr_text("|Resistors 10k|"), "Resistors 10k");
        assert_eq!(clean_ocr_text("M3  |  screws ."), "M3 screws");
        assert_eq!(clean_ocr_text("A|B"), "A|B");
    }

    #[test]
    fn collapses_whitespace_and_newlines() {
        assert_eq!(clean_ocr_text("  LED\n\n 5mm\tred  "), "LED 5mm red");
    }

    #[test]
    fn keeps_brackets_and_percent() {
        assert_eq!(clean_ocr_text("-- (M2) 1% --"), "(M2) 1%");
        assert_eq!(clean_ocr_text("#8 washers;"), "#8 washers");
    }

    #[test]
    fn empty_and_noise_only_input_become_empty() {
        assert_eq!(clean_ocr_text(""), "");
        assert_eq!(clean_ocr_text(" | . | "), "");
    }
}
