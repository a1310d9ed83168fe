//! Comment normalisation applied before tokenisation.
//!
//! User feedback arrives as free text with punctuation, emoji, order numbers
//! and mixed case ("Uygulamada teknik sorun var!!! 123"). The classifier was
//! trained on cleaned, lowercased text, so every comment goes through the
//! same cleanup before it reaches the tokenizer.

use std::sync::LazyLock;

use regex::Regex;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("static regex is valid"));

static DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("static regex is valid"));

/// Normalise a raw comment.
///
/// Input: "Uygulamada teknik sorun var!!! 123"
/// Output: "uygulamada teknik sorun var "
///
/// # Algorithm
///
/// 1. Drop every character that is neither a word character nor whitespace
/// 2. Drop every digit
/// 3. Lowercase (Unicode default mapping)
///
/// Whitespace is left untouched, including trailing runs. The function is
/// pure and idempotent.
pub fn normalize_comment(text: &str) -> String {
    let stripped = NON_WORD.replace_all(text, "");
    let stripped = DIGIT.replace_all(&stripped, "");
    stripped.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_digits_and_case() {
        assert_eq!(
            normalize_comment("Uygulamada teknik sorun var!!! 123"),
            "uygulamada teknik sorun var "
        );
    }

    #[test]
    fn empty_string() {
        assert_eq!(normalize_comment(""), "");
    }

    #[test]
    fn only_noise() {
        assert_eq!(normalize_comment("!!! ??? 42 ..."), "   ");
    }

    #[test]
    fn keeps_turkish_letters() {
        assert_eq!(
            normalize_comment("Rehberlik DESTEĞE ihtiyacım var."),
            "rehberlik desteğe ihtiyacım var"
        );
    }

    #[test]
    fn keeps_underscore() {
        // `_` is a word character.
        assert_eq!(normalize_comment("ders_1!"), "ders_");
    }

    #[test]
    fn non_ascii_digits_removed() {
        // Arabic-Indic digits are still digits.
        assert_eq!(normalize_comment("kod ٣٤ hata"), "kod  hata");
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "Uygulamada teknik sorun var!!! 123",
            "Rehberlik desteğe ihtiyacım var",
            "İSTANBUL şubesi — kapalı?!",
            "e-posta: ogrenci@example.com",
            "\ttab\nnewline  ",
            "🙂 emoji 🙂",
            "",
        ];
        for input in inputs {
            let once = normalize_comment(input);
            let twice = normalize_comment(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn whitespace_preserved() {
        assert_eq!(normalize_comment("a\tb\nc"), "a\tb\nc");
    }
}
