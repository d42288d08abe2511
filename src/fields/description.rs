use anyhow::Result;
use regex::Regex;

/// Isolated one- or two-letter capital tokens, almost always OCR noise.
const NOISE_TOKEN_PATTERN: &str = r"\b[A-Z]{1,2}\b";

/// Stray symbols picked up from the card frame.
const STRAY_SYMBOL_PATTERN: &str = r"[|=><&]";

/// Cleans description text: drops noise tokens and stray symbols, then
/// collapses runs of whitespace.
pub fn clean_description(raw: &str) -> Result<String> {
    let noise = Regex::new(NOISE_TOKEN_PATTERN)?;
    let symbols = Regex::new(STRAY_SYMBOL_PATTERN)?;
    let spaces = Regex::new(r"\s{2,}")?;

    let text = noise.replace_all(raw, "");
    let text = symbols.replace_all(&text, "");
    let text = spaces.replace_all(&text, " ");

    Ok(text.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_isolated_capitals() {
        assert_eq!(
            clean_description("This legendary dragon is a powerful engine of destruction. EE").unwrap(),
            "This legendary dragon is a powerful engine of destruction."
        );
        assert_eq!(clean_description("Draw X 2 cards OK").unwrap(), "Draw 2 cards");
    }

    #[test]
    fn test_keeps_longer_words() {
        assert_eq!(clean_description("ATK DEF LP").unwrap(), "ATK DEF");
    }

    #[test]
    fn test_strips_symbols_and_spaces() {
        assert_eq!(
            clean_description("| Destroy  1 monster => & gain <500> LP =").unwrap(),
            "Destroy 1 monster gain 500"
        );
    }

    #[test]
    fn test_empty() {
        assert_eq!(clean_description("").unwrap(), "");
        assert_eq!(clean_description("  | = ").unwrap(), "");
    }
}
