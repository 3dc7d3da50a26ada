//! Sentence and paragraph boundary detection.

/// Characters that end a sentence.
fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…' | '。' | '！' | '？')
}

/// Closing quotes and brackets allowed between a terminator and the space.
fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | '”' | '’' | ')' | ']' | '»')
}

/// Split text into sentence-or-paragraph units.
///
/// Each unit keeps the whitespace run that follows it, so concatenating the
/// units reproduces the input exactly. Units only end inside whitespace, never
/// inside a word.
pub fn split_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut after_terminator = false;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c.is_whitespace() {
            if after_terminator || c == '\n' {
                let mut end = i + c.len_utf8();
                while let Some(&(j, next)) = chars.peek() {
                    if !next.is_whitespace() {
                        break;
                    }
                    end = j + next.len_utf8();
                    chars.next();
                }
                units.push(&text[start..end]);
                start = end;
            }
            after_terminator = false;
        } else if is_terminator(c) {
            after_terminator = true;
        } else if !is_closer(c) {
            after_terminator = false;
        }
    }

    if start < text.len() {
        units.push(&text[start..]);
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_after_sentences() {
        let units = split_units("One. Two! Three? Four");
        assert_eq!(units, vec!["One. ", "Two! ", "Three? ", "Four"]);
    }

    #[test]
    fn test_keeps_whitespace_runs_and_quotes() {
        let units = split_units("He said \"stop.\"  Then left.\n\nNew paragraph");
        assert_eq!(units, vec!["He said \"stop.\"  ", "Then left.\n\n", "New paragraph"]);
    }

    #[test]
    fn test_line_breaks_are_boundaries() {
        let units = split_units("# Heading\nBody text without a period");
        assert_eq!(units, vec!["# Heading\n", "Body text without a period"]);
    }

    #[test]
    fn test_decimal_points_do_not_split() {
        let units = split_units("Pi is 3.14 roughly. Next");
        assert_eq!(units, vec!["Pi is 3.14 roughly. ", "Next"]);
    }

    #[test]
    fn test_concatenation_is_lossless() {
        let text = "  Leading space. Ünïcödé…  works!\n\tTabbed? yes";
        assert_eq!(split_units(text).concat(), text);
    }
}
