//! Command line tokenizer.
//!
//! Splits a raw input line into words. Words may be quoted with `"` or `'`;
//! inside quotes whitespace is kept and a backslash escapes the next
//! character. Every word is unescaped afterwards, so `\x` becomes `x`.

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

/// Cursor over the characters of one input line.
struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(line: &str) -> Self {
        Self {
            chars: line.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_space) {
            self.pos += 1;
        }
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    /// Read the next raw (still escaped) word, or `None` at end of input.
    fn next_word(&mut self, use_escape: bool) -> Option<String> {
        self.skip_whitespace();
        let first = self.peek()?;

        let mut escape_active = false;
        let mut last_char = '\0';

        if is_quote(first) {
            let quote = first;
            self.pos += 1;
            let start = self.pos;
            while let Some(c) = self.peek() {
                if !escape_active && c == quote {
                    break;
                }
                escape_active = use_escape && c == '\\' && last_char != '\\';
                last_char = c;
                self.pos += 1;
            }
            let word = self.slice(start, self.pos);
            if self.peek() == Some(quote) {
                self.pos += 1;
            }
            return Some(word);
        }

        let start = self.pos;
        while self.peek().is_some_and(|c| !is_space(c)) {
            self.pos += 1;
            if let Some(quote) = self.peek().filter(|c| is_quote(*c)) {
                // embedded quote: scan to its partner, whitespace included
                loop {
                    let c = self.chars[self.pos];
                    escape_active = use_escape && c == '\\' && last_char != '\\';
                    last_char = c;
                    self.pos += 1;
                    match self.peek() {
                        Some(next) if escape_active || next != quote => continue,
                        _ => break,
                    }
                }
            }
        }
        Some(self.slice(start, self.pos))
    }
}

/// Split `line` into unescaped tokens.
///
/// Empty or whitespace-only input yields an empty vector.
pub fn tokenize(line: &str) -> Vec<String> {
    let mut scanner = Scanner::new(line);
    let mut words = Vec::new();
    while let Some(word) = scanner.next_word(true) {
        words.push(unescape(&word));
    }
    words
}

/// Collapse every `\x` to `x`. A trailing lone backslash is kept.
pub fn unescape(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut escape_active = false;
    for c in word.chars() {
        if escape_active || c != '\\' {
            out.push(c);
            escape_active = false;
        } else {
            escape_active = true;
        }
    }
    if escape_active {
        out.push('\\');
    }
    out
}

/// Quote a token so that [`tokenize`] reads it back unchanged.
///
/// Wraps in double quotes when the token is empty or contains whitespace,
/// and always escapes embedded `"` and `\`.
pub fn quote_if_necessary(token: &str) -> String {
    let need_quotes = token.is_empty() || token.chars().any(is_space);
    let need_backslash = token.chars().any(|c| c == '"' || c == '\\');
    if !need_quotes && !need_backslash {
        return token.to_string();
    }

    let mut quoted = String::with_capacity(token.len() + 4);
    if need_quotes {
        quoted.push('"');
    }
    for c in token.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    if need_quotes {
        quoted.push('"');
    }
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        tokenize(line)
    }

    #[test]
    fn test_empty_input() {
        assert!(words("").is_empty());
        assert!(words("   \t  ").is_empty());
    }

    #[test]
    fn test_plain_words() {
        assert_eq!(words("  loadSystem  demo "), vec!["loadSystem", "demo"]);
    }

    #[test]
    fn test_double_quoted_word_keeps_spaces() {
        assert_eq!(
            words(r#"setCurrentWorkingDirectory "C:\\Program Files""#),
            vec!["setCurrentWorkingDirectory", r"C:\Program Files"]
        );
    }

    #[test]
    fn test_single_quoted_word() {
        assert_eq!(words("help 'a b'"), vec!["help", "a b"]);
    }

    #[test]
    fn test_escaped_quote_inside_quotes() {
        assert_eq!(words(r#""say \"hi\"" x"#), vec![r#"say "hi""#, "x"]);
    }

    #[test]
    fn test_embedded_quote_in_unquoted_word() {
        assert_eq!(
            words(r#"callRPC {"a":"b c"} next"#),
            vec!["callRPC", r#"{"a":"b c"}"#, "next"]
        );
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        assert_eq!(words(r#"x "open end"#), vec!["x", "open end"]);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"a\b"), "ab");
        assert_eq!(unescape(r"a\\b"), r"a\b");
        assert_eq!(unescape(r"trail\"), r"trail\");
        assert_eq!(unescape(""), "");
    }

    #[test]
    fn test_quote_if_necessary_vectors() {
        assert_eq!(quote_if_necessary(""), "\"\"");
        assert_eq!(quote_if_necessary("a"), "a");
        assert_eq!(quote_if_necessary("having space"), "\"having space\"");
        assert_eq!(quote_if_necessary("\""), "\\\"");
        assert_eq!(quote_if_necessary("\\"), "\\\\");
        assert_eq!(quote_if_necessary("x\\y"), "x\\\\y");
        assert_eq!(quote_if_necessary("a\"b"), "a\\\"b");
        assert_eq!(quote_if_necessary("\"x y\\"), "\"\\\"x y\\\\\"");
        assert_eq!(
            quote_if_necessary("C:\\Program Files (x86)\\"),
            "\"C:\\\\Program Files (x86)\\\\\""
        );
    }

    #[test]
    fn test_quoted_roundtrip_of_path() {
        let token = "C:\\Program Files (x86)\\";
        assert_eq!(words(&quote_if_necessary(token)), vec![token]);
    }
}
