//! Comment stripping for JSONC schema files.
//!
//! Schema descriptors are allowed to carry `//` line comments and
//! `/* .. */` block comments. Stripping happens before serde parsing;
//! string literals (including escaped quotes) pass through untouched.

/// Strip `//` and `/* */` comments, preserving everything inside strings.
///
/// Comment bytes are replaced rather than removed only where needed to
/// keep the output valid JSON; the result is simply the input minus the
/// comment runs.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' => match chars.peek() {
                Some('/') => {
                    while let Some(&next) = chars.peek() {
                        if next == '\n' {
                            break;
                        }
                        chars.next();
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = '\0';
                    for next in chars.by_ref() {
                        if prev == '*' && next == '/' {
                            break;
                        }
                        prev = next;
                    }
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_comments_stripped() {
        let input = "{\n  \"a\": 1, // trailing\n  \"b\": 2\n}";
        let stripped = strip_comments(input);
        assert!(!stripped.contains("trailing"));
        let parsed: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(parsed["a"], 1);
        assert_eq!(parsed["b"], 2);
    }

    #[test]
    fn test_block_comments_stripped() {
        let input = "{ /* block\n comment */ \"a\": 1 }";
        let parsed: serde_json::Value =
            serde_json::from_str(&strip_comments(input)).unwrap();
        assert_eq!(parsed["a"], 1);
    }

    #[test]
    fn test_strings_untouched() {
        let input = r#"{ "url": "http://example.com/a", "note": "a \"/*\" b" }"#;
        let stripped = strip_comments(input);
        let parsed: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(parsed["url"], "http://example.com/a");
        assert_eq!(parsed["note"], "a \"/*\" b");
    }
}
