//! Table-token rewriting.
//!
//! A table token is a bare word in braces, `{users}`, that
//!
//! * is preceded by a whitespace character, and
//! * is followed by whitespace, a `;`, or the end of the template.
//!
//! Each token is replaced by the backend-quoted identifier `prefix + word`.
//! The boundary characters stay exactly as they were. Tokens that break the
//! boundary rule (`x{users}`, `{users}s`, a token at the very start) and
//! braces inside quoted literals or comments are left alone, so a brace that
//! is part of a larger identifier or a string value is never rewritten.

use std::ops::Range;

use crate::scan::{is_word_byte, splice, unquoted_ranges};

/// A table token found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableToken<'a> {
    /// Byte range of the token, braces included.
    pub span: Range<usize>,
    /// The word between the braces.
    pub name: &'a str,
}

/// Finds every table token in `template`, left to right.
pub fn find_table_tokens(template: &str) -> Vec<TableToken<'_>> {
    let bytes = template.as_bytes();
    let mut tokens = Vec::new();
    for range in unquoted_ranges(template) {
        let mut pos = range.start;
        while pos < range.end {
            if bytes[pos] != b'{' {
                pos += 1;
                continue;
            }
            let preceded = pos > 0 && bytes[pos - 1].is_ascii_whitespace();
            let word_end = bytes[pos + 1..range.end]
                .iter()
                .position(|&b| !is_word_byte(b))
                .map_or(range.end, |offset| pos + 1 + offset);
            let closed = word_end > pos + 1 && word_end < range.end && bytes[word_end] == b'}';
            if !(preceded && closed) {
                pos += 1;
                continue;
            }
            let after = word_end + 1;
            let followed = after == bytes.len()
                || bytes[after] == b';'
                || bytes[after].is_ascii_whitespace();
            if followed {
                tokens.push(TableToken {
                    span: pos..after,
                    name: &template[pos + 1..word_end],
                });
            }
            pos = after;
        }
    }
    tokens
}

/// Rewrites every table token in `template` to `quote(prefix + name)`.
///
/// A template without tokens is returned unchanged.
pub fn rewrite(template: &str, prefix: &str, quote: impl Fn(&str) -> String) -> String {
    let tokens = find_table_tokens(template);
    if tokens.is_empty() {
        return template.to_owned();
    }
    let edits = tokens
        .into_iter()
        .map(|token| (token.span, quote(&format!("{prefix}{}", token.name))))
        .collect();
    splice(template, edits)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn backticks(name: &str) -> String {
        format!("`{name}`")
    }

    #[test]
    fn test_rewrites_prefixed_quoted_identifier() {
        assert_eq!(
            rewrite("SELECT * FROM {t} WHERE id = :i", "app_", backticks),
            "SELECT * FROM `app_t` WHERE id = :i"
        );
    }

    #[test_case("SELECT * FROM {users}", "SELECT * FROM `p_users`" ; "end of string")]
    #[test_case("DELETE FROM {users};", "DELETE FROM `p_users`;" ; "terminator")]
    #[test_case("SELECT *\tFROM\t{users}\n", "SELECT *\tFROM\t`p_users`\n" ; "tab and newline kept")]
    #[test_case("SELECT * FROM {a} JOIN {b} ON 1", "SELECT * FROM `p_a` JOIN `p_b` ON 1" ; "several tokens")]
    #[test_case("SELECT * FROM {a} {b}", "SELECT * FROM `p_a` `p_b`" ; "shared boundary")]
    fn test_bounded_tokens(template: &str, expected: &str) {
        assert_eq!(rewrite(template, "p_", backticks), expected);
    }

    #[test_case("SELECT * FROM x{users}" ; "glued before")]
    #[test_case("SELECT * FROM {users}s" ; "glued after")]
    #[test_case("SELECT * FROM {users}," ; "comma after")]
    #[test_case("{users} LIMIT 1" ; "template start")]
    #[test_case("SELECT * FROM { users }" ; "spaces inside")]
    #[test_case("SELECT * FROM {}" ; "empty word")]
    #[test_case("SELECT * FROM t WHERE a = ' {users} '" ; "quoted literal")]
    #[test_case("SELECT * FROM t -- see {users}\n" ; "line comment")]
    #[test_case("SELECT * FROM t /* {users} */" ; "block comment")]
    #[test_case("SELECT * FROM t" ; "no token")]
    fn test_unbounded_tokens_untouched(template: &str) {
        assert_eq!(rewrite(template, "p_", backticks), template);
    }

    #[test]
    fn test_find_table_tokens() {
        let tokens = find_table_tokens("INSERT INTO {log} SELECT * FROM {events};");
        let names: Vec<_> = tokens.iter().map(|token| token.name).collect();
        assert_eq!(names, vec!["log", "events"]);
        assert_eq!(tokens[0].span, 12..17);
    }

    #[test]
    fn test_apostrophe_in_comment_does_not_hide_tokens() {
        assert_eq!(
            rewrite("SELECT name -- the user's name\n FROM {users} WHERE 1", "p_", backticks),
            "SELECT name -- the user's name\n FROM `p_users` WHERE 1"
        );
        assert_eq!(
            rewrite("SELECT 1 /* it's */ FROM {users}", "p_", backticks),
            "SELECT 1 /* it's */ FROM `p_users`"
        );
    }

    #[test]
    fn test_empty_prefix() {
        assert_eq!(rewrite("SELECT 1 FROM {t}", "", backticks), "SELECT 1 FROM `t`");
    }
}
