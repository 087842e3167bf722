//! Identifier quoting and string-literal escaping for `SQLite`.

/// Quotes `name` as a backtick-delimited identifier, doubling any embedded
/// backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Escapes `raw` for use inside a single-quoted string literal.
///
/// The surrounding quotes are not added.
pub fn escape_string(raw: &str) -> String {
    raw.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("app_users"), "`app_users`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("plain"), "plain");
        assert_eq!(escape_string("O'Brien"), "O''Brien");
        assert_eq!(escape_string("''"), "''''");
    }
}
