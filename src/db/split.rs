//! Lexical statement splitting for multi-statement transactions.
//!
//! Splits SQL text at top-level `;` boundaries only. A terminator inside a
//! string literal, an identifier quote, a comment, or a dollar-quoted body
//! never splits. This is a byte-level scan, not a parse - the SQL itself
//! stays opaque.

/// Scanner state while walking the SQL text.
#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Split SQL text into ordered statements at top-level terminators.
///
/// `backslash_escapes` enables MySQL's `\'` escaping inside string
/// literals. PostgreSQL (standard_conforming_strings) and SQLite treat a
/// backslash as an ordinary character, where `'\'` is a complete
/// one-character string.
///
/// Statements that are empty or contain only whitespace and comments are
/// dropped. Statement text keeps its original bytes (comments included),
/// trimmed of surrounding whitespace.
pub fn split_statements(sql: &str, backslash_escapes: bool) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut state = State::Normal;
    let mut start = 0usize;
    // Tracks whether the current statement has anything outside comments.
    let mut has_content = false;
    let mut idx = 0usize;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b';' => {
                    push_statement(&mut statements, &sql[start..idx], has_content);
                    start = idx + 1;
                    has_content = false;
                    idx += 1;
                }
                b'\'' => {
                    state = State::SingleQuoted;
                    has_content = true;
                    idx += 1;
                }
                b'"' => {
                    state = State::DoubleQuoted;
                    has_content = true;
                    idx += 1;
                }
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 2;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 2;
                }
                b'$' => {
                    if let Some((tag, tag_end)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        has_content = true;
                        idx = tag_end + 1;
                    } else {
                        has_content = true;
                        idx += 1;
                    }
                }
                _ => {
                    if !b.is_ascii_whitespace() {
                        has_content = true;
                    }
                    idx += 1;
                }
            },
            State::SingleQuoted => match b {
                b'\\' if backslash_escapes => idx += 2,
                b'\'' => {
                    state = State::Normal;
                    idx += 1;
                }
                _ => idx += 1,
            },
            State::DoubleQuoted => match b {
                b'\\' if backslash_escapes => idx += 2,
                b'"' => {
                    state = State::Normal;
                    idx += 1;
                }
                _ => idx += 1,
            },
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
                idx += 1;
            }
            State::BlockComment(depth) => {
                if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 2;
                } else if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 2;
                } else {
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_closing_tag(bytes, idx, tag) {
                    let advance = tag.len() + 2;
                    state = State::Normal;
                    idx += advance;
                } else {
                    idx += 1;
                }
            }
        }
    }

    push_statement(&mut statements, &sql[start..], has_content);
    statements
}

fn push_statement(statements: &mut Vec<String>, text: &str, has_content: bool) {
    let trimmed = text.trim();
    if has_content && !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// At a `$`, try to read a dollar-quote opener `$tag$`. Returns the tag and
/// the index of the closing `$` of the opener.
fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }
    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

/// Whether the bytes at `idx` (pointing at `$`) close a `$tag$` quote.
fn matches_closing_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx + 1..end).is_some_and(|s| s == tag.as_bytes())
        && bytes.get(end) == Some(&b'$')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_statement() {
        assert_eq!(split_statements("SELECT 1", false), vec!["SELECT 1"]);
    }

    #[test]
    fn test_multiple_statements() {
        let stmts = split_statements("CREATE TABLE t (id INT); INSERT INTO t VALUES (1);", false);
        assert_eq!(
            stmts,
            vec!["CREATE TABLE t (id INT)", "INSERT INTO t VALUES (1)"]
        );
    }

    #[test]
    fn test_terminator_inside_string_literal() {
        let stmts = split_statements("INSERT INTO t VALUES ('a;b'); SELECT 1", false);
        assert_eq!(stmts, vec!["INSERT INTO t VALUES ('a;b')", "SELECT 1"]);
    }

    #[test]
    fn test_terminator_inside_doubled_quote_literal() {
        let stmts = split_statements("INSERT INTO t VALUES ('it''s; fine'); SELECT 1", false);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "INSERT INTO t VALUES ('it''s; fine')");
    }

    #[test]
    fn test_backslash_is_ordinary_without_escape_mode() {
        // Standard-conforming strings: '\' is a one-character string
        let stmts = split_statements(r"SELECT '\'; SELECT 2", false);
        assert_eq!(stmts, vec![r"SELECT '\'", "SELECT 2"]);
    }

    #[test]
    fn test_backslash_escape_in_mysql_mode() {
        let stmts =
            split_statements(r"INSERT INTO t VALUES ('a\'; still quoted'); SELECT 1", true);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], r"INSERT INTO t VALUES ('a\'; still quoted')");
    }

    #[test]
    fn test_terminator_inside_quoted_identifier() {
        let stmts = split_statements(r#"SELECT "weird;col" FROM t; SELECT 2"#, false);
        assert_eq!(stmts, vec![r#"SELECT "weird;col" FROM t"#, "SELECT 2"]);
    }

    #[test]
    fn test_terminator_inside_line_comment() {
        let stmts = split_statements("SELECT 1 -- trailing; not a split\n; SELECT 2", false);
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].starts_with("SELECT 1"));
        assert_eq!(stmts[1], "SELECT 2");
    }

    #[test]
    fn test_terminator_inside_block_comment() {
        let stmts = split_statements("SELECT 1 /* a; b */; SELECT 2", false);
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_nested_block_comment() {
        let stmts = split_statements("SELECT 1 /* outer /* inner; */ still; */; SELECT 2", false);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[1], "SELECT 2");
    }

    #[test]
    fn test_terminator_inside_dollar_quote() {
        let stmts = split_statements(
            "CREATE FUNCTION f() RETURNS void AS $$ BEGIN; END $$ LANGUAGE plpgsql; SELECT 1",
            false,
        );
        assert_eq!(stmts.len(), 2);
        assert!(stmts[0].contains("BEGIN; END"));
    }

    #[test]
    fn test_tagged_dollar_quote() {
        let stmts = split_statements("SELECT $tag$a; b$tag$; SELECT 2", false);
        assert_eq!(stmts, vec!["SELECT $tag$a; b$tag$", "SELECT 2"]);
    }

    #[test]
    fn test_empty_statements_dropped() {
        let stmts = split_statements(";;\n ; SELECT 1; ;", false);
        assert_eq!(stmts, vec!["SELECT 1"]);
    }

    #[test]
    fn test_comment_only_statement_dropped() {
        let stmts = split_statements("-- just a note\n; SELECT 1", false);
        assert_eq!(stmts, vec!["SELECT 1"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(split_statements("", false).is_empty());
        assert!(split_statements("  \n\t ", false).is_empty());
    }

    #[test]
    fn test_order_preserved() {
        let stmts = split_statements("A1; B2; C3", false);
        assert_eq!(stmts, vec!["A1", "B2", "C3"]);
    }
}
