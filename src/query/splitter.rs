//! Splitting of SQL scripts into individual statements.
//!
//! Semicolons separate statements unless they appear inside a string
//! literal, a quoted identifier or a comment. Statements are trimmed, and
//! statements that contain nothing but whitespace and comments are dropped.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

/// Split `text` into trimmed statements, in source order.
///
/// Doubled quotes (`''` and `""`) inside literals and identifiers are escapes
/// and do not end the quoted section.
///
/// # Example
///
/// ```
/// use exaquery::query::split_statements;
///
/// let statements = split_statements("SELECT ';'; -- done\nSELECT 2");
/// assert_eq!(statements, vec!["SELECT ';'", "-- done\nSELECT 2"]);
/// ```
pub fn split_statements(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    // Whether `current` holds anything outside of comments and whitespace.
    let mut has_code = false;
    let mut state = State::Normal;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                ';' => {
                    push_statement(&mut statements, &current, has_code);
                    current.clear();
                    has_code = false;
                    continue;
                }
                '\'' => {
                    state = State::SingleQuoted;
                    has_code = true;
                }
                '"' => {
                    state = State::DoubleQuoted;
                    has_code = true;
                }
                '-' if chars.peek() == Some(&'-') => {
                    current.push(c);
                    current.extend(chars.next());
                    state = State::LineComment;
                    continue;
                }
                '/' if chars.peek() == Some(&'*') => {
                    current.push(c);
                    current.extend(chars.next());
                    state = State::BlockComment;
                    continue;
                }
                c if !c.is_whitespace() => has_code = true,
                _ => {}
            },
            State::SingleQuoted | State::DoubleQuoted => {
                let quote = if state == State::SingleQuoted { '\'' } else { '"' };
                if c == quote {
                    if chars.peek() == Some(&quote) {
                        current.push(c);
                        current.extend(chars.next());
                        continue;
                    }
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    current.push(c);
                    current.extend(chars.next());
                    state = State::Normal;
                    continue;
                }
            }
        }
        current.push(c);
    }

    push_statement(&mut statements, &current, has_code);
    statements
}

fn push_statement(statements: &mut Vec<String>, text: &str, has_code: bool) {
    if has_code {
        statements.push(text.trim().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_statement_without_terminator() {
        assert_eq!(split_statements("SELECT 1"), vec!["SELECT 1"]);
    }

    #[test]
    fn test_multiple_statements() {
        assert_eq!(
            split_statements("SELECT 1;  BAD SQL ;\n"),
            vec!["SELECT 1", "BAD SQL"]
        );
    }

    #[test]
    fn test_semicolon_in_literal_and_identifier() {
        let sql = r#"INSERT INTO "a;b" VALUES ('x;y', 'it''s;'); SELECT 2"#;
        assert_eq!(
            split_statements(sql),
            vec![r#"INSERT INTO "a;b" VALUES ('x;y', 'it''s;')"#, "SELECT 2"]
        );
    }

    #[test]
    fn test_semicolon_in_comments() {
        let sql = "SELECT 1 -- one; two\n; /* a; b */ SELECT 2";
        assert_eq!(
            split_statements(sql),
            vec!["SELECT 1 -- one; two", "/* a; b */ SELECT 2"]
        );
    }

    #[test]
    fn test_empty_and_comment_only_statements_dropped() {
        assert!(split_statements("").is_empty());
        assert!(split_statements(" ;; \n ; ").is_empty());
        assert_eq!(
            split_statements("-- header\n; SELECT 1; /* trailer */"),
            vec!["SELECT 1"]
        );
    }

    #[test]
    fn test_unterminated_literal_runs_to_end() {
        assert_eq!(split_statements("SELECT 'abc; def"), vec!["SELECT 'abc; def"]);
    }
}
