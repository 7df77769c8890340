//! Quote- and comment-aware splitting of a script into SQL statements.

/// Lazy iterator over the semicolon-terminated statements of a script.
///
/// The scan walks the buffer once, left to right, tracking three mutually
/// exclusive quote states (`'...'`, `"..."`, `` `...` ``). A quote character
/// toggles its own state only when no other quote state is active; otherwise
/// it is literal text. Outside all quotes, `--` and `#` start a line comment
/// (skipped up to, but not past, the next newline), `/*` starts a block
/// comment (an unterminated one silently consumes the rest of the buffer),
/// and `;` terminates a statement.
///
/// Each yielded statement runs from just after the previous semicolon through
/// the terminating semicolon, leading whitespace included. Content after the
/// final semicolon is never yielded.
pub struct StatementSplitter<'a> {
    src: &'a str,
    pos: usize,
    start: usize,
    single: bool,
    double: bool,
    backtick: bool,
}

impl<'a> StatementSplitter<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            start: 0,
            single: false,
            double: false,
            backtick: false,
        }
    }

    fn in_quotes(&self) -> bool {
        self.single || self.double || self.backtick
    }
}

impl<'a> Iterator for StatementSplitter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let bytes = self.src.as_bytes();
        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\'' if !self.double && !self.backtick => self.single = !self.single,
                b'"' if !self.single && !self.backtick => self.double = !self.double,
                b'`' if !self.single && !self.double => self.backtick = !self.backtick,
                b @ (b'-' | b'#') if !self.in_quotes() => {
                    // `-` only opens a comment when doubled
                    if b == b'#' || bytes.get(self.pos + 1) == Some(&b'-') {
                        while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
                            self.pos += 1;
                        }
                    }
                }
                b'/' if !self.in_quotes() => {
                    if bytes.get(self.pos + 1) == Some(&b'*') {
                        self.pos += 2;
                        while self.pos < bytes.len()
                            && !(bytes[self.pos - 1] == b'*' && bytes[self.pos] == b'/')
                        {
                            self.pos += 1;
                        }
                    }
                }
                b';' if !self.in_quotes() => {
                    let stmt = &self.src[self.start..=self.pos];
                    self.pos += 1;
                    self.start = self.pos;
                    return Some(stmt);
                }
                _ => {}
            }
            self.pos += 1;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(src: &str) -> Vec<&str> {
        StatementSplitter::new(src).collect()
    }

    #[test]
    fn splits_on_top_level_semicolons() {
        assert_eq!(split("a; b; c;"), vec!["a;", " b;", " c;"]);
    }

    #[test]
    fn block_comment_hides_semicolons() {
        assert_eq!(split("a /* b;\n */; c;"), vec!["a /* b;\n */;", " c;"]);
    }

    #[test]
    fn line_comments_hide_semicolons() {
        assert_eq!(split("a--b;\nc;d;"), vec!["a--b;\nc;", "d;"]);
        assert_eq!(split("a#b;\nc;d;"), vec!["a#b;\nc;", "d;"]);
    }

    #[test]
    fn quotes_hide_comment_openers_and_semicolons() {
        assert_eq!(split("a'/*--;#`\"';b;"), vec!["a'/*--;#`\"';", "b;"]);
        assert_eq!(split("a\"/*--;#`'\";b;"), vec!["a\"/*--;#`'\";", "b;"]);
        assert_eq!(split("a`/*--;#'\"`;b;"), vec!["a`/*--;#'\"`;", "b;"]);
    }

    #[test]
    fn single_dash_is_literal() {
        assert_eq!(split("a-b;c;"), vec!["a-b;", "c;"]);
    }

    #[test]
    fn unterminated_block_comment_swallows_the_rest() {
        assert_eq!(split("a /* b;"), Vec::<&str>::new());
        assert_eq!(split("a; /* b;"), vec!["a;"]);
    }

    #[test]
    fn line_comment_at_end_of_buffer_needs_no_newline() {
        assert_eq!(split("a;-- tail;"), vec!["a;"]);
        assert_eq!(split("a;#tail;"), vec!["a;"]);
    }

    #[test]
    fn tail_without_semicolon_is_dropped() {
        assert_eq!(split("a; trailing"), vec!["a;"]);
        assert_eq!(split(""), Vec::<&str>::new());
        assert_eq!(split("   \n"), Vec::<&str>::new());
    }

    #[test]
    fn statement_spanning_lines_keeps_leading_whitespace() {
        assert_eq!(
            split("CREATE TABLE t (x int);\n  INSERT INTO t VALUES (1);\n"),
            vec!["CREATE TABLE t (x int);", "\n  INSERT INTO t VALUES (1);"]
        );
    }
}
