//! Dialect-aware tokenizer for DDL scripts.

use datafill_core::Dialect;

use crate::error::ParseError;

/// SQL token types.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Unquoted identifier or keyword.
    Word(String),
    /// Quoted identifier with the quotes removed.
    Quoted(String),
    Str(String),
    Num(String),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    LBracket,
    RBracket,
    /// Any other operator or punctuation.
    Op(String),
}

impl Token {
    /// Case-insensitive keyword comparison; quoted identifiers never match.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(word) if word.eq_ignore_ascii_case(keyword))
    }

    /// Identifier text for words and quoted identifiers.
    pub fn ident(&self) -> Option<&str> {
        match self {
            Token::Word(word) | Token::Quoted(word) => Some(word),
            _ => None,
        }
    }
}

/// A token and where it starts and ends in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
    pub start: usize,
    pub end: usize,
}

pub struct Lexer<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    column: usize,
    dialect: Dialect,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, dialect: Dialect) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
            line: 1,
            column: 1,
            dialect,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).map(|(_, c)| *c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source.len())
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.pos += 1;
        }
    }

    fn error(&self, line: usize, column: usize, start: usize, message: impl Into<String>) -> ParseError {
        ParseError::Tokenize {
            line,
            column,
            fragment: fragment_at(self.source, start),
            message: message.into(),
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.current() {
            if c == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn skip_block_comment(&mut self, line: usize, column: usize, start: usize) -> Result<(), ParseError> {
        self.advance();
        self.advance();
        loop {
            match self.current() {
                None => return Err(self.error(line, column, start, "unterminated block comment")),
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    self.advance();
                    return Ok(());
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn read_delimited(&mut self, close: char, backslash_escapes: bool) -> Option<String> {
        self.advance();
        let mut text = String::new();
        while let Some(c) = self.current() {
            if c == close {
                if self.peek() == Some(close) {
                    text.push(c);
                    self.advance();
                    self.advance();
                    continue;
                }
                self.advance();
                return Some(text);
            }
            if backslash_escapes && c == '\\' {
                self.advance();
                if let Some(escaped) = self.current() {
                    match escaped {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        'r' => text.push('\r'),
                        '0' => text.push('\0'),
                        other => text.push(other),
                    }
                    self.advance();
                }
                continue;
            }
            text.push(c);
            self.advance();
        }
        None
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut text = String::new();
        while let Some(c) = self.current() {
            if !predicate(c) {
                break;
            }
            text.push(c);
            self.advance();
        }
        text
    }

    fn read_number(&mut self) -> String {
        let mut number = self.read_while(|c| c.is_ascii_digit() || c == '.');
        if matches!(self.current(), Some('e' | 'E'))
            && self
                .peek()
                .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-')
        {
            number.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.current() {
                number.push(sign);
                self.advance();
            }
            number.push_str(&self.read_while(|c| c.is_ascii_digit()));
        }
        number
    }

    /// An Oracle `/` on a line of its own ends the current statement.
    fn is_lone_slash(&self) -> bool {
        let offset = self.offset();
        let line_start = self.source[..offset].rfind('\n').map(|idx| idx + 1).unwrap_or(0);
        let line_end = self.source[offset..]
            .find('\n')
            .map(|idx| offset + idx)
            .unwrap_or(self.source.len());
        self.source[line_start..offset].trim().is_empty()
            && self.source[offset + 1..line_end].trim().is_empty()
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, ParseError> {
        loop {
            let Some(c) = self.current() else {
                return Ok(None);
            };
            let (line, column, start) = (self.line, self.column, self.offset());

            let token = match c {
                c if c.is_whitespace() => {
                    self.advance();
                    continue;
                }
                '-' if self.peek() == Some('-') => {
                    self.skip_line_comment();
                    continue;
                }
                '#' if self.dialect == Dialect::Mysql => {
                    self.skip_line_comment();
                    continue;
                }
                '/' if self.peek() == Some('*') => {
                    self.skip_block_comment(line, column, start)?;
                    continue;
                }
                '/' if self.dialect == Dialect::Oracle && self.is_lone_slash() => {
                    self.advance();
                    Token::Semicolon
                }
                '(' => {
                    self.advance();
                    Token::LParen
                }
                ')' => {
                    self.advance();
                    Token::RParen
                }
                ',' => {
                    self.advance();
                    Token::Comma
                }
                ';' => {
                    self.advance();
                    Token::Semicolon
                }
                '.' if !self.peek().is_some_and(|next| next.is_ascii_digit()) => {
                    self.advance();
                    Token::Dot
                }
                '\'' => {
                    let escapes = self.dialect == Dialect::Mysql;
                    let text = self
                        .read_delimited('\'', escapes)
                        .ok_or_else(|| self.error(line, column, start, "unterminated string literal"))?;
                    Token::Str(text)
                }
                '"' => {
                    let text = self.read_delimited('"', false).ok_or_else(|| {
                        self.error(line, column, start, "unterminated quoted identifier")
                    })?;
                    if self.dialect.accepts_double_quoted_identifiers() {
                        Token::Quoted(text)
                    } else {
                        Token::Str(text)
                    }
                }
                '`' => {
                    if !self.dialect.accepts_backtick_identifiers() {
                        return Err(self.error(
                            line,
                            column,
                            start,
                            format!("backtick-quoted identifiers are not valid in {}", self.dialect),
                        ));
                    }
                    let text = self.read_delimited('`', false).ok_or_else(|| {
                        self.error(line, column, start, "unterminated quoted identifier")
                    })?;
                    Token::Quoted(text)
                }
                '[' if self.dialect.accepts_bracket_identifiers() => {
                    let text = self.read_delimited(']', false).ok_or_else(|| {
                        self.error(line, column, start, "unterminated bracket identifier")
                    })?;
                    Token::Quoted(text)
                }
                '[' => {
                    self.advance();
                    Token::LBracket
                }
                ']' => {
                    self.advance();
                    Token::RBracket
                }
                c if c.is_ascii_digit() || c == '.' => Token::Num(self.read_number()),
                c if c.is_alphabetic() || c == '_' => {
                    Token::Word(self.read_while(|c| c.is_alphanumeric() || c == '_' || c == '$'))
                }
                _ => {
                    self.advance();
                    let mut op = c.to_string();
                    if let Some(next) = self.current()
                        && matches!(
                            (c, next),
                            (':', ':') | ('>', '=') | ('<', '=') | ('<', '>') | ('!', '=') | ('|', '|')
                        )
                    {
                        op.push(next);
                        self.advance();
                    }
                    Token::Op(op)
                }
            };

            return Ok(Some(Spanned {
                token,
                line,
                column,
                start,
                end: self.offset(),
            }));
        }
    }

    /// Collect all tokens.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

/// Source text from `offset` to the end of its line, shortened for messages.
pub fn fragment_at(source: &str, offset: usize) -> String {
    let rest = source.get(offset..).unwrap_or("");
    let line = rest.lines().next().unwrap_or("").trim();
    if line.chars().count() > 60 {
        let cut: String = line.chars().take(60).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(sql: &str, dialect: Dialect) -> Vec<Token> {
        Lexer::new(sql, dialect)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|spanned| spanned.token)
            .collect()
    }

    #[test]
    fn simple_create_table() {
        let tokens = tokens("CREATE TABLE users (id INT);", Dialect::Postgres);
        assert!(tokens[0].is_keyword("create"));
        assert_eq!(tokens[2], Token::Word("users".to_string()));
        assert_eq!(tokens[3], Token::LParen);
        assert_eq!(tokens[6], Token::RParen);
        assert_eq!(tokens[7], Token::Semicolon);
    }

    #[test]
    fn quoting_depends_on_dialect() {
        let mysql = tokens("CREATE TABLE `User Table` (id INT);", Dialect::Mysql);
        assert_eq!(mysql[2], Token::Quoted("User Table".to_string()));

        let postgres = tokens(r#"CREATE TABLE "User Table" (id INT);"#, Dialect::Postgres);
        assert_eq!(postgres[2], Token::Quoted("User Table".to_string()));

        let sqlite = tokens("CREATE TABLE [order items] (id INT);", Dialect::Sqlite);
        assert_eq!(sqlite[2], Token::Quoted("order items".to_string()));
    }

    #[test]
    fn backticks_are_rejected_outside_mysql_family() {
        let err = Lexer::new("CREATE TABLE `t` (id INT);", Dialect::Oracle)
            .tokenize()
            .unwrap_err();
        match err {
            ParseError::Tokenize { line, column, .. } => {
                assert_eq!(line, 1);
                assert_eq!(column, 14);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = tokens(
            "-- comment\nCREATE /* block */ TABLE t (id INT); # mysql",
            Dialect::Mysql,
        );
        assert!(tokens[0].is_keyword("CREATE"));
        assert!(tokens[1].is_keyword("TABLE"));
        assert_eq!(tokens.len(), 8);
    }

    #[test]
    fn oracle_slash_line_terminates_statement() {
        let tokens = tokens("CREATE TABLE t (id NUMBER)\n/\n", Dialect::Oracle);
        assert_eq!(tokens.last(), Some(&Token::Semicolon));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::new("CREATE TABLE t (s TEXT DEFAULT 'abc);", Dialect::Sqlite)
            .tokenize()
            .unwrap_err();
        assert!(err.to_string().contains("unterminated string"));
    }

    #[test]
    fn doubled_quotes_escape() {
        let tokens = tokens("DEFAULT 'it''s'", Dialect::Postgres);
        assert_eq!(tokens[1], Token::Str("it's".to_string()));
    }
}
