//! Recursive-descent parser for CREATE TABLE scripts.
//!
//! Each statement is parsed into drafts; inline column constraints are
//! emitted in the same table-level form the script could have used, so
//! canonicalization only ever sees one representation.

use datafill_core::{CheckConstraint, Constraint, Dialect, FkAction, ForeignKey, PrimaryKey, UniqueConstraint};
use tracing::debug;

use crate::error::ParseError;
use crate::lexer::{Spanned, Token, fragment_at};
use crate::result::ParseDiagnostic;
use crate::types::{TypeSpec, is_known_type_word};

/// A column as declared, before type normalization.
#[derive(Debug, Clone)]
pub(crate) struct ColumnDraft {
    pub name: String,
    pub quoted: bool,
    pub line: usize,
    pub spec: Option<TypeSpec>,
    pub nullable: Option<bool>,
    pub default: Option<String>,
    pub auto_increment: bool,
}

/// Columns and constraints collected for one table. Foreign keys may have
/// empty `referenced_columns`, meaning the target's primary key.
#[derive(Debug, Clone)]
pub(crate) struct TableDraft {
    pub name: String,
    pub quoted: bool,
    pub line: usize,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDraft>,
    pub constraints: Vec<Constraint>,
}

impl TableDraft {
    fn new(name: String, line: usize) -> Self {
        Self {
            name,
            quoted: false,
            line,
            if_not_exists: false,
            columns: Vec::new(),
            constraints: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Statement {
    CreateTable(TableDraft),
    /// `ALTER TABLE ... ADD ...`; the draft holds the added items.
    AlterTable(TableDraft),
    UniqueIndex {
        table: String,
        line: usize,
        constraint: Constraint,
    },
    /// Postgres `CREATE TYPE name AS ENUM (...)`.
    EnumType { name: String, values: Vec<String> },
    Skipped {
        line: usize,
        summary: String,
        reason: String,
    },
}

const COLUMN_STOP_WORDS: &[&str] = &[
    "NOT",
    "NULL",
    "PRIMARY",
    "UNIQUE",
    "REFERENCES",
    "CHECK",
    "CONSTRAINT",
    "COLLATE",
    "COMMENT",
    "AUTO_INCREMENT",
    "AUTOINCREMENT",
    "GENERATED",
    "ON",
];

pub(crate) struct StatementParser<'a> {
    source: &'a str,
    tokens: &'a [Spanned],
    pos: usize,
    dialect: Dialect,
}

impl<'a> StatementParser<'a> {
    pub fn new(source: &'a str, tokens: &'a [Spanned], dialect: Dialect) -> Self {
        Self {
            source,
            tokens,
            pos: 0,
            dialect,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|spanned| &spanned.token)
    }

    fn peek_nth(&self, n: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + n).map(|spanned| &spanned.token)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|spanned| spanned.line)
            .unwrap_or(1)
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|token| token.is_keyword(keyword))
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume the whole keyword sequence, or nothing.
    fn eat_keywords(&mut self, keywords: &[&str]) -> bool {
        let matches = keywords
            .iter()
            .enumerate()
            .all(|(idx, keyword)| self.peek_nth(idx).is_some_and(|token| token.is_keyword(keyword)));
        if matches {
            self.pos += keywords.len();
        }
        matches
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        let spanned = self.tokens.get(self.pos).or_else(|| self.tokens.last());
        let (line, fragment) = match spanned {
            Some(spanned) => (spanned.line, fragment_at(self.source, spanned.start)),
            None => (1, String::new()),
        };
        ParseError::Syntax {
            line,
            fragment,
            message: message.into(),
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), ParseError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ParseError> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Some(found) => self.error(format!("expected {expected}, found {}", describe(found))),
            None => self.error(format!("expected {expected}, found end of statement")),
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek().and_then(Token::ident) {
            Some(ident) => {
                self.advance();
                Ok(ident.to_string())
            }
            None => Err(self.unexpected(what)),
        }
    }

    /// Identifier and whether it was written quoted.
    fn expect_name(&mut self, what: &str) -> Result<(String, bool), ParseError> {
        let quoted = matches!(self.peek(), Some(Token::Quoted(_)));
        Ok((self.expect_ident(what)?, quoted))
    }

    /// `[catalog.][schema.]name`; only the last part is kept.
    fn object_name(&mut self, what: &str) -> Result<String, ParseError> {
        Ok(self.qualified_name(what)?.0)
    }

    fn qualified_name(&mut self, what: &str) -> Result<(String, bool), ParseError> {
        let mut name = self.expect_name(what)?;
        while self.at(&Token::Dot) {
            self.advance();
            name = self.expect_name(what)?;
        }
        Ok(name)
    }

    fn skip_balanced(&mut self) {
        if !self.at(&Token::LParen) {
            return;
        }
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip to the next `,` or `)` that closes the current clause.
    fn skip_to_clause_end(&mut self) {
        while let Some(token) = self.peek() {
            match token {
                Token::Comma | Token::RParen => return,
                Token::LParen => self.skip_balanced(),
                _ => self.advance(),
            }
        }
    }

    /// Text between a pair of parentheses, consuming both.
    fn paren_text(&mut self) -> Result<String, ParseError> {
        let Some(open) = self.tokens.get(self.pos) else {
            return Err(self.unexpected("`(`"));
        };
        if open.token != Token::LParen {
            return Err(self.unexpected("`(`"));
        }
        let start = open.end;
        self.skip_balanced();
        let close = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .filter(|spanned| spanned.token == Token::RParen && self.pos > 0)
            .ok_or_else(|| self.error("unbalanced parentheses"))?;
        Ok(self.source[start..close.start].trim().to_string())
    }

    /// `(a, b [ASC|DESC], c(10))` as used by key definitions.
    fn ident_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(&Token::LParen, "`(`")?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.expect_ident("column name")?);
            if self.at(&Token::LParen) {
                let prefix_length = matches!(self.peek_nth(1), Some(Token::Num(_)))
                    && matches!(self.peek_nth(2), Some(Token::RParen));
                if !prefix_length {
                    return Err(self.error("expressions are not supported in key column lists"));
                }
                self.pos += 3;
            }
            if !self.eat_keyword("ASC") {
                self.eat_keyword("DESC");
            }
            if self.eat_keyword("NULLS") && !self.eat_keyword("FIRST") {
                self.eat_keyword("LAST");
            }
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen, "`,` or `)`")?;
            return Ok(columns);
        }
    }

    fn summary(&self) -> String {
        self.tokens
            .iter()
            .take(3)
            .map(|spanned| token_text(self.source, spanned))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn parse_statement(
        &mut self,
        diagnostics: &mut Vec<ParseDiagnostic>,
    ) -> Result<Statement, ParseError> {
        let line = self.line();

        if self.eat_keyword("CREATE") {
            self.eat_keywords(&["OR", "REPLACE"]);
            let mut unique = false;
            loop {
                if ["GLOBAL", "LOCAL", "TEMP", "TEMPORARY", "UNLOGGED"]
                    .iter()
                    .any(|keyword| self.eat_keyword(keyword))
                {
                    continue;
                }
                if self.eat_keyword("UNIQUE") {
                    unique = true;
                    continue;
                }
                break;
            }
            if self.eat_keyword("TABLE") {
                return self.create_table(line, diagnostics);
            }
            if unique && self.eat_keyword("INDEX") {
                return self.unique_index(line, diagnostics);
            }
            if !unique && self.eat_keyword("TYPE") {
                let name = self.object_name("type name")?;
                if self.eat_keywords(&["AS", "ENUM"]) {
                    return self.enum_values(name);
                }
            }
        } else if self.at_keyword("ALTER") && self.peek_nth(1).is_some_and(|t| t.is_keyword("TABLE")) {
            self.pos += 2;
            return self.alter_table(line, diagnostics);
        }

        Ok(Statement::Skipped {
            line,
            summary: self.summary(),
            reason: "not a table definition".to_string(),
        })
    }

    fn create_table(
        &mut self,
        line: usize,
        diagnostics: &mut Vec<ParseDiagnostic>,
    ) -> Result<Statement, ParseError> {
        let if_not_exists = self.eat_keywords(&["IF", "NOT", "EXISTS"]);
        let (name, quoted) = self.qualified_name("table name")?;

        if !self.at(&Token::LParen) {
            return Ok(Statement::Skipped {
                line,
                summary: self.summary(),
                reason: format!("table {name} has no column list"),
            });
        }
        self.advance();

        let mut draft = TableDraft::new(name, line);
        draft.quoted = quoted;
        draft.if_not_exists = if_not_exists;
        loop {
            if self.peek().is_none() {
                return Err(self.error("unexpected end of statement inside table definition"));
            }
            if self.eat(&Token::RParen) {
                break;
            }
            self.table_element(&mut draft, diagnostics)?;
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen, "`,` or `)` in table definition")?;
            break;
        }

        debug!(
            table = %draft.name,
            columns = draft.columns.len(),
            constraints = draft.constraints.len(),
            "parsed table definition"
        );
        Ok(Statement::CreateTable(draft))
    }

    fn is_constraint_start(&self) -> bool {
        ["CONSTRAINT", "PRIMARY", "UNIQUE", "FOREIGN", "CHECK"]
            .iter()
            .any(|keyword| self.at_keyword(keyword))
    }

    fn table_element(
        &mut self,
        draft: &mut TableDraft,
        diagnostics: &mut Vec<ParseDiagnostic>,
    ) -> Result<(), ParseError> {
        if self.is_constraint_start() {
            return self.table_constraint(draft);
        }

        if self.at_index_clause() {
            self.skip_to_clause_end();
            return Ok(());
        }

        if ["EXCLUDE", "LIKE", "PERIOD"]
            .iter()
            .any(|keyword| self.at_keyword(keyword))
        {
            diagnostics.push(
                ParseDiagnostic::warning(
                    "clause_ignored",
                    format!("unsupported clause `{}` ignored", self.summary_here()),
                )
                .with_table(&draft.name)
                .with_line(self.line()),
            );
            self.skip_to_clause_end();
            return Ok(());
        }

        self.column_definition(draft, diagnostics)
    }

    /// MySQL `KEY|INDEX [name] (cols)`. A column named `key` is told apart by
    /// its type: either an unknown type word, or a known one followed by a
    /// parenthesized column list rather than a length.
    fn at_index_clause(&self) -> bool {
        let index_like = ["KEY", "INDEX", "FULLTEXT", "SPATIAL"]
            .iter()
            .any(|keyword| self.at_keyword(keyword));
        if !index_like {
            return false;
        }
        match self.peek_nth(1) {
            Some(Token::LParen) => true,
            Some(Token::Word(word)) if is_known_type_word(word, self.dialect) => {
                matches!(self.peek_nth(2), Some(Token::LParen))
                    && matches!(self.peek_nth(3), Some(Token::Word(_) | Token::Quoted(_)))
            }
            _ => true,
        }
    }

    fn summary_here(&self) -> String {
        self.tokens
            .get(self.pos)
            .map(|spanned| token_text(self.source, spanned))
            .unwrap_or_default()
    }

    fn table_constraint(&mut self, draft: &mut TableDraft) -> Result<(), ParseError> {
        let mut name = if self.eat_keyword("CONSTRAINT") {
            Some(self.expect_ident("constraint name")?)
        } else {
            None
        };

        if self.eat_keywords(&["PRIMARY", "KEY"]) {
            let columns = self.ident_list()?;
            draft
                .constraints
                .push(Constraint::PrimaryKey(PrimaryKey { name, columns }));
        } else if self.eat_keyword("UNIQUE") {
            if !self.eat_keyword("KEY") {
                self.eat_keyword("INDEX");
            }
            if !self.at(&Token::LParen) {
                let index_name = self.expect_ident("index name or `(`")?;
                name = name.or(Some(index_name));
            }
            let columns = self.ident_list()?;
            draft
                .constraints
                .push(Constraint::Unique(UniqueConstraint { name, columns }));
        } else if self.eat_keywords(&["FOREIGN", "KEY"]) {
            if !self.at(&Token::LParen) {
                let index_name = self.expect_ident("index name or `(`")?;
                name = name.or(Some(index_name));
            }
            let columns = self.ident_list()?;
            self.expect_keyword("REFERENCES")?;
            let fk = self.references(name, columns)?;
            draft.constraints.push(Constraint::ForeignKey(fk));
        } else if self.eat_keyword("CHECK") {
            let expression = self.paren_text()?;
            draft
                .constraints
                .push(Constraint::Check(CheckConstraint { name, expression }));
        } else {
            return Err(self.unexpected("PRIMARY KEY, UNIQUE, FOREIGN KEY or CHECK"));
        }

        self.skip_to_clause_end();
        Ok(())
    }

    /// Everything after `REFERENCES`.
    fn references(&mut self, name: Option<String>, columns: Vec<String>) -> Result<ForeignKey, ParseError> {
        let referenced_table = self.object_name("referenced table")?;
        let referenced_columns = if self.at(&Token::LParen) {
            self.ident_list()?
        } else {
            Vec::new()
        };

        let mut fk = ForeignKey {
            name,
            columns,
            referenced_table,
            referenced_columns,
            on_update: FkAction::NoAction,
            on_delete: FkAction::NoAction,
        };

        loop {
            if self.eat_keyword("MATCH") {
                self.advance();
            } else if self.eat_keywords(&["ON", "DELETE"]) {
                fk.on_delete = self.fk_action()?;
            } else if self.eat_keywords(&["ON", "UPDATE"]) {
                fk.on_update = self.fk_action()?;
            } else if self.eat_keyword("DEFERRABLE")
                || self.eat_keywords(&["NOT", "DEFERRABLE"])
            {
            } else if self.eat_keyword("INITIALLY") {
                self.advance();
            } else {
                return Ok(fk);
            }
        }
    }

    fn fk_action(&mut self) -> Result<FkAction, ParseError> {
        if self.eat_keyword("CASCADE") {
            Ok(FkAction::Cascade)
        } else if self.eat_keyword("RESTRICT") {
            Ok(FkAction::Restrict)
        } else if self.eat_keywords(&["NO", "ACTION"]) {
            Ok(FkAction::NoAction)
        } else if self.eat_keywords(&["SET", "NULL"]) {
            Ok(FkAction::SetNull)
        } else if self.eat_keywords(&["SET", "DEFAULT"]) {
            Ok(FkAction::SetDefault)
        } else {
            Err(self.unexpected("referential action"))
        }
    }

    fn column_definition(
        &mut self,
        draft: &mut TableDraft,
        diagnostics: &mut Vec<ParseDiagnostic>,
    ) -> Result<(), ParseError> {
        let line = self.line();
        let (name, quoted) = self.expect_name("column name")?;

        let starts_type = match self.peek() {
            Some(Token::Word(word)) => !COLUMN_STOP_WORDS
                .iter()
                .chain(["DEFAULT"].iter())
                .any(|stop| word.eq_ignore_ascii_case(stop)),
            Some(Token::Quoted(_)) => true,
            _ => false,
        };
        let spec = if starts_type {
            Some(self.type_spec()?)
        } else if self.dialect == Dialect::Sqlite {
            None
        } else {
            return Err(self.unexpected(&format!("type for column {name}")));
        };

        let mut column = ColumnDraft {
            name,
            quoted,
            line,
            spec,
            nullable: None,
            default: None,
            auto_increment: false,
        };
        self.column_modifiers(draft, &mut column, diagnostics)?;
        draft.columns.push(column);
        Ok(())
    }

    fn type_spec(&mut self) -> Result<TypeSpec, ParseError> {
        let start = self.tokens.get(self.pos).map(|spanned| spanned.start).unwrap_or(0);
        let first = self.expect_ident("column type")?;
        let mut spec = TypeSpec {
            words: vec![first.to_ascii_lowercase()],
            ..TypeSpec::default()
        };
        self.type_continuation(&mut spec);

        if self.at(&Token::LParen) {
            self.advance();
            let mut depth = 1usize;
            let mut current: Vec<String> = Vec::new();
            loop {
                let Some(spanned) = self.tokens.get(self.pos) else {
                    return Err(self.error("unterminated type arguments"));
                };
                match &spanned.token {
                    Token::LParen => depth += 1,
                    Token::RParen => {
                        depth -= 1;
                        if depth == 0 {
                            self.advance();
                            break;
                        }
                    }
                    Token::Comma if depth == 1 => {
                        spec.args.push(current.join(" "));
                        current.clear();
                        self.advance();
                        continue;
                    }
                    _ => {}
                }
                current.push(match &spanned.token {
                    Token::Str(text) => text.clone(),
                    _ => token_text(self.source, spanned),
                });
                self.advance();
            }
            if !current.is_empty() {
                spec.args.push(current.join(" "));
            }
            self.type_continuation(&mut spec);
        }

        while self.at(&Token::LBracket) {
            self.advance();
            if matches!(self.peek(), Some(Token::Num(_))) {
                self.advance();
            }
            self.expect(&Token::RBracket, "`]`")?;
            spec.is_array = true;
        }
        if self.eat_keyword("ARRAY") {
            spec.is_array = true;
        }

        let end = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map(|spanned| spanned.end)
            .unwrap_or(start);
        spec.raw = self.source[start..end].to_string();
        Ok(spec)
    }

    fn type_continuation(&mut self, spec: &mut TypeSpec) {
        loop {
            let Some(Token::Word(word)) = self.peek() else {
                return;
            };
            let upper = word.to_ascii_uppercase();
            let first = spec.words.first().map(String::as_str).unwrap_or("");
            let accept = match upper.as_str() {
                "PRECISION" | "VARYING" | "UNSIGNED" | "SIGNED" | "ZEROFILL" => true,
                "VARCHAR" | "CHAR" | "CHARACTER" => first == "national" && spec.words.len() == 1,
                "RAW" => first == "long",
                "WITH" | "WITHOUT" => {
                    let time_at = if self.peek_nth(1).is_some_and(|t| t.is_keyword("LOCAL")) {
                        2
                    } else {
                        1
                    };
                    if self.peek_nth(time_at).is_some_and(|t| t.is_keyword("TIME")) {
                        for _ in 0..=time_at {
                            if let Some(Token::Word(word)) = self.peek() {
                                spec.words.push(word.to_ascii_lowercase());
                            }
                            self.advance();
                        }
                        if let Some(Token::Word(word)) = self.peek()
                            && word.eq_ignore_ascii_case("ZONE")
                        {
                            spec.words.push("zone".to_string());
                            self.advance();
                        }
                        continue;
                    }
                    false
                }
                _ => false,
            };
            if !accept {
                return;
            }
            spec.words.push(upper.to_ascii_lowercase());
            self.advance();
        }
    }

    fn column_modifiers(
        &mut self,
        draft: &mut TableDraft,
        column: &mut ColumnDraft,
        diagnostics: &mut Vec<ParseDiagnostic>,
    ) -> Result<(), ParseError> {
        let mut pending_name: Option<String> = None;

        loop {
            let Some(token) = self.peek() else {
                return Ok(());
            };
            let word = match token {
                Token::Comma | Token::RParen => return Ok(()),
                Token::Word(word) => word.to_ascii_uppercase(),
                _ => {
                    diagnostics.push(
                        ParseDiagnostic::warning(
                            "column_option_ignored",
                            format!("unexpected `{}` in column definition", self.summary_here()),
                        )
                        .with_table(&draft.name)
                        .with_column(&column.name)
                        .with_line(self.line()),
                    );
                    if self.at(&Token::LParen) {
                        self.skip_balanced();
                    } else {
                        self.advance();
                    }
                    continue;
                }
            };

            self.advance();
            match word.as_str() {
                "CONSTRAINT" => pending_name = Some(self.expect_ident("constraint name")?),
                "NOT" => {
                    if self.eat_keyword("NULL") {
                        column.nullable = Some(false);
                    } else if !self.eat_keyword("DEFERRABLE") {
                        return Err(self.unexpected("NULL"));
                    }
                }
                "NULL" => column.nullable = Some(true),
                "PRIMARY" => {
                    self.expect_keyword("KEY")?;
                    if !self.eat_keyword("ASC") {
                        self.eat_keyword("DESC");
                    }
                    if self.eat_keywords(&["ON", "CONFLICT"]) {
                        self.advance();
                    }
                    if self.eat_keyword("AUTOINCREMENT") {
                        column.auto_increment = true;
                    }
                    draft.constraints.push(Constraint::PrimaryKey(PrimaryKey {
                        name: pending_name.take(),
                        columns: vec![column.name.clone()],
                    }));
                }
                "UNIQUE" => {
                    self.eat_keyword("KEY");
                    draft.constraints.push(Constraint::Unique(UniqueConstraint {
                        name: pending_name.take(),
                        columns: vec![column.name.clone()],
                    }));
                }
                "REFERENCES" => {
                    let fk = self.references(pending_name.take(), vec![column.name.clone()])?;
                    draft.constraints.push(Constraint::ForeignKey(fk));
                }
                "CHECK" => {
                    let expression = self.paren_text()?;
                    draft.constraints.push(Constraint::Check(CheckConstraint {
                        name: pending_name.take(),
                        expression,
                    }));
                }
                "DEFAULT" => column.default = Some(self.default_expression()?),
                "AUTO_INCREMENT" | "AUTOINCREMENT" => column.auto_increment = true,
                "IDENTITY" => {
                    self.skip_balanced();
                    column.auto_increment = true;
                }
                "GENERATED" => {
                    if !self.eat_keyword("ALWAYS") {
                        self.eat_keywords(&["BY", "DEFAULT"]);
                        self.eat_keywords(&["ON", "NULL"]);
                    }
                    self.expect_keyword("AS")?;
                    if self.eat_keyword("IDENTITY") {
                        column.auto_increment = true;
                    }
                    self.skip_balanced();
                }
                "AS" => self.skip_balanced(),
                "COLLATE" => {
                    self.object_name("collation")?;
                }
                "COMMENT" => self.advance(),
                "CHARACTER" => {
                    if self.eat_keyword("SET") {
                        self.advance();
                    }
                }
                "CHARSET" => self.advance(),
                "ON" => {
                    self.advance();
                    self.advance();
                    self.skip_balanced();
                }
                "INITIALLY" => self.advance(),
                "UNSIGNED" | "SIGNED" | "ZEROFILL" | "VISIBLE" | "INVISIBLE" | "ENABLE"
                | "DISABLE" | "DEFERRABLE" | "STORED" | "VIRTUAL" | "PERSISTENT" | "ASC"
                | "DESC" => {}
                other => {
                    diagnostics.push(
                        ParseDiagnostic::warning(
                            "column_option_ignored",
                            format!("unknown column option `{other}` ignored"),
                        )
                        .with_table(&draft.name)
                        .with_column(&column.name)
                        .with_line(self.line()),
                    );
                    self.skip_balanced();
                }
            }
        }
    }

    /// Source text of a DEFAULT expression, up to the next column option.
    fn default_expression(&mut self) -> Result<String, ParseError> {
        let Some(first) = self.tokens.get(self.pos) else {
            return Err(self.unexpected("default value"));
        };
        let start = first.start;
        let mut consumed_any = false;

        while let Some(token) = self.peek() {
            let stop = match token {
                Token::Comma | Token::RParen => true,
                Token::Word(word) if consumed_any => COLUMN_STOP_WORDS
                    .iter()
                    .any(|stop| word.eq_ignore_ascii_case(stop)),
                _ => false,
            };
            if stop {
                break;
            }
            if self.at(&Token::LParen) {
                self.skip_balanced();
            } else {
                self.advance();
            }
            consumed_any = true;
        }

        if !consumed_any {
            return Err(self.unexpected("default value"));
        }
        let end = self.tokens[self.pos - 1].end;
        Ok(self.source[start..end].trim().to_string())
    }

    fn alter_table(
        &mut self,
        line: usize,
        diagnostics: &mut Vec<ParseDiagnostic>,
    ) -> Result<Statement, ParseError> {
        self.eat_keywords(&["IF", "EXISTS"]);
        self.eat_keyword("ONLY");
        let name = self.object_name("table name")?;
        let mut draft = TableDraft::new(name, line);

        loop {
            if self.eat_keyword("ADD") {
                if self.is_constraint_start() {
                    self.table_constraint(&mut draft)?;
                } else if self.eat(&Token::LParen) {
                    loop {
                        self.column_definition(&mut draft, diagnostics)?;
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                    self.expect(&Token::RParen, "`)`")?;
                } else {
                    self.eat_keyword("COLUMN");
                    self.eat_keywords(&["IF", "NOT", "EXISTS"]);
                    self.column_definition(&mut draft, diagnostics)?;
                }
            } else {
                diagnostics.push(
                    ParseDiagnostic::info(
                        "alter_action_skipped",
                        format!("ALTER TABLE action `{}` ignored", self.summary_here()),
                    )
                    .with_table(&draft.name)
                    .with_line(self.line()),
                );
                self.skip_to_clause_end();
            }

            if !self.eat(&Token::Comma) {
                break;
            }
        }

        Ok(Statement::AlterTable(draft))
    }

    fn enum_values(&mut self, name: String) -> Result<Statement, ParseError> {
        self.expect(&Token::LParen, "`(`")?;
        let mut values = Vec::new();
        while let Some(Token::Str(value)) = self.peek() {
            values.push(value.clone());
            self.advance();
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen, "`)`")?;
        Ok(Statement::EnumType { name, values })
    }

    fn unique_index(
        &mut self,
        line: usize,
        diagnostics: &mut Vec<ParseDiagnostic>,
    ) -> Result<Statement, ParseError> {
        self.eat_keyword("CONCURRENTLY");
        self.eat_keywords(&["IF", "NOT", "EXISTS"]);
        let name = if self.at_keyword("ON") {
            None
        } else {
            Some(self.object_name("index name")?)
        };
        self.expect_keyword("ON")?;
        self.eat_keyword("ONLY");
        let table = self.object_name("table name")?;
        if self.eat_keyword("USING") {
            self.advance();
        }

        let saved = self.pos;
        let columns = match self.ident_list() {
            Ok(columns) => columns,
            Err(_) => {
                self.pos = saved;
                return Ok(skipped_index(line, name, &table, "indexes an expression", diagnostics));
            }
        };
        if self.eat_keyword("WHERE") {
            return Ok(skipped_index(line, name, &table, "is partial", diagnostics));
        }

        Ok(Statement::UniqueIndex {
            table,
            line,
            constraint: Constraint::Unique(UniqueConstraint { name, columns }),
        })
    }
}

fn skipped_index(
    line: usize,
    name: Option<String>,
    table: &str,
    reason: &str,
    diagnostics: &mut Vec<ParseDiagnostic>,
) -> Statement {
    let label = name.unwrap_or_else(|| "(unnamed)".to_string());
    diagnostics.push(
        ParseDiagnostic::warning(
            "unique_index_ignored",
            format!("unique index {label} {reason} and is not enforced during generation"),
        )
        .with_table(table)
        .with_line(line),
    );
    Statement::Skipped {
        line,
        summary: format!("CREATE UNIQUE INDEX {label}"),
        reason: format!("index {reason}"),
    }
}

fn token_text(source: &str, spanned: &Spanned) -> String {
    source
        .get(spanned.start..spanned.end)
        .unwrap_or_default()
        .to_string()
}

fn describe(token: &Token) -> String {
    match token {
        Token::Word(word) => format!("`{word}`"),
        Token::Quoted(ident) => format!("identifier \"{ident}\""),
        Token::Str(text) => format!("string '{text}'"),
        Token::Num(number) => format!("number {number}"),
        Token::LParen => "`(`".to_string(),
        Token::RParen => "`)`".to_string(),
        Token::Comma => "`,`".to_string(),
        Token::Semicolon => "`;`".to_string(),
        Token::Dot => "`.`".to_string(),
        Token::LBracket => "`[`".to_string(),
        Token::RBracket => "`]`".to_string(),
        Token::Op(op) => format!("`{op}`"),
    }
}
