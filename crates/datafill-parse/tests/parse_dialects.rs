use std::fs;
use std::path::PathBuf;

use datafill_core::{Constraint, DataType, Dialect, FkAction, IntegerWidth, order};
use datafill_parse::{DiagnosticLevel, ParseError, parse, parse_schema};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture at {}", path.display()))
}

#[test]
fn library_schema_parses_in_declaration_order() {
    let result = parse(&fixture("library.postgres.sql"), Dialect::Postgres).expect("parse library");
    let schema = &result.schema;

    let names: Vec<&str> = schema.table_names().collect();
    assert_eq!(
        names,
        vec!["Authors", "Categories", "Books", "Members", "Loans", "Penalties"]
    );
    assert_eq!(result.warnings().count(), 0);

    let authors = schema.table("authors").expect("authors");
    let author_id = authors.column("author_id").expect("author_id");
    assert!(author_id.is_primary_key);
    assert!(!author_id.is_nullable);
    assert!(author_id.data_type.is_auto_increment());
    assert_eq!(author_id.raw_type, "SERIAL");
    assert_eq!(
        authors.column("sex").unwrap().data_type,
        DataType::Char { length: Some(1) }
    );
    assert_eq!(
        authors.unique_sets(),
        vec![
            vec!["author_id".to_string()],
            vec!["first_name".to_string(), "last_name".to_string()],
        ]
    );

    let books = schema.table("Books").expect("books");
    assert_eq!(books.foreign_keys().count(), 2);
    assert!(books.column("isbn").unwrap().is_unique);
    assert_eq!(
        books.column("penalty_rate").unwrap().data_type,
        DataType::Decimal {
            precision: Some(5),
            scale: Some(2)
        }
    );
    let checks: Vec<&str> = books
        .constraints
        .iter()
        .filter_map(|constraint| match constraint {
            Constraint::Check(check) => Some(check.expression.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(checks[0], r"isbn ~ '^\d{13}$'");
    assert!(checks[1].starts_with("publication_year >= 1900"));

    let loans = schema.table("Loans").expect("loans");
    assert!(loans.column("return_date").unwrap().is_nullable);
    assert!(!loans.column("due_date").unwrap().is_nullable);
}

#[test]
fn library_generation_order_respects_foreign_keys() {
    let schema = parse_schema(&fixture("library.postgres.sql"), Dialect::Postgres).unwrap();
    assert_eq!(
        order(&schema).unwrap(),
        vec!["Authors", "Categories", "Books", "Members", "Loans", "Penalties"]
    );
}

#[test]
fn inline_and_table_level_constraints_are_identical() {
    let inline = "
        CREATE TABLE authors (
            id INTEGER PRIMARY KEY,
            name VARCHAR(40) NOT NULL UNIQUE
        );
        CREATE TABLE books (
            id INTEGER PRIMARY KEY,
            author_id INTEGER NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
            editor_id INTEGER REFERENCES authors,
            isbn CHAR(13) UNIQUE,
            CHECK (id > 0)
        );
    ";
    let table_level = "
        CREATE TABLE authors (
            id INTEGER NOT NULL,
            name VARCHAR(40) NOT NULL,
            PRIMARY KEY (id),
            UNIQUE (name)
        );
        CREATE TABLE books (
            id INTEGER,
            author_id INTEGER NOT NULL,
            editor_id INTEGER,
            isbn CHAR(13),
            PRIMARY KEY (id),
            FOREIGN KEY (author_id) REFERENCES authors (id) ON DELETE CASCADE,
            FOREIGN KEY (editor_id) REFERENCES authors (id),
            UNIQUE (isbn),
            CHECK (id > 0)
        );
    ";

    for dialect in Dialect::ALL {
        let a = parse_schema(inline, dialect).expect("inline form");
        let b = parse_schema(table_level, dialect).expect("table-level form");
        assert_eq!(a, b, "forms differ for {dialect}");
    }

    let schema = parse_schema(inline, Dialect::Postgres).unwrap();
    let books = schema.table("books").unwrap();
    let kinds: Vec<u8> = books.constraints.iter().map(Constraint::kind_rank).collect();
    assert_eq!(kinds, vec![0, 1, 2, 2, 3]);
    let editor = books.foreign_key_for("editor_id").unwrap();
    assert_eq!(editor.referenced_columns, vec!["id".to_string()]);
    assert_eq!(
        books.foreign_key_for("author_id").unwrap().on_delete,
        FkAction::Cascade
    );
}

#[test]
fn parse_is_idempotent() {
    let text = fixture("library.postgres.sql");
    let first = parse(&text, Dialect::Postgres).unwrap();
    let second = parse(&text, Dialect::Postgres).unwrap();
    assert_eq!(first.schema, second.schema);
    assert_eq!(first.diagnostics, second.diagnostics);
}

#[test]
fn mysql_dump_parses() {
    let result = parse(&fixture("shop.mysql.sql"), Dialect::Mysql).expect("parse mysql dump");
    let schema = &result.schema;

    let customers = schema.table("customers").unwrap();
    let id = customers.column("id").unwrap();
    assert!(id.data_type.is_auto_increment());
    assert_eq!(id.raw_type, "int(11) unsigned");
    assert_eq!(
        customers.column("is_active").unwrap().data_type,
        DataType::Boolean
    );
    assert_eq!(
        customers.column("is_active").unwrap().default.as_deref(),
        Some("'1'")
    );
    assert_eq!(
        customers.column("created_at").unwrap().default.as_deref(),
        Some("CURRENT_TIMESTAMP")
    );
    let unique = customers.unique_constraints().next().unwrap();
    assert_eq!(unique.name.as_deref(), Some("uq_customers_email"));
    assert_eq!(customers.constraints.len(), 2);

    let orders = schema.table("orders").unwrap();
    assert_eq!(
        orders.column("status").unwrap().data_type,
        DataType::Enum {
            values: vec![
                "pending".to_string(),
                "paid".to_string(),
                "shipped".to_string(),
                "cancelled".to_string()
            ]
        }
    );
    let fk = orders.foreign_keys().next().unwrap();
    assert_eq!(fk.name.as_deref(), Some("fk_orders_customer"));
    assert_eq!(fk.on_delete, FkAction::Cascade);

    let items = schema.table("order_items").unwrap();
    assert_eq!(
        items.primary_key().unwrap().columns,
        vec!["order_id".to_string(), "sku".to_string()]
    );
    assert!(items.column("sku").unwrap().is_primary_key);
    assert!(!items.column("sku").unwrap().is_unique);
}

#[test]
fn mysql_index_lines_named_like_types_are_skipped() {
    let ddl = "
        CREATE TABLE events (
          id INT PRIMARY KEY,
          year INT NOT NULL,
          d DATE,
          time TIME,
          KEY year (year),
          KEY date (d),
          INDEX time (time),
          KEY (d, year),
          FULLTEXT KEY ft_text (d)
        );
    ";
    let schema = parse_schema(ddl, Dialect::Mysql).expect("parse events");
    let events = schema.table("events").expect("events");

    let columns: Vec<&str> = events.columns.iter().map(|column| column.name.as_str()).collect();
    assert_eq!(columns, vec!["id", "year", "d", "time"]);
    assert_eq!(events.constraints.len(), 1);
}

#[test]
fn quoted_identifiers_are_marked() {
    let schema = parse_schema(
        r#"CREATE TABLE "Authors" ("AuthorId" INT PRIMARY KEY, name TEXT);"#,
        Dialect::Postgres,
    )
    .expect("parse");
    let authors = schema.table("Authors").expect("authors");
    assert!(authors.quoted);
    assert!(authors.column("AuthorId").expect("AuthorId").quoted);
    assert!(!authors.column("name").expect("name").quoted);

    let mysql = parse_schema("CREATE TABLE `t` (`Id` INT, v INT);", Dialect::Mysql).expect("parse");
    let table = mysql.table("t").expect("t");
    assert!(table.quoted);
    assert!(table.column("Id").expect("Id").quoted);
    assert!(!table.column("v").expect("v").quoted);
}

#[test]
fn backticks_fail_to_tokenize_for_postgres() {
    let err = parse("CREATE TABLE `users` (id INT);", Dialect::Postgres).unwrap_err();
    match err {
        ParseError::Tokenize { fragment, .. } => assert!(fragment.starts_with("`users`")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn oracle_script_with_slash_terminators() {
    let schema = parse_schema(&fixture("hr.oracle.sql"), Dialect::Oracle).expect("parse oracle");
    assert_eq!(schema.tables.len(), 2);

    let departments = schema.table("departments").unwrap();
    assert_eq!(
        departments.column("department_id").unwrap().data_type,
        DataType::Integer {
            width: IntegerWidth::Small,
            auto_increment: true
        }
    );

    let employees = schema.table("employees").unwrap();
    let manager = employees.foreign_key_for("manager_id").unwrap();
    assert_eq!(manager.referenced_table, "employees");
    assert_eq!(manager.referenced_columns, vec!["employee_id".to_string()]);
    assert!(employees.column("email").unwrap().is_unique);

    assert_eq!(order(&schema).unwrap(), vec!["departments", "employees"]);
}

#[test]
fn sqlite_brackets_and_rowid_alias() {
    let schema = parse_schema(
        "CREATE TABLE [line items] ([item id] INTEGER PRIMARY KEY, label, price REAL);",
        Dialect::Sqlite,
    )
    .unwrap();
    let table = schema.table("line items").unwrap();
    assert!(table.column("item id").unwrap().data_type.is_auto_increment());
    assert_eq!(table.column("label").unwrap().data_type, DataType::text());
    assert_eq!(table.column("price").unwrap().data_type, DataType::Float);
}

#[test]
fn pg_dump_alter_table_and_unique_index() {
    let result = parse(
        "
        CREATE TABLE public.authors (id integer NOT NULL, email text);
        CREATE TABLE public.books (id integer NOT NULL, author_id integer);
        ALTER TABLE ONLY public.authors ADD CONSTRAINT authors_pkey PRIMARY KEY (id);
        ALTER TABLE ONLY public.books ADD CONSTRAINT books_pkey PRIMARY KEY (id);
        ALTER TABLE ONLY public.books
            ADD CONSTRAINT books_author_id_fkey FOREIGN KEY (author_id) REFERENCES public.authors(id);
        CREATE UNIQUE INDEX authors_email_key ON public.authors USING btree (email);
        CREATE INDEX books_author_idx ON public.books (author_id);
        ",
        Dialect::Postgres,
    )
    .expect("parse pg_dump output");

    let authors = result.schema.table("authors").unwrap();
    assert_eq!(
        authors.primary_key().unwrap().name.as_deref(),
        Some("authors_pkey")
    );
    assert!(authors.column("email").unwrap().is_unique);

    let books = result.schema.table("books").unwrap();
    assert_eq!(books.foreign_keys().count(), 1);
    assert!(
        result
            .diagnostics
            .iter()
            .any(|d| d.code == "statement_skipped" && d.level == DiagnosticLevel::Info)
    );
}

#[test]
fn postgres_enum_types_become_enums() {
    let schema = parse_schema(
        "CREATE TYPE mood AS ENUM ('sad', 'ok', 'happy');
         CREATE TABLE person (id serial primary key, current_mood mood NOT NULL);",
        Dialect::Postgres,
    )
    .unwrap();
    let column = schema.table("person").unwrap().column("current_mood").unwrap();
    assert_eq!(
        column.data_type,
        DataType::Enum {
            values: vec!["sad".to_string(), "ok".to_string(), "happy".to_string()]
        }
    );
}

#[test]
fn unknown_types_are_kept_as_opaque_with_warning() {
    let result = parse(
        "CREATE TABLE events (id INT PRIMARY KEY, payload JSONB, tags TEXT[]);",
        Dialect::Postgres,
    )
    .unwrap();
    let events = result.schema.table("events").unwrap();
    assert_eq!(
        events.column("payload").unwrap().data_type,
        DataType::Opaque {
            raw: "JSONB".to_string()
        }
    );
    assert_eq!(
        events.column("tags").unwrap().data_type,
        DataType::Opaque {
            raw: "TEXT[]".to_string()
        }
    );
    let warned: Vec<_> = result
        .warnings()
        .filter(|d| d.code == "unknown_type")
        .filter_map(|d| d.column.clone())
        .collect();
    assert_eq!(warned, vec!["payload".to_string(), "tags".to_string()]);
}

#[test]
fn rejects_scripts_without_tables() {
    let err = parse("INSERT INTO t VALUES (1);", Dialect::Sqlite).unwrap_err();
    assert!(matches!(err, ParseError::NoCreateTable));
}

#[test]
fn rejects_constraint_on_unknown_column() {
    let err = parse(
        "CREATE TABLE t (id INT, PRIMARY KEY (missing));",
        Dialect::Mysql,
    )
    .unwrap_err();
    match err {
        ParseError::UnknownColumn { table, column, .. } => {
            assert_eq!(table, "t");
            assert_eq!(column, "missing");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn rejects_reference_to_unknown_table() {
    let err = parse(
        "CREATE TABLE books (id INT PRIMARY KEY, author_id INT REFERENCES authors(id));",
        Dialect::Postgres,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::UnknownTable { ref table, .. } if table == "authors"));
}

#[test]
fn unique_index_on_unknown_table_names_its_line() {
    let ddl = "CREATE TABLE books (id INT PRIMARY KEY, isbn TEXT);\n\nCREATE UNIQUE INDEX uq_isbn ON novels (isbn);\n";
    let err = parse(ddl, Dialect::Postgres).unwrap_err();
    match err {
        ParseError::UnknownTable { table, context } => {
            assert_eq!(table, "novels");
            assert_eq!(context, "unique index uq_isbn on line 3");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn rejects_conflicting_primary_keys() {
    let err = parse(
        "CREATE TABLE t (a INT PRIMARY KEY, b INT, PRIMARY KEY (b));",
        Dialect::Postgres,
    )
    .unwrap_err();
    assert!(matches!(err, ParseError::ConflictingPrimaryKey { .. }));
}

#[test]
fn syntax_errors_report_line_and_fragment() {
    let err = parse(
        "CREATE TABLE t (\n  id INT,\n  , name TEXT\n);",
        Dialect::Postgres,
    )
    .unwrap_err();
    match err {
        ParseError::Syntax {
            line,
            fragment,
            message,
        } => {
            assert_eq!(line, 3);
            assert!(fragment.starts_with(", name TEXT"));
            assert!(message.contains("column name"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}
