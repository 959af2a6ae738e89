#[cfg(test)]
mod tests {
    use indoc::indoc;
    use quarry::{
        BuiltStatement, CancellationToken, ColumnDef, Columns, DialectKind, Entity, MappingError,
        Parameter, RowOptions, RowsAffected, SchemaCache, Session, Settings, StatementObserver,
        TableDef, Value,
    };
    use quarry_tests::{ScriptedDriver, init_logs};
    use std::sync::{Arc, Mutex};

    #[derive(Entity, Default, Debug, Clone, PartialEq)]
    struct User {
        id: i64,
        name: String,
        email: Option<String>,
        active: bool,
    }

    const LABELS: [&str; 4] = ["id", "name", "email", "active"];

    fn schema() -> Arc<SchemaCache> {
        let schema = SchemaCache::new();
        schema
            .register(
                TableDef::table("users")
                    .column(ColumnDef::new("id").primary_key().identity().of::<i64>())
                    .column(ColumnDef::new("name").of::<String>())
                    .column(ColumnDef::new("email").of::<String>())
                    .column(ColumnDef::new("active").of::<bool>()),
            )
            .expect("users should register");
        Arc::new(schema)
    }

    fn session(driver: &ScriptedDriver, dialect: DialectKind) -> Session<ScriptedDriver> {
        init_logs();
        Session::new(driver.clone(), Settings::new(dialect), schema())
    }

    fn ada_row(id: i64) -> Vec<Value> {
        vec![
            Value::from(id),
            Value::from("Ada"),
            Value::Varchar(None),
            Value::from(true),
        ]
    }

    fn kind(error: &quarry::Error) -> MappingError {
        MappingError::kind_of(error)
            .cloned()
            .unwrap_or_else(|| panic!("Expected a mapping error, got {error:#}"))
    }

    #[derive(Default)]
    struct Recorder {
        prepared: Mutex<Vec<String>>,
        executed: Mutex<Vec<Option<u64>>>,
    }

    impl StatementObserver for Recorder {
        fn prepared(&self, statement: &BuiltStatement) {
            if let Ok(mut prepared) = self.prepared.lock() {
                prepared.push(statement.sql.clone());
            }
        }
        fn executed(&self, _statement: &BuiltStatement, result: &RowsAffected) {
            if let Ok(mut executed) = self.executed.lock() {
                executed.push(result.rows_affected);
            }
        }
    }

    #[test]
    fn forwarded_identity() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver, DialectKind::MySql);
        driver.affected(1, Some(42)).rows(LABELS, vec![ada_row(42)]);
        let insert = session
            .insert("users")
            .expect("users is known")
            .values([("name", Value::from("Ada")), ("active", Value::from(true))])
            .returning(Columns::All);
        let user = session
            .fetch_one::<User>(insert, None)
            .expect("the inserted row is read back")
            .expect("one row");
        assert_eq!(user.id, 42);
        let executed = driver.executed();
        assert_eq!(executed.len(), 2);
        assert_eq!(
            executed[0].0,
            indoc! {"
                INSERT INTO `users` (`name`, `active`)
                VALUES (?, ?);
            "}
            .trim()
        );
        assert_eq!(
            executed[1].0,
            indoc! {"
                SELECT `id`, `name`, `email`, `active`
                FROM `users`
                WHERE `id` = ?;
            "}
            .trim()
        );
        assert_eq!(executed[1].1, [Parameter::new("id", 42i64)]);
    }

    #[test]
    fn forwarded_identity_missing() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver, DialectKind::MySql);
        driver.affected(1, None).rows(LABELS, vec![ada_row(42)]);
        let insert = session
            .insert("users")
            .expect("users is known")
            .values([("name", Value::from("Ada"))])
            .returning(["id"]);
        let error = session.fetch_scalar::<i64>(insert, None).unwrap_err();
        assert!(matches!(kind(&error), MappingError::RowCountUnavailable(..)));
        // The read back is never sent.
        assert_eq!(driver.statements().len(), 1);
        assert_eq!(driver.pending(), 1);
    }

    #[test]
    fn forwarded_identity_from_rows() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver, DialectKind::MySql);
        driver
            .rows(["id"], vec![vec![Value::from(42i64)]])
            .rows(LABELS, vec![ada_row(42)]);
        let insert = session
            .insert("users")
            .expect("users is known")
            .values([("name", Value::from("Ada"))])
            .returning(Columns::All);
        let error = session.fetch_one::<User>(insert, None).unwrap_err();
        assert!(matches!(kind(&error), MappingError::RowCountUnavailable(..)));
        assert_eq!(driver.statements().len(), 1);
        assert!(driver.cursors()[0].closed);
    }

    #[test]
    fn requery_after_insert() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver, DialectKind::Sqlite);
        driver
            .affected(1, Some(9))
            .rows(["id"], vec![vec![Value::from(9i64)]]);
        let insert = session
            .insert("users")
            .expect("users is known")
            .values([("name", Value::from("Ada"))])
            .returning(Columns::Key);
        let id = session
            .fetch_scalar::<i64>(insert, None)
            .expect("the generated key is read back");
        assert_eq!(id, Some(9));
        assert_eq!(
            driver.statements()[1],
            indoc! {r#"
                SELECT "id"
                FROM "users"
                WHERE "rowid" = last_insert_rowid();
            "#}
            .trim()
        );
    }

    #[test]
    fn row_count_checks() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver, DialectKind::Postgres);
        let update = session
            .update("users")
            .expect("users is known")
            .set([("id", Value::from(7i64)), ("name", Value::from("Ada"))])
            .build()
            .expect("update by key");
        assert_eq!(update.expected_rows, Some(1));

        driver.affected(0, None);
        let error = session.execute(update.clone()).unwrap_err();
        assert_eq!(
            kind(&error),
            MappingError::RowCountMismatch {
                expected: 1,
                actual: 0,
            }
        );
        assert!(format!("{error:#}").starts_with("While executing `UPDATE \"users\""));

        driver.affected(2, None);
        let error = session.execute(update.clone()).unwrap_err();
        assert!(kind(&error).is_cardinality());

        driver.affected_unknown();
        let error = session.execute(update.clone()).unwrap_err();
        assert!(matches!(kind(&error), MappingError::RowCountUnavailable(..)));

        driver.affected(1, None);
        let result = session.execute(update.clone()).expect("one row updated");
        assert_eq!(result.rows_affected, Some(1));
    }

    #[test]
    fn execute_counts_returned_rows() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver, DialectKind::Postgres);
        driver.rows(["id"], vec![vec![Value::from(1i64)]; 3]);
        let result = session
            .execute(BuiltStatement::query("SELECT id FROM users", Vec::new()))
            .expect("rows are counted");
        assert_eq!(result, RowsAffected::new(3));
        assert!(driver.cursors()[0].closed);
    }

    #[test]
    fn driver_errors_pass_through() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver, DialectKind::Postgres);
        driver.error("connection reset by peer");
        let error = session
            .fetch_all::<User>(session.select("users").expect("users is known"), None)
            .unwrap_err();
        assert_eq!(error.to_string(), "connection reset by peer");
        assert!(MappingError::kind_of(&error).is_none());

        let error = session.select("orders").err().expect("orders is unknown");
        assert!(matches!(kind(&error), MappingError::Configuration(..)));
    }

    #[test]
    fn observers_see_every_statement() {
        let driver = ScriptedDriver::new();
        let recorder = Arc::new(Recorder::default());
        let mut session = session(&driver, DialectKind::MySql).with_observer(recorder.clone());
        driver.affected(1, Some(5)).rows(LABELS, vec![ada_row(5)]);
        let insert = session
            .insert("users")
            .expect("users is known")
            .values([("name", Value::from("Ada"))])
            .returning(Columns::All);
        session
            .fetch_one::<User>(insert, None)
            .expect("the inserted row is read back");
        let prepared = recorder.prepared.lock().expect("prepared").clone();
        assert_eq!(prepared, driver.statements());
        let executed = recorder.executed.lock().expect("executed").clone();
        assert_eq!(executed, [Some(1)]);
    }

    #[test]
    fn default_row_options_from_settings() {
        let driver = ScriptedDriver::new();
        let settings = Settings {
            default_row_options: RowOptions::new().allow_empty(true),
            ..Settings::new(DialectKind::Postgres)
        };
        let mut session = Session::new(driver.clone(), settings, schema());
        driver.rows(LABELS, Vec::new());
        let user = session
            .fetch_one::<User>(session.select("users").expect("users is known").key(1i64), None)
            .expect("empty results are allowed by the settings");
        assert_eq!(user, None);

        driver.rows(LABELS, Vec::new());
        let error = session
            .fetch_one::<User>(
                BuiltStatement::query("SELECT * FROM users", Vec::new()),
                Some(&RowOptions::new()),
            )
            .unwrap_err();
        assert_eq!(kind(&error), MappingError::NoRows);
    }

    #[tokio::test]
    async fn async_chain() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver, DialectKind::MySql);
        driver.affected(1, Some(11)).rows(LABELS, vec![ada_row(11)]);
        let token = CancellationToken::new();
        let insert = session
            .insert("users")
            .expect("users is known")
            .values([("name", Value::from("Ada"))])
            .returning(Columns::All);
        let user = session
            .fetch_one_async::<User>(insert, None, &token)
            .await
            .expect("the inserted row is read back")
            .expect("one row");
        assert_eq!(user.id, 11);
        assert_eq!(driver.executed()[1].1, [Parameter::new("id", 11i64)]);

        driver.affected(1, None);
        let result = session
            .execute_async(
                session
                    .delete("users")
                    .expect("users is known")
                    .key(11i64),
                &token,
            )
            .await
            .expect("one row deleted");
        assert_eq!(result.rows_affected, Some(1));

        driver.rows(["count"], vec![vec![Value::from(4i64)]]);
        let count = session
            .fetch_scalar_async::<i64>(
                session.select("users").expect("users is known").count(),
                None,
                &token,
            )
            .await
            .expect("a count");
        assert_eq!(count, Some(4));
    }
}
