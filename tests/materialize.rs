#[cfg(test)]
mod tests {
    use quarry::{
        BuiltStatement, ColumnDef, DialectKind, Entity, MappingError, RowOptions, SchemaCache,
        Session, Settings, TableDef, Value,
    };
    use quarry_tests::{ScriptedDriver, init_logs};
    use std::sync::Arc;

    #[derive(Entity, Default, Debug, Clone, PartialEq)]
    struct User {
        id: i64,
        name: String,
        email: Option<String>,
        active: bool,
    }

    fn session(driver: &ScriptedDriver) -> Session<ScriptedDriver> {
        init_logs();
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
        Session::new(
            driver.clone(),
            Settings::new(DialectKind::Postgres),
            Arc::new(schema),
        )
    }

    fn query() -> BuiltStatement {
        BuiltStatement::query("SELECT * FROM users", Vec::new())
    }

    const LABELS: [&str; 4] = ["id", "name", "email", "active"];

    fn row(id: i64, name: &str, email: Option<&str>) -> Vec<Value> {
        vec![
            Value::from(id),
            Value::from(name),
            email.map(Value::from).unwrap_or(Value::Varchar(None)),
            Value::from(true),
        ]
    }

    fn kind(error: &quarry::Error) -> MappingError {
        MappingError::kind_of(error)
            .cloned()
            .unwrap_or_else(|| panic!("Expected a mapping error, got {error:#}"))
    }

    #[test]
    fn single_row_cardinality() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);

        driver.rows(LABELS, Vec::new());
        let error = session.fetch_one::<User>(query(), None).unwrap_err();
        assert_eq!(kind(&error), MappingError::NoRows);

        driver.rows(LABELS, Vec::new());
        let user = session
            .fetch_optional::<User>(query(), None)
            .expect("an empty result is allowed");
        assert_eq!(user, None);

        driver.rows(LABELS, vec![row(1, "Ada", None), row(2, "Bob", None)]);
        let error = session.fetch_one::<User>(query(), None).unwrap_err();
        assert_eq!(kind(&error), MappingError::TooManyRows);

        driver.rows(
            LABELS,
            vec![
                row(1, "Ada", None),
                row(2, "Bob", None),
                row(3, "Eve", None),
            ],
        );
        let user = session
            .fetch_one::<User>(query(), Some(&RowOptions::new().discard_extra_rows(true)))
            .expect("the extra rows are discarded")
            .expect("the first row");
        assert_eq!(user.name, "Ada");

        let cursors = driver.cursors();
        assert_eq!(cursors.len(), 4);
        assert!(cursors.iter().all(|v| v.closed));
        // The discarded rows are drained before the cursor is released.
        assert!(cursors[3].exhausted());
        assert_eq!(driver.pending(), 0);
    }

    #[test]
    fn all_rows_keep_the_cursor_order() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.rows(
            LABELS,
            vec![
                row(3, "Eve", None),
                row(1, "Ada", Some("ada@example.com")),
                row(2, "Bob", None),
            ],
        );
        let users = session
            .fetch_all::<User>(query(), None)
            .expect("every row is materialized");
        assert_eq!(
            users.iter().map(|v| v.id).collect::<Vec<_>>(),
            [3, 1, 2]
        );
        assert_eq!(users[1].email.as_deref(), Some("ada@example.com"));
        assert_eq!(users[0].email, None);

        driver.rows(LABELS, Vec::new());
        let users = session
            .fetch_all::<User>(query(), None)
            .expect("an empty list");
        assert!(users.is_empty());
    }

    #[test]
    fn maps_reject_duplicate_keys() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        let rows = || {
            vec![
                row(7, "Ada", None),
                row(8, "Bob", None),
                row(7, "Ada Lovelace", None),
            ]
        };

        driver.rows(LABELS, rows());
        let error = session
            .fetch_map(query(), None, |v: &User| v.id)
            .unwrap_err();
        assert_eq!(kind(&error), MappingError::DuplicateKey("7".into()));
        assert!(driver.cursors()[0].closed);

        driver.rows(LABELS, rows());
        let users = session
            .fetch_map(
                query(),
                Some(&RowOptions::new().discard_duplicates(true)),
                |v: &User| v.id,
            )
            .expect("the later row wins");
        assert_eq!(users.len(), 2);
        assert_eq!(users[&7].name, "Ada Lovelace");

        driver.rows(
            LABELS,
            vec![
                row(1, "Ada", Some("ada@example.com")),
                row(2, "Bob", Some("bob@example.com")),
            ],
        );
        let users = session
            .fetch_map_by_column::<User>(query(), None, "EMAIL")
            .expect("keyed by email");
        assert_eq!(users[&Value::from("bob@example.com")].id, 2);

        driver.rows(LABELS, vec![row(1, "Ada", None)]);
        let error = session
            .fetch_map_by_column::<User>(query(), None, "login")
            .unwrap_err();
        assert!(matches!(
            kind(&error),
            MappingError::MissingColumn { column, .. } if column == "login"
        ));
    }

    #[test]
    fn scalars() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.rows(["count"], vec![vec![Value::from(42i64)]]);
        let count = session
            .fetch_scalar::<u32>(query(), None)
            .expect("count fits in u32");
        assert_eq!(count, Some(42));

        driver.rows(["count"], vec![vec![Value::from("42")]]);
        let count = session
            .fetch_scalar::<i64>(query(), None)
            .expect("text is parsed");
        assert_eq!(count, Some(42));

        driver.rows(["name"], Vec::new());
        let name = session
            .fetch_scalar::<String>(query(), Some(&RowOptions::new().allow_empty(true)))
            .expect("no row");
        assert_eq!(name, None);
    }

    #[test]
    fn coercions_and_data_shape() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.rows(
            ["ID", "Name", "Active", "extra"],
            vec![vec![
                Value::from("42"),
                Value::from('A'),
                Value::from(1i32),
                Value::from(3.5f64),
            ]],
        );
        let user = session
            .fetch_one::<User>(query(), None)
            .expect("values are coerced")
            .expect("one row");
        assert_eq!(
            user,
            User {
                id: 42,
                name: "A".into(),
                email: None,
                active: true,
            }
        );

        driver.rows(
            LABELS,
            vec![vec![
                Value::from(1i64),
                Value::from("Ada"),
                Value::Null,
                Value::from("maybe"),
            ]],
        );
        let error = session.fetch_one::<User>(query(), None).unwrap_err();
        let MappingError::DataShape {
            member,
            source_type,
            target,
            ..
        } = kind(&error)
        else {
            panic!("Expected a data shape error, got {error:#}");
        };
        assert_eq!(member, "active");
        assert_eq!(source_type, "Varchar");
        assert_eq!(target, "bool");
        assert!(driver.cursors()[1].closed);
    }

    #[test]
    fn nulls_leave_defaults() {
        #[derive(Entity, Debug, PartialEq)]
        struct Preferences {
            theme: String,
            page_size: i32,
        }

        impl Default for Preferences {
            fn default() -> Self {
                Self {
                    theme: "light".into(),
                    page_size: 25,
                }
            }
        }

        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.rows(
            ["theme", "page_size"],
            vec![vec![Value::Null, Value::from(50i32)]],
        );
        let preferences = session
            .fetch_one::<Preferences>(query(), None)
            .expect("null members keep the default")
            .expect("one row");
        assert_eq!(
            preferences,
            Preferences {
                theme: "light".into(),
                page_size: 50,
            }
        );
    }

    #[test]
    fn statements_without_rows_cannot_be_fetched() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.affected(1, None);
        let error = session
            .fetch_all::<User>(BuiltStatement::non_query("DELETE FROM users", Vec::new()), None)
            .unwrap_err();
        assert!(matches!(kind(&error), MappingError::Configuration(..)));
    }
}
