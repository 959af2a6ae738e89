#[cfg(test)]
mod tests {
    use indoc::indoc;
    use quarry::{
        BuiltStatement, ColumnDef, Columns, DialectKind, ExecutionMode, MappingError, Parameter,
        Result, TableDef, Target, UpsertBuilder, Value,
    };
    use std::sync::Arc;

    fn users() -> Arc<TableDef> {
        Arc::new(
            TableDef::table("users")
                .column(ColumnDef::new("id").primary_key().identity().of::<i64>())
                .column(ColumnDef::new("name").of::<String>())
                .column(ColumnDef::new("email").of::<String>()),
        )
    }

    fn accounts() -> Arc<TableDef> {
        Arc::new(
            TableDef::table("accounts")
                .column(ColumnDef::new("email").primary_key().of::<String>())
                .column(ColumnDef::new("name").of::<String>())
                .column(ColumnDef::new("balance").of::<i64>()),
        )
    }

    fn upsert(table: Arc<TableDef>, dialect: DialectKind) -> UpsertBuilder {
        UpsertBuilder::new(Target::new(table, dialect.writer(), true))
    }

    fn account() -> [(&'static str, Value); 3] {
        [
            ("email", Value::from("ada@example.com")),
            ("name", Value::from("Ada")),
            ("balance", Value::from(10i64)),
        ]
    }

    fn configuration_error(result: Result<BuiltStatement>) -> String {
        let error = result.expect_err("the upsert should be rejected");
        match MappingError::kind_of(&error) {
            Some(MappingError::Configuration(message)) => message.clone(),
            other => panic!("Expected a configuration error, got {other:?}"),
        }
    }

    #[test]
    fn identity_without_value_inserts() {
        for values in [
            vec![("name", Value::from("Ada"))],
            vec![("id", Value::from(0i64)), ("name", Value::from("Ada"))],
        ] {
            let values: Vec<_> = values
                .into_iter()
                .map(|(k, v)| quarry::Member::new(k, v))
                .collect();
            let statement = upsert(users(), DialectKind::Postgres)
                .values(values)
                .build()
                .expect("insert of a new user");
            assert_eq!(
                statement.sql,
                indoc! {r#"
                    INSERT INTO "users" ("name")
                    VALUES ($1);
                "#}
                .trim()
            );
            assert_eq!(statement.parameters, [Parameter::new("name", "Ada")]);
            assert_eq!(statement.mode, ExecutionMode::NonQuery);
            assert_eq!(statement.expected_rows, Some(1));
        }
    }

    #[test]
    fn identity_with_value_updates() {
        let statement = upsert(users(), DialectKind::Postgres)
            .values([
                ("id", Value::from(5i64)),
                ("name", Value::from("Ada")),
                ("email", Value::Varchar(None)),
            ])
            .build()
            .expect("update of an existing user");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                UPDATE "users"
                SET "name" = $1, "email" = $2
                WHERE "id" = $3;
            "#}
            .trim()
        );
        assert_eq!(
            statement.parameters,
            [
                Parameter::new("name", "Ada"),
                Parameter::new("email", Value::Varchar(None)),
                Parameter::new("id", 5i64),
            ]
        );
        assert_eq!(statement.expected_rows, Some(1));
    }

    #[test]
    fn identity_insert_uses_native_upsert() {
        let statement = upsert(users(), DialectKind::Postgres)
            .values([("id", Value::from(5i64)), ("name", Value::from("Ada"))])
            .identity_insert(true)
            .build()
            .expect("upsert with explicit identity");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                INSERT INTO "users" ("id", "name")
                VALUES ($1, $2)
                ON CONFLICT ("id") DO UPDATE SET "name" = EXCLUDED."name";
            "#}
            .trim()
        );
        assert_eq!(statement.expected_rows, None);

        let statement = upsert(users(), DialectKind::SqlServer)
            .values([("id", Value::from(5i64)), ("name", Value::from("Ada"))])
            .identity_insert(true)
            .build()
            .expect("merge with explicit identity");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                SET IDENTITY_INSERT [users] ON;
                MERGE INTO [users] AS target
                USING (VALUES (@id, @name)) AS source ([id], [name])
                ON target.[id] = source.[id]
                WHEN MATCHED THEN UPDATE SET target.[name] = source.[name]
                WHEN NOT MATCHED THEN INSERT ([id], [name]) VALUES (source.[id], source.[name]);
                SET IDENTITY_INSERT [users] OFF;
            "#}
            .trim()
        );
    }

    #[test]
    fn natural_key_postgres() {
        let statement = upsert(accounts(), DialectKind::Postgres)
            .values(account())
            .returning(Columns::All)
            .build()
            .expect("postgres upsert");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                INSERT INTO "accounts" ("email", "name", "balance")
                VALUES ($1, $2, $3)
                ON CONFLICT ("email") DO UPDATE SET "name" = EXCLUDED."name", "balance" = EXCLUDED."balance"
                RETURNING "email", "name", "balance";
            "#}
            .trim()
        );
        assert_eq!(statement.mode, ExecutionMode::Query);
        assert!(statement.next.is_none());
    }

    #[test]
    fn natural_key_with_default_value() {
        let rates = Arc::new(
            TableDef::table("rates")
                .column(ColumnDef::new("code").primary_key().of::<i32>())
                .column(ColumnDef::new("rate").of::<f64>()),
        );
        let statement = upsert(rates, DialectKind::Postgres)
            .values([("code", Value::from(0i32)), ("rate", Value::from(1.5f64))])
            .build()
            .expect("zero is a valid natural key");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                INSERT INTO "rates" ("code", "rate")
                VALUES ($1, $2)
                ON CONFLICT ("code") DO UPDATE SET "rate" = EXCLUDED."rate";
            "#}
            .trim()
        );
        assert_eq!(statement.parameters[0].value, Value::from(0i32));
    }

    #[test]
    fn natural_key_mysql() {
        let statement = upsert(accounts(), DialectKind::MySql)
            .values(account())
            .build()
            .expect("mysql upsert");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                INSERT INTO `accounts` (`email`, `name`, `balance`)
                VALUES (?, ?, ?)
                ON DUPLICATE KEY UPDATE `name` = VALUES(`name`), `balance` = VALUES(`balance`);
            "#}
            .trim()
        );
        assert_eq!(statement.mode, ExecutionMode::NonQuery);

        let statement = upsert(accounts(), DialectKind::MySql)
            .values(account())
            .returning(["balance"])
            .build()
            .expect("mysql upsert with read back");
        let next = statement.next.as_deref().expect("chained read back");
        assert_eq!(
            next.sql,
            indoc! {r#"
                SELECT `balance`
                FROM `accounts`
                WHERE `email` = ?;
            "#}
            .trim()
        );
        assert_eq!(next.parameters, [Parameter::new("email", "ada@example.com")]);
        assert!(statement.returns_rows());
    }

    #[test]
    fn natural_key_sql_server() {
        let statement = upsert(accounts(), DialectKind::SqlServer)
            .values(account())
            .returning(["balance"])
            .build()
            .expect("sql server merge");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                MERGE INTO [accounts] AS target
                USING (VALUES (@email, @name, @balance)) AS source ([email], [name], [balance])
                ON target.[email] = source.[email]
                WHEN MATCHED THEN UPDATE SET target.[name] = source.[name], target.[balance] = source.[balance]
                WHEN NOT MATCHED THEN INSERT ([email], [name], [balance]) VALUES (source.[email], source.[name], source.[balance])
                OUTPUT Inserted.[balance];
            "#}
            .trim()
        );
        assert_eq!(statement.mode, ExecutionMode::Query);
    }

    #[test]
    fn natural_key_sqlite() {
        let statement = upsert(accounts(), DialectKind::Sqlite)
            .values(account())
            .returning(["name"])
            .build()
            .expect("sqlite upsert");
        let sql: Vec<_> = statement.chain().map(|v| v.sql.as_str()).collect();
        assert_eq!(
            sql,
            [
                indoc! {r#"
                    INSERT INTO "accounts" ("email", "name", "balance")
                    VALUES (@email, @name, @balance)
                    ON CONFLICT ("email") DO UPDATE SET "name" = EXCLUDED."name", "balance" = EXCLUDED."balance";
                "#}
                .trim(),
                indoc! {r#"
                    SELECT "name"
                    FROM "accounts"
                    WHERE "email" = @email;
                "#}
                .trim(),
            ]
        );
    }

    #[test]
    fn rejected_upserts() {
        let message = configuration_error(
            upsert(accounts(), DialectKind::Postgres)
                .values([("name", Value::from("Ada"))])
                .build(),
        );
        assert!(message.contains("needs a value for every key column"));

        let message = configuration_error(
            upsert(accounts(), DialectKind::Generic)
                .values(account())
                .build(),
        );
        assert!(message.contains("does not support a native upsert"));

        let log = Arc::new(
            TableDef::table("log")
                .column(ColumnDef::new("line").of::<String>()),
        );
        let message = configuration_error(
            upsert(log, DialectKind::Postgres)
                .values([("line", Value::from("started"))])
                .build(),
        );
        assert!(message.contains("needs a key"));
    }

    #[test]
    fn key_columns_override_primary_key() {
        let statement = upsert(users(), DialectKind::Postgres)
            .values([
                ("email", Value::from("ada@example.com")),
                ("name", Value::from("Ada")),
            ])
            .key_columns(["email"])
            .build()
            .expect("upsert on the email");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                INSERT INTO "users" ("name", "email")
                VALUES ($1, $2)
                ON CONFLICT ("email") DO UPDATE SET "name" = EXCLUDED."name";
            "#}
            .trim()
        );
    }
}
