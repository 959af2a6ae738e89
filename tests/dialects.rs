#[cfg(test)]
mod tests {
    use indoc::indoc;
    use quarry::{
        BuiltStatement, ColumnDef, Columns, DeleteBuilder, DialectKind, ExecutionMode,
        InsertBuilder, Limit, LimitMode, MappingError, Parameter, Result, SelectBuilder, TableDef,
        Target, UpdateBuilder, Value,
    };
    use std::sync::Arc;

    fn users() -> Arc<TableDef> {
        Arc::new(
            TableDef::table("users")
                .column(ColumnDef::new("id").primary_key().identity().of::<i64>())
                .column(ColumnDef::new("name").of::<String>())
                .column(ColumnDef::new("email").of::<String>())
                .column(ColumnDef::new("active").of::<bool>()),
        )
    }

    fn target(dialect: DialectKind) -> Target {
        Target::new(users(), dialect.writer(), true)
    }

    fn page(dialect: DialectKind) -> Result<BuiltStatement> {
        SelectBuilder::new(target(dialect))
            .filter([("active", Value::from(true))])
            .sort(["name"])
            .limit(Limit::page(20, 10))
            .build()
    }

    fn is_configuration(result: Result<BuiltStatement>) -> bool {
        match result {
            Ok(..) => false,
            Err(error) => matches!(
                MappingError::kind_of(&error),
                Some(MappingError::Configuration(..))
            ),
        }
    }

    #[test]
    fn select_page() {
        let statement = page(DialectKind::Generic).expect("generic paging");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                SELECT "id", "name", "email", "active"
                FROM "users"
                WHERE "active" = :active
                ORDER BY "name"
                OFFSET 20 ROWS
                FETCH NEXT 10 ROWS ONLY;
            "#}
            .trim()
        );
        assert_eq!(statement.parameters, [Parameter::new("active", true)]);
        assert_eq!(statement.mode, ExecutionMode::Query);

        assert_eq!(
            page(DialectKind::Postgres).expect("postgres paging").sql,
            indoc! {r#"
                SELECT "id", "name", "email", "active"
                FROM "users"
                WHERE "active" = $1
                ORDER BY "name"
                LIMIT 10
                OFFSET 20;
            "#}
            .trim()
        );
        assert_eq!(
            page(DialectKind::Sqlite).expect("sqlite paging").sql,
            indoc! {r#"
                SELECT "id", "name", "email", "active"
                FROM "users"
                WHERE "active" = @active
                ORDER BY "name"
                LIMIT 10 OFFSET 20;
            "#}
            .trim()
        );
        assert_eq!(
            page(DialectKind::MySql).expect("mysql paging").sql,
            indoc! {"
                SELECT `id`, `name`, `email`, `active`
                FROM `users`
                WHERE `active` = ?
                ORDER BY `name`
                LIMIT 20, 10;
            "}
            .trim()
        );
        assert_eq!(
            page(DialectKind::SqlServer).expect("sql server paging").sql,
            indoc! {"
                SELECT [id], [name], [email], [active]
                FROM [users]
                WHERE [active] = @active
                ORDER BY [name]
                OFFSET 20 ROWS
                FETCH NEXT 10 ROWS ONLY;
            "}
            .trim()
        );
        assert!(is_configuration(page(DialectKind::Access)));
    }

    #[test]
    fn top_rows_are_ordered_by_key() {
        let statement = SelectBuilder::new(target(DialectKind::Access))
            .limit(Limit::take(5))
            .build()
            .expect("access top");
        assert_eq!(
            statement.sql,
            indoc! {"
                SELECT TOP 5 [id], [name], [email], [active]
                FROM [users]
                ORDER BY [id];
            "}
            .trim()
        );
        let statement = SelectBuilder::new(target(DialectKind::SqlServer))
            .sort(["name DESC"])
            .limit(Limit::mode(LimitMode::RowsWithTies, 3))
            .build()
            .expect("sql server top with ties");
        assert_eq!(
            statement.sql,
            indoc! {"
                SELECT TOP (3) WITH TIES [id], [name], [email], [active]
                FROM [users]
                ORDER BY [name] DESC;
            "}
            .trim()
        );
    }

    #[test]
    fn sampling() {
        let statement = SelectBuilder::new(target(DialectKind::Postgres))
            .columns(["id"])
            .limit(Limit::mode(LimitMode::TableSampleBernoulliPercentage, 10).with_seed(7))
            .build()
            .expect("postgres sampling");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                SELECT "id"
                FROM "users" TABLESAMPLE BERNOULLI (10) REPEATABLE (7);
            "#}
            .trim()
        );
        let statement = SelectBuilder::new(target(DialectKind::MySql))
            .columns(["id"])
            .limit(Limit::mode(LimitMode::RandomSampleRows, 5).with_seed(3))
            .build()
            .expect("mysql random rows");
        assert_eq!(
            statement.sql,
            indoc! {"
                SELECT `id`
                FROM `users`
                ORDER BY RAND(3)
                LIMIT 5;
            "}
            .trim()
        );
        assert!(is_configuration(
            SelectBuilder::new(target(DialectKind::MySql))
                .sort(["name"])
                .limit(Limit::mode(LimitMode::RandomSampleRows, 5))
                .build()
        ));
        assert!(is_configuration(
            SelectBuilder::new(target(DialectKind::Generic))
                .limit(Limit::mode(LimitMode::Percentage, 5))
                .build()
        ));
        assert!(is_configuration(
            SelectBuilder::new(target(DialectKind::Postgres))
                .limit(Limit::mode(LimitMode::TableSampleSystemRows, 5).with_seed(1))
                .build()
        ));
        assert!(is_configuration(
            SelectBuilder::new(target(DialectKind::SqlServer))
                .limit(Limit::mode(LimitMode::Percentage, 150))
                .build()
        ));
    }

    #[test]
    fn limit_without_key() {
        let log = Arc::new(TableDef::view("log").column(ColumnDef::new("line").of::<String>()));
        let strict = Target::new(log.clone(), DialectKind::Generic.writer(), true);
        assert!(is_configuration(
            SelectBuilder::new(strict).limit(Limit::take(5)).build()
        ));
        let lenient = Target::new(log, DialectKind::Generic.writer(), false);
        let statement = SelectBuilder::new(lenient)
            .limit(Limit::take(5))
            .build()
            .expect("non strict limit");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                SELECT "line"
                FROM "log"
                FETCH FIRST 5 ROWS ONLY;
            "#}
            .trim()
        );
    }

    #[test]
    fn count() {
        let statement = SelectBuilder::new(target(DialectKind::SqlServer))
            .filter([("active", Value::from(false))])
            .count()
            .build()
            .expect("count");
        assert_eq!(
            statement.sql,
            indoc! {"
                SELECT COUNT(*)
                FROM [users]
                WHERE [active] = @active;
            "}
            .trim()
        );
        assert!(is_configuration(
            SelectBuilder::new(target(DialectKind::SqlServer))
                .count()
                .limit(Limit::take(1))
                .build()
        ));
    }

    #[test]
    fn raw_predicate_placeholders() {
        let select = |dialect| {
            SelectBuilder::new(target(dialect))
                .columns(["id"])
                .filter([("active", Value::from(true))])
                .where_sql(
                    r#""name" LIKE :pattern AND "id" > :min"#,
                    [("pattern", Value::from("a%")), ("min", Value::from(3i64))],
                )
                .build()
        };
        let statement = select(DialectKind::Postgres).expect("postgres raw predicate");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                SELECT "id"
                FROM "users"
                WHERE "active" = $1 AND ("name" LIKE $2 AND "id" > $3);
            "#}
            .trim()
        );
        assert_eq!(
            statement.parameters,
            [
                Parameter::new("active", true),
                Parameter::new("pattern", "a%"),
                Parameter::new("min", 3i64),
            ]
        );
        let statement = select(DialectKind::SqlServer).expect("sql server raw predicate");
        assert_eq!(
            statement.sql,
            indoc! {"
                SELECT [id]
                FROM [users]
                WHERE [active] = @active AND (\"name\" LIKE @pattern AND \"id\" > @min);
            "}
            .trim()
        );
    }

    #[test]
    fn insert_reads_back_generated_values() {
        let insert = |dialect| {
            InsertBuilder::new(target(dialect))
                .values([
                    ("name", Value::from("ada")),
                    ("email", Value::from("ada@example.com")),
                ])
                .returning(Columns::Key)
                .build()
        };

        let statement = insert(DialectKind::Postgres).expect("postgres insert");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                INSERT INTO "users" ("name", "email")
                VALUES ($1, $2)
                RETURNING "id";
            "#}
            .trim()
        );
        assert_eq!(statement.mode, ExecutionMode::Query);
        assert!(statement.next.is_none());

        let statement = insert(DialectKind::SqlServer).expect("sql server insert");
        assert_eq!(
            statement.sql,
            indoc! {"
                INSERT INTO [users] ([name], [email])
                OUTPUT Inserted.[id]
                VALUES (@name, @email);
            "}
            .trim()
        );

        let statement = insert(DialectKind::Sqlite).expect("sqlite insert");
        assert_eq!(statement.mode, ExecutionMode::NonQuery);
        assert_eq!(statement.expected_rows, Some(1));
        let next = statement.next.as_deref().expect("sqlite reads back");
        assert_eq!(
            next.sql,
            indoc! {r#"
                SELECT "id"
                FROM "users"
                WHERE "rowid" = last_insert_rowid();
            "#}
            .trim()
        );
        assert!(statement.returns_rows());

        let statement = insert(DialectKind::MySql).expect("mysql insert");
        assert_eq!(
            statement.sql,
            indoc! {"
                INSERT INTO `users` (`name`, `email`)
                VALUES (?, ?);
            "}
            .trim()
        );
        assert_eq!(
            statement.mode,
            ExecutionMode::Forward {
                parameter: "id".into()
            }
        );
        let next = statement.next.as_deref().expect("mysql reads back");
        assert_eq!(
            next.sql,
            indoc! {"
                SELECT `id`
                FROM `users`
                WHERE `id` = ?;
            "}
            .trim()
        );

        assert!(is_configuration(insert(DialectKind::Generic)));
    }

    #[test]
    fn insert_identity_values() {
        let statement = InsertBuilder::new(target(DialectKind::SqlServer))
            .values([("id", Value::from(7i64)), ("name", Value::from("ada"))])
            .identity_insert(true)
            .build()
            .expect("identity insert");
        assert_eq!(
            statement.sql,
            indoc! {"
                SET IDENTITY_INSERT [users] ON;
                INSERT INTO [users] ([id], [name])
                VALUES (@id, @name);
                SET IDENTITY_INSERT [users] OFF;
            "}
            .trim()
        );
        let statement = InsertBuilder::new(target(DialectKind::Postgres))
            .values([("id", Value::from(7i64)), ("name", Value::from("ada"))])
            .build()
            .expect("identity skipped");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                INSERT INTO "users" ("name")
                VALUES ($1);
            "#}
            .trim()
        );
        let statement = InsertBuilder::new(target(DialectKind::MySql))
            .values(())
            .build()
            .expect("default values");
        assert_eq!(
            statement.sql,
            indoc! {"
                INSERT INTO `users` ()
                VALUES ();
            "}
            .trim()
        );
    }

    #[test]
    fn update_by_key() {
        let statement = UpdateBuilder::new(target(DialectKind::Postgres))
            .set([("id", Value::from(7i64)), ("name", Value::from("ada"))])
            .build()
            .expect("update by key");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                UPDATE "users"
                SET "name" = $1
                WHERE "id" = $2;
            "#}
            .trim()
        );
        assert_eq!(
            statement.parameters,
            [Parameter::new("name", "ada"), Parameter::new("id", 7i64)]
        );
        assert_eq!(statement.expected_rows, Some(1));

        let statement = UpdateBuilder::new(target(DialectKind::SqlServer))
            .set([("active", Value::from(false))])
            .filter([("email", Value::Varchar(None))])
            .returning(["id", "active"])
            .old_values(true)
            .build()
            .expect("update returning old values");
        assert_eq!(
            statement.sql,
            indoc! {"
                UPDATE [users]
                SET [active] = @active
                OUTPUT Deleted.[id], Deleted.[active]
                WHERE [email] IS NULL;
            "}
            .trim()
        );
        assert_eq!(statement.expected_rows, None);

        assert!(is_configuration(
            UpdateBuilder::new(target(DialectKind::Postgres))
                .set([("name", Value::from("ada"))])
                .build()
        ));
        assert!(is_configuration(
            UpdateBuilder::new(target(DialectKind::Postgres))
                .set([("name", Value::from("ada"))])
                .returning(["id"])
                .old_values(true)
                .all_rows()
                .build()
        ));
        let statement = UpdateBuilder::new(target(DialectKind::Postgres))
            .set([("active", Value::from(false))])
            .all_rows()
            .build()
            .expect("update every row");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                UPDATE "users"
                SET "active" = $1;
            "#}
            .trim()
        );
    }

    #[test]
    fn delete() {
        let statement = DeleteBuilder::new(target(DialectKind::SqlServer))
            .key(7i64)
            .returning(["id", "name"])
            .build()
            .expect("delete returning");
        assert_eq!(
            statement.sql,
            indoc! {"
                DELETE FROM [users]
                OUTPUT Deleted.[id], Deleted.[name]
                WHERE [id] = @id;
            "}
            .trim()
        );
        assert_eq!(statement.mode, ExecutionMode::Query);

        let statement = DeleteBuilder::new(target(DialectKind::Sqlite))
            .keys([1i64, 2, 3])
            .build()
            .expect("delete key list");
        assert_eq!(
            statement.sql,
            indoc! {r#"
                DELETE FROM "users"
                WHERE "id" IN (@id_0, @id_1, @id_2);
            "#}
            .trim()
        );
        assert_eq!(statement.expected_rows, None);

        let statement = DeleteBuilder::new(target(DialectKind::MySql))
            .object([("id", Value::from(9i64)), ("name", Value::from("ignored"))])
            .build()
            .expect("delete by object");
        assert_eq!(
            statement.sql,
            indoc! {"
                DELETE FROM `users`
                WHERE `id` = ?;
            "}
            .trim()
        );
        assert_eq!(statement.expected_rows, Some(1));

        assert!(is_configuration(
            DeleteBuilder::new(target(DialectKind::Generic)).build()
        ));
        assert!(is_configuration(
            DeleteBuilder::new(target(DialectKind::MySql))
                .key(1i64)
                .returning(["id"])
                .build()
        ));
        assert_eq!(
            DeleteBuilder::new(target(DialectKind::Generic))
                .all_rows()
                .build()
                .expect("delete every row")
                .sql,
            r#"DELETE FROM "users";"#
        );
    }
}
