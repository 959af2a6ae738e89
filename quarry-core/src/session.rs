use crate::{
    All, AsValue, AsyncCursor, AsyncDriver, BuiltStatement, ByColumn, CancellationToken, Cursor,
    DeleteBuilder, Driver, Entity, EntityReader, Error, Execution, ExecutionMode, InsertBuilder,
    IntoStatement, Keyed, MappingError, Result, RowIter, RowOptions, RowsAffected, ScalarReader,
    SchemaProvider, SelectBuilder, Settings, Single, SqlWriter, StatementObserver, Target,
    UpdateBuilder, UpsertBuilder, Value, advance_or_cancel, collect, collect_async, row_stream,
    futures::{BoxStream, StreamExt},
    truncate_long,
};
use log::{Level, debug};
use std::{collections::HashMap, fmt::Debug, hash::Hash, sync::Arc};

/// A driver bundled with the settings, the dialect writer and the schema.
///
/// Builders obtained from the session carry its dialect and strict mode. Every
/// materializing call comes in a blocking form (on a [`Driver`]) and an async form
/// (on an [`AsyncDriver`]) sharing the same validation and construction.
pub struct Session<D> {
    driver: D,
    settings: Settings,
    writer: Arc<dyn SqlWriter>,
    schema: Arc<dyn SchemaProvider>,
    observers: Vec<Arc<dyn StatementObserver>>,
}

impl<D> Session<D> {
    pub fn new(driver: D, settings: Settings, schema: Arc<dyn SchemaProvider>) -> Self {
        Self {
            driver,
            writer: settings.dialect.writer(),
            settings,
            schema,
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StatementObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn writer(&self) -> &dyn SqlWriter {
        self.writer.as_ref()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn target(&self, table: &str) -> Result<Target> {
        Ok(Target::new(
            self.schema.table(table)?,
            self.writer.clone(),
            self.settings.strict_mode,
        ))
    }

    pub fn select(&self, table: &str) -> Result<SelectBuilder> {
        Ok(SelectBuilder::new(self.target(table)?))
    }

    pub fn insert(&self, table: &str) -> Result<InsertBuilder> {
        Ok(InsertBuilder::new(self.target(table)?))
    }

    pub fn update(&self, table: &str) -> Result<UpdateBuilder> {
        Ok(UpdateBuilder::new(self.target(table)?))
    }

    pub fn upsert(&self, table: &str) -> Result<UpsertBuilder> {
        Ok(UpsertBuilder::new(self.target(table)?))
    }

    pub fn delete(&self, table: &str) -> Result<DeleteBuilder> {
        Ok(DeleteBuilder::new(self.target(table)?))
    }

    fn options(&self, options: Option<&RowOptions>) -> RowOptions {
        options
            .unwrap_or(&self.settings.default_row_options)
            .clone()
    }

    fn prepared(&self, statement: &BuiltStatement) {
        for observer in &self.observers {
            observer.prepared(statement);
        }
        if self.settings.log_statements {
            debug!("{}", truncate_long!(statement.sql));
        }
    }

    /// Checks the reported row count and returns the value forwarded to the next statement.
    fn executed(
        &self,
        statement: &BuiltStatement,
        result: &RowsAffected,
    ) -> Result<Option<(String, Value)>> {
        for observer in &self.observers {
            observer.executed(statement, result);
        }
        if let Some(expected) = statement.expected_rows {
            let Some(actual) = result.rows_affected else {
                return Err(MappingError::RowCountUnavailable(
                    "the number of affected rows".into(),
                )
                .into());
            };
            if actual != expected {
                let error = Error::new(MappingError::RowCountMismatch { expected, actual })
                    .context(format!("While executing `{}`", truncate_long!(statement.sql)));
                log::log!(
                    if actual == 0 {
                        Level::Info
                    } else {
                        Level::Error
                    },
                    "{:#}",
                    error
                );
                return Err(error);
            }
        }
        if let ExecutionMode::Forward { parameter } = &statement.mode {
            let Some(id) = result.last_affected_id else {
                return Err(MappingError::RowCountUnavailable(
                    "the identity generated by the insert".into(),
                )
                .into());
            };
            return Ok(Some((parameter.clone(), Value::Int64(Some(id)))));
        }
        Ok(None)
    }
}

fn forward(next: &mut BuiltStatement, forwarded: Option<(String, Value)>) {
    if let Some((parameter, value)) = forwarded {
        next.bind(&parameter, value);
    }
}

/// A chained statement answered with rows, nothing can be checked or forwarded.
fn rows_in_chain(statement: &BuiltStatement) -> Result<()> {
    if let ExecutionMode::Forward { .. } = statement.mode {
        return Err(MappingError::RowCountUnavailable(
            "the identity generated by the insert".into(),
        )
        .into());
    }
    if statement.expected_rows.is_some() {
        return Err(MappingError::RowCountUnavailable(
            "the number of affected rows".into(),
        )
        .into());
    }
    Ok(())
}

fn expect_rows<C>(execution: Execution<C>) -> Result<C> {
    match execution {
        Execution::Rows(cursor) => Ok(cursor),
        Execution::Affected(..) => Err(MappingError::configuration(
            "The statement did not produce a result set",
        )
        .into()),
    }
}

fn count_rows<C: Cursor>(cursor: &mut C) -> Result<u64> {
    let mut rows = 0;
    while Cursor::advance(cursor)? {
        rows += 1;
    }
    Ok(rows)
}

impl<D: Driver> Session<D> {
    /// Runs the chain, the outcome of the last statement is returned.
    fn run(&mut self, statement: impl IntoStatement) -> Result<Execution<D::Cursor>> {
        let mut current = statement.into_statement()?;
        loop {
            let next = current.next.take();
            self.prepared(&current);
            let execution = self.driver.execute(&current.sql, &current.parameters)?;
            let (forwarded, affected) = match execution {
                Execution::Affected(result) => (self.executed(&current, &result)?, result),
                Execution::Rows(cursor) if next.is_none() => return Ok(Execution::Rows(cursor)),
                Execution::Rows(mut cursor) => {
                    cursor.close();
                    rows_in_chain(&current)?;
                    (None, RowsAffected::default())
                }
            };
            match next {
                Some(mut next) => {
                    forward(&mut next, forwarded);
                    current = *next;
                }
                None => return Ok(Execution::Affected(affected)),
            }
        }
    }

    /// Executes the statement, rows returned are read and counted.
    pub fn execute(&mut self, statement: impl IntoStatement) -> Result<RowsAffected> {
        match self.run(statement)? {
            Execution::Affected(result) => Ok(result),
            Execution::Rows(mut cursor) => {
                let result = count_rows(&mut cursor);
                cursor.close();
                result.map(RowsAffected::new)
            }
        }
    }

    /// One entity, `None` only when the options allow an empty result.
    pub fn fetch_one<E: Entity>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
    ) -> Result<Option<E>> {
        let options = self.options(options);
        let reader = EntityReader::<E>::new(&options)?;
        let mut cursor = expect_rows(self.run(statement)?)?;
        collect(
            &mut cursor,
            Single::new(reader, &options),
        )
    }

    /// Like [`Session::fetch_one`] with empty results allowed.
    pub fn fetch_optional<E: Entity>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
    ) -> Result<Option<E>> {
        let options = self.options(options).allow_empty(true);
        self.fetch_one(statement, Some(&options))
    }

    pub fn fetch_all<E: Entity>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
    ) -> Result<Vec<E>> {
        let options = self.options(options);
        let reader = EntityReader::<E>::new(&options)?;
        let mut cursor = expect_rows(self.run(statement)?)?;
        collect(&mut cursor, All::new(reader))
    }

    /// Entities keyed by `key`.
    pub fn fetch_map<E, K, F>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
        key: F,
    ) -> Result<HashMap<K, E>>
    where
        E: Entity,
        K: Eq + Hash + Debug,
        F: FnMut(&E) -> K,
    {
        let options = self.options(options);
        let reader = EntityReader::<E>::new(&options)?;
        let mut cursor = expect_rows(self.run(statement)?)?;
        collect(
            &mut cursor,
            Keyed::new(reader, key, &options),
        )
    }

    /// Entities keyed by the value of `column`.
    pub fn fetch_map_by_column<E: Entity>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
        column: &str,
    ) -> Result<HashMap<Value, E>> {
        let options = self.options(options);
        let reader = EntityReader::<E>::new(&options)?;
        let mut cursor = expect_rows(self.run(statement)?)?;
        collect(
            &mut cursor,
            ByColumn::new(reader, column, &options),
        )
    }

    /// First column of the only row.
    pub fn fetch_scalar<T: AsValue>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
    ) -> Result<Option<T>> {
        let options = self.options(options);
        let mut cursor = expect_rows(self.run(statement)?)?;
        collect(&mut cursor, Single::new(ScalarReader::<T>::default(), &options))
    }

    pub fn stream<E: Entity>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
    ) -> Result<RowIter<EntityReader<E>, D::Cursor>> {
        let options = self.options(options);
        let reader = EntityReader::<E>::new(&options)?;
        let cursor = expect_rows(self.run(statement)?)?;
        RowIter::new(cursor, reader)
    }
}

async fn count_rows_async<C: AsyncCursor>(
    cursor: &mut C,
    token: &CancellationToken,
) -> Result<u64> {
    let mut rows = 0;
    while advance_or_cancel(cursor, token).await? {
        rows += 1;
    }
    Ok(rows)
}

impl<D: AsyncDriver> Session<D> {
    async fn run_async(
        &mut self,
        statement: impl IntoStatement,
        token: &CancellationToken,
    ) -> Result<Execution<D::Cursor>> {
        let mut current = statement.into_statement()?;
        loop {
            let next = current.next.take();
            self.prepared(&current);
            let execution = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(MappingError::Cancelled.into()),
                result = AsyncDriver::execute(&mut self.driver, &current.sql, &current.parameters) => result?,
            };
            let (forwarded, affected) = match execution {
                Execution::Affected(result) => (self.executed(&current, &result)?, result),
                Execution::Rows(cursor) if next.is_none() => return Ok(Execution::Rows(cursor)),
                Execution::Rows(mut cursor) => {
                    cursor.close();
                    rows_in_chain(&current)?;
                    (None, RowsAffected::default())
                }
            };
            match next {
                Some(mut next) => {
                    forward(&mut next, forwarded);
                    current = *next;
                }
                None => return Ok(Execution::Affected(affected)),
            }
        }
    }

    pub async fn execute_async(
        &mut self,
        statement: impl IntoStatement,
        token: &CancellationToken,
    ) -> Result<RowsAffected> {
        match self.run_async(statement, token).await? {
            Execution::Affected(result) => Ok(result),
            Execution::Rows(mut cursor) => {
                let result = count_rows_async(&mut cursor, token).await;
                cursor.close();
                result.map(RowsAffected::new)
            }
        }
    }

    pub async fn fetch_one_async<E: Entity>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
        token: &CancellationToken,
    ) -> Result<Option<E>> {
        let options = self.options(options);
        let reader = EntityReader::<E>::new(&options)?;
        let mut cursor = expect_rows(self.run_async(statement, token).await?)?;
        collect_async(
            &mut cursor,
            Single::new(reader, &options),
            token,
        )
        .await
    }

    pub async fn fetch_optional_async<E: Entity>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
        token: &CancellationToken,
    ) -> Result<Option<E>> {
        let options = self.options(options).allow_empty(true);
        self.fetch_one_async(statement, Some(&options), token).await
    }

    pub async fn fetch_all_async<E: Entity>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
        token: &CancellationToken,
    ) -> Result<Vec<E>> {
        let options = self.options(options);
        let reader = EntityReader::<E>::new(&options)?;
        let mut cursor = expect_rows(self.run_async(statement, token).await?)?;
        collect_async(&mut cursor, All::new(reader), token).await
    }

    pub async fn fetch_map_async<E, K, F>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
        key: F,
        token: &CancellationToken,
    ) -> Result<HashMap<K, E>>
    where
        E: Entity,
        K: Eq + Hash + Debug,
        F: FnMut(&E) -> K,
    {
        let options = self.options(options);
        let reader = EntityReader::<E>::new(&options)?;
        let mut cursor = expect_rows(self.run_async(statement, token).await?)?;
        collect_async(
            &mut cursor,
            Keyed::new(reader, key, &options),
            token,
        )
        .await
    }

    pub async fn fetch_map_by_column_async<E: Entity>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
        column: &str,
        token: &CancellationToken,
    ) -> Result<HashMap<Value, E>> {
        let options = self.options(options);
        let reader = EntityReader::<E>::new(&options)?;
        let mut cursor = expect_rows(self.run_async(statement, token).await?)?;
        collect_async(
            &mut cursor,
            ByColumn::new(reader, column, &options),
            token,
        )
        .await
    }

    pub async fn fetch_scalar_async<T: AsValue>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
        token: &CancellationToken,
    ) -> Result<Option<T>> {
        let options = self.options(options);
        let mut cursor = expect_rows(self.run_async(statement, token).await?)?;
        collect_async(
            &mut cursor,
            Single::new(ScalarReader::<T>::default(), &options),
            token,
        )
        .await
    }

    /// Runs the statement and returns a lazy stream over its rows, the cursor is released when
    /// the stream is exhausted or dropped.
    pub async fn stream_async<E: Entity>(
        &mut self,
        statement: impl IntoStatement,
        options: Option<&RowOptions>,
        token: CancellationToken,
    ) -> Result<BoxStream<'static, Result<E>>> {
        let options = self.options(options);
        let reader = EntityReader::<E>::new(&options)?;
        let cursor = expect_rows(self.run_async(statement, &token).await?)?;
        Ok(row_stream(cursor, reader, token).boxed())
    }
}
