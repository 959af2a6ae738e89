use crate::{
    AsValue, AsyncCursor, CancellationToken, ConstructorChoice, ConstructorResolver, Cursor,
    Entity, MappingError, Resolved, Result, RowMap, RowNames, RowPlan, Value, position_of,
};
use log::debug;
use std::{
    collections::HashMap,
    fmt::Debug,
    hash::Hash,
};

/// Row count and construction flags of a materializing call.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct RowOptions {
    /// A single row request accepts zero rows.
    pub allow_empty: bool,
    /// A single row request keeps the first row and drains the others.
    pub discard_extra_rows: bool,
    /// A map request keeps the later of two rows with the same key.
    pub discard_duplicates: bool,
    /// Use the only constructor taking parameters.
    pub infer_constructor: bool,
    /// Use the constructor with these parameter types, wins over inference.
    pub signature: Option<Vec<Value>>,
}

impl RowOptions {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }
    pub fn discard_extra_rows(mut self, discard_extra_rows: bool) -> Self {
        self.discard_extra_rows = discard_extra_rows;
        self
    }
    pub fn discard_duplicates(mut self, discard_duplicates: bool) -> Self {
        self.discard_duplicates = discard_duplicates;
        self
    }
    pub fn infer_constructor(mut self, infer_constructor: bool) -> Self {
        self.infer_constructor = infer_constructor;
        self
    }
    pub fn signature(mut self, signature: Vec<Value>) -> Self {
        self.signature = Some(signature);
        self
    }
    pub fn constructor(&self) -> ConstructorChoice {
        match (&self.signature, self.infer_constructor) {
            (Some(signature), _) => ConstructorChoice::Signature(signature.clone()),
            (None, true) => ConstructorChoice::Infer,
            (None, false) => ConstructorChoice::Default,
        }
    }
}

/// Whether the collector wants more rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    More,
    /// Stop reading, the rest of the cursor is discarded.
    Drain,
}

/// Turns one row into a value.
pub trait ReadRow {
    type Item;
    /// Called once with the column names, before the first row.
    fn start(&mut self, labels: &RowNames) -> Result<()>;
    fn read(&mut self, row: RowMap) -> Result<Self::Item>;
}

/// Builds entities through the resolved constructor.
pub struct EntityReader<E> {
    resolved: Resolved,
    plan: Option<RowPlan<E>>,
}

impl<E: Entity> EntityReader<E> {
    /// Resolves the constructor selected by `options`, before any statement runs.
    pub fn new(options: &RowOptions) -> Result<Self> {
        Ok(Self {
            resolved: ConstructorResolver::resolve::<E>(&options.constructor())?,
            plan: None,
        })
    }
}

impl<E: Entity> ReadRow for EntityReader<E> {
    type Item = E;
    fn start(&mut self, labels: &RowNames) -> Result<()> {
        self.plan = Some(RowPlan::new(self.resolved, labels)?);
        Ok(())
    }
    fn read(&mut self, mut row: RowMap) -> Result<E> {
        match &self.plan {
            Some(plan) => plan.construct(&mut row),
            None => Err(crate::Error::msg("A row was read before the column names")),
        }
    }
}

/// First column converted to `T`.
pub struct ScalarReader<T>(std::marker::PhantomData<fn() -> T>);

impl<T> Default for ScalarReader<T> {
    fn default() -> Self {
        Self(Default::default())
    }
}

impl<T: AsValue> ReadRow for ScalarReader<T> {
    type Item = T;
    fn start(&mut self, labels: &RowNames) -> Result<()> {
        if labels.is_empty() {
            return Err(MappingError::configuration("A scalar needs at least one column").into());
        }
        Ok(())
    }
    fn read(&mut self, mut row: RowMap) -> Result<T> {
        T::try_from_value(row.take(0))
    }
}

/// Accumulates the rows of a cursor into a result.
pub trait Collect {
    type Output;
    fn start(&mut self, labels: &RowNames) -> Result<()>;
    fn push(&mut self, row: RowMap) -> Result<Flow>;
    fn finish(self) -> Result<Self::Output>;
}

/// At most one row.
pub struct Single<R: ReadRow> {
    reader: R,
    allow_empty: bool,
    discard_extra_rows: bool,
    item: Option<R::Item>,
}

impl<R: ReadRow> Single<R> {
    pub fn new(reader: R, options: &RowOptions) -> Self {
        Self {
            reader,
            allow_empty: options.allow_empty,
            discard_extra_rows: options.discard_extra_rows,
            item: None,
        }
    }
}

impl<R: ReadRow> Collect for Single<R> {
    type Output = Option<R::Item>;
    fn start(&mut self, labels: &RowNames) -> Result<()> {
        self.reader.start(labels)
    }
    fn push(&mut self, row: RowMap) -> Result<Flow> {
        if self.item.is_some() {
            if self.discard_extra_rows {
                return Ok(Flow::Drain);
            }
            return Err(MappingError::TooManyRows.into());
        }
        self.item = Some(self.reader.read(row)?);
        Ok(Flow::More)
    }
    fn finish(self) -> Result<Option<R::Item>> {
        match self.item {
            Some(item) => Ok(Some(item)),
            None if self.allow_empty => Ok(None),
            None => Err(MappingError::NoRows.into()),
        }
    }
}

/// Every row, in cursor order.
pub struct All<R: ReadRow> {
    reader: R,
    items: Vec<R::Item>,
}

impl<R: ReadRow> All<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            items: Vec::new(),
        }
    }
}

impl<R: ReadRow> Collect for All<R> {
    type Output = Vec<R::Item>;
    fn start(&mut self, labels: &RowNames) -> Result<()> {
        self.reader.start(labels)
    }
    fn push(&mut self, row: RowMap) -> Result<Flow> {
        self.items.push(self.reader.read(row)?);
        Ok(Flow::More)
    }
    fn finish(self) -> Result<Vec<R::Item>> {
        Ok(self.items)
    }
}

fn insert_unique<K: Eq + Hash + Debug, V>(
    map: &mut HashMap<K, V>,
    key: K,
    value: V,
    discard_duplicates: bool,
) -> Result<()> {
    if !discard_duplicates && map.contains_key(&key) {
        return Err(MappingError::DuplicateKey(format!("{key:?}")).into());
    }
    map.insert(key, value);
    Ok(())
}

/// Rows keyed by a function of the constructed item.
pub struct Keyed<R: ReadRow, K, F> {
    reader: R,
    key: F,
    discard_duplicates: bool,
    items: HashMap<K, R::Item>,
}

impl<R, K, F> Keyed<R, K, F>
where
    R: ReadRow,
    K: Eq + Hash + Debug,
    F: FnMut(&R::Item) -> K,
{
    pub fn new(reader: R, key: F, options: &RowOptions) -> Self {
        Self {
            reader,
            key,
            discard_duplicates: options.discard_duplicates,
            items: HashMap::new(),
        }
    }
}

impl<R, K, F> Collect for Keyed<R, K, F>
where
    R: ReadRow,
    K: Eq + Hash + Debug,
    F: FnMut(&R::Item) -> K,
{
    type Output = HashMap<K, R::Item>;
    fn start(&mut self, labels: &RowNames) -> Result<()> {
        self.reader.start(labels)
    }
    fn push(&mut self, row: RowMap) -> Result<Flow> {
        let item = self.reader.read(row)?;
        let key = (self.key)(&item);
        insert_unique(&mut self.items, key, item, self.discard_duplicates)?;
        Ok(Flow::More)
    }
    fn finish(self) -> Result<Self::Output> {
        Ok(self.items)
    }
}

/// Rows keyed by the value of one column.
pub struct ByColumn<R: ReadRow> {
    reader: R,
    column: String,
    index: usize,
    discard_duplicates: bool,
    items: HashMap<Value, R::Item>,
}

impl<R: ReadRow> ByColumn<R> {
    pub fn new(reader: R, column: impl Into<String>, options: &RowOptions) -> Self {
        Self {
            reader,
            column: column.into(),
            index: 0,
            discard_duplicates: options.discard_duplicates,
            items: HashMap::new(),
        }
    }
}

impl<R: ReadRow> Collect for ByColumn<R> {
    type Output = HashMap<Value, R::Item>;
    fn start(&mut self, labels: &RowNames) -> Result<()> {
        let Some(index) = position_of(labels, &self.column) else {
            return Err(MappingError::MissingColumn {
                type_name: std::any::type_name::<R::Item>().into(),
                column: self.column.clone(),
            }
            .into());
        };
        self.index = index;
        self.reader.start(labels)
    }
    fn push(&mut self, row: RowMap) -> Result<Flow> {
        let key = row.values()[self.index].clone();
        let item = self.reader.read(row)?;
        insert_unique(&mut self.items, key, item, self.discard_duplicates)?;
        Ok(Flow::More)
    }
    fn finish(self) -> Result<Self::Output> {
        Ok(self.items)
    }
}

/// Feeds every row of `cursor` to `collector`. The cursor is closed when this returns,
/// whatever the outcome.
pub fn collect<C: Cursor, K: Collect>(cursor: &mut C, mut collector: K) -> Result<K::Output> {
    let result = read_all(cursor, &mut collector);
    cursor.close();
    result?;
    collector.finish()
}

fn read_all<C: Cursor, K: Collect>(cursor: &mut C, collector: &mut K) -> Result<()> {
    let labels = RowMap::labels_of(cursor)?;
    collector.start(&labels)?;
    while Cursor::advance(cursor)? {
        if collector.push(RowMap::read(cursor, &labels)?)? == Flow::Drain {
            let mut discarded = 1;
            while Cursor::advance(cursor)? {
                discarded += 1;
            }
            debug!("Discarded {discarded} extra rows");
            break;
        }
    }
    Ok(())
}

/// Advances `cursor` unless `token` is cancelled first.
pub async fn advance_or_cancel<C: AsyncCursor>(
    cursor: &mut C,
    token: &CancellationToken,
) -> Result<bool> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(MappingError::Cancelled.into()),
        result = AsyncCursor::advance(cursor) => result,
    }
}

/// Async [`collect`], cancellation is honored at every row read.
pub async fn collect_async<C: AsyncCursor, K: Collect>(
    cursor: &mut C,
    mut collector: K,
    token: &CancellationToken,
) -> Result<K::Output> {
    let result = read_all_async(cursor, &mut collector, token).await;
    cursor.close();
    result?;
    collector.finish()
}

async fn read_all_async<C: AsyncCursor, K: Collect>(
    cursor: &mut C,
    collector: &mut K,
    token: &CancellationToken,
) -> Result<()> {
    let labels = RowMap::labels_of(cursor)?;
    collector.start(&labels)?;
    while advance_or_cancel(cursor, token).await? {
        if collector.push(RowMap::read(cursor, &labels)?)? == Flow::Drain {
            let mut discarded = 1;
            while advance_or_cancel(cursor, token).await? {
                discarded += 1;
            }
            debug!("Discarded {discarded} extra rows");
            break;
        }
    }
    Ok(())
}
