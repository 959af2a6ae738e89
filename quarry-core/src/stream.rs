use crate::{
    AsyncCursor, CancellationToken, Cursor, ReadRow, Result, RowMap, RowNames, advance_or_cancel,
    futures::Stream,
};
use async_stream::try_stream;

/// Lazy one pass iterator over a live cursor.
///
/// Rows are constructed one at a time, nothing is buffered. The cursor is released when the
/// iterator is exhausted, on the first error, on [`RowIter::close`] or when it is dropped.
pub struct RowIter<R: ReadRow, C: Cursor> {
    cursor: Option<C>,
    labels: RowNames,
    reader: R,
}

impl<R: ReadRow, C: Cursor> RowIter<R, C> {
    /// Reads the column names and prepares the reader, before any row is read.
    pub fn new(mut cursor: C, mut reader: R) -> Result<Self> {
        let labels = RowMap::labels_of(&cursor)
            .and_then(|labels| reader.start(&labels).map(|_| labels));
        match labels {
            Ok(labels) => Ok(Self {
                cursor: Some(cursor),
                labels,
                reader,
            }),
            Err(error) => {
                cursor.close();
                Err(error)
            }
        }
    }

    pub fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cursor.is_none()
    }

    fn next_row(&mut self) -> Result<Option<R::Item>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return Ok(None);
        };
        if !Cursor::advance(cursor)? {
            self.close();
            return Ok(None);
        }
        let row = RowMap::read(cursor, &self.labels)?;
        self.reader.read(row).map(Some)
    }
}

impl<R: ReadRow, C: Cursor> Iterator for RowIter<R, C> {
    type Item = Result<R::Item>;
    fn next(&mut self) -> Option<Self::Item> {
        match self.next_row() {
            Ok(item) => item.map(Ok),
            Err(error) => {
                self.close();
                Some(Err(error))
            }
        }
    }
}

impl<R: ReadRow, C: Cursor> Drop for RowIter<R, C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Closes the async cursor when the stream owning it goes away.
struct CursorGuard<C: AsyncCursor>(C);

impl<C: AsyncCursor> Drop for CursorGuard<C> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Async counterpart of [`RowIter`], cancellation is honored at every row read.
pub fn row_stream<R, C>(
    cursor: C,
    mut reader: R,
    token: CancellationToken,
) -> impl Stream<Item = Result<R::Item>> + Send
where
    R: ReadRow + Send + 'static,
    R::Item: Send,
    C: AsyncCursor + 'static,
{
    try_stream! {
        let mut cursor = CursorGuard(cursor);
        let labels = RowMap::labels_of(&cursor.0)?;
        reader.start(&labels)?;
        while advance_or_cancel(&mut cursor.0, &token).await? {
            let row = RowMap::read(&cursor.0, &labels)?;
            yield reader.read(row)?;
        }
    }
}
