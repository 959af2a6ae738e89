#[cfg(test)]
mod tests {
    use futures::{StreamExt, TryStreamExt};
    use quarry::{
        BuiltStatement, DialectKind, Entity, MappingError, Result, SchemaCache, Session, Settings,
        Value,
    };
    use quarry_tests::{ScriptedDriver, init_logs};
    use std::{sync::Arc, time::Duration};
    use tokio_util::sync::CancellationToken;

    #[derive(Entity, Default, Debug, Clone, PartialEq)]
    struct Reading {
        sensor: String,
        value: f64,
    }

    fn session(driver: &ScriptedDriver) -> Session<ScriptedDriver> {
        init_logs();
        Session::new(
            driver.clone(),
            Settings::new(DialectKind::Postgres),
            Arc::new(SchemaCache::new()),
        )
    }

    fn query() -> BuiltStatement {
        BuiltStatement::query("SELECT sensor, value FROM readings", Vec::new())
    }

    fn readings(count: usize) -> Vec<Vec<Value>> {
        (0..count)
            .map(|i| vec![Value::from(format!("s{i}")), Value::from(i as f64 / 2.0)])
            .collect()
    }

    fn is_cancelled(error: &quarry::Error) -> bool {
        MappingError::kind_of(error) == Some(&MappingError::Cancelled)
    }

    #[test]
    fn iterator_reads_lazily() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.rows(["sensor", "value"], readings(100));
        let mut rows = session
            .stream::<Reading>(query(), None)
            .expect("the cursor is open");
        let first = rows
            .next()
            .expect("a first row")
            .expect("a valid reading");
        assert_eq!(first.sensor, "s0");
        assert_eq!(driver.cursors()[0].rows_read, 1);
        assert!(!rows.is_closed());
        drop(rows);
        let cursor = driver.cursors()[0];
        assert!(cursor.closed);
        assert!(cursor.dropped);
        assert_eq!(cursor.rows_read, 1);
    }

    #[test]
    fn iterator_closes_when_exhausted() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.rows(["sensor", "value"], readings(3));
        let mut rows = session
            .stream::<Reading>(query(), None)
            .expect("the cursor is open");
        let values = rows
            .by_ref()
            .map(|v| v.map(|v| v.value))
            .collect::<Result<Vec<_>>>()
            .expect("every reading is valid");
        assert_eq!(values, [0.0, 0.5, 1.0]);
        assert!(rows.is_closed());
        assert!(driver.cursors()[0].closed);
        assert!(rows.next().is_none());
    }

    #[test]
    fn iterator_stops_on_error() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.rows(
            ["sensor", "value"],
            vec![
                vec![Value::from("s0"), Value::from(1.0f64)],
                vec![Value::from("s1"), Value::from("high")],
                vec![Value::from("s2"), Value::from(2.0f64)],
            ],
        );
        let mut rows = session
            .stream::<Reading>(query(), None)
            .expect("the cursor is open");
        assert!(rows.next().expect("first").is_ok());
        assert!(rows.next().expect("second").is_err());
        assert!(rows.is_closed());
        assert!(rows.next().is_none());
    }

    #[tokio::test]
    async fn async_stream() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.rows(["sensor", "value"], readings(4));
        let token = CancellationToken::new();
        let stream = session
            .stream_async::<Reading>(query(), None, token.clone())
            .await
            .expect("the cursor is open");
        let sensors = stream
            .map_ok(|v| v.sensor)
            .try_collect::<Vec<_>>()
            .await
            .expect("every reading is valid");
        assert_eq!(sensors, ["s0", "s1", "s2", "s3"]);
        let cursor = driver.cursors()[0];
        assert!(cursor.exhausted());
        assert!(cursor.closed);
    }

    #[tokio::test]
    async fn async_stream_dropped_early() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.rows(["sensor", "value"], readings(10));
        let mut stream = session
            .stream_async::<Reading>(query(), None, CancellationToken::new())
            .await
            .expect("the cursor is open");
        let first = stream
            .next()
            .await
            .expect("a first row")
            .expect("a valid reading");
        assert_eq!(first.sensor, "s0");
        drop(stream);
        let cursor = driver.cursors()[0];
        assert_eq!(cursor.rows_read, 1);
        assert!(cursor.closed);
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.rows(["sensor", "value"], readings(2));
        let token = CancellationToken::new();
        token.cancel();
        let error = session
            .fetch_all_async::<Reading>(query(), None, &token)
            .await
            .unwrap_err();
        assert!(is_cancelled(&error));
    }

    #[tokio::test]
    async fn cancelled_while_reading() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.stalled_rows(["sensor", "value"], readings(2));
        let token = CancellationToken::new();
        let mut stream = session
            .stream_async::<Reading>(query(), None, token.clone())
            .await
            .expect("the cursor is open");
        for _ in 0..2 {
            stream
                .next()
                .await
                .expect("a row")
                .expect("a valid reading");
        }
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        let error = stream
            .next()
            .await
            .expect("the cancellation is reported")
            .unwrap_err();
        assert!(is_cancelled(&error));
        assert!(stream.next().await.is_none());
        drop(stream);
        assert!(driver.cursors()[0].closed);
    }

    #[tokio::test]
    async fn fetch_async_cancelled_mid_read() {
        let driver = ScriptedDriver::new();
        let mut session = session(&driver);
        driver.stalled_rows(["sensor", "value"], readings(3));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        let error = session
            .fetch_all_async::<Reading>(query(), None, &token)
            .await
            .unwrap_err();
        assert!(is_cancelled(&error));
        let cursor = driver.cursors()[0];
        assert_eq!(cursor.rows_read, 3);
        assert!(cursor.closed);
    }
}
