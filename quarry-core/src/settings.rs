use crate::{
    Context, Error, MappingError, Result, RowOptions, SqlWriter, truncate_long,
    writer::{
        AccessSqlWriter, GenericSqlWriter, MySQLSqlWriter, PostgresSqlWriter, SQLiteSqlWriter,
        SqlServerSqlWriter,
    },
};
use std::{
    fmt::{self, Display},
    sync::Arc,
};
use url::Url;
use urlencoding::decode;

/// Target SQL dialect.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DialectKind {
    #[default]
    Generic,
    Postgres,
    Sqlite,
    MySql,
    SqlServer,
    Access,
}

impl DialectKind {
    /// Dialect selected by a connection URL scheme.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        Some(match scheme.to_ascii_lowercase().as_str() {
            "generic" => Self::Generic,
            "postgres" | "postgresql" => Self::Postgres,
            "sqlite" => Self::Sqlite,
            "mysql" | "mariadb" => Self::MySql,
            "sqlserver" | "mssql" => Self::SqlServer,
            "access" => Self::Access,
            _ => return None,
        })
    }

    pub fn writer(&self) -> Arc<dyn SqlWriter> {
        match self {
            Self::Generic => Arc::new(GenericSqlWriter),
            Self::Postgres => Arc::new(PostgresSqlWriter),
            Self::Sqlite => Arc::new(SQLiteSqlWriter),
            Self::MySql => Arc::new(MySQLSqlWriter),
            Self::SqlServer => Arc::new(SqlServerSqlWriter),
            Self::Access => Arc::new(AccessSqlWriter),
        }
    }
}

impl Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generic => "Generic SQL",
            Self::Postgres => "PostgreSQL",
            Self::Sqlite => "SQLite",
            Self::MySql => "MySQL",
            Self::SqlServer => "SQL Server",
            Self::Access => "Access",
        })
    }
}

/// Session wide behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub dialect: DialectKind,
    /// Unknown members are errors and paging must be deterministic.
    pub strict_mode: bool,
    /// Used by the fetch calls that do not receive explicit options.
    pub default_row_options: RowOptions,
    /// Log the SQL of every executed statement at debug level.
    pub log_statements: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dialect: DialectKind::Generic,
            strict_mode: true,
            default_row_options: RowOptions::default(),
            log_statements: true,
        }
    }
}

impl Settings {
    pub fn new(dialect: DialectKind) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    /// Reads the settings from a connection URL.
    ///
    /// The scheme selects the dialect, the query pairs `strict`, `log_statements`,
    /// `allow_empty` and `discard_extra_rows` override the defaults. Other pairs are left
    /// to the driver.
    ///
    /// ```rust
    /// use quarry_core::{DialectKind, Settings};
    /// let settings = Settings::from_url("postgres://localhost/app?strict=false").unwrap();
    /// assert_eq!(settings.dialect, DialectKind::Postgres);
    /// assert!(!settings.strict_mode);
    /// ```
    pub fn from_url(url: &str) -> Result<Self> {
        let context = || format!("While reading the settings from `{}`", truncate_long!(url));
        let decoded = decode(url).with_context(context)?;
        let parsed = Url::parse(&decoded).with_context(context)?;
        let Some(dialect) = DialectKind::from_scheme(parsed.scheme()) else {
            let error = Error::new(MappingError::configuration(format!(
                "Unknown database scheme `{}`",
                parsed.scheme()
            )))
            .context(context());
            log::error!("{:#}", error);
            return Err(error);
        };
        let mut settings = Settings::new(dialect);
        for (key, value) in parsed.query_pairs() {
            let target = match &*key {
                "strict" => &mut settings.strict_mode,
                "log_statements" => &mut settings.log_statements,
                "allow_empty" => &mut settings.default_row_options.allow_empty,
                "discard_extra_rows" => &mut settings.default_row_options.discard_extra_rows,
                _ => continue,
            };
            *target = parse_flag(&key, &value).with_context(context)?;
        }
        Ok(settings)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(MappingError::configuration(format!(
            "The flag `{key}` expects a boolean, found `{value}`"
        ))
        .into()),
    }
}
