mod access;
mod context;
mod mysql;
mod plan;
mod postgres;
mod sql_server;
mod sql_writer;
mod sqlite;

pub use access::*;
pub use context::*;
pub use mysql::*;
pub use plan::*;
pub use postgres::*;
pub use sql_server::*;
pub use sql_writer::{GenericSqlWriter, IdentityFetch, SqlWriter};
pub use sqlite::*;
