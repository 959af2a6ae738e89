mod argument;
mod as_value;
mod builder;
mod column;
mod constructor;
mod driver;
mod entity;
mod error;
mod materialize;
mod row;
mod schema;
mod session;
mod settings;
mod statement;
mod stream;
mod util;
mod value;
pub mod writer;

pub use ::anyhow::Context;
pub use argument::*;
pub use as_value::*;
pub use builder::*;
pub use column::*;
pub use constructor::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use materialize::*;
pub use row::*;
pub use schema::*;
pub use session::*;
pub use settings::*;
pub use statement::*;
pub use stream::*;
pub use util::*;
pub use value::*;
pub use writer::SqlWriter;
pub mod futures {
    pub use ::futures::stream::{BoxStream, Stream, StreamExt, TryStreamExt};
}
pub use ::tokio_util::sync::CancellationToken;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
