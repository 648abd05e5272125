pub mod archive;
pub mod dataset;
pub mod filename;
pub mod query;

pub use crate::domain::model::{InfoPairs, Record, Table, TableRow};
pub use crate::domain::ports::{FilenameParse, Storage};
pub use crate::utils::error::Result;
