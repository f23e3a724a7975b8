pub mod error;
pub mod config;
pub mod format;
pub mod csv_io;
pub mod excel;
pub mod fetch;
pub mod payload;
pub mod sample;
pub mod source;

pub use error::{LoadError, LoadResult};
pub use config::LoadConfig;
pub use format::Format;
pub use csv_io::read_delimited;
pub use excel::read_spreadsheet;
pub use fetch::fetch_bytes;
pub use payload::table_from_json;
pub use sample::{sample_table, SAMPLES};
pub use source::{load_table, LoadSource};
