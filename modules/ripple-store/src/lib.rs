pub mod csv_source;
pub mod filters;
pub mod postgres;
pub mod source;

pub use csv_source::CsvPostSource;
pub use filters::{filter_set_label, AllowLists, FilterKind, FilterResult, FilterTarget};
pub use postgres::PgPostSource;
pub use source::{ForumQuery, PostSource};
