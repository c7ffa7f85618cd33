//! Staged record queries

pub mod get_record;
pub mod list_records;

pub use get_record::{GetRecordError, GetRecordQuery, GetRecordResponse};
pub use list_records::{
    ListRecordsError, ListRecordsQuery, ListRecordsResponse, RecordListItem,
};
