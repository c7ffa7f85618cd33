//! Staging lifecycle feature
//!
//! Staged records move through `staged → {merged, imported, rejected}`;
//! `imported` is terminal. Commands cover the write side of the lifecycle
//! including the full per-record processing sequence; queries read records
//! and the staging inventory.

pub mod commands;
pub mod queries;

pub use commands::{
    CreateRecordCommand, CreateRecordError, CreateRecordResponse, DeleteRecordCommand,
    DeleteRecordError, DeleteRecordResponse, ProcessRecordCommand, ProcessRecordError,
    UpdateRecordCommand, UpdateRecordError, UpdateRecordResponse,
};

pub use queries::{
    GetRecordError, GetRecordQuery, GetRecordResponse, ListRecordsError, ListRecordsQuery,
    ListRecordsResponse, RecordListItem,
};
