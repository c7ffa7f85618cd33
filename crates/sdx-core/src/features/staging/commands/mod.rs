//! Staged record commands

pub mod create_record;
pub mod delete_record;
pub mod process_record;
pub mod update_record;

pub use create_record::{CreateRecordCommand, CreateRecordError, CreateRecordResponse};
pub use delete_record::{DeleteRecordCommand, DeleteRecordError, DeleteRecordResponse};
pub use process_record::{ProcessRecordCommand, ProcessRecordError};
pub use update_record::{UpdateRecordCommand, UpdateRecordError, UpdateRecordResponse};
