pub mod memory_record_store;
pub mod rows;
pub mod sheets_record_store;

pub use memory_record_store::MemoryRecordStore;
pub use sheets_record_store::SheetsRecordStore;
