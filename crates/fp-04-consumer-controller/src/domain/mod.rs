//! Backend-independent helpers shared by every controller variant.

pub mod locator;
pub mod msgs;
pub mod proof;

pub use locator::{block_height_by_timestamp, TimestampedBlocks};
pub use msgs::{block_info_from, check_batch_cardinality, ContractExecuteMsg};
pub use proof::decode_proof;
