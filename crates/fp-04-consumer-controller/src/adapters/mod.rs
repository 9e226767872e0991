//! Controller variants.

pub mod babylon;
pub mod contract;

pub use babylon::BabylonConsumerController;
pub use contract::ContractConsumerController;
