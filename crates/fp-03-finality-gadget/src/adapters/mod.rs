//! Adapters for the gadget's driven ports.

pub mod contract;

pub use contract::CwGadgetContract;
