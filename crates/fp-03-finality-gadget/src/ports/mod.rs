//! Ports for the finality gadget

pub mod inbound;
pub mod outbound;

pub use inbound::FinalityGadgetApi;
pub use outbound::GadgetContract;
