//! Guarantors and their accept/reject decisions

mod model;
pub(crate) mod service;

pub use model::{
    AddGuarantorRequest, Guarantor, GuarantorDecision, GuarantorInput, GuarantorStatus,
};
pub use service::GuarantorService;
