//! Client savings ledger

mod model;
mod service;

pub use model::{apply_to_balance, AdjustSavingsRequest, DepositRequest, SavingsKind, SavingsTransaction};
pub use service::SavingsService;
