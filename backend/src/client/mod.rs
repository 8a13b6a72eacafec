//! Borrowing clients

mod model;
mod service;

pub use model::{Client, ClientQuery, CreateClientRequest};
pub use service::ClientService;
