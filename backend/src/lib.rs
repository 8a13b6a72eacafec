//! Lendflow Backend Library
//!
//! Microfinance back office: clients, groups, savings and the loan lifecycle
//! workflow behind a role-gated REST API.

pub mod assessment;
pub mod audit;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod group;
pub mod guarantor;
pub mod handlers;
pub mod loan;
pub mod middleware;
pub mod models;
pub mod payments;
pub mod routes;
pub mod savings;
pub mod services;
pub mod state;
pub mod workflow;
