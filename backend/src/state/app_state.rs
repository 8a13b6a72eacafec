//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::assessment::AssessmentService;
use crate::audit::AuditService;
use crate::auth::AuthService;
use crate::client::ClientService;
use crate::config::Config;
use crate::group::GroupService;
use crate::guarantor::GuarantorService;
use crate::loan::LoanService;
use crate::payments::PaymentRail;
use crate::savings::SavingsService;
use crate::services::{AnalyticsService, UserService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub client_service: Arc<ClientService>,
    pub savings_service: Arc<SavingsService>,
    pub group_service: Arc<GroupService>,
    pub loan_service: Arc<LoanService>,
    pub assessment_service: Arc<AssessmentService>,
    pub guarantor_service: Arc<GuarantorService>,
    pub audit_service: Arc<AuditService>,
    pub analytics_service: Arc<AnalyticsService>,
}

impl AppState {
    /// Wire every service onto one pool
    pub fn new(db_pool: PgPool, config: &Config, payment_rail: Arc<dyn PaymentRail>) -> Self {
        let workflow = &config.workflow;

        Self {
            auth_service: Arc::new(AuthService::new(
                db_pool.clone(),
                config.jwt_secret.clone(),
                config.jwt_access_token_ttl_seconds,
                config.jwt_refresh_token_ttl_days,
            )),
            user_service: Arc::new(UserService::new(db_pool.clone())),
            client_service: Arc::new(ClientService::new(db_pool.clone())),
            savings_service: Arc::new(SavingsService::new(db_pool.clone())),
            group_service: Arc::new(GroupService::new(db_pool.clone())),
            loan_service: Arc::new(LoanService::new(
                db_pool.clone(),
                workflow.clone(),
                payment_rail,
            )),
            assessment_service: Arc::new(AssessmentService::new(db_pool.clone(), workflow)),
            guarantor_service: Arc::new(GuarantorService::new(db_pool.clone())),
            audit_service: Arc::new(AuditService::new(db_pool.clone())),
            analytics_service: Arc::new(AnalyticsService::new(db_pool.clone())),
            db_pool,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}
