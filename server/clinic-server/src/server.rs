use crate::auth::{parse_expires_in, JwtKeys};
use crate::config::AppConfig;
use crate::error::ApiResult;
use crate::services::google::GoogleServices;
use crate::services::{PgUserDirectory, PrescriptionStore, UserDirectory};
use prescription_engine::{DrugInteractionChecker, NoopInteractionChecker};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::Arc;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: JwtKeys,
    pub users: Arc<dyn UserDirectory>,
    pub prescriptions: PrescriptionStore,
    /// Checker consulted for the clinical warnings of generated drafts
    pub interactions: Arc<dyn DrugInteractionChecker>,
    /// `None` when Google OAuth is not configured
    pub google: Option<GoogleServices>,
}

impl AppState {
    pub fn new(config: AppConfig, db: PgPool) -> ApiResult<Self> {
        let ttl = parse_expires_in(&config.jwt_expires_in)?;
        let jwt = JwtKeys::new(config.jwt_secret.expose_secret(), ttl);
        let google = GoogleServices::from_config(&config, db.clone())?;

        if google.is_none() {
            tracing::info!("Google OAuth is not configured; calendar integration disabled");
        }

        Ok(Self {
            users: Arc::new(PgUserDirectory::new(db.clone())),
            prescriptions: PrescriptionStore::new(db.clone()),
            interactions: Arc::new(NoopInteractionChecker),
            config: Arc::new(config),
            db,
            jwt,
            google,
        })
    }

    pub fn with_users(mut self, users: Arc<dyn UserDirectory>) -> Self {
        self.users = users;
        self
    }

    pub fn with_interactions(mut self, interactions: Arc<dyn DrugInteractionChecker>) -> Self {
        self.interactions = interactions;
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("jwt", &self.jwt)
            .field("google", &self.google)
            .finish_non_exhaustive()
    }
}
