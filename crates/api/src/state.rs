use std::sync::Arc;

use infra::db::Db;

use crate::config::AppConfig;
use crate::services::payment_gateway::{PaymentGateway, TossPaymentsGateway};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Arc<AppConfig>,
    pub gateway: Arc<dyn PaymentGateway>,
}

impl AppState {
    pub fn new(db: Db, config: AppConfig) -> anyhow::Result<Self> {
        let gateway = TossPaymentsGateway::new(&config.payments)?;
        Ok(Self::with_gateway(db, config, Arc::new(gateway)))
    }

    /// State with a caller-supplied gateway (tests, sandboxes).
    pub fn with_gateway(db: Db, config: AppConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            gateway,
        }
    }
}
