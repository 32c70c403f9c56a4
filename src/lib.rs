pub mod api;
pub mod config;
pub mod db;
pub mod lifecycle;
pub mod sms;

pub use db::DbPool;

use config::Config;
use sms::SmsClient;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub sms: SmsClient,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let sms = SmsClient::new(&config.sms);
        Self {
            config,
            db,
            sms,
            http: reqwest::Client::new(),
        }
    }
}
