use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Log {
    pub level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
    pub data_dir: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Loyalty {
    pub referrer_bonus: u32,
    pub welcome_bonus: u32,
    pub points_per_euro: u32,
    pub guest_discount_percent: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ServiceOffering {
    pub id: String,
    pub name: String,
    pub price_in_cents: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Reward {
    pub name: String,
    pub points: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub log: Log,
    pub storage: Storage,
    pub loyalty: Loyalty,
    pub services: Vec<ServiceOffering>,
    pub rewards: Vec<Reward>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config.toml"))
            .build()?;

        config.try_deserialize()
    }
}
