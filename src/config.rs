use std::collections::HashSet;
use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::warehouse::{LoadStrategy, TableRef};

pub const DEFAULT_SOURCE_URL: &str = "https://cl.controlroll.com/ww01/ServiceUrl.aspx";
pub const DEFAULT_DESTINATION_TABLE: &str = "ww_data_upload_asistencia.Asistencias_ControlRoll";
pub const DEFAULT_ORIGIN_TAG: &str = "ControlRoll";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,

    // Vendor API
    pub source_url: String,
    pub source_token: Option<String>,

    // Destination
    pub destination_table: TableRef,
    pub load_strategy: LoadStrategy,
    pub origin_tag: String,
    pub excluded_shifts: HashSet<String>,

    // Logging
    pub log_level: tracing::Level,
    pub log_dir: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let destination_table = env::var("DESTINATION_TABLE")
            .unwrap_or_else(|_| DEFAULT_DESTINATION_TABLE.to_string());

        Ok(Self {
            port: parse_var("PORT", 8080)?,
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,

            source_url: env::var("SOURCE_URL").unwrap_or_else(|_| DEFAULT_SOURCE_URL.to_string()),
            source_token: env::var("TOKEN_CR").ok().filter(|t| !t.is_empty()),

            destination_table: TableRef::parse(&destination_table)
                .with_context(|| format!("invalid DESTINATION_TABLE `{destination_table}`"))?,
            load_strategy: env::var("LOAD_STRATEGY")
                .ok()
                .map(|s| {
                    LoadStrategy::from_str(s.trim())
                        .map_err(|_| anyhow!("invalid LOAD_STRATEGY `{s}`"))
                })
                .transpose()?
                .unwrap_or_default(),
            origin_tag: env::var("ORIGIN_TAG").unwrap_or_else(|_| DEFAULT_ORIGIN_TAG.to_string()),
            excluded_shifts: parse_shift_list(&env::var("EXCLUDED_SHIFTS").unwrap_or_default()),

            log_level: env::var("LOG_LEVEL")
                .ok()
                .map(|s| {
                    tracing::Level::from_str(&s).map_err(|_| anyhow!("invalid LOG_LEVEL `{s}`"))
                })
                .transpose()?
                .unwrap_or(tracing::Level::INFO),
            log_dir: env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
        })
    }

    pub fn server_addr(&self) -> (String, u16) {
        ("0.0.0.0".to_string(), self.port)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid {name} `{raw}`: {e}")),
        Err(_) => Ok(default),
    }
}

/// Comma separated shift codes, blanks ignored.
pub fn parse_shift_list(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
