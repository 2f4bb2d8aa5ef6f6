use clap::{Parser, ValueEnum};
use linkdrop_telemetry::LogFormat;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const LISTEN_ADDR_ENV: &str = "LINKDROP_LISTEN_ADDR";
pub const DATA_DIR_ENV: &str = "LINKDROP_DATA_DIR";
pub const UPLOADS_DIR_ENV: &str = "LINKDROP_UPLOADS_DIR";
pub const PUBLIC_BASE_URL_ENV: &str = "LINKDROP_PUBLIC_BASE_URL";
pub const FRONTEND_URL_ENV: &str = "LINKDROP_FRONTEND_URL";
pub const FILE_MAX_AGE_DAYS_ENV: &str = "LINKDROP_FILE_MAX_AGE_DAYS";
pub const LOG_FORMAT_ENV: &str = "LINKDROP_LOG_FORMAT";
pub const HSTS_ENV: &str = "LINKDROP_HSTS";
pub const NO_RATE_LIMIT_ENV: &str = "LINKDROP_NO_RATE_LIMIT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3002";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormatArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormatArg::Text => write!(f, "text"),
            LogFormatArg::Json => write!(f, "json"),
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "linkdrop", version, about = "URL shortener and file drop")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Directory holding urls.json and files.json.
    #[arg(long, env = DATA_DIR_ENV, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    #[arg(long, env = UPLOADS_DIR_ENV, default_value = DEFAULT_UPLOADS_DIR)]
    pub uploads_dir: PathBuf,

    /// Base of generated links. Derived from the Host header when unset.
    #[arg(long, env = PUBLIC_BASE_URL_ENV)]
    pub public_base_url: Option<String>,

    #[arg(long, env = FRONTEND_URL_ENV, default_value = DEFAULT_FRONTEND_URL)]
    pub frontend_url: String,

    /// Delete uploads older than this many days. Disabled when unset.
    #[arg(long, env = FILE_MAX_AGE_DAYS_ENV, value_parser = clap::value_parser!(u32).range(1..))]
    pub file_max_age_days: Option<u32>,

    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormatArg::Text
    )]
    pub log_format: LogFormatArg,

    /// Send Strict-Transport-Security. Enable when served over https.
    #[arg(long, env = HSTS_ENV)]
    pub hsts: bool,

    /// Turn off the per-client request limits.
    #[arg(long, env = NO_RATE_LIMIT_ENV)]
    pub no_rate_limit: bool,
}
