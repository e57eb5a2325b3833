// ⚙️ Configuration - built once at startup, passed by reference
//
// Every setting comes from the environment (a .env file is honored by the
// binary). Lookup goes through a closure so tests never touch process state.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_INPUT_DIR: &str = "HOUSING_INPUT_DIR";
pub const ENV_DUMP_PATH: &str = "HOUSING_DUMP_PATH";
pub const ENV_CSV_PATH: &str = "HOUSING_CSV_PATH";
pub const ENV_SPREADSHEET_PATH: &str = "HOUSING_SPREADSHEET_PATH";
pub const ENV_SCHEMA_PATH: &str = "HOUSING_SCHEMA_PATH";
pub const ENV_BROKEN_ROWS: &str = "HOUSING_BROKEN_ROWS";

// Store connection
pub const ENV_HOST: &str = "HOST";
pub const ENV_USER_DB: &str = "USER_DB";
pub const ENV_PASSWORD_DB: &str = "PASSWORD_DB";
pub const ENV_NAME_DB: &str = "NAME_DB";
pub const ENV_DATABASE_URL: &str = "HOUSING_DATABASE_URL";

const DEFAULT_INPUT_DIR: &str = "input";
const DEFAULT_HOST: &str = "localhost";

/// Row 46 of the upstream dump is known to be corrupt
pub const DEFAULT_BROKEN_ROWS: [i64; 1] = [46];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var}: '{value}' is not a valid house id")]
    InvalidBrokenRow { var: &'static str, value: String },

    #[error("{var} must be set (or {url_var} given instead)")]
    MissingVar {
        var: &'static str,
        url_var: &'static str,
    },
}

// ============================================================================
// STORE
// ============================================================================

/// Where the destination store lives
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Server host, optionally with `:port`
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,

    /// Full connection URL; wins over the fields above when set
    pub url_override: Option<String>,
}

impl StoreConfig {
    pub fn mysql(host: &str, user: &str, password: &str, database: &str) -> Self {
        StoreConfig {
            host: host.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            database: database.to_string(),
            url_override: None,
        }
    }

    /// Any URL the store driver understands (`mysql://…`, `sqlite:…`)
    pub fn from_url(url: &str) -> Self {
        StoreConfig {
            host: String::new(),
            user: String::new(),
            password: String::new(),
            database: String::new(),
            url_override: Some(url.to_string()),
        }
    }

    /// Connection URL, credentials percent-encoded
    pub fn url(&self) -> String {
        match &self.url_override {
            Some(url) => url.clone(),
            None => format!(
                "mysql://{}:{}@{}/{}",
                urlencoding::encode(&self.user),
                urlencoding::encode(&self.password),
                self.host,
                urlencoding::encode(&self.database)
            ),
        }
    }
}

// Never print the password
impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("url_override", &self.url_override.as_ref().map(|_| "***"))
            .finish()
    }
}

impl fmt::Display for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.url_override {
            Some(url) => {
                let scheme = url.split(':').next().unwrap_or("");
                write!(f, "{} store from {}", scheme, ENV_DATABASE_URL)
            }
            None => write!(f, "{}@{}/{}", self.user, self.host, self.database),
        }
    }
}

// ============================================================================
// HOUSING CONFIG
// ============================================================================

/// HousingConfig - everything one run needs to know
#[derive(Debug, Clone, PartialEq)]
pub struct HousingConfig {
    /// SQL dump with area and bedroom inserts
    pub dump_path: PathBuf,

    /// CSV with the house attributes
    pub csv_path: PathBuf,

    /// Spreadsheet with the price column
    pub spreadsheet_path: PathBuf,

    /// Destination store receiving the load
    pub store: StoreConfig,

    /// Schema script; None means the schema shipped with the crate
    pub schema_path: Option<PathBuf>,

    /// House ids excluded from every merge
    pub broken_rows: BTreeSet<i64>,
}

impl HousingConfig {
    /// Default layout under `input_dir`: house.sql, data_house.csv, house_price.xls
    pub fn with_input_dir(input_dir: &Path, store: StoreConfig) -> Self {
        HousingConfig {
            dump_path: input_dir.join("house.sql"),
            csv_path: input_dir.join("data_house.csv"),
            spreadsheet_path: input_dir.join("house_price.xls"),
            store,
            schema_path: None,
            broken_rows: DEFAULT_BROKEN_ROWS.into_iter().collect(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |var: &'static str| {
            get(var).ok_or(ConfigError::MissingVar {
                var,
                url_var: ENV_DATABASE_URL,
            })
        };

        let store = match get(ENV_DATABASE_URL) {
            Some(url) => StoreConfig::from_url(&url),
            None => StoreConfig {
                host: get(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
                user: require(ENV_USER_DB)?,
                password: lookup(ENV_PASSWORD_DB).unwrap_or_default(),
                database: require(ENV_NAME_DB)?,
                url_override: None,
            },
        };

        let input_dir = get(ENV_INPUT_DIR).unwrap_or_else(|| DEFAULT_INPUT_DIR.to_string());
        let mut config = Self::with_input_dir(Path::new(&input_dir), store);

        if let Some(path) = get(ENV_DUMP_PATH) {
            config.dump_path = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_CSV_PATH) {
            config.csv_path = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_SPREADSHEET_PATH) {
            config.spreadsheet_path = PathBuf::from(path);
        }
        config.schema_path = get(ENV_SCHEMA_PATH).map(PathBuf::from);

        if let Some(list) = get(ENV_BROKEN_ROWS) {
            config.broken_rows = parse_id_list(ENV_BROKEN_ROWS, &list)?;
        }

        Ok(config)
    }
}

/// Parse "46, 102,7" into a set of ids
fn parse_id_list(var: &'static str, list: &str) -> Result<BTreeSet<i64>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<i64>().map_err(|_| ConfigError::InvalidBrokenRow {
                var,
                value: item.to_string(),
            })
        })
        .collect()
}
