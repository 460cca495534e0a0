use std::{env, fs, ops::Deref, path::Path, str::FromStr, sync::Arc};

use tokio::sync::Semaphore;
use tracing::info;

use crate::{
    error::Error,
    provider::{DatabasePool, Directus, HTTP},
    push::{PushTransport, VapidKeys, WebPush},
    registry::Registry,
    types::{PushHeader, Urgency},
};

#[derive(Debug)]
pub struct AppState<T>(Arc<T>);

impl<T> AppState<T> {
    pub fn new(state: T) -> AppState<T> {
        AppState(Arc::new(state))
    }
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> AppState<T> {
        AppState(Arc::clone(&self.0))
    }
}

impl<T> Deref for AppState<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Arc<T> {
        &self.0
    }
}

#[derive(Debug)]
pub struct State {
    pub config: Config,
    pub registry: Registry,
    pub transport: Option<Arc<dyn PushTransport>>,
    pub push_permits: Arc<Semaphore>,
}

impl State {
    pub fn new(
        config: Config,
        registry: Registry,
        transport: Option<Arc<dyn PushTransport>>,
    ) -> State {
        let push_permits = Arc::new(Semaphore::new(config.max_tasks.max(1)));

        Self {
            config,
            registry,
            transport,
            push_permits,
        }
    }

    /// Wire the configured store and, when both VAPID keys are present, the
    /// web push transport.
    pub async fn from_config(config: Config) -> Result<State, Error> {
        let http = HTTP::new(&config)?;
        let registry = Self::init_registry(&config, &http).await?;

        let transport = match VapidKeys::from_config(&config)? {
            Some(keys) => {
                let transport: Arc<dyn PushTransport> =
                    Arc::new(WebPush::new(http, keys, config.push_header()));
                Some(transport)
            },
            None => {
                info!("VAPID keys not configured, push delivery disabled");
                None
            },
        };

        info!("Subscription store: {}", registry.backend());

        Ok(Self::new(config, registry, transport))
    }

    async fn init_registry(
        config: &Config,
        http: &HTTP,
    ) -> Result<Registry, Error> {
        let registry = match config.push_store {
            StoreKind::Memory => Registry::memory(),
            StoreKind::Postgres => {
                let url = config.database_url.as_deref().ok_or_else(|| {
                    Error::ConfigurationError(String::from(
                        "DATABASE_URL is required for PUSH_STORE=postgres",
                    ))
                })?;
                let database = DatabasePool::new(url).await?;
                database.init_migrations().await?;
                info!(
                    "Loaded {} stored subscriptions",
                    database.subscription.count().await?
                );
                Registry::new(Arc::new(database.subscription))
            },
            StoreKind::Directus => {
                let url = config.directus_url.as_deref().ok_or_else(|| {
                    Error::ConfigurationError(String::from(
                        "DIRECTUS_URL is required for PUSH_STORE=directus",
                    ))
                })?;
                let directus = Directus::new(
                    http.http.clone(),
                    url,
                    config.directus_token.to_owned(),
                )?;
                info!("Using Directus at {}", directus.base_url());
                Registry::new(Arc::new(directus))
            },
        };

        Ok(registry)
    }

    pub fn push_enabled(&self) -> bool {
        self.transport.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Postgres,
    Directus,
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<StoreKind, Self::Err> {
        match value {
            "memory" => Ok(StoreKind::Memory),
            "postgres" => Ok(StoreKind::Postgres),
            "directus" => Ok(StoreKind::Directus),
            _ => Err(Error::InvalidOption {
                option: format!("PUSH_STORE {}", value),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub static_dir: Option<String>,
    pub timeout: u64,
    pub max_tasks: usize,
    pub push_store: StoreKind,
    pub database_url: Option<String>,
    pub directus_url: Option<String>,
    pub directus_token: Option<String>,
    pub vapid_public_key: String,
    pub vapid_private_key: String,
    pub vapid_contact: String,
    pub push_ttl: i64,
    pub push_urgency: Urgency,
    pub notify_secret: Option<String>,
}

impl Config {
    pub fn has_vapid(&self) -> bool {
        !self.vapid_public_key.is_empty() && !self.vapid_private_key.is_empty()
    }

    pub fn push_header(&self) -> PushHeader {
        PushHeader {
            ttl: self.push_ttl,
            urgency: self.push_urgency,
        }
    }
}

pub fn get_configuration() -> Result<Config, Error> {
    parse_configuration(|key| env::var(key).ok())
}

pub fn parse_configuration<F>(lookup: F) -> Result<Config, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        lookup(key)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    };

    let server_host = var("SERVER_HOST").unwrap_or(String::from("0.0.0.0"));
    let port: u16 = var("PORT").unwrap_or(String::from("8080")).parse()?;
    let allowed_origins = var("ALLOWED_ORIGINS")
        .unwrap_or(String::from("*"))
        .split(',')
        .map(|item| item.trim().to_owned())
        .collect::<Vec<String>>();
    let static_dir = var("STATIC_DIRECTORY");
    let timeout: u64 = var("TIMEOUT").unwrap_or(String::from("10")).parse()?;
    let max_tasks: usize =
        var("MAX_PUSH_TASKS").unwrap_or(String::from("32")).parse()?;
    let push_store =
        StoreKind::from_str(&var("PUSH_STORE").unwrap_or(String::from("memory")))?;
    let database_url = var("DATABASE_URL");
    let directus_url = var("DIRECTUS_URL");
    let directus_token = var("DIRECTUS_TOKEN");

    let vapid_public_key = var("WEB_PUSH_PUBLIC_KEY").unwrap_or_default();
    let vapid_private_key = var("WEB_PUSH_PRIVATE_KEY").unwrap_or_default();
    let vapid_contact = var("WEB_PUSH_CONTACT")
        .unwrap_or(String::from("mailto:admin@example.com"));
    let push_ttl: i64 =
        var("WEB_PUSH_TTL").unwrap_or(String::from("86400")).parse()?;
    let push_urgency =
        Urgency::from_str(&var("WEB_PUSH_URGENCY").unwrap_or(String::from("normal")))?;
    let notify_secret = var("NOTIFY_SECRET");

    let config = Config {
        server_host,
        port,
        allowed_origins,
        static_dir,
        timeout,
        max_tasks,
        push_store,
        database_url,
        directus_url,
        directus_token,
        vapid_public_key,
        vapid_private_key,
        vapid_contact,
        push_ttl,
        push_urgency,
        notify_secret,
    };

    Ok(config)
}

/// Load `.env` from the manifest directory into the process environment.
/// Variables already set in the environment take precedence.
pub fn set_configuration() -> Result<(), Error> {
    let config_file: &str = ".env";

    let directory = env!("CARGO_MANIFEST_DIR");
    let path = format!("{}/{}", directory, config_file);

    if !Path::new(&path).exists() {
        return Ok(());
    }

    let config_string = fs::read_to_string(path)?;

    for (key, value) in parse_config_string(&config_string) {
        if env::var_os(key).is_none() {
            env::set_var(key, value);
        }
    }

    Ok(())
}

fn parse_config_string(config: &str) -> Vec<(&str, &str)> {
    config
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim().trim_matches('"')))
        .collect()
}
