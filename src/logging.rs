use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Chatty dependencies are held at `warn` unless `RUST_LOG` names them.
pub const QUIET_DEPENDENCIES: &[&str] = &["sqlx=warn", "hyper=warn", "hyper_util=warn", "reqwest=warn"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
    /// Directives applied before `log_level`; a `RUST_LOG` entry for the same target wins.
    pub default_directives: Vec<String>,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            loki_enabled: std::env::var("LOKI_ENABLED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            loki_url: std::env::var("LOKI_URL").ok(),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "options-ingest".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
            default_directives: Vec::new(),
        }
    }

    pub fn with_default_directives(mut self, directives: &[&str]) -> Self {
        self.default_directives
            .extend(directives.iter().map(|d| d.to_string()));
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err("LOKI_ENABLED is true but LOKI_URL is not set".to_string());
        }
        Ok(())
    }

    pub fn env_filter(&self) -> Result<EnvFilter, BoxError> {
        let directives = self
            .default_directives
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.log_level.as_str()))
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .collect::<Vec<_>>()
            .join(",");

        Ok(EnvFilter::try_new(directives)?)
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<(), BoxError> {
    config.validate()?;

    let registry = tracing_subscriber::registry()
        .with(config.env_filter()?)
        .with(tracing_subscriber::fmt::layer());

    #[cfg(feature = "loki")]
    {
        if let (true, Some(loki_url)) = (config.loki_enabled, config.loki_url.as_deref()) {
            registry.with(loki_layer(&config, loki_url)?).try_init()?;
            tracing::info!("✅ Loki logging initialized at {} ({})", loki_url, config.environment);
            return Ok(());
        }
    }

    #[cfg(not(feature = "loki"))]
    {
        if config.loki_enabled {
            eprintln!("LOKI_ENABLED is set but this build has no `loki` feature; logging to console only");
        }
    }

    registry.try_init()?;
    tracing::info!("📊 Console logging initialized ({})", config.environment);
    Ok(())
}

// Must be called inside a tokio runtime: the Loki shipper runs as a background task.
#[cfg(feature = "loki")]
fn loki_layer(config: &LoggingConfig, loki_url: &str) -> Result<tracing_loki::Layer, BoxError> {
    let (layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_url(url::Url::parse(loki_url)?)?;

    tokio::spawn(task);
    Ok(layer)
}
