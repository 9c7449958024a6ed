#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scheduler_cron: String,
    pub scheduler_max_concurrent_projects: usize,
    pub scheduler_auto_pause: bool,
    pub connector_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub classifier_url: Option<String>,
    pub alert_email_enabled: bool,
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
    pub email_from: Option<String>,
    pub dashboard_url: String,
    pub youtube_api_key: Option<String>,
    pub twitter_bearer_token: Option<String>,
    pub meta_access_token: Option<String>,
    pub meta_page_id: Option<String>,
    pub meta_ig_user_id: Option<String>,
}

fn redact(value: Option<&String>) -> Option<&'static str> {
    value.map(|_| "[redacted]")
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("scheduler_cron", &self.scheduler_cron)
            .field(
                "scheduler_max_concurrent_projects",
                &self.scheduler_max_concurrent_projects,
            )
            .field("scheduler_auto_pause", &self.scheduler_auto_pause)
            .field("connector_timeout_secs", &self.connector_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("classifier_url", &self.classifier_url)
            .field("alert_email_enabled", &self.alert_email_enabled)
            .field("email_api_url", &self.email_api_url)
            .field("email_api_key", &redact(self.email_api_key.as_ref()))
            .field("email_from", &self.email_from)
            .field("dashboard_url", &self.dashboard_url)
            .field("youtube_api_key", &redact(self.youtube_api_key.as_ref()))
            .field(
                "twitter_bearer_token",
                &redact(self.twitter_bearer_token.as_ref()),
            )
            .field("meta_access_token", &redact(self.meta_access_token.as_ref()))
            .field("meta_page_id", &self.meta_page_id)
            .field("meta_ig_user_id", &self.meta_ig_user_id)
            .finish()
    }
}
