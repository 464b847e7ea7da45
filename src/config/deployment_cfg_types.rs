use crate::from_env_var;
use std::{fmt, net::IpAddr, str::FromStr, time::Duration};
use strum::VariantNames;
use strum_macros::{EnumString, EnumVariantNames};

from_env_var!(
    /// The current environment, which controls what file to read other ENV vars from
    let name = Env;
    let default: EnvInner = EnvInner::Development;
    let (env_var, allowed_values) = ("ENV", format!("one of: {:?}", EnvInner::VARIANTS));
    let from_str = |s| EnvInner::from_str(s).ok();
);
from_env_var!(
    /// The address to run tutter on
    let name = BindAddr;
    let default: IpAddr = IpAddr::V4("127.0.0.1".parse().expect("hardcoded"));
    let (env_var, allowed_values) = ("BIND", "a valid address (e.g., 127.0.0.1)");
    let from_str = |s| match s {
        "localhost" => Some(IpAddr::V4("127.0.0.1".parse().expect("hardcoded"))),
        _ => s.parse().ok(),
    };
);
from_env_var!(
    /// The port to run tutter on
    let name = Port;
    let default: u16 = 8080;
    let (env_var, allowed_values) = ("PORT", "a number between 0 and 65535");
    let from_str = |s| s.parse().ok();
);
from_env_var!(
    /// Log filter directives, either a bare level or per-module ones like `tutter=debug,warp=info`
    let name = LogLevel;
    let default: String = "warn".to_string();
    let (env_var, allowed_values) = ("RUST_LOG", "env_logger filter directives");
    let from_str = |s| Some(s.to_string());
);
from_env_var!(
    /// Whether the debug endpoint (and resetting the hub) is available
    let name = DebugMode;
    let default: bool = false;
    let (env_var, allowed_values) = ("DEBUG", "`true`, `false`, `1` or `0`");
    let from_str = |s| match s {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    };
);
from_env_var!(
    /// The value the `X-Debug-Pin` header must carry
    let name = DebugPin;
    let default: Option<String> = None;
    let (env_var, allowed_values) = ("DEBUG_PIN", "any string");
    let from_str = |s| Some(Some(s.to_string()));
);
from_env_var!(
    /// The bearer token `GET /metrics` requires; unset leaves the endpoint open
    let name = MetricsBearer;
    let default: Option<String> = None;
    let (env_var, allowed_values) = ("METRICS_BEARER", "any string");
    let from_str = |s| Some(Some(s.to_string()));
);
from_env_var!(
    /// Where posts are kept
    let name = StoreKind;
    let default: StoreInner = StoreInner::Postgres;
    let (env_var, allowed_values) = ("STORE", format!("one of: {:?}", StoreInner::VARIANTS));
    let from_str = |s| StoreInner::from_str(s).ok();
);
from_env_var!(
    /// How long a long-poll request waits before answering `204 No Content`
    let name = PollTimeout;
    let default: Duration = Duration::from_secs(120);
    let (env_var, allowed_values) = ("POLL_TIMEOUT", "a positive number of seconds");
    let from_str = |s| s.parse().ok().filter(|n: &u64| *n > 0).map(Duration::from_secs);
);
from_env_var!(
    /// How often the store is checked for posts the hub missed
    let name = ReconcileInterval;
    let default: Duration = Duration::from_secs(30);
    let (env_var, allowed_values) = ("RECONCILE_INTERVAL", "a positive number of seconds");
    let from_str = |s| s.parse().ok().filter(|n: &u64| *n > 0).map(Duration::from_secs);
);
from_env_var!(
    /// How many undelivered posts a single subscriber may have queued
    let name = SubscriberQueue;
    let default: usize = 3;
    let (env_var, allowed_values) = ("SUBSCRIBER_QUEUE", "a positive number");
    let from_str = |s| s.parse().ok().filter(|n: &usize| *n > 0);
);

#[derive(EnumString, EnumVariantNames, Debug, Clone, Copy, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum EnvInner {
    Production,
    Development,
}

#[derive(EnumString, EnumVariantNames, Debug, Clone, Copy, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum StoreInner {
    Postgres,
    Memory,
}

/// Permissions for Cross Origin Resource Sharing (CORS)
#[derive(Clone)]
pub struct Cors<'a> {
    pub allowed_headers: Vec<&'a str>,
    pub allowed_methods: Vec<&'a str>,
}
impl fmt::Debug for Cors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allowed headers: {:?}\n      allowed methods: {:?}",
            self.allowed_headers, self.allowed_methods
        )
    }
}
impl std::default::Default for Cors<'_> {
    fn default() -> Self {
        Self {
            allowed_methods: vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"],
            allowed_headers: vec![
                "Authorization",
                "Accept",
                "Cache-Control",
                "Content-Type",
                "X-Debug-Pin",
            ],
        }
    }
}
