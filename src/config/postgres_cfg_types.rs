use crate::from_env_var;

from_env_var!(
    /// The user to use for Postgres
    let name = PgUser;
    let default: String = "postgres".to_string();
    let (env_var, allowed_values) = ("DB_USER", "any string");
    let from_str = |s| Some(s.to_string());
);

from_env_var!(
    /// The host address where Postgres is running
    let name = PgHost;
    let default: String = "localhost".to_string();
    let (env_var, allowed_values) = ("DB_HOST", "any string");
    let from_str = |s| Some(s.to_string());
);

from_env_var!(
    /// The password to use with Postgres
    let name = PgPass;
    let default: Option<String> = None;
    let (env_var, allowed_values) = ("DB_PASS", "any string");
    let from_str = |s| Some(Some(s.to_string()));
);

from_env_var!(
    /// The Postgres database to use
    let name = PgDatabase;
    let default: String = "tutter".to_string();
    let (env_var, allowed_values) = ("DB_NAME", "any string");
    let from_str = |s| Some(s.to_string());
);

from_env_var!(
    /// The port Postgres is running on
    let name = PgPort;
    let default: u16 = 5432;
    let (env_var, allowed_values) = ("DB_PORT", "a number between 0 and 65535");
    let from_str = |s| s.parse().ok();
);

from_env_var!(
    /// The largest number of pooled Postgres connections
    let name = PgMaxConnections;
    let default: u32 = 50;
    let (env_var, allowed_values) = ("DB_MAX_CONNECTIONS", "a positive number");
    let from_str = |s| s.parse().ok().filter(|n: &u32| *n > 0);
);
