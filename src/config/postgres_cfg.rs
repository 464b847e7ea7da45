use super::postgres_cfg_types::*;
use super::EnvVar;
use crate::err::FatalErr;

#[derive(Debug, Default)]
pub struct Postgres {
    pub user: PgUser,
    pub host: PgHost,
    pub password: PgPass,
    pub database: PgDatabase,
    pub port: PgPort,
    pub max_connections: PgMaxConnections,
}

impl Postgres {
    /// Configure Postgres and return a connection
    pub(crate) fn from_env(env: EnvVar) -> Result<Self, FatalErr> {
        let env = match env.get("DATABASE_URL").cloned() {
            Some(url_str) => env.update_with_postgres_url(&url_str)?,
            None => env,
        };

        let cfg = Self {
            user: PgUser::default().maybe_update(env.get("DB_USER"))?,
            host: PgHost::default().maybe_update(env.get("DB_HOST"))?,
            password: PgPass::default().maybe_update(env.get("DB_PASS"))?,
            database: PgDatabase::default().maybe_update(env.get("DB_NAME"))?,
            port: PgPort::default().maybe_update(env.get("DB_PORT"))?,
            max_connections: PgMaxConnections::default()
                .maybe_update(env.get("DB_MAX_CONNECTIONS"))?,
        };

        log::info!("Postgres configuration:\n{:#?}", &cfg);
        Ok(cfg)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hashbrown::HashMap;

    fn env(pairs: &[(&str, &str)]) -> EnvVar {
        EnvVar::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_without_env() {
        let cfg = Postgres::from_env(EnvVar::new(HashMap::new())).expect("in test");
        assert_eq!(*cfg.user, "postgres");
        assert_eq!(*cfg.port, 5432);
        assert_eq!(*cfg.max_connections, 50);
        assert!(cfg.password.is_none());
    }

    #[test]
    fn database_url_wins_over_db_vars() {
        let cfg = Postgres::from_env(env(&[
            ("DB_HOST", "ignored"),
            ("DATABASE_URL", "postgres://me@db:6000/blog"),
        ]))
        .expect("in test");
        assert_eq!(*cfg.host, "db");
        assert_eq!(*cfg.port, 6000);
        assert_eq!(*cfg.database, "blog");
        assert_eq!(*cfg.user, "me");
    }

    #[test]
    fn invalid_values_are_fatal() {
        assert!(Postgres::from_env(env(&[("DB_PORT", "http")])).is_err());
        assert!(Postgres::from_env(env(&[("DB_MAX_CONNECTIONS", "0")])).is_err());
    }
}
