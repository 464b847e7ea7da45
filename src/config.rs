//! Configuration read from the environment (and from a `.env` file, when there is one)
//!
//! Every setting has a default; set the environmental variable named in its type's
//! documentation to override it.
pub use {deployment_cfg::Deployment, postgres_cfg::Postgres};

pub(crate) use self::environmental_variables::EnvVar;
use crate::err::FatalErr;
use hashbrown::HashMap;
use std::env;

mod deployment_cfg;
mod deployment_cfg_types;
mod environmental_variables;
mod postgres_cfg;
mod postgres_cfg_types;

pub use deployment_cfg_types::{StoreInner, StoreKind};
use deployment_cfg_types::{Env, EnvInner, LogLevel};

pub fn merge_dotenv() -> Result<(), FatalErr> {
    let file = match *Env::default().maybe_update(env::var("ENV").ok().as_ref())? {
        EnvInner::Production => ".env.production",
        EnvInner::Development => ".env",
    };
    match dotenv::from_filename(file) {
        Ok(_) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Start logging with the filter directives in `RUST_LOG` (`warn` when unset).
pub fn init_logger(env_vars: &HashMap<String, String>) -> Result<(), FatalErr> {
    let level = LogLevel::default().maybe_update(env_vars.get("RUST_LOG"))?;
    pretty_env_logger::formatted_builder()
        .parse_filters(level.as_str())
        .try_init()?;
    Ok(())
}

pub fn from_env<'a>(env_vars: HashMap<String, String>) -> Result<(Postgres, Deployment<'a>), FatalErr> {
    let env_vars = EnvVar::new(env_vars);
    log::info!("Environmental variables tutter received: {}", &env_vars);
    Ok((
        Postgres::from_env(env_vars.clone())?,
        Deployment::from_env(&env_vars)?,
    ))
}

#[cfg(test)]
mod test {
    use log::LevelFilter;

    #[test]
    fn module_directives_raise_the_max_level() {
        let logger = pretty_env_logger::formatted_builder()
            .parse_filters("tutter=debug,warp=info")
            .build();
        assert_eq!(logger.filter(), LevelFilter::Debug);

        let logger = pretty_env_logger::formatted_builder().parse_filters("warn").build();
        assert_eq!(logger.filter(), LevelFilter::Warn);
    }
}
