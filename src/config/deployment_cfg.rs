use super::deployment_cfg_types::*;
use super::EnvVar;
use crate::err::FatalErr;
use rand::distributions::Alphanumeric;
use rand::Rng;

#[derive(Debug, Default)]
pub struct Deployment<'a> {
    pub address: BindAddr,
    pub port: Port,
    pub cors: Cors<'a>,
    pub debug: DebugMode,
    pub debug_pin: DebugPin,
    pub metrics_bearer: MetricsBearer,
    pub store: StoreKind,
    pub poll_timeout: PollTimeout,
    pub reconcile_interval: ReconcileInterval,
    pub subscriber_queue: SubscriberQueue,
}

impl Deployment<'_> {
    const DEBUG_WARNING: &'static str =
        "Debug mode enabled; POST /api/debug/cleanup can wipe every post.";

    pub(crate) fn from_env(env: &EnvVar) -> Result<Self, FatalErr> {
        let mut cfg = Self {
            address: BindAddr::default().maybe_update(env.get("BIND"))?,
            port: Port::default().maybe_update(env.get("PORT"))?,
            cors: Cors::default(),
            debug: DebugMode::default().maybe_update(env.get("DEBUG"))?,
            debug_pin: DebugPin::default().maybe_update(env.get("DEBUG_PIN"))?,
            metrics_bearer: MetricsBearer::default().maybe_update(env.get("METRICS_BEARER"))?,
            store: StoreKind::default().maybe_update(env.get("STORE"))?,
            poll_timeout: PollTimeout::default().maybe_update(env.get("POLL_TIMEOUT"))?,
            reconcile_interval: ReconcileInterval::default()
                .maybe_update(env.get("RECONCILE_INTERVAL"))?,
            subscriber_queue: SubscriberQueue::default()
                .maybe_update(env.get("SUBSCRIBER_QUEUE"))?,
        };

        if *cfg.debug {
            if cfg.debug_pin.is_none() {
                let pin = Self::random_pin();
                log::info!("DEBUG_PIN undefined, generated a random pin: {}", pin);
                cfg.debug_pin = DebugPin(Some(pin));
            }
            log::warn!("{}", Self::DEBUG_WARNING);
        }
        log::info!("Using deployment configuration:\n {:#?}", &cfg);
        Ok(cfg)
    }

    fn random_pin() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hashbrown::HashMap;
    use std::time::Duration;

    fn env(pairs: &[(&str, &str)]) -> EnvVar {
        EnvVar::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let cfg = Deployment::from_env(&env(&[])).expect("in test");
        assert_eq!(*cfg.port, 8080);
        assert_eq!(*cfg.poll_timeout, Duration::from_secs(120));
        assert_eq!(*cfg.reconcile_interval, Duration::from_secs(30));
        assert_eq!(*cfg.subscriber_queue, 3);
        assert_eq!(*cfg.store, StoreInner::Postgres);
        assert!(!*cfg.debug);
        assert!(cfg.debug_pin.is_none());
    }

    #[test]
    fn debug_mode_always_has_a_pin() {
        let cfg = Deployment::from_env(&env(&[("DEBUG", "true")])).expect("in test");
        assert_eq!(cfg.debug_pin.as_ref().map(String::len), Some(24));

        let cfg = Deployment::from_env(&env(&[("DEBUG", "1"), ("DEBUG_PIN", "1234")]))
            .expect("in test");
        assert_eq!(cfg.debug_pin.as_deref(), Some("1234"));
    }

    #[test]
    fn empty_values_fall_back_to_defaults() {
        let cfg = Deployment::from_env(&env(&[("PORT", "")])).expect("in test");
        assert_eq!(*cfg.port, 8080);
    }

    #[test]
    fn invalid_values_are_fatal() {
        for (var, value) in &[
            ("STORE", "redis"),
            ("POLL_TIMEOUT", "0"),
            ("SUBSCRIBER_QUEUE", "-1"),
            ("DEBUG", "yes"),
        ] {
            assert!(Deployment::from_env(&env(&[(*var, *value)])).is_err(), "{}", var);
        }
    }

    #[test]
    fn log_directives_are_passed_through() {
        let cfg = Deployment::from_env(&env(&[("RUST_LOG", "tutter=debug,warp=info")]))
            .expect("in test");
        assert!(cfg.metrics_bearer.is_none());

        let level = LogLevel::default()
            .maybe_update(Some(&"tutter=debug,warp=info".to_string()))
            .expect("in test");
        assert_eq!(level.as_str(), "tutter=debug,warp=info");
        assert_eq!(LogLevel::default().as_str(), "warn");
    }

    #[test]
    fn env_only_names_known_environments() {
        let env = Env::default()
            .maybe_update(Some(&"production".to_string()))
            .expect("in test");
        assert_eq!(*env, EnvInner::Production);
        assert!(Env::default().maybe_update(Some(&"staging".to_string())).is_err());
    }

    #[test]
    fn cors_allows_the_debug_pin_header() {
        let cfg = Deployment::from_env(&env(&[("METRICS_BEARER", "s3cret")])).expect("in test");
        assert!(cfg.cors.allowed_headers.contains(&"X-Debug-Pin"));
        assert!(cfg.cors.allowed_methods.contains(&"PUT"));
        assert!(cfg.cors.allowed_methods.contains(&"DELETE"));
        assert_eq!(cfg.metrics_bearer.as_deref(), Some("s3cret"));
    }
}
