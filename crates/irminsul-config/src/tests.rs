#[cfg(test)]
mod tests {
    use super::super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.scraper.requests_per_second, 1.0);
        assert_eq!(config.scraper.max_retries, 3);
        assert_eq!(config.scraper.timeout_secs, 30);
        assert_eq!(config.scraper.user_agents.len(), 5);
        assert_eq!(config.source.base_url, "https://wiki.biligame.com/ys");
        assert_eq!(config.database.path, "./data/irminsul.lancedb");
        assert!(config.catalog.override_for(EntityKind::Weapon).is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_jitter_window_and_interval() {
        let scraper = ScraperConfig {
            requests_per_second: 4.0,
            min_delay_secs: 0.5,
            max_delay_secs: 1.5,
            ..ScraperConfig::default()
        };
        assert_eq!(scraper.min_request_interval(), Duration::from_millis(250));
        let (lo, hi) = scraper.jitter_window();
        assert_eq!(lo, Duration::from_millis(500));
        assert_eq!(hi, Duration::from_millis(1500));
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let toml = r#"
            [scraper]
            concurrency = 4
            max_retries = 5

            [sync.significant_fields]
            weapon = ["base_attack"]

            [catalog]
            weapons = ["天空之刃"]
        "#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.scraper.concurrency, 4);
        assert_eq!(config.scraper.max_retries, 5);
        assert_eq!(config.scraper.backoff_factor, 2.0);
        assert_eq!(
            config.sync.significant_fields.get(&EntityKind::Weapon),
            Some(&vec!["base_attack".to_string()])
        );
        assert_eq!(
            config.catalog.override_for(EntityKind::Weapon),
            Some(&["天空之刃".to_string()][..])
        );
    }

    #[test]
    fn test_env_overrides_replace_catalog() {
        let mut config = Config::default();
        config.apply_overrides_from(|name| match name {
            "IRMINSUL_CHARACTERS" => Some(" 琴 , 迪卢克,,".to_string()),
            "IRMINSUL_MONSTERS" => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(
            config.catalog.override_for(EntityKind::Character),
            Some(&["琴".to_string(), "迪卢克".to_string()][..])
        );
        assert!(config.catalog.override_for(EntityKind::Monster).is_none());
    }

    #[test]
    fn test_validate_rejects_inverted_jitter_window() {
        let mut config = Config::default();
        config.scraper.min_delay_secs = 3.0;
        config.scraper.max_delay_secs = 1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_rate_and_retries() {
        let mut config = Config::default();
        config.scraper.requests_per_second = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scraper.max_retries = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_floats() {
        let setters: [fn(&mut ScraperConfig, f64); 5] = [
            |s, v| s.requests_per_second = v,
            |s, v| s.min_delay_secs = v,
            |s, v| s.max_delay_secs = v,
            |s, v| s.retry_delay_secs = v,
            |s, v| s.backoff_factor = v,
        ];
        for set in setters {
            for bad in [f64::NAN, f64::INFINITY] {
                let mut config = Config::default();
                set(&mut config.scraper, bad);
                assert!(
                    matches!(config.validate(), Err(ConfigError::Invalid(_))),
                    "accepted {bad} in {:?}",
                    config.scraper
                );
            }
        }
    }

    #[test]
    fn test_validate_rejects_nan_from_toml() {
        let config = Config::from_toml_str("[scraper]\nmin_delay_secs = nan\n").unwrap();
        assert!(config.validate().is_err());
        let config = Config::from_toml_str("[scraper]\nbackoff_factor = inf\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_max_retries() {
        let mut config = Config::default();
        config.scraper.max_retries = MAX_RETRIES_LIMIT;
        config.validate().unwrap();
        config.scraper.max_retries = MAX_RETRIES_LIMIT + 1;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_duration_helpers_saturate() {
        let scraper = ScraperConfig {
            requests_per_second: 1e-320,
            min_delay_secs: f64::NAN,
            max_delay_secs: f64::INFINITY,
            retry_delay_secs: -1.0,
            ..ScraperConfig::default()
        };
        assert_eq!(scraper.min_request_interval(), Duration::MAX);
        assert_eq!(scraper.jitter_window(), (Duration::ZERO, Duration::MAX));
        assert_eq!(scraper.retry_delay(), Duration::ZERO);
    }

    #[test]
    fn test_load_missing_file_is_not_found() {
        let err = Config::load_from("/nonexistent/irminsul.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = Config::from_toml_str("[scraper\nconcurrency = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_example_file_is_valid() {
        let config = Config::from_toml_str(include_str!("../../../irminsul.example.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.source.allowed_hosts, vec!["wiki.biligame.com"]);
        assert!(config.sync.significant_fields.is_empty());
    }
}
