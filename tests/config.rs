use std::path::PathBuf;

use figment::Jail;
use pretty_assertions::assert_eq;
use shutup::config::Config;
use shutup::error::ConfigError;

#[test]
fn test_environment_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.set_env("SHUTUP_TIMER_SECONDS", "90");
        jail.set_env("SHUTUP_SEED", "42");
        jail.set_env("SHUTUP_DATA_DIR", "/tmp/shutup");
        jail.set_env("SHUTUP_MUTE", "true");

        let config = Config::load().unwrap();
        assert_eq!(
            config,
            Config {
                timer_seconds: 90,
                seed: Some(42),
                data_dir: PathBuf::from("/tmp/shutup"),
                mute: true,
                ..Config::default()
            }
        );
        Ok(())
    });
}

#[test]
fn test_empty_environment_uses_defaults() {
    Jail::expect_with(|_jail| {
        let config = Config::load().unwrap();
        assert_eq!(config.timer_seconds, 1080);
        assert_eq!(config.calibration_seconds, 3.0);
        assert_eq!(config.movement_threshold, 0.1);
        assert_eq!(config.seed, None);
        assert_eq!(config.asset_dir, PathBuf::from("assets"));
        Ok(())
    });
}

#[test]
fn test_out_of_range_values_are_rejected() {
    Jail::expect_with(|jail| {
        jail.set_env("SHUTUP_CALIBRATION_SECONDS", "0");
        match Config::load() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "calibration_seconds"),
            other => panic!("expected invalid calibration_seconds, got {other:?}"),
        }
        Ok(())
    });

    Jail::expect_with(|jail| {
        jail.set_env("SHUTUP_TIMER_SECONDS", "0");
        assert!(matches!(
            Config::load(),
            Err(ConfigError::Invalid {
                field: "timer_seconds",
                ..
            })
        ));
        Ok(())
    });
}

#[test]
fn test_unparseable_values_fail_extraction() {
    Jail::expect_with(|jail| {
        jail.set_env("SHUTUP_TIMER_SECONDS", "eighteen minutes");
        let error = Config::load().unwrap_err();
        assert!(matches!(error, ConfigError::Extract(_)));
        assert!(error.to_string().starts_with("Failed to extract configuration"));
        Ok(())
    });
}
