use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use vitalstats::{Channel, Config, CycleMode, MetricKind, VitalsError};

#[test]
fn test_load_full_valid_config() {
    let toml_content = r#"
        log_level = "debug"
        cycle_mode = "per_timestamp"
        disk_path = "/var/lib/weewx"
        temp_sensors = ["coretemp", "acpitz"]

        [bindings]
        cpu_load = "loop,archive"
        cpu_idle = ["loop"]
        mem_avail = ""
    "#;

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", toml_content).unwrap();

    let config = Config::load(Some(file.path())).unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.cycle_mode, CycleMode::PerTimestamp);
    assert_eq!(config.disk_path, PathBuf::from("/var/lib/weewx"));
    assert_eq!(config.temp_sensors, vec!["coretemp".to_string(), "acpitz".to_string()]);

    let filter = config.validate().unwrap();
    let load = filter.membership(MetricKind::CpuLoad);
    assert!(load.contains(Channel::Loop) && load.contains(Channel::Archive));
    assert!(filter.membership(MetricKind::CpuIdle).contains(Channel::Loop));
    assert!(!filter.membership(MetricKind::CpuIdle).contains(Channel::Archive));
    assert!(filter.membership(MetricKind::MemAvail).is_empty());
    // Not mentioned in the file
    assert!(filter.membership(MetricKind::DiskAvail).contains(Channel::Archive));
    assert!(!filter.membership(MetricKind::DiskAvail).contains(Channel::Loop));
}

#[test]
fn test_missing_file_is_an_error() {
    let result = Config::load(Some(Path::new("/nonexistent/vitalstats.toml")));
    assert!(matches!(result, Err(VitalsError::ConfigLoad(_))));
}

#[test]
fn test_unknown_channel_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[bindings]\ncpu_temp = \"loop,report\"\n").unwrap();

    let config = Config::load(Some(file.path())).unwrap();
    match config.validate() {
        Err(VitalsError::Config(msg)) => assert!(msg.contains("report"), "{}", msg),
        other => panic!("expected a configuration error, got {:?}", other),
    }
}

#[test]
fn test_unknown_metric_is_rejected() {
    let config = Config::from_toml("[bindings]\nswap_avail = \"archive\"\n").unwrap();
    assert!(matches!(config.validate(), Err(VitalsError::Config(_))));
}

#[test]
fn test_bindings_are_case_insensitive() {
    let config = Config::from_toml("[bindings]\ncpu_temp = \" LOOP , Archive \"\n").unwrap();
    let set = config.validate().unwrap().membership(MetricKind::CpuTemp);
    assert!(set.contains(Channel::Loop));
    assert!(set.contains(Channel::Archive));
}
