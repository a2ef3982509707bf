use mailcheck_bench::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../mailcheck-bench.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    cfg.validate().expect("example config is valid");
    assert_eq!(cfg.polling.max_wait_ms, 60_000);
    assert_eq!(cfg.run.smoke_test_size, 5);
    assert_eq!(cfg.api.verify_url(), "http://localhost:8080/api/verify");
}

#[test]
fn load_rejects_invalid_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[run]\nsmoke_completion_threshold = 150.0\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("smoke_completion_threshold"));
}
