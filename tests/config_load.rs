use ansibbs::config::Config;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn loads_full_config() {
    let file = write_config(
        r#"
        [bbs]
        name = "Night Owl"
        sysop = "owl"
        max_connections = 4

        [telnet]
        bind = "127.0.0.1:2323"
        enabled = false

        [terminal]
        home_position_timeout_ms = 1500
        screen_size_timeout_ms = 1000
        menu_handoff_delay_ms = 100
        fallback_width = 132
        fallback_height = 43
        entry_menu = "login"

        [logging]
        level = "debug"
        "#,
    );
    let config = Config::load(file.path().to_str().unwrap()).await.unwrap();
    assert_eq!(config.bbs.name, "Night Owl");
    assert_eq!(config.bbs.max_connections, 4);
    assert!(!config.telnet.enabled);
    assert_eq!(config.terminal.fallback_width, 132);
    assert_eq!(config.terminal.entry_menu, "login");
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.file.is_none());
}

#[tokio::test]
async fn malformed_toml_is_an_error() {
    let file = write_config("[bbs\nname = ");
    let err = Config::load(file.path().to_str().unwrap()).await.unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));
}

#[tokio::test]
async fn invalid_values_are_rejected_on_load() {
    let file = write_config(
        r#"
        [bbs]
        name = "x"
        sysop = "y"

        [terminal]
        fallback_height = 5
        "#,
    );
    assert!(Config::load(file.path().to_str().unwrap()).await.is_err());
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(Config::load(path.to_str().unwrap()).await.is_err());
}

#[tokio::test]
async fn default_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let path = path.to_str().unwrap();
    Config::create_default(path).await.unwrap();
    let config = Config::load(path).await.unwrap();
    assert_eq!(config.telnet.bind, "0.0.0.0:8888");
    assert_eq!(config.terminal.home_position_timeout_ms, 3000);
    assert_eq!(config.logging.file.as_deref(), Some("ansibbs.log"));
}
