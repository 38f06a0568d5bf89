//! Shared integration-test server bootstrap helpers.

use axum_test::TestServer;
use shortpaste_server::{create_app, storage::StorageKind, AppState, Config};
use std::path::Path;
use tempfile::TempDir;

pub(crate) fn test_config_for_storage_path(path: &Path) -> Config {
    let mut config = Config {
        port: 0,
        ..Config::default()
    };
    config.storage.path = path.to_path_buf();
    config.storage.kind = StorageKind::File;
    config
}

pub(crate) fn test_server_for_config(config: Config) -> TestServer {
    let state = AppState::open(config).expect("open state");
    let app = create_app(state);
    TestServer::new(app).expect("server")
}

pub(crate) fn setup_test_server() -> (TestServer, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = test_config_for_storage_path(&temp_dir.path().join("data"));
    (test_server_for_config(config), temp_dir)
}

pub(crate) fn setup_server_with(
    adjust: impl FnOnce(&mut Config),
) -> (TestServer, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let mut config = test_config_for_storage_path(&temp_dir.path().join("data"));
    adjust(&mut config);
    (test_server_for_config(config), temp_dir)
}
