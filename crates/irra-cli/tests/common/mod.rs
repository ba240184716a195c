//! Shared test utilities for irra-cli integration tests.

use assert_cmd::Command;
use std::path::Path;

/// Get a Command for the irra binary.
///
/// # Panics
///
/// Panics if the irra binary cannot be found.
#[allow(deprecated)]
pub fn irra_cmd() -> Command {
    Command::cargo_bin("irra").expect("irra binary should exist")
}

/// An `irra` command isolated in `home`: no user config, no inherited
/// `IRRA_*` overrides, a store under `home/store` and no colors.
pub fn isolated_cmd(home: &Path) -> Command {
    let mut cmd = irra_cmd();
    cmd.env("HOME", home)
        .env("USERPROFILE", home)
        .env_remove("IRRA_CONFIG")
        .env_remove("IRRA_STORE")
        .env_remove("IRRA_DEVICE")
        .env_remove("IRRA_VERBOSE")
        .env_remove("IRRA_QUIET")
        .env("NO_COLOR", "1")
        .arg("--store")
        .arg(home.join("store"));
    cmd
}
