//! Shared helpers for command handlers.

use std::path::PathBuf;

use owfleet_config::Settings;
use owfleet_core::{DeploymentConfig, Session};
use tracing::debug;

use crate::cli::{DeploymentArgs, GlobalOpts};
use crate::error::CliError;

/// Resolved config directory and its effective settings.
pub struct Workspace {
    pub dir: PathBuf,
    pub settings: Settings,
}

/// Load settings for the resolved config directory, then apply the global
/// `--insecure` and `--timeout` overrides.
pub fn load_workspace(global: &GlobalOpts) -> Result<Workspace, CliError> {
    let dir = owfleet_config::resolve_config_dir(global.config_dir.as_deref());
    let mut settings = owfleet_config::load_settings(&dir)?;

    if global.insecure {
        settings.insecure = true;
    }
    if let Some(secs) = global.timeout {
        settings.timeout_secs = secs;
    }
    debug!(config_dir = %dir.display(), "settings loaded");
    Ok(Workspace { dir, settings })
}

/// Build the deployment config, honoring `--fresh-login`.
pub fn deployment_config(
    workspace: &mut Workspace,
    args: &DeploymentArgs,
) -> Result<DeploymentConfig, CliError> {
    if args.fresh_login {
        workspace.settings.fresh_login = true;
    }
    Ok(owfleet_config::deployment_config(
        &workspace.dir,
        &workspace.settings,
        &args.deployment,
    )?)
}

/// Resolve config and authenticate in one step.
pub async fn open_session(
    global: &GlobalOpts,
    args: &DeploymentArgs,
) -> Result<(Workspace, DeploymentConfig, Session), CliError> {
    let mut workspace = load_workspace(global)?;
    let config = deployment_config(&mut workspace, args)?;
    let session = Session::open(&config).await?;
    Ok((workspace, config, session))
}
