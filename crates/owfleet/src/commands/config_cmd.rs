//! Config subcommand handlers. None of these touch the network.

use serde::Serialize;
use tabled::Tabled;

use owfleet_config::SETTINGS_FILE;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Serialize)]
struct ConfigFile {
    role: &'static str,
    path: String,
    exists: bool,
}

#[derive(Tabled)]
struct ConfigFileRow {
    #[tabled(rename = "File")]
    role: &'static str,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Present")]
    exists: &'static str,
}

#[derive(Serialize)]
struct DeploymentEntry {
    name: String,
    services: Vec<String>,
}

#[derive(Tabled)]
struct DeploymentRow {
    #[tabled(rename = "Deployment")]
    name: String,
    #[tabled(rename = "Services")]
    services: String,
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let workspace = util::load_workspace(global)?;
    let settings = &workspace.settings;

    let out = match args.command {
        ConfigCommand::Show => {
            let toml = settings.to_toml()?;
            output::render_single(global.output, settings, |_| toml.clone(), |_| {
                workspace.dir.display().to_string()
            })?
        }

        ConfigCommand::Path => {
            let files: Vec<ConfigFile> = [
                ("settings", SETTINGS_FILE),
                ("topology", settings.topology_file.as_str()),
                ("credentials", settings.credentials_file.as_str()),
                ("token cache", settings.token_cache_file.as_str()),
            ]
            .into_iter()
            .map(|(role, name)| {
                let path = workspace.dir.join(name);
                ConfigFile {
                    role,
                    exists: path.is_file(),
                    path: path.display().to_string(),
                }
            })
            .collect();

            output::render_list(
                global.output,
                &files,
                |f| ConfigFileRow {
                    role: f.role,
                    path: f.path.clone(),
                    exists: if f.exists { "yes" } else { "no" },
                },
                |f| f.path.clone(),
            )?
        }

        ConfigCommand::Deployments => {
            let topology =
                owfleet_config::load_topology(&workspace.dir.join(&settings.topology_file))?;
            let entries: Vec<DeploymentEntry> = topology
                .into_iter()
                .map(|(name, services)| DeploymentEntry {
                    name,
                    services: services.into_keys().collect(),
                })
                .collect();

            output::render_list(
                global.output,
                &entries,
                |e| DeploymentRow {
                    name: e.name.clone(),
                    services: e.services.join(", "),
                },
                |e| e.name.clone(),
            )?
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
