//! `owfleet device`: script, firmware upgrade and command status.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use owfleet_api::QueuedCommand;
use owfleet_api::models::CommandDetails;
use owfleet_core::MacAddress;

use crate::cli::{DeviceArgs, DeviceCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

/// A command the gateway accepted, as shown to the user.
#[derive(Debug, Serialize)]
struct Queued {
    mac: MacAddress,
    uuid: Option<Uuid>,
    result_code: Option<i64>,
    text: Option<String>,
}

impl Queued {
    fn new(mac: MacAddress, cmd: QueuedCommand) -> Self {
        Self {
            mac,
            uuid: cmd.uuid,
            result_code: cmd.status.result_code,
            text: cmd.status.text,
        }
    }
}

fn queued_detail(q: &Queued) -> String {
    [
        format!("MAC:    {}", q.mac),
        format!(
            "UUID:   {}",
            q.uuid.map_or_else(|| "-".into(), |u| u.to_string())
        ),
        format!(
            "Result: {}",
            q.result_code.map_or_else(|| "-".into(), |c| c.to_string())
        ),
        format!("Text:   {}", q.text.as_deref().unwrap_or("-")),
    ]
    .join("\n")
}

fn status_detail(d: &CommandDetails) -> String {
    [
        format!("UUID:    {}", d.uuid.as_deref().unwrap_or("-")),
        format!("Command: {}", d.command.as_deref().unwrap_or("-")),
        format!("Status:  {}", d.status.as_deref().unwrap_or("-")),
        format!(
            "Error:   {}",
            d.error_code.map_or_else(|| "-".into(), |c| c.to_string())
        ),
        format!("Text:    {}", d.error_text.as_deref().unwrap_or("-")),
    ]
    .join("\n")
}

fn render_queued(global: &GlobalOpts, queued: &Queued) -> Result<(), CliError> {
    let out = output::render_single(global.output, queued, queued_detail, |q| {
        q.uuid.map(|u| u.to_string()).unwrap_or_default()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(args: DeviceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DeviceCommand::Script(script) => {
            let body = std::fs::read(&script.file)?;
            let encoded = STANDARD.encode(body);
            let mac = MacAddress::new(&script.mac);

            let (_, _, session) = util::open_session(global, &script.deployment).await?;
            let cmd = session
                .client()
                .run_script(mac.as_str(), &encoded, script.deferred)
                .await?;
            info!(%mac, uuid = ?cmd.uuid, "script queued");
            render_queued(global, &Queued::new(mac, cmd))
        }

        DeviceCommand::Upgrade(upgrade) => {
            let mac = MacAddress::new(&upgrade.mac);
            let (_, _, session) = util::open_session(global, &upgrade.deployment).await?;
            let cmd = session
                .client()
                .upgrade_firmware(mac.as_str(), &upgrade.uri, !upgrade.no_keep_redirector)
                .await?;
            info!(%mac, uri = %upgrade.uri, "upgrade requested");
            render_queued(global, &Queued::new(mac, cmd))
        }

        DeviceCommand::Status(status) => {
            let uuid = Uuid::parse_str(&status.uuid).map_err(|e| CliError::Validation {
                field: "uuid".into(),
                reason: e.to_string(),
            })?;
            let mac = MacAddress::new(&status.mac);
            let (_, _, session) = util::open_session(global, &status.deployment).await?;
            let details = session.client().command_status(mac.as_str(), &uuid).await?;

            let out = output::render_single(global.output, &details, status_detail, |d| {
                d.status.clone().unwrap_or_default()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
