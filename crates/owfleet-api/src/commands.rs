// Gateway device commands
//
// Script execution, firmware upgrade, and command status polling.

use tracing::debug;
use uuid::Uuid;

use crate::client::{CloudClient, Service};
use crate::error::Error;
use crate::models::{CommandDetails, CommandReply, CommandStatus, ScriptRequest, UpgradeRequest};

/// A command accepted by the gateway.
#[derive(Debug, Clone)]
pub struct QueuedCommand {
    pub uuid: Option<Uuid>,
    pub status: CommandStatus,
}

impl CloudClient {
    /// Run a shell script on a device.
    ///
    /// `script_b64` must already be base64-encoded. `POST /api/v1/device/{mac}/script`
    pub async fn run_script(
        &self,
        mac: &str,
        script_b64: &str,
        deferred: bool,
    ) -> Result<QueuedCommand, Error> {
        debug!(mac, deferred, "running script");
        let body = ScriptRequest {
            serial_number: mac,
            kind: "shell",
            script: script_b64,
            when: 0,
            deferred,
        };
        let reply: CommandReply = self
            .post(Service::Gateway, &format!("/api/v1/device/{mac}/script"), &body)
            .await?;
        queued(reply)
    }

    /// Start a firmware upgrade from `uri`.
    ///
    /// `POST /api/v1/device/{mac}/upgrade`
    pub async fn upgrade_firmware(
        &self,
        mac: &str,
        uri: &str,
        keep_redirector: bool,
    ) -> Result<QueuedCommand, Error> {
        debug!(mac, uri, keep_redirector, "requesting firmware upgrade");
        let body = UpgradeRequest {
            serial_number: mac,
            uri,
            when: 0,
            keep_redirector,
        };
        let reply: CommandReply = self
            .post(Service::Gateway, &format!("/api/v1/device/{mac}/upgrade"), &body)
            .await?;
        queued(reply)
    }

    /// Current state of a previously issued command.
    ///
    /// `GET /api/v1/command/{uuid}?serialNumber={mac}`
    pub async fn command_status(&self, mac: &str, uuid: &Uuid) -> Result<CommandDetails, Error> {
        self.get(
            Service::Gateway,
            &format!("/api/v1/command/{uuid}"),
            &[("serialNumber", mac.to_owned())],
        )
        .await
    }
}

fn queued(reply: CommandReply) -> Result<QueuedCommand, Error> {
    let status = reply
        .results
        .and_then(|r| r.status)
        .ok_or(Error::MissingField {
            field: "results.status",
        })?;
    let uuid = reply.uuid.as_deref().and_then(|s| Uuid::parse_str(s).ok());
    Ok(QueuedCommand { uuid, status })
}
