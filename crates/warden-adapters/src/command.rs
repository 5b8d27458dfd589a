//! Command-backed resource controller

use async_trait::async_trait;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};
use warden_api::ResourceType;
use warden_config::{CommandSet, ControllerConfig};
use warden_controller_api::{ControllerError, ControllerResult, ResourceController};
use warden_util::ServiceId;

/// Placeholder substituted with the service id in argv templates
pub const ID_PLACEHOLDER: &str = "{id}";

/// Resource controller that shells out to provider CLIs.
///
/// Each resource type maps to a [`CommandSet`]; a command succeeds when it
/// exits with status 0. The emptiness check treats any output on stdout as
/// "holds data".
pub struct CommandController {
    config: ControllerConfig,
}

impl CommandController {
    pub fn new(config: ControllerConfig) -> Self {
        Self { config }
    }

    fn template(
        &self,
        resource_type: &ResourceType,
        operation: &'static str,
        pick: impl Fn(&CommandSet) -> Option<&Vec<String>>,
    ) -> ControllerResult<&[String]> {
        self.config
            .commands_for(resource_type)
            .and_then(pick)
            .map(Vec::as_slice)
            .ok_or_else(|| ControllerError::NotConfigured {
                resource_type: resource_type.clone(),
                operation,
            })
    }

    async fn run(&self, template: &[String], id: &ServiceId) -> ControllerResult<Output> {
        let argv = render_argv(template, id);
        let Some((program, args)) = argv.split_first() else {
            return Err(ControllerError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "empty argv",
            )));
        };

        debug!(program = %program, args = ?args, "Running controller command");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        run_with_timeout(cmd, self.config.timeout).await
    }
}

/// Substitute the service id into every argument
pub fn render_argv(template: &[String], id: &ServiceId) -> Vec<String> {
    template
        .iter()
        .map(|arg| arg.replace(ID_PLACEHOLDER, id.as_str()))
        .collect()
}

async fn run_with_timeout(mut cmd: Command, timeout: Duration) -> ControllerResult<Output> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(output) => Ok(output?),
        Err(_) => Err(ControllerError::Timeout(timeout)),
    }
}

fn failure_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        format!("exited with {}: {}", output.status, stderr)
    }
}

#[async_trait]
impl ResourceController for CommandController {
    async fn stop(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<()> {
        let template = self.template(resource_type, "stop", |c| c.stop.as_ref())?;
        let output = self.run(template, id).await?;

        if !output.status.success() {
            let text = failure_text(&output);
            warn!(service_id = %id, resource_type = %resource_type, error = %text, "Stop command failed");
            return Err(ControllerError::StopFailed(text));
        }

        info!(service_id = %id, resource_type = %resource_type, "Resource stopped");
        Ok(())
    }

    async fn delete(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<()> {
        let template = self.template(resource_type, "delete", |c| c.delete.as_ref())?;
        let output = self.run(template, id).await?;

        if !output.status.success() {
            let text = failure_text(&output);
            warn!(service_id = %id, resource_type = %resource_type, error = %text, "Delete command failed");
            return Err(ControllerError::DeleteFailed(text));
        }

        info!(service_id = %id, resource_type = %resource_type, "Resource deleted");
        Ok(())
    }

    async fn is_empty(&self, resource_type: &ResourceType, id: &ServiceId) -> ControllerResult<bool> {
        let template = self.template(resource_type, "is_empty", |c| c.is_empty.as_ref())?;
        let output = self.run(template, id).await?;

        if !output.status.success() {
            return Err(ControllerError::CheckFailed(failure_text(&output)));
        }

        let empty = output.stdout.iter().all(u8::is_ascii_whitespace);
        debug!(service_id = %id, empty, "Emptiness check");
        Ok(empty)
    }
}
