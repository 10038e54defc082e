//! Supervision of the external display process.
//!
//! Liveness is polled once per tick; an exited renderer is relaunched
//! immediately, without backoff or a restart limit.

use std::time::Duration;

use ekiboard_core::config::RendererConfig;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};

use crate::error::{Result, SchedulerError};

/// How long `stop` waits for the renderer to exit after signalling it.
const STOP_GRACE: Duration = Duration::from_secs(5);

pub struct Renderer {
    command: Vec<String>,
    stop_command: Vec<String>,
    child: Option<Child>,
    launches: u32,
}

impl Renderer {
    pub fn new(config: &RendererConfig) -> Self {
        Self {
            command: config.command.clone(),
            stop_command: config.stop_command.clone(),
            child: None,
            launches: 0,
        }
    }

    /// Number of successful launches so far, including the first.
    pub fn launches(&self) -> u32 {
        self.launches
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    fn launch(&mut self) -> Result<()> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| SchedulerError::RendererSpawn("empty renderer command".to_string()))?;
        let child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SchedulerError::RendererSpawn(format!("{program}: {e}")))?;
        self.launches += 1;
        info!(pid = ?child.id(), command = ?self.command, "renderer launched");
        self.child = Some(child);
        Ok(())
    }

    /// Launch the renderer if it is not running. Returns true when a
    /// (re)launch happened.
    pub fn ensure_running(&mut self) -> Result<bool> {
        if let Some(child) = self.child.as_mut() {
            match child.try_wait() {
                Ok(None) => return Ok(false),
                Ok(Some(status)) => warn!(%status, "renderer exited, restarting"),
                Err(e) => warn!("renderer status unknown, restarting: {e}"),
            }
            self.child = None;
        }
        self.launch()?;
        Ok(true)
    }

    /// Stop the renderer if it is still alive.
    pub async fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if !matches!(child.try_wait(), Ok(None)) {
            return;
        }

        let stopped = match (child.id(), self.stop_command.split_first()) {
            (Some(pid), Some((program, args))) => Command::new(program)
                .args(args)
                .arg(pid.to_string())
                .status()
                .await
                .map(|s| s.success())
                .unwrap_or_else(|e| {
                    warn!("renderer stop command failed: {e}");
                    false
                }),
            _ => false,
        };
        if !stopped {
            if let Err(e) = child.start_kill() {
                error!("could not kill renderer: {e}");
                return;
            }
        }

        match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(Ok(status)) => info!(%status, "renderer stopped"),
            Ok(Err(e)) => warn!("renderer wait failed: {e}"),
            Err(_) => {
                warn!("renderer still running after stop; killing");
                let _ = child.start_kill();
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn config(command: &[&str], stop: &[&str]) -> RendererConfig {
        RendererConfig {
            enabled: true,
            command: command.iter().map(|s| s.to_string()).collect(),
            stop_command: stop.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn relaunches_after_exit() {
        let mut renderer = Renderer::new(&config(&["true"], &[]));
        assert!(renderer.ensure_running().unwrap());

        // wait for `true` to exit
        for _ in 0..100 {
            if renderer
                .child
                .as_mut()
                .is_some_and(|c| matches!(c.try_wait(), Ok(Some(_))))
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(renderer.ensure_running().unwrap());
        assert_eq!(renderer.launches(), 2);
    }

    #[tokio::test]
    async fn running_child_is_left_alone() {
        let mut renderer = Renderer::new(&config(&["sleep", "30"], &[]));
        assert!(renderer.ensure_running().unwrap());
        assert!(!renderer.ensure_running().unwrap());
        assert_eq!(renderer.launches(), 1);
        renderer.stop().await;
        assert!(renderer.pid().is_none());
    }

    #[tokio::test]
    async fn stop_command_receives_pid() {
        let mut renderer = Renderer::new(&config(&["sleep", "30"], &["kill"]));
        renderer.ensure_running().unwrap();
        assert!(renderer.pid().is_some());
        renderer.stop().await;
        assert!(renderer.child.is_none());
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let mut renderer = Renderer::new(&config(&["/nonexistent/draw_matrix"], &[]));
        assert!(matches!(
            renderer.ensure_running(),
            Err(SchedulerError::RendererSpawn(_))
        ));
        let mut empty = Renderer::new(&config(&[], &[]));
        assert!(empty.ensure_running().is_err());
    }
}
