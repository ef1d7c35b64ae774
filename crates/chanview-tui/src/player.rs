//! mpv playback over its JSON IPC socket.
//!
//! ```text
//!   MpvPlayer::play(url)
//!         │
//!         ├── ensure_process()  ← spawn `mpv --idle=yes --input-ipc-server=…` once
//!         └── send(["loadfile", url, "replace"])   → socket / named pipe
//! ```
//!
//! One short-lived connection per command. Replies are not awaited; mpv
//! reports failures for a stream in its own window/log.

use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tracing::{debug, info, warn};

use chanview_core::platform;
use chanview_core::Player;

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

const SOCKET_WAIT_STEPS: usize = 50;
const SOCKET_WAIT_STEP_MS: u64 = 100;

pub struct MpvPlayer {
    socket_name: String,
    extra_args: Vec<String>,
    process: Option<Child>,
}

impl MpvPlayer {
    pub fn new(extra_args: Vec<String>) -> Self {
        Self {
            socket_name: platform::mpv_socket_name(),
            extra_args,
            process: None,
        }
    }

    fn process_alive(&mut self) -> bool {
        match self.process.as_mut().map(|child| child.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                warn!("mpv exited: {}", status);
                self.process = None;
                false
            }
            Some(Err(e)) => {
                warn!("mpv: liveness check failed: {}", e);
                false
            }
            None => false,
        }
    }

    async fn ensure_process(&mut self) -> anyhow::Result<()> {
        if self.process_alive() {
            return Ok(());
        }

        #[cfg(unix)]
        let _ = tokio::fs::remove_file(&self.socket_name).await;

        let mpv_binary =
            platform::find_mpv_binary().ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;

        let stderr_path = platform::data_dir().join("mpv-stderr.log");
        let stderr_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&stderr_path)?;

        info!("mpv: spawning {:?}", mpv_binary);
        let child = tokio::process::Command::new(&mpv_binary)
            .arg("--idle=yes")
            .arg("--force-window=yes")
            .arg("--quiet")
            .arg(platform::mpv_socket_arg())
            .args(&self.extra_args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(stderr_file)
            .kill_on_drop(true)
            .spawn()?;
        info!("mpv: pid {:?}", child.id());
        self.process = Some(child);

        for _ in 0..SOCKET_WAIT_STEPS {
            if self.try_connect().await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(SOCKET_WAIT_STEP_MS)).await;
        }
        anyhow::bail!("mpv IPC socket did not appear")
    }

    #[cfg(unix)]
    async fn try_connect(&self) -> std::io::Result<UnixStream> {
        UnixStream::connect(&self.socket_name).await
    }

    #[cfg(windows)]
    async fn try_connect(&self) -> std::io::Result<tokio::net::windows::named_pipe::NamedPipeClient> {
        ClientOptions::new().open(format!(r"\\.\pipe\{}", self.socket_name))
    }

    async fn send(&self, command: Value) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(&json!({ "command": command }))?;
        line.push('\n');

        let mut stream = self.try_connect().await?;
        stream.write_all(line.as_bytes()).await?;
        stream.flush().await?;
        debug!("mpv <- {}", line.trim_end());
        Ok(())
    }

    /// Terminate the mpv process, if any.
    pub async fn kill(&mut self) {
        if let Some(mut child) = self.process.take() {
            if let Err(e) = child.kill().await {
                warn!("mpv: kill failed: {}", e);
            }
        }
    }
}

impl Player for MpvPlayer {
    async fn play(&mut self, url: &str) -> anyhow::Result<()> {
        self.ensure_process().await?;
        self.send(json!(["loadfile", url, "replace"])).await
    }

    async fn toggle_pause(&mut self) -> anyhow::Result<()> {
        if !self.process_alive() {
            anyhow::bail!("nothing is playing");
        }
        self.send(json!(["cycle", "pause"])).await
    }

    async fn stop(&mut self) {
        if !self.process_alive() {
            return;
        }
        if let Err(e) = self.send(json!(["stop"])).await {
            debug!("mpv: stop: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pause_without_process_fails() {
        let mut player = MpvPlayer::new(Vec::new());
        assert!(player.toggle_pause().await.is_err());
        player.stop().await;
        player.kill().await;
    }
}
