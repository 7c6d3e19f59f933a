use std::process::Stdio;
use std::sync::Mutex;

use abn::TeamId;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{trace, warn};

use crate::{MatchTable, PlayerConfig, Recorder};

/// A spawned player process, playing one match.
///
/// Everything arriving on its stdout is a request from its team.
pub struct Player {
    pub name: String,
    pub team_id: TeamId,
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    // A re-usable buffer for IO.
    // Should always be empty before and after serving a request.
    buf: String,
}

impl Player {
    /// Starts the player's command with its configured arguments, then `session_args`.
    pub fn spawn(config: &PlayerConfig, session_args: &[String]) -> anyhow::Result<Self> {
        let mut child = Command::new(&config.cmd)
            .args(&config.args)
            .args(session_args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("Could not access stdin of {}", config.nick))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Could not access stdout of {}", config.nick))?;

        Ok(Self {
            name: config.nick.clone(),
            team_id: config.team_id.clone(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
            buf: String::new(),
        })
    }

    /// Answers requests until the player closes its stdout, then waits for it to exit.
    ///
    /// Returns the number of requests served.
    pub async fn serve(
        &mut self,
        table: &Mutex<MatchTable>,
        recorder: Option<&Recorder>,
    ) -> anyhow::Result<usize> {
        let mut num_requests = 0;
        loop {
            self.buf.clear();
            let num_bytes_read = self.stdout.read_line(&mut self.buf).await?;
            if num_bytes_read == 0 {
                // 0 bytes read means EOF - the player is done.
                break;
            }
            let request = self.buf.trim_end();
            trace!(player = &self.name, %request, "Received request");
            let mut reply = {
                let mut table = table
                    .lock()
                    .map_err(|_| anyhow::anyhow!("The match table lock is poisoned"))?;
                table.respond(&self.team_id, request)?
            };
            trace!(player = &self.name, %reply, "Sending reply");
            if let Some(recorder) = recorder {
                recorder.store_request(&self.name, request, &reply);
            }
            reply.push('\n');
            self.stdin.write_all(reply.as_bytes()).await?;
            self.stdin.flush().await?;
            num_requests += 1;
        }
        self.buf.clear();

        let status = self.child.wait().await?;
        if !status.success() {
            warn!(player = &self.name, %status, "Player exited unsuccessfully");
        }
        Ok(num_requests)
    }
}
