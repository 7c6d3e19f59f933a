use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Writes every request and reply of a match to `match_NNNNNN.json`.
///
/// Both players of a match are served at the same time, so requests are
/// stored through a shared reference.
pub struct Recorder {
    num: usize,
    directory: PathBuf,
    requests: Mutex<Vec<RequestFromPlayer>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestFromPlayer {
    pub player: String,
    pub request: Value,
    pub reply: Value,
}

impl Recorder {
    pub fn new(directory: PathBuf) -> anyhow::Result<Self> {
        if !directory.is_dir() {
            anyhow::bail!("Directory '{}' does not exist", directory.display());
        }
        Ok(Self {
            num: 1,
            directory,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Lines that are not JSON are kept as strings.
    pub fn store_request(&self, player: &str, request: &str, reply: &str) {
        let parse = |line: &str| {
            serde_json::from_str(line).unwrap_or_else(|_| Value::String(String::from(line)))
        };
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RequestFromPlayer {
                player: String::from(player),
                request: parse(request),
                reply: parse(reply),
            });
        }
    }

    pub fn write_match_recording(&mut self) -> anyhow::Result<PathBuf> {
        let requests = match self.requests.get_mut() {
            Ok(requests) => std::mem::take(requests),
            Err(_) => anyhow::bail!("The recording lock is poisoned"),
        };
        let filepath = self.directory.join(format!("match_{:0>6}.json", self.num));
        let writer = BufWriter::new(File::create(&filepath)?);
        serde_json::to_writer_pretty(writer, &requests)?;
        self.num += 1;
        Ok(filepath)
    }
}
