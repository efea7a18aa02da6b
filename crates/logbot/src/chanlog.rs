use anyhow::Context;
use chrono::Local;
use irc_core::Observer;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

pub const TRAFFIC: &str = "!";

#[derive(Debug)]
pub struct ChannelLogs {
    dir: PathBuf,
    files: HashMap<String, Mutex<File>>,
}

impl ChannelLogs {
    pub fn open<I, S>(dir: &Path, keys: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let mut files = HashMap::new();
        for key in keys {
            let key = key.as_ref().to_lowercase();
            if files.contains_key(&key) {
                continue;
            }
            let path = dir.join(file_name(&key));
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("open {}", path.display()))?;
            files.insert(key, Mutex::new(file));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn append(&self, key: &str, line: &str) {
        let Some(file) = self.files.get(&key.to_lowercase()) else {
            return;
        };
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut file = match file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(err) = writeln!(file, "[{stamp}] {line}") {
            warn!(%err, %key, "log write failed");
        }
    }
}

fn file_name(key: &str) -> String {
    let safe: String = key
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{safe}.txt")
}

pub struct TrafficLog {
    logs: Arc<ChannelLogs>,
}

impl TrafficLog {
    pub fn new(logs: Arc<ChannelLogs>) -> Self {
        Self { logs }
    }
}

impl Observer for TrafficLog {
    fn on_read(&self, line: &str) {
        debug!("-> {line}");
        self.logs.append(TRAFFIC, &format!("-> {line}"));
    }

    fn on_write(&self, line: &str) {
        debug!("<- {line}");
        self.logs.append(TRAFFIC, &format!("<- {line}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn appends_to_known_keys_only() {
        let dir = tempdir().unwrap();
        let logs = ChannelLogs::open(dir.path(), ["#Rust", TRAFFIC, "#rust"]).unwrap();
        logs.append("#rust", "<alice> hi");
        logs.append("#RUST", "<bob> hello");
        logs.append("#elsewhere", "dropped");

        let raw = std::fs::read_to_string(dir.path().join("#rust.txt")).unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] <alice> hi"));
        assert!(lines[1].ends_with("] <bob> hello"));
        assert!(!dir.path().join("#elsewhere.txt").exists());
    }

    #[test]
    fn traffic_observer_marks_direction() {
        let dir = tempdir().unwrap();
        let logs = Arc::new(ChannelLogs::open(dir.path(), [TRAFFIC]).unwrap());
        let observer = TrafficLog::new(logs.clone());
        observer.on_read("PING :srv");
        observer.on_write("PONG :srv");

        let raw = std::fs::read_to_string(logs.dir().join("!.txt")).unwrap();
        let lines: Vec<_> = raw.lines().collect();
        assert!(lines[0].ends_with("-> PING :srv"));
        assert!(lines[1].ends_with("<- PONG :srv"));
    }

    #[test]
    fn reopening_appends() {
        let dir = tempdir().unwrap();
        ChannelLogs::open(dir.path(), ["#a"]).unwrap().append("#a", "one");
        ChannelLogs::open(dir.path(), ["#a"]).unwrap().append("#a", "two");
        let raw = std::fs::read_to_string(dir.path().join("#a.txt")).unwrap();
        assert_eq!(raw.lines().count(), 2);
    }
}
