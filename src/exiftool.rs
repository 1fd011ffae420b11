use std::collections::{BTreeMap, HashMap};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ExtractError;

/// exiftool prints this on its own line after each `-execute`.
const SENTINEL: &str = "{ready}";

/// One exiftool JSON record: the source path plus every returned tag.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "SourceFile")]
    source_file: String,
    #[serde(flatten)]
    tags: BTreeMap<String, Value>,
}

/// A long-lived `exiftool -stay_open True` subprocess. One request is in
/// flight at a time; dropping the handle always sends the shutdown
/// command.
pub struct ExifTool {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ExifTool {
    pub fn open(executable: &str) -> Result<Self, ExtractError> {
        let mut child = Command::new(executable)
            .args(["-stay_open", "True", "-@", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(ExtractError::Spawn)?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("exiftool stdin unavailable"))?;
        let stdout = child
            .stdout
            .take()
            .map(BufReader::new)
            .ok_or_else(|| io::Error::other("exiftool stdout unavailable"))?;
        Ok(Self { child, stdin, stdout })
    }

    /// Query a batch of files with `-j -a -G -time:all`, returning one
    /// tag map per file, keyed by the path exiftool echoes back. Files
    /// exiftool could not read are simply absent from the result.
    pub fn metadata(
        &mut self,
        paths: &[PathBuf],
    ) -> Result<HashMap<PathBuf, BTreeMap<String, String>>, ExtractError> {
        let mut request = String::new();
        for arg in ["-j", "-a", "-G", "-time:all"] {
            request.push_str(arg);
            request.push('\n');
        }
        for path in paths {
            request.push_str(&path.to_string_lossy());
            request.push('\n');
        }
        request.push_str("-execute\n");
        self.stdin.write_all(request.as_bytes())?;
        self.stdin.flush()?;

        let output = self.read_response()?;
        let trimmed = output.trim();
        if trimmed.is_empty() {
            return Ok(HashMap::new());
        }

        let records: Vec<RawRecord> = serde_json::from_str(trimmed)?;
        let mut result = HashMap::with_capacity(records.len());
        for record in records {
            let mut tags = BTreeMap::new();
            for (name, value) in record.tags {
                if let Some(text) = stringify(&value) {
                    tags.insert(name, text);
                }
            }
            result.insert(PathBuf::from(record.source_file), tags);
        }
        Ok(result)
    }

    fn read_response(&mut self) -> io::Result<String> {
        let mut output = String::new();
        loop {
            let mut line = String::new();
            let n = self.stdout.read_line(&mut line)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "exiftool closed its output stream",
                ));
            }
            if line.trim_end() == SENTINEL {
                return Ok(output);
            }
            output.push_str(&line);
        }
    }
}

impl Drop for ExifTool {
    fn drop(&mut self) {
        let _ = self.stdin.write_all(b"-stay_open\nFalse\n");
        let _ = self.stdin.flush();
        // give it a few seconds to exit cleanly, then kill
        for _ in 0..50 {
            match self.child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => std::thread::sleep(Duration::from_millis(100)),
                Err(_) => break,
            }
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Collapse a JSON tag value to the string form used for date parsing.
/// Multi-value tags keep their first entry (the oldest, under `-a`).
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.first().and_then(stringify),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(&json!("2020:05:01 10:00:00")), Some("2020:05:01 10:00:00".into()));
        assert_eq!(
            stringify(&json!(["2019:01:01 00:00:00", "2020:05:01 10:00:00"])),
            Some("2019:01:01 00:00:00".into())
        );
        assert_eq!(stringify(&json!(42)), Some("42".into()));
        assert_eq!(stringify(&json!(null)), None);
        assert_eq!(stringify(&json!({"nested": true})), None);
    }

    #[test]
    fn test_record_shape() {
        let raw = r#"[{"SourceFile":"/a/b.jpg","EXIF:CreateDate":"2020:05:01 10:00:00"}]"#;
        let records: Vec<RawRecord> = serde_json::from_str(raw).unwrap();
        assert_eq!(records[0].source_file, "/a/b.jpg");
        assert_eq!(records[0].tags["EXIF:CreateDate"], json!("2020:05:01 10:00:00"));
    }

    #[test]
    fn test_open_missing_executable() {
        assert!(matches!(
            ExifTool::open("mediasort-no-such-exiftool"),
            Err(ExtractError::Spawn(_))
        ));
    }
}
