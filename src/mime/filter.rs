//! External content filters keyed by MIME type.
//!
//! A filter table maps a full type (`text/html`) or a top-level type
//! (`image`) to a shell command. The part body is piped into the command
//! and whatever the command prints becomes the rendered part.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{MimeError, Result};

/// Environment variable carrying the part's charset to the filter.
pub const CHARSET_ENV: &str = "PIPE_CHARSET";

/// Environment variable naming the filter file.
pub const FILTER_FILE_ENV: &str = "MAILFILTER";

#[cfg(not(windows))]
const SHELL: (&str, &str) = ("sh", "-c");
#[cfg(windows)]
const SHELL: (&str, &str) = ("cmd", "/C");

/// Read-only map from MIME type (or top-level type) to filter command.
#[derive(Debug, Clone, Default)]
pub struct FilterTable {
    commands: BTreeMap<String, String>,
}

impl FilterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a filter file.
    ///
    /// The format is that of a mail header block: `type: command` per line,
    /// lines starting with whitespace continue the previous command, and
    /// lines starting with `#` are comments.
    pub fn parse(text: &str) -> Self {
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in text.lines() {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            if line.starts_with(' ') || line.starts_with('\t') {
                if let Some(last) = entries.last_mut() {
                    last.1.push(' ');
                    last.1.push_str(line.trim());
                }
            } else if let Some(colon_pos) = line.find(':') {
                let mime_type = line[..colon_pos].trim().to_ascii_lowercase();
                let command = line[colon_pos + 1..].trim().to_string();
                entries.push((mime_type, command));
            } else {
                debug!(line, "Ignoring filter line without a type");
            }
        }

        let mut table = Self::new();
        for (mime_type, command) in entries {
            table.insert(mime_type, command);
        }
        table
    }

    /// Read and parse a filter file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read(path).map_err(|e| MimeError::io(path, e))?;
        let table = Self::parse(&String::from_utf8_lossy(&text));
        info!(path = %path.display(), filters = table.len(), "Loaded filter table");
        Ok(table)
    }

    /// Register `command` for `mime_type`, replacing an earlier entry.
    /// Empty commands are ignored.
    pub fn insert(&mut self, mime_type: impl Into<String>, command: impl Into<String>) {
        let command = command.into();
        if command.trim().is_empty() {
            return;
        }
        self.commands
            .insert(mime_type.into().to_ascii_lowercase(), command);
    }

    /// Merge `other` into `self`; entries of `other` win.
    pub fn extend(&mut self, other: FilterTable) {
        self.commands.extend(other.commands);
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The command for a part: by full type first, then by top-level type.
    pub fn lookup(&self, mime_type: &str, top_level: &str) -> Option<&str> {
        self.commands
            .get(&mime_type.to_ascii_lowercase())
            .or_else(|| self.commands.get(&top_level.to_ascii_lowercase()))
            .map(String::as_str)
    }
}

/// Default location of the filter file: `$MAILFILTER`, then the configured
/// path, then `~/.mblaze/filter` if it exists.
pub fn filter_file_path(configured: Option<&Path>) -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(FILTER_FILE_ENV) {
        if !env_path.is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    dirs::home_dir()
        .map(|home| home.join(".mblaze").join("filter"))
        .filter(|path| path.exists())
}

/// Pipe `body` through `command`, copying the command's output to `out`.
///
/// The body is written from a separate thread while the output is read,
/// so large bodies cannot deadlock on full pipes. The body is always
/// delivered completely before the command is waited on.
pub fn run<W: Write + ?Sized>(
    command: &str,
    charset: Option<&str>,
    body: &[u8],
    out: &mut W,
) -> Result<()> {
    let mut cmd = Command::new(SHELL.0);
    cmd.arg(SHELL.1)
        .arg(command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped());
    match charset {
        Some(charset) => cmd.env(CHARSET_ENV, charset),
        None => cmd.env_remove(CHARSET_ENV),
    };

    debug!(command, bytes = body.len(), "Spawning filter");
    let mut child = cmd.spawn().map_err(|source| MimeError::FilterSpawn {
        command: command.to_string(),
        source,
    })?;

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();

    let (copied, delivered) = std::thread::scope(|scope| {
        let writer = scope.spawn(move || deliver(stdin, body));
        let copied = match stdout {
            Some(mut stdout) => io::copy(&mut stdout, out).map(|_| ()),
            None => Ok(()),
        };
        let delivered = writer
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("filter writer thread panicked")));
        (copied, delivered)
    });

    let status = child.wait().map_err(|source| MimeError::FilterSpawn {
        command: command.to_string(),
        source,
    })?;

    copied?;
    if let Err(e) = delivered {
        warn!(command, error = %e, "Could not deliver body to filter");
    }
    if !status.success() {
        return Err(MimeError::FilterExit {
            command: command.to_string(),
            status,
        });
    }
    Ok(())
}

/// Write the body to the filter's stdin and close it.
fn deliver(stdin: Option<std::process::ChildStdin>, body: &[u8]) -> io::Result<()> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(body) {
        // the filter is allowed to stop reading early
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}
