use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use sysinfo::System;
use thiserror::Error;
use tracing::debug;

/// One candidate place to read raw text from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    File(PathBuf),
    Command {
        program: String,
        args: Vec<String>,
        /// Added to the reader's timeout for commands that sample on purpose.
        grace: Duration,
    },
    Native(NativeProbe),
}

impl Source {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Source::File(path.into())
    }

    pub fn command(program: &str, args: &[&str]) -> Self {
        Source::Command {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            grace: Duration::ZERO,
        }
    }

    pub fn with_grace(mut self, extra: Duration) -> Self {
        if let Source::Command { grace, .. } = &mut self {
            *grace = extra;
        }
        self
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        if let Source::Command { args, .. } = &mut self {
            args.push(arg.into());
        }
        self
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Command { program, args, .. } => {
                write!(f, "{program}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            Source::Native(probe) => write!(f, "native:{}", probe.name()),
        }
    }
}

/// Values answered in-process when every file and command has failed.
///
/// Each probe renders its answer as text shaped like the file it stands in for,
/// so it goes through the same parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeProbe {
    OsLabel,
    HostName,
    /// Seconds since boot, like the first field of `/proc/uptime`.
    Uptime,
    /// `one five fifteen`, like the first fields of `/proc/loadavg`.
    LoadAverage,
    /// `total_bytes available_bytes`.
    Memory,
}

impl NativeProbe {
    pub fn name(self) -> &'static str {
        match self {
            NativeProbe::OsLabel => "os-label",
            NativeProbe::HostName => "hostname",
            NativeProbe::Uptime => "uptime",
            NativeProbe::LoadAverage => "loadavg",
            NativeProbe::Memory => "memory",
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} is not readable")]
    Unreadable(String),

    #[error("{origin} exited with {status}")]
    Failed { origin: String, status: String },

    #[error("{0} produced no output")]
    Empty(String),

    #[error("{origin} timed out after {limit:?}")]
    TimedOut { origin: String, limit: Duration },

    #[error("failed to run {origin}: {error}")]
    Spawn { origin: String, error: io::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    Missing,
    Unreadable,
    Readable,
}

#[allow(async_fn_in_trait)]
pub trait SourceReader {
    /// Returns the full text of `source`. Empty command or probe output is a
    /// failure; an empty file is read as is.
    async fn read(&self, source: &Source) -> Result<String, SourceError>;

    fn probe(&self, path: &Path) -> PathStatus;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemSource {
    timeout: Duration,
}

impl SystemSource {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn read_file(&self, path: &Path) -> Result<String, SourceError> {
        let origin = path.display().to_string();
        match tokio::fs::read_to_string(path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(SourceError::NotFound(origin)),
            Err(_) => Err(SourceError::Unreadable(origin)),
        }
    }

    async fn run_command(
        &self,
        source: &Source,
        program: &str,
        args: &[String],
        grace: Duration,
    ) -> Result<String, SourceError> {
        let origin = source.to_string();
        let limit = self.timeout + grace;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(limit, cmd.output()).await {
            Err(_) => return Err(SourceError::TimedOut { origin, limit }),
            Ok(Err(e)) if e.kind() == io::ErrorKind::NotFound => {
                return Err(SourceError::NotFound(origin));
            }
            Ok(Err(error)) => return Err(SourceError::Spawn { origin, error }),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            return Err(SourceError::Failed {
                origin,
                status: output.status.to_string(),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(SourceError::Empty(origin));
        }
        Ok(text)
    }

    fn read_native(&self, probe: NativeProbe) -> Result<String, SourceError> {
        let answer = match probe {
            NativeProbe::OsLabel => System::long_os_version(),
            NativeProbe::HostName => System::host_name(),
            NativeProbe::Uptime => Some(System::uptime().to_string()),
            NativeProbe::LoadAverage => {
                let load = System::load_average();
                Some(format!("{:.2} {:.2} {:.2}", load.one, load.five, load.fifteen))
            }
            NativeProbe::Memory => {
                let mut sys = System::new();
                sys.refresh_memory();
                (sys.total_memory() > 0)
                    .then(|| format!("{} {}", sys.total_memory(), sys.available_memory()))
            }
        };
        answer
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| SourceError::NotFound(format!("native:{}", probe.name())))
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl SourceReader for SystemSource {
    async fn read(&self, source: &Source) -> Result<String, SourceError> {
        debug!(%source, "reading source");
        match source {
            Source::File(path) => self.read_file(path).await,
            Source::Command {
                program,
                args,
                grace,
            } => self.run_command(source, program, args, *grace).await,
            Source::Native(probe) => self.read_native(*probe),
        }
    }

    fn probe(&self, path: &Path) -> PathStatus {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return PathStatus::Missing,
            Err(_) => return PathStatus::Unreadable,
        };
        let readable = if metadata.is_dir() {
            std::fs::read_dir(path).is_ok()
        } else {
            std::fs::File::open(path).is_ok()
        };
        if readable {
            PathStatus::Readable
        } else {
            PathStatus::Unreadable
        }
    }
}
