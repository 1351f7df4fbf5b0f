pub mod scenarios;

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::source::{NativeProbe, PathStatus, Source, SourceError, SourceReader};

#[derive(Debug, Clone)]
enum Reply {
    Outputs(Vec<String>),
    Fails,
    Unreadable,
}

#[derive(Debug, Clone, Default)]
pub struct MockSource {
    replies: HashMap<String, Reply>,
    paths: HashMap<PathBuf, PathStatus>,
    reads: RefCell<HashMap<String, usize>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref();
        self.paths.insert(path.to_path_buf(), PathStatus::Readable);
        self.add_output(&Source::file(path), content);
    }

    pub fn add_unreadable(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.paths.insert(path.to_path_buf(), PathStatus::Unreadable);
        self.replies
            .insert(Source::file(path).to_string(), Reply::Unreadable);
    }

    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        self.paths
            .insert(path.as_ref().to_path_buf(), PathStatus::Readable);
    }

    pub fn add_command(&mut self, command_line: &str, output: impl Into<String>) {
        self.replies
            .insert(command_line.to_string(), Reply::Outputs(vec![output.into()]));
    }

    pub fn add_failing_command(&mut self, command_line: &str) {
        self.replies.insert(command_line.to_string(), Reply::Fails);
    }

    pub fn add_native(&mut self, probe: NativeProbe, output: impl Into<String>) {
        self.add_output(&Source::Native(probe), output);
    }

    pub fn add_output(&mut self, source: &Source, output: impl Into<String>) {
        self.replies
            .insert(source.to_string(), Reply::Outputs(vec![output.into()]));
    }

    /// Successive reads of `source` return `outputs` in order, repeating the last.
    pub fn add_sequence(&mut self, source: &Source, outputs: Vec<String>) {
        self.replies.insert(source.to_string(), Reply::Outputs(outputs));
    }

    /// Number of times `key` (a source's display text) has been read.
    pub fn read_count(&self, key: &str) -> usize {
        self.reads.borrow().get(key).copied().unwrap_or(0)
    }
}

impl SourceReader for MockSource {
    async fn read(&self, source: &Source) -> Result<String, SourceError> {
        let key = source.to_string();
        let nth = {
            let mut reads = self.reads.borrow_mut();
            let count = reads.entry(key.clone()).or_insert(0);
            *count += 1;
            *count - 1
        };

        match self.replies.get(&key) {
            None => Err(SourceError::NotFound(key)),
            Some(Reply::Fails) => Err(SourceError::Failed {
                origin: key,
                status: "exit status: 1".to_string(),
            }),
            Some(Reply::Unreadable) => Err(SourceError::Unreadable(key)),
            Some(Reply::Outputs(outputs)) => {
                let Some(text) = outputs.get(nth).or_else(|| outputs.last()) else {
                    return Err(SourceError::Empty(key));
                };
                if text.trim().is_empty() && !matches!(source, Source::File(_)) {
                    Err(SourceError::Empty(key))
                } else {
                    Ok(text.clone())
                }
            }
        }
    }

    fn probe(&self, path: &Path) -> PathStatus {
        self.paths.get(path).copied().unwrap_or(PathStatus::Missing)
    }
}
