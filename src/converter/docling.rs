//! [`DocumentConverter`] backed by the `docling` command-line tool.
//!
//! Each conversion runs `docling` against the staged input and points `--output` at a private
//! scratch directory. The Markdown rendition is read back before the directory is removed.
//!
//! On Unix the converter runs in its own process group. Abandoning a conversion (for example
//! when the timeout fires) kills the whole group, so launchers such as `uvx docling` do not
//! leave the real converter running.

use super::{ConversionError, ConvertedDocument, DocumentConverter, ExportError, PipelineOptions};
use async_trait::async_trait;
use group::ProcessGroupGuard;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;

/// Lines of converter output kept for error reports.
const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// Runs the `docling` CLI as the document converter.
#[derive(Debug, Clone)]
pub struct DoclingCli {
    program: String,
    leading_args: Vec<String>,
    scratch_root: Option<PathBuf>,
}

impl DoclingCli {
    /// Use `program` as the converter executable.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            scratch_root: None,
        }
    }

    /// Build from a program-plus-arguments list such as `["uvx", "docling"]`.
    ///
    /// Returns `None` when the list is empty.
    pub fn from_command(parts: &[String]) -> Option<Self> {
        let (program, rest) = parts.split_first()?;
        Some(rest.iter().fold(Self::new(program.clone()), |cli, arg| cli.arg(arg)))
    }

    /// Append an argument placed before the pipeline flags.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.leading_args.push(arg.into());
        self
    }

    /// Create scratch output directories under `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    /// Executable this converter launches.
    pub fn program(&self) -> &str {
        &self.program
    }

    fn scratch_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("docparse-out-");
        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }

    /// Full argument list for one conversion, excluding the program itself.
    fn command_args(
        &self,
        source: &Path,
        options: &PipelineOptions,
        output_dir: &Path,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.leading_args.iter().map(OsString::from).collect();
        args.push("--from".into());
        args.push(options.input_format().as_str().into());
        if let PipelineOptions::Pdf {
            ocr,
            table_structure,
        } = *options
        {
            let ocr_flag = if ocr { "--ocr" } else { "--no-ocr" };
            let tables_flag = if table_structure {
                "--tables"
            } else {
                "--no-tables"
            };
            args.push(ocr_flag.into());
            args.push(tables_flag.into());
        }
        args.push("--to".into());
        args.push("md".into());
        args.push("--image-export-mode".into());
        args.push("placeholder".into());
        args.push("--output".into());
        args.push(output_dir.as_os_str().to_owned());
        args.push(source.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl DocumentConverter for DoclingCli {
    async fn convert(
        &self,
        source: &Path,
        options: &PipelineOptions,
    ) -> Result<Box<dyn ConvertedDocument>, ConversionError> {
        let stem = source
            .file_stem()
            .ok_or_else(|| ConversionError::Other("input path has no file name".to_string()))?;
        let mut markdown_name = stem.to_os_string();
        markdown_name.push(".md");

        let output_dir = self.scratch_dir().map_err(ConversionError::Scratch)?;
        let args = self.command_args(source, options, output_dir.path());
        tracing::debug!(
            program = %self.program,
            args = ?args,
            "Launching converter"
        );

        let mut command = Command::new(&self.program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let child = command.spawn().map_err(|source| ConversionError::Launch {
            program: self.program.clone(),
            source,
        })?;
        let group = ProcessGroupGuard::new(child.id());
        let output = child
            .wait_with_output()
            .await
            .map_err(|err| ConversionError::Other(format!("converter did not finish: {err}")))?;
        group.disarm();

        if !output.status.success() {
            let stream = if output.stderr.iter().all(u8::is_ascii_whitespace) {
                &output.stdout
            } else {
                &output.stderr
            };
            return Err(ConversionError::Failed {
                status: output.status.to_string(),
                detail: diagnostic_tail(stream),
            });
        }

        let markdown_path = output_dir.path().join(markdown_name);
        let rendition = match tokio::fs::read_to_string(&markdown_path).await {
            Ok(markdown) => Rendition::Markdown(markdown),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Rendition::Missing(markdown_path)
            }
            Err(err) => Rendition::Unreadable(err),
        };
        Ok(Box::new(DoclingDocument { rendition }))
    }
}

/// Outcome of reading the `<stem>.md` file `docling` was asked to write.
enum Rendition {
    Markdown(String),
    Missing(PathBuf),
    Unreadable(std::io::Error),
}

/// Markdown rendition written by `docling`.
struct DoclingDocument {
    rendition: Rendition,
}

impl ConvertedDocument for DoclingDocument {
    fn export_to_markdown(&self) -> Result<String, ExportError> {
        match &self.rendition {
            Rendition::Markdown(markdown) => Ok(markdown.clone()),
            Rendition::Missing(path) => Err(ExportError::MissingOutput { path: path.clone() }),
            Rendition::Unreadable(err) => Err(ExportError::Io(std::io::Error::new(
                err.kind(),
                err.to_string(),
            ))),
        }
    }
}

#[cfg(unix)]
mod group {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    /// Sends `SIGKILL` to the converter's process group unless disarmed.
    pub(super) struct ProcessGroupGuard {
        pgid: Option<Pid>,
    }

    impl ProcessGroupGuard {
        /// The child was spawned with `process_group(0)`, so its pid is the group id.
        pub(super) fn new(pid: Option<u32>) -> Self {
            let pgid = pid
                .and_then(|pid| i32::try_from(pid).ok())
                .map(Pid::from_raw);
            Self { pgid }
        }

        /// The converter exited on its own; leave the group alone.
        pub(super) fn disarm(mut self) {
            self.pgid = None;
        }
    }

    impl Drop for ProcessGroupGuard {
        fn drop(&mut self) {
            let Some(pgid) = self.pgid.take() else {
                return;
            };
            match killpg(pgid, Signal::SIGKILL) {
                Ok(()) => tracing::debug!(%pgid, "Killed abandoned converter process group"),
                Err(Errno::ESRCH) => {}
                Err(err) => tracing::warn!(%pgid, error = %err, "Failed to kill converter process group"),
            }
        }
    }
}

#[cfg(not(unix))]
mod group {
    pub(super) struct ProcessGroupGuard;

    impl ProcessGroupGuard {
        pub(super) fn new(_pid: Option<u32>) -> Self {
            Self
        }

        pub(super) fn disarm(self) {}
    }
}

fn diagnostic_tail(output: &[u8]) -> String {
    let text = String::from_utf8_lossy(output);
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "no diagnostic output".to_string()
    } else {
        tail
    }
}
