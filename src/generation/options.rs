//! Options controlling a single generator invocation
//!
//! `GeneratorOptions` is a plain value: it performs no I/O and no validation.
//! Every getter returns the resolved value together with a flag telling whether
//! the field was set explicitly, so callers can tell a default apart from a
//! value that happens to equal it.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};

/// Directory name used under the system temp root when no output folder is set
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "generated";

/// Async writer shared between sink clones
pub type SharedWriter = Arc<Mutex<dyn AsyncWrite + Send + Unpin>>;

/// Destination for one of the generator's output streams.
///
/// Clones share the destination. Binding stdout and stderr to clones of the same
/// sink merges both streams in the order chunks arrive.
#[derive(Clone, Default)]
pub enum OutputSink {
    /// Output is thrown away; the child is given a null device
    #[default]
    Discard,
    /// Chunks are forwarded to a bounded channel
    Channel(mpsc::Sender<Bytes>),
    /// Chunks are written to an async writer
    Writer(SharedWriter),
}

impl OutputSink {
    pub fn channel(sender: mpsc::Sender<Bytes>) -> Self {
        Self::Channel(sender)
    }

    pub fn writer<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let shared: SharedWriter = Arc::new(Mutex::new(writer));
        Self::Writer(shared)
    }

    pub fn shared_writer(writer: SharedWriter) -> Self {
        Self::Writer(writer)
    }

    pub fn is_discard(&self) -> bool {
        matches!(self, Self::Discard)
    }

    /// Forward one chunk. Fails with `BrokenPipe` once a channel receiver is gone.
    pub async fn write(&self, chunk: &[u8]) -> io::Result<()> {
        match self {
            Self::Discard => Ok(()),
            Self::Channel(sender) => sender
                .send(Bytes::copy_from_slice(chunk))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "output receiver closed")),
            Self::Writer(writer) => {
                let mut writer = writer.lock().await;
                writer.write_all(chunk).await?;
                writer.flush().await
            }
        }
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discard => f.write_str("Discard"),
            Self::Channel(_) => f.write_str("Channel"),
            Self::Writer(_) => f.write_str("Writer"),
        }
    }
}

/// Flags and output bindings for one generator run
#[derive(Debug, Clone, Default)]
pub struct GeneratorOptions {
    output_folder: Option<PathBuf>,
    tag: Option<String>,
    use_package: Option<String>,
    stdout: Option<OutputSink>,
    stderr: Option<OutputSink>,
}

impl GeneratorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the generator writes its files.
    /// Defaults to `<system temp dir>/generated`.
    pub fn output_folder(&self) -> (PathBuf, bool) {
        match &self.output_folder {
            Some(dir) => (dir.clone(), true),
            None => (std::env::temp_dir().join(DEFAULT_OUTPUT_DIR_NAME), false),
        }
    }

    pub fn set_output_folder(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_folder = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn clear_output_folder(mut self) -> Self {
        self.output_folder = None;
        self
    }

    /// Value for `--tag`. When unset the flag is not passed at all.
    pub fn tag(&self) -> (&str, bool) {
        match &self.tag {
            Some(tag) => (tag, true),
            None => ("", false),
        }
    }

    pub fn set_tag(mut self, value: impl Into<String>) -> Self {
        self.tag = Some(value.into());
        self
    }

    pub fn clear_tag(mut self) -> Self {
        self.tag = None;
        self
    }

    /// Value for `--use`, formatted as an npm package identifier, e.g.
    /// `@microsoft.azure/autorest.go@~2`. When unset the default generator is used.
    pub fn use_package(&self) -> (&str, bool) {
        match &self.use_package {
            Some(package) => (package, true),
            None => ("", false),
        }
    }

    pub fn set_use_package(mut self, value: impl Into<String>) -> Self {
        self.use_package = Some(value.into());
        self
    }

    pub fn clear_use_package(mut self) -> Self {
        self.use_package = None;
        self
    }

    /// Sink for the generator's standard output. Discards by default.
    pub fn stdout(&self) -> (OutputSink, bool) {
        match &self.stdout {
            Some(sink) => (sink.clone(), true),
            None => (OutputSink::Discard, false),
        }
    }

    pub fn set_stdout(mut self, sink: OutputSink) -> Self {
        self.stdout = Some(sink);
        self
    }

    pub fn clear_stdout(mut self) -> Self {
        self.stdout = None;
        self
    }

    /// Sink for the generator's standard error. Discards by default.
    pub fn stderr(&self) -> (OutputSink, bool) {
        match &self.stderr {
            Some(sink) => (sink.clone(), true),
            None => (OutputSink::Discard, false),
        }
    }

    pub fn set_stderr(mut self, sink: OutputSink) -> Self {
        self.stderr = Some(sink);
        self
    }

    pub fn clear_stderr(mut self) -> Self {
        self.stderr = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_options_resolve_to_defaults() {
        let options = GeneratorOptions::new();

        assert_eq!(
            options.output_folder(),
            (std::env::temp_dir().join("generated"), false)
        );
        assert_eq!(options.tag(), ("", false));
        assert_eq!(options.use_package(), ("", false));

        let (stdout, stdout_set) = options.stdout();
        assert!(stdout.is_discard());
        assert!(!stdout_set);

        let (stderr, stderr_set) = options.stderr();
        assert!(stderr.is_discard());
        assert!(!stderr_set);
    }

    #[test]
    fn test_output_folder_set_and_clear() {
        let options = GeneratorOptions::new().set_output_folder("/srv/out");
        assert_eq!(options.output_folder(), (PathBuf::from("/srv/out"), true));

        let options = options.clear_output_folder();
        assert_eq!(
            options.output_folder(),
            (std::env::temp_dir().join("generated"), false)
        );
    }

    #[test]
    fn test_tag_set_and_clear() {
        let options = GeneratorOptions::new().set_tag("package-2018-12");
        assert_eq!(options.tag(), ("package-2018-12", true));

        let options = options.clear_tag();
        assert_eq!(options.tag(), ("", false));
    }

    #[test]
    fn test_empty_tag_is_still_explicit() {
        let options = GeneratorOptions::new().set_tag("");
        assert_eq!(options.tag(), ("", true));
    }

    #[test]
    fn test_use_package_set_and_clear() {
        let options = GeneratorOptions::new().set_use_package("@microsoft.azure/autorest.go@~2");
        assert_eq!(
            options.use_package(),
            ("@microsoft.azure/autorest.go@~2", true)
        );

        let options = options.clear_use_package();
        assert_eq!(options.use_package(), ("", false));
    }

    #[test]
    fn test_sinks_set_and_clear() {
        let (tx, _rx) = mpsc::channel(1);
        let options = GeneratorOptions::new().set_stdout(OutputSink::channel(tx));

        let (stdout, stdout_set) = options.stdout();
        assert!(matches!(stdout, OutputSink::Channel(_)));
        assert!(stdout_set);

        // stderr is independent of stdout
        let (stderr, stderr_set) = options.stderr();
        assert!(stderr.is_discard());
        assert!(!stderr_set);

        let options = options
            .set_stderr(OutputSink::writer(tokio::io::sink()))
            .clear_stdout();
        assert!(!options.stdout().1);
        let (stderr, stderr_set) = options.stderr();
        assert!(matches!(stderr, OutputSink::Writer(_)));
        assert!(stderr_set);

        let options = options.clear_stderr();
        assert!(options.stderr().0.is_discard());
        assert!(!options.stderr().1);
    }

    #[test]
    fn test_fields_are_independent() {
        let options = GeneratorOptions::new()
            .set_tag("v1")
            .set_use_package("@autorest/go@4")
            .clear_tag();

        assert_eq!(options.tag(), ("", false));
        assert_eq!(options.use_package(), ("@autorest/go@4", true));
        assert!(!options.output_folder().1);
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_chunks() {
        let (tx, mut rx) = mpsc::channel(4);
        let sink = OutputSink::channel(tx);

        sink.write(b"hello ").await.unwrap();
        sink.clone().write(b"world").await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"hello "));
        assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"world"));
    }

    #[tokio::test]
    async fn test_channel_sink_reports_closed_receiver() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let err = OutputSink::channel(tx).write(b"lost").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_writer_sink_is_shared_between_clones() {
        let buffer = Arc::new(Mutex::new(Vec::<u8>::new()));
        let sink = OutputSink::shared_writer(buffer.clone());
        let options = GeneratorOptions::new()
            .set_stdout(sink.clone())
            .set_stderr(sink);

        options.stdout().0.write(b"out;").await.unwrap();
        options.stderr().0.write(b"err;").await.unwrap();

        assert_eq!(buffer.lock().await.as_slice(), b"out;err;");
    }
}
