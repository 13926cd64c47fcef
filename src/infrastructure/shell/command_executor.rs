//! Command executor for running the AutoRest generator
//!
//! This module launches the generator as a child process, forwards its output
//! streams to the sinks configured in [`GeneratorOptions`] and supervises it
//! against an [`InvocationContext`]. The generator leads its own process group
//! (a job object on Windows), so stopping it also stops anything it started.

use async_trait::async_trait;
use process_wrap::tokio::{KillOnDrop, TokioChildWrapper, TokioCommandWrap};
use std::future::Future;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};

#[cfg(windows)]
use process_wrap::tokio::JobObject;
#[cfg(unix)]
use process_wrap::tokio::ProcessGroup;

use crate::generation::{
    Generator, GeneratorLanguage, GeneratorOptions, InvocationContext, InvocationError,
    OutputSink,
};

/// Program name resolved from `PATH` when none is configured
pub const DEFAULT_PROGRAM: &str = "autorest";

const PUMP_BUFFER_SIZE: usize = 8 * 1024;

/// How long output may stay open after the generator exits
pub const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Quote a flag value as one token: wrapped in double quotes, with backslashes,
/// quotes and control characters escaped.
pub fn quote_flag_value(value: &str) -> String {
    format!("{value:?}")
}

/// Build the generator's argument vector.
///
/// Order is fixed: language flag, `--use`, `--tag`, `--output-folder`, then the
/// input specifications verbatim. `--use` and `--tag` only appear when set.
/// An output folder that is not valid UTF-8 is rejected rather than altered.
pub fn build_args(
    language: &GeneratorLanguage,
    input_specs: &[String],
    options: &GeneratorOptions,
) -> Result<Vec<String>, InvocationError> {
    let mut args = Vec::with_capacity(input_specs.len() + 4);
    args.push(language.as_flag().to_string());

    if let (package, true) = options.use_package() {
        args.push(format!("--use={}", quote_flag_value(package)));
    }
    if let (tag, true) = options.tag() {
        args.push(format!("--tag={}", quote_flag_value(tag)));
    }

    let (output_folder, _) = options.output_folder();
    let Some(folder) = output_folder.to_str() else {
        return Err(InvocationError::NonUtf8OutputFolder {
            path: output_folder.clone(),
        });
    };
    args.push(format!("--output-folder={}", quote_flag_value(folder)));

    args.extend(input_specs.iter().cloned());
    Ok(args)
}

fn stdio_for(sink: &OutputSink) -> Stdio {
    if sink.is_discard() {
        Stdio::null()
    } else {
        Stdio::piped()
    }
}

/// Copy a child pipe into a sink until EOF.
///
/// If the sink stops accepting data the pipe is still drained so the child never
/// blocks on a full pipe.
async fn pump<R>(pipe: Option<R>, sink: OutputSink, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else {
        return;
    };

    let mut buffer = vec![0u8; PUMP_BUFFER_SIZE];
    let mut forwarding = true;
    loop {
        match pipe.read(&mut buffer).await {
            Ok(0) => break,
            Ok(read) => {
                if forwarding {
                    if let Err(e) = sink.write(&buffer[..read]).await {
                        tracing::debug!(
                            stream,
                            error = %e,
                            "Output sink closed, discarding remaining generator output"
                        );
                        forwarding = false;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(stream, error = %e, "Failed to read generator output");
                break;
            }
        }
    }
}

/// Wait for the generator to exit with both pipes drained.
///
/// Pipes still open [`PIPE_DRAIN_GRACE`] after the exit are held by processes the
/// generator left behind. Those are killed and the rest of their output is dropped.
async fn wait_for_exit(
    child: &mut Box<dyn TokioChildWrapper>,
    pumps: impl Future<Output = ()>,
    program: &str,
) -> io::Result<ExitStatus> {
    tokio::pin!(pumps);
    tokio::select! {
        _ = &mut pumps => Box::into_pin(child.wait()).await,
        status = Box::into_pin(child.wait()) => {
            if tokio::time::timeout(PIPE_DRAIN_GRACE, &mut pumps).await.is_err() {
                tracing::warn!(
                    program,
                    "Generator exited with its output still open, stopping leftover processes"
                );
                if let Err(e) = child.start_kill() {
                    tracing::debug!(program, error = %e, "Failed to stop leftover processes");
                }
            }
            status
        }
    }
}

/// Kill the generator's process group and reap the generator
async fn terminate(child: &mut Box<dyn TokioChildWrapper>, program: &str) {
    if let Err(e) = child.start_kill() {
        tracing::warn!(program, error = %e, "Failed to kill generator");
    }
    if let Err(e) = Box::into_pin(child.wait()).await {
        tracing::warn!(program, error = %e, "Failed to reap generator");
    }
}

/// Generator backed by the `autorest` executable
#[derive(Debug, Clone)]
pub struct AutoRestExecutor {
    program: String,
}

impl AutoRestExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for AutoRestExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

#[async_trait]
impl Generator for AutoRestExecutor {
    async fn invoke(
        &self,
        ctx: &InvocationContext,
        language: &GeneratorLanguage,
        input_specs: &[String],
        options: GeneratorOptions,
    ) -> Result<(), InvocationError> {
        if let Some(reason) = ctx.stop_reason() {
            return Err(InvocationError::stopped(reason, ctx.timeout()));
        }

        let args = build_args(language, input_specs, &options)?;
        let (stdout_sink, _) = options.stdout();
        let (stderr_sink, _) = options.stderr();
        drop(options);

        tracing::info!(program = %self.program, ?args, "Invoking generator");
        let started = Instant::now();

        let mut command = TokioCommandWrap::with_new(&self.program, |command| {
            command
                .args(&args)
                .stdin(Stdio::null())
                .stdout(stdio_for(&stdout_sink))
                .stderr(stdio_for(&stderr_sink));
        });
        #[cfg(unix)]
        command.wrap(ProcessGroup::leader());
        #[cfg(windows)]
        command.wrap(JobObject);
        command.wrap(KillOnDrop);

        let mut child = command.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => InvocationError::NotFound {
                program: self.program.clone(),
            },
            _ => InvocationError::Spawn {
                program: self.program.clone(),
                source: e,
            },
        })?;

        let stdout_pump = pump(child.stdout().take(), stdout_sink, "stdout");
        let stderr_pump = pump(child.stderr().take(), stderr_sink, "stderr");
        let pumps = async {
            tokio::join!(stdout_pump, stderr_pump);
        };

        let finished = tokio::select! {
            status = wait_for_exit(&mut child, pumps, &self.program) => Ok(status),
            reason = ctx.done() => Err(reason),
        };

        let outcome = match finished {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(InvocationError::ToolFailed { status }),
            Ok(Err(e)) => Err(InvocationError::Wait(e)),
            Err(reason) => {
                terminate(&mut child, &self.program).await;
                Err(InvocationError::stopped(reason, ctx.timeout()))
            }
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(()) => tracing::info!(program = %self.program, elapsed_ms, "Generator finished"),
            Err(e) => tracing::warn!(
                program = %self.program,
                elapsed_ms,
                kind = e.kind().as_str(),
                exit_code = ?e.exit_code(),
                error = %e,
                "Generator failed"
            ),
        }

        outcome
    }
}
