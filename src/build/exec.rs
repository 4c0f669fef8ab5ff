use crate::types::Invocation;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use anyhow::{anyhow, bail, Context, Result};
use color_print::*;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinSet;

/// A single invocation that reached its terminal succeeded state, with the
/// captured compiler streams.
#[derive(Debug)]
pub struct Finished {
	pub invocation: Invocation,
	pub stdout: String,
	pub stderr: String,
}

/// Spawn every invocation as an independent process and wait until each one
/// reaches a terminal state, in whatever order they complete.
///
/// A failed invocation is reported as it lands but never cuts the run short;
/// siblings are always observed before the error is returned. On SIGINT the
/// outstanding children are killed and their partial outputs removed.
pub async fn run_all(invocations: Vec<Invocation>, max_buffer: usize) -> Result<Vec<Finished>> {
	for invocation in &invocations {
		create_output(&invocation.output)?;
	}

	let outputs: Vec<PathBuf> = invocations.iter().map(|i| i.output.clone()).collect();
	let total = invocations.len();

	let mut tasks = JoinSet::new();
	for invocation in invocations {
		tasks.spawn(async move {
			let result = run_one(&invocation, max_buffer).await;
			(invocation, result)
		});
	}

	let mut finished = Vec::new();
	let mut failures = 0usize;
	let mut settled: HashSet<PathBuf> = HashSet::new();
	let mut interrupted = false;

	while finished.len() + failures < total {
		tokio::select! {
			joined = tasks.join_next() => match joined {
				None => break,
				Some(Ok((invocation, Ok((stdout, stderr))))) => {
					cprintln!("<g>Compiled {} -> {}</>", invocation.label(), invocation.output.display());
					if !stdout.is_empty() {
						print!("{stdout}");
					}
					if !stderr.is_empty() {
						eprint!("{stderr}");
					}

					settled.insert(invocation.output.clone());
					finished.push(Finished { invocation, stdout, stderr });
				}
				Some(Ok((invocation, Err(err)))) => {
					ceprintln!("<r!>Failed to compile <s>{}</></>: {:#}", invocation.label(), err);
					settled.insert(invocation.output.clone());
					failures += 1;
				}
				Some(Err(err)) => {
					ceprintln!("<r!>Invocation task failed:</> {err}");
					failures += 1;
				}
			},
			_ = tokio::signal::ctrl_c() => {
				interrupted = true;
				break;
			}
		}
	}

	if interrupted {
		// kill-on-drop takes the children down with their tasks
		tasks.shutdown().await;

		for output in outputs {
			if !settled.contains(&output) {
				if let Err(err) = fs::remove_file(&output) {
					log::warn!("could not remove partial output {}: {err}", output.display());
				}
			}
		}

		bail!("Interrupted, {} of {total} invocations cancelled", total - finished.len() - failures);
	}

	if failures > 0 {
		bail!("{failures} of {total} invocations failed");
	}

	Ok(finished)
}

/// Run one invocation to its terminal state: spawn, drain both streams under
/// the buffer cap, then wait for the exit status.
async fn run_one(invocation: &Invocation, max_buffer: usize) -> Result<(String, String)> {
	let mut child = Command::new(&invocation.program)
		.args(&invocation.args)
		.current_dir(&invocation.cwd)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true)
		.spawn()
		.with_context(|| format!("Failed to spawn {}", invocation.program.display()))?;

	let stdout = child.stdout.take();
	let stderr = child.stderr.take();

	let streams = tokio::try_join!(
		read_capped(stdout, max_buffer),
		read_capped(stderr, max_buffer),
	);

	let (stdout, stderr) = match streams {
		Ok(streams) => streams,
		Err(err) => {
			child.kill().await.ok();
			return Err(err);
		}
	};

	let status = child.wait().await.context("Failed to wait for the compiler")?;

	if !status.success() {
		let detail = stderr.trim();
		if detail.is_empty() {
			return Err(anyhow!("Compiler {status}"));
		}
		return Err(anyhow!("Compiler {status}:\n{detail}"));
	}

	Ok((stdout, stderr))
}

/// Drain a child stream, failing once it grows past the configured cap.
async fn read_capped<R: AsyncRead + Unpin>(stream: Option<R>, cap: usize) -> Result<String> {
	let Some(mut stream) = stream else {
		return Ok(String::new());
	};

	let mut buffer = Vec::new();
	let read = (&mut stream).take(cap as u64 + 1).read_to_end(&mut buffer).await?;

	if read > cap {
		bail!("Process output exceeded the {} KiB buffer limit", cap / 1024);
	}

	Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// The compiler does not create directories, so every destination file is
/// created empty up front.
fn create_output(path: &Path) -> Result<()> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)
				.with_context(|| format!("Failed to create {}", parent.display()))?;
		}
	}

	fs::write(path, "").with_context(|| format!("Failed to create {}", path.display()))?;
	log::debug!("created output file {}", path.display());

	Ok(())
}
