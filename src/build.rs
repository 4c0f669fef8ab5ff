pub mod command;
mod exec;

use crate::config::{self, Output, Target};
use std::fs;
use std::path::PathBuf;
use anyhow::{Context, Result};
use color_print::*;

#[derive(clap::Args, Clone, Debug)]
pub struct Args {
	/// Targets to build (defaults to every target in the build file)
	pub targets: Vec<String>,

	/// Path to the build file
	#[arg(short, long)]
	pub config: Option<PathBuf>,
}

pub async fn run(args: Args) -> Result<()> {
	let build_file = config::load(args.config.as_deref())?;
	let env_closure = config::closure_path_env();

	// resolve every selected target up front so configuration errors land
	// before a single process spawns
	let mut targets = Vec::new();
	for name in build_file.target_names(&args.targets)? {
		targets.push(build_file.resolve(&name, env_closure.as_deref())?);
	}

	for target in &targets {
		build_target(target).await?;
	}

	Ok(())
}

async fn build_target(target: &Target) -> Result<()> {
	let invocations = command::invocations(target)?;

	if invocations.is_empty() {
		cprintln!("<y>Nothing to process in {:?}</>", target.js);
		return Ok(());
	}

	cprintln!("<b!>Compiling <s>{}</> ({} invocations)", target.name, invocations.len());

	let finished = exec::run_all(invocations, target.max_buffer).await?;

	if matches!(target.output, Output::File(_)) {
		report_combined(target, &finished)?;
	}

	Ok(())
}

/// After a combined build: report the minified size and persist the
/// compiler's diagnostic stream, both for display and inspection only.
fn report_combined(target: &Target, finished: &[exec::Finished]) -> Result<()> {
	let Some(done) = finished.first() else {
		return Ok(());
	};

	let output = &done.invocation.output;
	let bytes = fs::metadata(output)
		.with_context(|| format!("Failed to read {}", output.display()))?
		.len();

	cprintln!("Compressed size: <g><s>{:.2} KB</></> ({bytes} bytes)", bytes as f64 / 1024.0);

	if let Some(report) = &target.report {
		fs::write(report, &done.stderr)
			.with_context(|| format!("Failed to write report {}", report.display()))?;
		cprintln!("Report saved to <s>{}</>", report.display());
	}

	Ok(())
}

#[cfg(all(test, unix))]
mod tests {
	use super::*;
	use std::fs;
	use std::path::Path;

	const FAKE_COMPILER: &str = "#!/bin/sh\n\
		out=\"\"\n\
		prev=\"\"\n\
		for arg in \"$@\"; do\n\
		\tif [ \"$prev\" = \"--js_output_file\" ]; then out=\"$arg\"; fi\n\
		\tprev=\"$arg\"\n\
		done\n\
		echo minified > \"$out\"\n";

	fn scratch() -> (tempfile::TempDir, std::path::PathBuf) {
		use std::os::unix::fs::PermissionsExt;

		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("a.js"), "var a;").unwrap();
		fs::write(dir.path().join("b.js"), "var b;").unwrap();

		let java = dir.path().join("fake-java");
		fs::write(&java, FAKE_COMPILER).unwrap();
		fs::set_permissions(&java, fs::Permissions::from_mode(0o755)).unwrap();

		(dir, java)
	}

	fn write_build_file(dir: &Path, body: String) -> std::path::PathBuf {
		let path = dir.join("closr.toml");
		fs::write(&path, body).unwrap();
		path
	}

	#[tokio::test]
	async fn a_per_file_target_builds_end_to_end() {
		let (dir, java) = scratch();
		let out = dir.path().join("dist");

		let build_file = write_build_file(dir.path(), format!(
			"[targets.scripts]\n\
			cwd = \"{}\"\n\
			js = [\"*.js\"]\n\
			js_output_path = \"{}\"\n\
			closure_path = \"/opt/closure\"\n\
			java_bin = \"{}\"\n",
			dir.path().display(), out.display(), java.display(),
		));

		run(Args { targets: Vec::new(), config: Some(build_file) }).await.unwrap();

		assert_eq!(fs::read_to_string(out.join("a.js")).unwrap(), "minified\n");
		assert_eq!(fs::read_to_string(out.join("b.js")).unwrap(), "minified\n");
	}

	#[tokio::test]
	async fn a_combined_target_writes_its_report() {
		let (dir, java) = scratch();
		let out = dir.path().join("dist/app.min.js");

		let build_file = write_build_file(dir.path(), format!(
			"[targets.app]\n\
			cwd = \"{}\"\n\
			js = [\"*.js\"]\n\
			js_output_file = \"{}\"\n\
			closure_path = \"/opt/closure\"\n\
			java_bin = \"{}\"\n",
			dir.path().display(), out.display(), java.display(),
		));

		run(Args { targets: Vec::new(), config: Some(build_file) }).await.unwrap();

		assert_eq!(fs::read_to_string(&out).unwrap(), "minified\n");

		let report = dir.path().join("dist/app.min.js.report.txt");
		assert_eq!(fs::read_to_string(report).unwrap(), "");
	}

	#[tokio::test]
	async fn unmatched_patterns_are_a_quiet_no_op_by_default() {
		let (dir, java) = scratch();

		let build_file = write_build_file(dir.path(), format!(
			"[targets.empty]\n\
			cwd = \"{}\"\n\
			js = [\"*.coffee\"]\n\
			js_output_path = \"{}\"\n\
			closure_path = \"/opt/closure\"\n\
			java_bin = \"{}\"\n",
			dir.path().display(), dir.path().join("dist").display(), java.display(),
		));

		run(Args { targets: Vec::new(), config: Some(build_file) }).await.unwrap();

		// nothing spawned, nothing created
		assert!(!dir.path().join("dist").exists());
	}
}
