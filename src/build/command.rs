use crate::config::{OnEmpty, Output, Target};
use crate::expand;
use crate::types::Invocation;
use std::path::{Path, PathBuf};
use anyhow::{bail, Result};

/// Assemble the invocations for one target: a single combined invocation, or
/// one per input file.
///
/// Returns an empty list when the input patterns match nothing and the target
/// is configured to skip; the caller logs and moves on.
pub fn invocations(target: &Target) -> Result<Vec<Invocation>> {
	let inputs = expand::files(&target.cwd, &target.js)?;

	if inputs.is_empty() {
		match target.on_empty {
			OnEmpty::Skip => {
				log::debug!("target {} matched nothing (on_empty = {})", target.name, target.on_empty);
				return Ok(Vec::new());
			}
			OnEmpty::Fail => {
				bail!("No input files match {:?} in {}", target.js, target.cwd.display());
			}
		}
	}

	let externs = expand::files(&target.cwd, &target.externs)?;
	let shared = shared_args(target, &externs);

	match &target.output {
		Output::File(file) => {
			// the compiler resolves the output against the process cwd, so
			// pin it down before the child changes directory
			let output = absolute(file)?;

			let mut args = jar_args(target);
			for input in &inputs {
				args.push("--js".into());
				args.push(input.display().to_string());
			}
			args.push("--js_output_file".into());
			args.push(output.display().to_string());
			args.extend(shared);

			Ok(vec![Invocation {
				target: target.name.clone(),
				program: target.java_bin.clone(),
				args,
				cwd: target.cwd.clone(),
				input: None,
				output,
			}])
		}
		Output::Dir(dir) => {
			let dir = absolute(dir)?;

			inputs.into_iter()
				.map(|input| {
					let Some(name) = input.file_name() else {
						bail!("Input {} has no file name", input.display());
					};
					let output = dir.join(name);

					let mut args = jar_args(target);
					args.push("--js".into());
					args.push(input.display().to_string());
					args.push("--js_output_file".into());
					args.push(output.display().to_string());
					args.extend(shared.iter().cloned());

					Ok(Invocation {
						target: target.name.clone(),
						program: target.java_bin.clone(),
						args,
						cwd: target.cwd.clone(),
						input: Some(input),
						output,
					})
				})
				.collect()
		}
	}
}

fn jar_args(target: &Target) -> Vec<String> {
	vec!["-jar".into(), target.compiler_jar.display().to_string()]
}

/// Extern flags (dropped entirely when no extern file resolved) followed by
/// the rendered generic flag map, in declaration order.
fn shared_args(target: &Target, externs: &[PathBuf]) -> Vec<String> {
	let mut args = Vec::new();

	for extern_file in externs {
		args.push("--externs".into());
		args.push(extern_file.display().to_string());
	}

	for (name, value) in &target.flags {
		value.render(name, &mut args);
	}

	args
}

fn absolute(path: &Path) -> Result<PathBuf> {
	Ok(std::path::absolute(path)?)
}
