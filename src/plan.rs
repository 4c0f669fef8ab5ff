use crate::build::command;
use crate::config;
use crate::types::Invocation;
use std::path::PathBuf;
use anyhow::Result;
use color_print::*;
use colored_json::to_colored_json_auto;
use serde::Serialize;

#[derive(clap::Args, Clone, Debug)]
pub struct Args {
	/// Targets to plan (defaults to every target in the build file)
	pub targets: Vec<String>,

	/// Path to the build file
	#[arg(short, long)]
	pub config: Option<PathBuf>,

	/// Output format
	#[arg(short, long, value_enum, default_value_t = PlanFormat::default())]
	pub format: PlanFormat,
}

#[derive(Copy, Clone, Default, Debug, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PlanFormat {
	#[default]
	Flat,
	JSON,
	TOML,
}

#[derive(Serialize)]
struct Plan {
	invocations: Vec<Invocation>,
}

/// Resolve the build file and print the invocations `build` would execute,
/// without spawning anything.
pub async fn run(args: Args) -> Result<()> {
	let build_file = config::load(args.config.as_deref())?;
	let env_closure = config::closure_path_env();

	let mut invocations = Vec::new();
	for name in build_file.target_names(&args.targets)? {
		let target = build_file.resolve(&name, env_closure.as_deref())?;
		invocations.extend(command::invocations(&target)?);
	}

	match args.format {
		PlanFormat::Flat => {
			for invocation in &invocations {
				cprintln!("<b!>{}:</> {}", invocation.target, invocation.command_line());
			}
		}
		PlanFormat::JSON => {
			let value = serde_json::to_value(Plan { invocations })?;
			println!("{}", to_colored_json_auto(&value).unwrap_or_default());
		}
		PlanFormat::TOML => {
			print!("{}", toml::to_string(&Plan { invocations })?);
		}
	}

	Ok(())
}
