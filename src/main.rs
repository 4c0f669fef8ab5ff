mod types;
mod config;
mod expand;
mod build;
mod plan;

use clap::Parser;
use color_print::*;

#[derive(clap::Parser)]
#[command(version, about, long_about = None, args_conflicts_with_subcommands = true, disable_help_subcommand = true, flatten_help = true)]
struct Cli {
	#[command(subcommand)]
	command: Option<Command>,

	#[clap(flatten)]
	args: build::Args,
}

#[derive(clap::Subcommand, Clone)]
enum Command {
	#[command(hide = true)]
	Build(build::Args),
	Plan(plan::Args),
}

#[tokio::main]
async fn main() {
	env_logger::init();

	let cli = Cli::parse();
	let command = cli.command.unwrap_or_else(|| Command::Build(cli.args));

	let result = match command {
		Command::Build(args) => build::run(args).await,
		Command::Plan(args) => plan::run(args).await,
	};

	if let Err(err) = result {
		ceprintln!("<r!><s>Error:</></> {:#}", err);
		std::process::exit(1); // general error
	}
}
