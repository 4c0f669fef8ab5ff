use crate::types::FlagValue;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

pub const CLOSURE_PATH_VAR: &str = "CLOSURE_PATH";
pub const BUILD_FILE: &str = "closr.toml";

const COMPILER_JAR: &str = "build/compiler.jar";
const DEFAULT_JAVA_BIN: &str = "java";
const DEFAULT_MAX_BUFFER_KB: u64 = 1000;

/// Configuration errors are all fatal and reported before any process spawns.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("target `{0}`: cannot have js_output_file & js_output_path set at the same time")]
	ConflictingOutputs(String),
	#[error("target `{0}` sets neither js_output_file nor js_output_path")]
	MissingOutput(String),
	#[error("target `{0}` is missing the js input patterns")]
	MissingInputs(String),
	#[error("no target named `{0}` in the build file")]
	UnknownTarget(String),
	#[error("set an environment variable called {CLOSURE_PATH_VAR} or the build parameter closure_path and make it point to your root install of Closure Compiler")]
	MissingClosurePath,
}

/// The parsed build file: shared defaults plus named targets, in file order.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct BuildFile {
	#[serde(default)]
	pub defaults: Defaults,
	#[serde(default)]
	pub targets: IndexMap<String, TargetConfig>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Defaults {
	pub closure_path: Option<PathBuf>,
	pub java_bin: Option<PathBuf>,
	pub max_buffer: Option<u64>,
	pub on_empty: Option<OnEmpty>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TargetConfig {
	/// Working directory the input patterns expand against.
	pub cwd: Option<PathBuf>,
	/// Input file glob patterns.
	#[serde(default)]
	pub js: Vec<String>,
	/// Root install of Closure Compiler. Falls back to [defaults], then to
	/// the CLOSURE_PATH environment variable.
	pub closure_path: Option<PathBuf>,
	pub java_bin: Option<PathBuf>,
	/// Combined mode: every input bundled into this one file.
	pub js_output_file: Option<PathBuf>,
	/// Per-file mode: one output per input, named after it, in this directory.
	pub js_output_path: Option<PathBuf>,
	#[serde(default)]
	pub externs: Vec<String>,
	#[serde(default)]
	pub options: Options,
	pub report_file: Option<PathBuf>,
	#[serde(default = "default_report")]
	pub report: bool,
	/// Captured process output cap, in KiB.
	pub max_buffer: Option<u64>,
	pub on_empty: Option<OnEmpty>,
}

/// The open-ended compiler option map, plus the second home for extern
/// patterns.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Options {
	#[serde(default)]
	pub externs: Vec<String>,
	#[serde(flatten)]
	pub flags: IndexMap<String, FlagValue>,
}

/// Policy for input patterns that expand to nothing.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OnEmpty {
	/// Log "nothing to process" and succeed without spawning.
	#[default]
	Skip,
	/// Fail the run.
	Fail,
}

/// A target with every default applied and every precedence resolved, ready
/// for command assembly.
#[derive(Clone, Debug)]
pub struct Target {
	pub name: String,
	pub cwd: PathBuf,
	pub js: Vec<String>,
	pub java_bin: PathBuf,
	pub compiler_jar: PathBuf,
	pub output: Output,
	pub externs: Vec<String>,
	pub flags: IndexMap<String, FlagValue>,
	/// Where the compiler's diagnostic stream is persisted after a combined
	/// build. `None` disables reporting (and per-file targets never report).
	pub report: Option<PathBuf>,
	/// Captured process output cap, in bytes.
	pub max_buffer: usize,
	pub on_empty: OnEmpty,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Output {
	File(PathBuf),
	Dir(PathBuf),
}

impl BuildFile {
	/// Validate the selection and return the target names to build, in build
	/// file order when no explicit selection was given.
	pub fn target_names(&self, selected: &[String]) -> Result<Vec<String>, ConfigError> {
		if selected.is_empty() {
			return Ok(self.targets.keys().cloned().collect());
		}

		for name in selected {
			if !self.targets.contains_key(name) {
				return Err(ConfigError::UnknownTarget(name.clone()));
			}
		}

		Ok(selected.to_vec())
	}

	/// Resolve one target. `env_closure` is the CLOSURE_PATH value captured
	/// once at startup; explicit configuration wins over it.
	pub fn resolve(&self, name: &str, env_closure: Option<&Path>) -> Result<Target, ConfigError> {
		let target = self.targets.get(name).ok_or_else(|| ConfigError::UnknownTarget(name.into()))?;

		if target.js_output_file.is_some() && target.js_output_path.is_some() {
			return Err(ConfigError::ConflictingOutputs(name.into()));
		}

		let output = match (&target.js_output_file, &target.js_output_path) {
			(Some(file), None) => Output::File(file.clone()),
			(None, Some(dir)) => Output::Dir(dir.clone()),
			_ => return Err(ConfigError::MissingOutput(name.into())),
		};

		if target.js.is_empty() {
			return Err(ConfigError::MissingInputs(name.into()));
		}

		let closure_path = target.closure_path.clone()
			.or_else(|| self.defaults.closure_path.clone())
			.or_else(|| env_closure.map(Path::to_path_buf))
			.ok_or(ConfigError::MissingClosurePath)?;

		let report = match (&output, target.report) {
			(Output::File(file), true) => {
				Some(target.report_file.clone().unwrap_or_else(|| default_report_file(file)))
			}
			_ => None,
		};

		let mut externs = target.externs.clone();
		externs.extend(target.options.externs.iter().cloned());

		let max_buffer = target.max_buffer
			.or(self.defaults.max_buffer)
			.unwrap_or(DEFAULT_MAX_BUFFER_KB);

		Ok(Target {
			name: name.into(),
			cwd: target.cwd.clone().unwrap_or_else(|| PathBuf::from(".")),
			js: target.js.clone(),
			java_bin: target.java_bin.clone()
				.or_else(|| self.defaults.java_bin.clone())
				.unwrap_or_else(|| PathBuf::from(DEFAULT_JAVA_BIN)),
			compiler_jar: closure_path.join(COMPILER_JAR),
			output,
			externs,
			flags: target.options.flags.clone(),
			report,
			max_buffer: max_buffer as usize * 1024,
			on_empty: target.on_empty.or(self.defaults.on_empty).unwrap_or_default(),
		})
	}
}

/// Load the build file from an explicit path, the current directory, or the
/// user config directory, in that order.
pub fn load(path: Option<&Path>) -> Result<BuildFile> {
	let path = match path {
		Some(path) => path.to_path_buf(),
		None => find_build_file()?,
	};

	let content = fs::read_to_string(&path)
		.with_context(|| format!("Failed to read build file {}", path.display()))?;

	toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn find_build_file() -> Result<PathBuf> {
	let local = PathBuf::from(BUILD_FILE);
	if local.exists() {
		return Ok(local);
	}

	if let Some(dir) = dirs::config_dir() {
		let user = dir.join("closr").join(BUILD_FILE);
		if user.exists() {
			return Ok(user);
		}
	}

	Err(anyhow!("No {BUILD_FILE} found in the current directory, and no user config exists"))
}

/// Capture the environment fallback for the compiler install root. Read once
/// at startup and injected into resolution.
pub fn closure_path_env() -> Option<PathBuf> {
	env::var_os(CLOSURE_PATH_VAR).map(PathBuf::from)
}

fn default_report() -> bool {
	true
}

fn default_report_file(output: &Path) -> PathBuf {
	let mut file = OsString::from(output.as_os_str());
	file.push(".report.txt");
	PathBuf::from(file)
}
