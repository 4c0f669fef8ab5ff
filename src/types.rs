use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// One value from the open-ended compiler flag map.
///
/// TOML has no null, so a boolean plays the switch role: `true` emits the
/// bare flag with no argument and `false` drops the flag entirely.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
	Switch(bool),
	Int(i64),
	Float(f64),
	List(Vec<String>),
	Scalar(String),
}

impl FlagValue {
	/// Append the flag to an argv, repeating list flags once per element.
	pub fn render(&self, name: &str, args: &mut Vec<String>) {
		match self {
			Self::Switch(true) => args.push(format!("--{name}")),
			Self::Switch(false) => {}
			Self::Int(value) => {
				args.push(format!("--{name}"));
				args.push(value.to_string());
			}
			Self::Float(value) => {
				args.push(format!("--{name}"));
				args.push(value.to_string());
			}
			Self::List(values) => {
				for value in values {
					args.push(format!("--{name}"));
					args.push(value.clone());
				}
			}
			Self::Scalar(value) => {
				args.push(format!("--{name}"));
				args.push(value.clone());
			}
		}
	}
}

/// One fully assembled external compiler invocation.
///
/// Built once per run from the resolved target and the expanded file set,
/// spawned once and never reused.
#[derive(Clone, Debug, Serialize)]
pub struct Invocation {
	/// Name of the target this invocation belongs to.
	pub target: String,
	/// The java binary to execute.
	pub program: PathBuf,
	/// Full argv, starting with `-jar <compiler.jar>`.
	pub args: Vec<String>,
	/// Working directory the process runs in; input paths are relative to it.
	pub cwd: PathBuf,
	/// Source file in per-file mode, `None` for a combined bundle.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub input: Option<PathBuf>,
	/// Destination file, absolute.
	pub output: PathBuf,
}

impl Invocation {
	/// Short name for status lines: the input's file name, or the target name
	/// for a combined bundle.
	pub fn label(&self) -> String {
		match &self.input {
			Some(input) => input.display().to_string(),
			None => self.target.clone(),
		}
	}

	/// Shell-style rendering for display only. The process is spawned from
	/// the argv directly, never through a shell.
	pub fn command_line(&self) -> String {
		let mut parts = vec![quote(&self.program.display().to_string())];
		parts.extend(self.args.iter().map(|arg| quote(arg)));
		parts.join(" ")
	}
}

fn quote(arg: &str) -> String {
	if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"') {
		format!("\"{}\"", arg.replace('"', "\\\""))
	} else {
		arg.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn render(name: &str, value: FlagValue) -> Vec<String> {
		let mut args = Vec::new();
		value.render(name, &mut args);
		args
	}

	#[test]
	fn list_flags_repeat_per_element() {
		let args = render("x", FlagValue::List(vec!["a".into(), "b".into()]));
		assert_eq!(args, ["--x", "a", "--x", "b"]);
	}

	#[test]
	fn switch_flags_have_no_argument() {
		assert_eq!(render("y", FlagValue::Switch(true)), ["--y"]);
		assert!(render("y", FlagValue::Switch(false)).is_empty());
	}

	#[test]
	fn scalar_flags_carry_their_value() {
		assert_eq!(render("z", FlagValue::Int(5)), ["--z", "5"]);
		assert_eq!(
			render("compilation_level", FlagValue::Scalar("ADVANCED_OPTIMIZATIONS".into())),
			["--compilation_level", "ADVANCED_OPTIMIZATIONS"],
		);
	}

	#[test]
	fn command_line_quotes_spaced_arguments() {
		let invocation = Invocation {
			target: "app".into(),
			program: "java".into(),
			args: vec!["-jar".into(), "/opt/closure tools/compiler.jar".into()],
			cwd: ".".into(),
			input: None,
			output: "out.js".into(),
		};

		assert_eq!(invocation.command_line(), r#"java -jar "/opt/closure tools/compiler.jar""#);
	}

	#[test]
	fn label_prefers_the_input_file() {
		let mut invocation = Invocation {
			target: "app".into(),
			program: "java".into(),
			args: Vec::new(),
			cwd: ".".into(),
			input: Some("src/a.js".into()),
			output: "out/a.js".into(),
		};

		assert_eq!(invocation.label(), "src/a.js");

		invocation.input = None;
		assert_eq!(invocation.label(), "app");
	}
}
