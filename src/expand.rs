use std::collections::HashSet;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use globset::{Glob, GlobMatcher};
use ignore::WalkBuilder;

/// Expand glob patterns into existing files under `cwd`, returned relative to
/// it.
///
/// Order is resolution order: every file matched by the first pattern (path
/// order) before any file first matched by the second, duplicates dropped.
pub fn files(cwd: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
	if patterns.is_empty() {
		return Ok(Vec::new());
	}

	let matchers = patterns.iter()
		.map(|pattern| {
			Glob::new(pattern)
				.map(|glob| glob.compile_matcher())
				.with_context(|| format!("Invalid glob pattern: {pattern}"))
		})
		.collect::<Result<Vec<GlobMatcher>>>()?;

	// one plain walk; build inputs are matched as-is, no gitignore semantics
	let walker = WalkBuilder::new(cwd)
		.standard_filters(false)
		.sort_by_file_path(|a, b| a.cmp(b))
		.build();

	let mut buckets = vec![Vec::new(); matchers.len()];

	for result in walker {
		let entry = match result {
			Ok(entry) => entry,
			Err(err) => {
				log::warn!("error walking {}: {err}", cwd.display());
				continue;
			}
		};

		if !entry.file_type().is_some_and(|ft| ft.is_file()) {
			continue;
		}

		let Ok(relative) = entry.path().strip_prefix(cwd) else {
			continue;
		};

		for (matcher, bucket) in matchers.iter().zip(&mut buckets) {
			if matcher.is_match(relative) {
				bucket.push(relative.to_path_buf());
			}
		}
	}

	let mut seen = HashSet::new();
	let mut expanded = Vec::new();

	for bucket in buckets {
		for path in bucket {
			if seen.insert(path.clone()) {
				expanded.push(path);
			}
		}
	}

	Ok(expanded)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;

	fn scratch() -> tempfile::TempDir {
		let dir = tempfile::tempdir().unwrap();
		fs::create_dir(dir.path().join("sub")).unwrap();

		for name in ["a.js", "b.js", "sub/c.js", "notes.txt"] {
			fs::write(dir.path().join(name), "x").unwrap();
		}

		dir
	}

	fn strings(paths: Vec<PathBuf>) -> Vec<String> {
		paths.into_iter().map(|p| p.display().to_string()).collect()
	}

	#[test]
	fn patterns_expand_in_path_order() {
		let dir = scratch();
		let expanded = files(dir.path(), &["*.js".into(), "sub/*.js".into()]).unwrap();
		assert_eq!(strings(expanded), ["a.js", "b.js", "sub/c.js"]);
	}

	#[test]
	fn pattern_order_beats_path_order() {
		let dir = scratch();
		let expanded = files(dir.path(), &["sub/*.js".into(), "*.js".into()]).unwrap();
		assert_eq!(strings(expanded), ["sub/c.js", "a.js", "b.js"]);
	}

	#[test]
	fn overlapping_patterns_deduplicate() {
		let dir = scratch();
		let expanded = files(dir.path(), &["a.js".into(), "*.js".into()]).unwrap();
		assert_eq!(strings(expanded), ["a.js", "b.js"]);
	}

	#[test]
	fn unmatched_patterns_expand_to_nothing() {
		let dir = scratch();
		assert!(files(dir.path(), &["*.ts".into()]).unwrap().is_empty());
		assert!(files(dir.path(), &[]).unwrap().is_empty());
	}

	#[test]
	fn invalid_patterns_are_reported() {
		let dir = scratch();
		let err = files(dir.path(), &["src/[".into()]).unwrap_err();
		assert!(err.to_string().contains("Invalid glob pattern"));
	}
}
