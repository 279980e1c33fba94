// Copyright (c) 2025 Unfolded Circle ApS
// SPDX-License-Identifier: MPL-2.0

use std::env;
use std::fs;
use std::path::Path;
use std::process::Command;

fn main() {
    built::write_built_file().expect("Failed to acquire build-time information");

    let version = git(&["describe", "--match", "v[0-9]*", "--tags", "HEAD"])
        .map(|v| v.trim_start_matches('v').to_string())
        .or_else(|| git(&["rev-parse", "--short", "HEAD"]));
    let dirty = git(&["diff-index", "--name-only", "HEAD", "--"]).is_some_and(|v| !v.is_empty());

    let mut content = String::from("// Git information generated at build time\n");
    match version {
        Some(v) => content.push_str(&format!(
            "pub const GIT_VERSION: Option<&'static str> = Some({v:?});\n"
        )),
        None => content.push_str("pub const GIT_VERSION: Option<&'static str> = None;\n"),
    }
    if dirty {
        content.push_str("pub const GIT_DIRTY: Option<bool> = Some(true);\n");
    } else {
        content.push_str("pub const GIT_DIRTY: Option<bool> = None;\n");
    }

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    fs::write(Path::new(&out_dir).join("git_built.rs"), content)
        .expect("Failed to write git build information");
}

/// Run a git command and return its trimmed stdout if it succeeded.
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|v| v.trim().to_string())
}
