// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Platform-aware command lookup (§6 "PATH is read..."; §9 "Windows
//! specifics": retry with `.cmd` on ENOENT, enumerate all PATH-like vars).

use std::path::PathBuf;

/// All environment variable names that can influence where a command is
/// found, platform-dependent (§9: "enumerate all PATH-like variables and
/// note which one actually takes effect").
pub fn path_like_variable_names(is_windows: bool) -> &'static [&'static str] {
    if is_windows {
        &["PATH", "Path", "PATHEXT"]
    } else {
        &["PATH"]
    }
}

/// Find `command` on `path_value` (a `:`- or `;`-separated string, platform
/// dependent), returning the first directory that contains an executable by
/// that name. This is a pure function over an explicit PATH string so it is
/// testable without touching the real environment.
pub fn find_on_path(command: &str, path_value: &str, is_windows: bool) -> Option<PathBuf> {
    let separator = if is_windows { ';' } else { ':' };
    for dir in path_value.split(separator) {
        if dir.is_empty() {
            continue;
        }
        let candidate = PathBuf::from(dir).join(command);
        if candidate.is_file() {
            return Some(candidate);
        }
        if is_windows {
            let with_cmd = PathBuf::from(dir).join(format!("{command}.cmd"));
            if with_cmd.is_file() {
                return Some(with_cmd);
            }
        }
    }
    None
}

/// On Windows, a bare spawn of a `.cmd`/`.bat` shim can ENOENT even when
/// `find_on_path` located it, because the child process API needs the
/// extension explicit. Given an ENOENT, retry once with `.cmd` appended.
pub fn enoent_retry_candidate(original_command: &str, is_windows: bool) -> Option<String> {
    if is_windows && !original_command.ends_with(".cmd") {
        Some(format!("{original_command}.cmd"))
    } else {
        None
    }
}

/// Locate `command` using the real environment `PATH` (via the `which`
/// crate, which already knows the platform's executable-extension rules).
/// Returns `None` rather than an error: callers treat "not found" as an
/// ordinary `SpawnError::CommandNotFound` once the spawn itself is attempted.
pub fn locate_on_real_path(command: &str, cwd: &std::path::Path) -> Option<PathBuf> {
    which::which_in(command, std::env::var_os("PATH"), cwd).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn finds_executable_in_first_matching_dir() {
        let dir = tempdir().expect("tempdir");
        let bin = dir.path().join("elm");
        fs::write(&bin, b"").expect("write");
        let path_value = dir.path().to_str().expect("utf8 path").to_string();
        let found = find_on_path("elm", &path_value, false);
        assert_eq!(found, Some(bin));
    }

    #[test]
    fn missing_command_returns_none() {
        let dir = tempdir().expect("tempdir");
        let path_value = dir.path().to_str().expect("utf8 path").to_string();
        assert_eq!(find_on_path("elm", &path_value, false), None);
    }

    #[test]
    fn windows_also_checks_cmd_suffix() {
        let dir = tempdir().expect("tempdir");
        let bin = dir.path().join("elm.cmd");
        fs::write(&bin, b"").expect("write");
        let path_value = dir.path().to_str().expect("utf8 path").to_string();
        assert_eq!(find_on_path("elm", &path_value, true), Some(bin));
    }

    #[test]
    fn enoent_retry_only_applies_on_windows() {
        assert_eq!(enoent_retry_candidate("elm", false), None);
        assert_eq!(enoent_retry_candidate("elm", true), Some("elm.cmd".to_string()));
        assert_eq!(enoent_retry_candidate("elm.cmd", true), None);
    }

    #[test]
    fn path_like_variables_include_pathext_on_windows_only() {
        assert_eq!(path_like_variable_names(false), &["PATH"]);
        assert!(path_like_variable_names(true).contains(&"PATHEXT"));
    }
}
