// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal styling (§6 "NO_COLOR disables ANSI styling").

use std::io::IsTerminal;

mod codes {
    pub const HEADER: &str = "36";
    pub const MUTED: &str = "90";
    pub const ERROR: &str = "31";
    pub const SUCCESS: &str = "32";
}

pub fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    std::io::stdout().is_terminal()
}

fn paint(code: &str, text: &str) -> String {
    if should_colorize() {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

pub fn header(text: &str) -> String {
    paint(codes::HEADER, text)
}

pub fn muted(text: &str) -> String {
    paint(codes::MUTED, text)
}

pub fn error(text: &str) -> String {
    paint(codes::ERROR, text)
}

pub fn success(text: &str) -> String {
    paint(codes::SUCCESS, text)
}
