//! Copying the composed command to the terminal's clipboard.
//!
//! Uses the OSC 52 escape sequence, so it works wherever the terminal
//! emulator honours it, including over SSH, without a platform clipboard
//! library.

use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use crossterm::{execute, style::Print};

/// Ask the terminal behind `out` to put `text` on the system clipboard.
pub fn copy<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    execute!(out, Print(osc52_sequence(text)))
}

fn osc52_sequence(text: &str) -> String {
    let encoded = STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x1b\\")
}
