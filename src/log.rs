// This file contains functions for displaying nicely formatted log output to stderr.

// Copyright 2025 Ryan Wick (rrwick@gmail.com)
// https://github.com/rrwick/Radstruct

// This file is part of Radstruct. Radstruct is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Radstruct
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Radstruct. If not, see <http://www.gnu.org/licenses/>.

use std::cmp::min;
use chrono::prelude::*;
use colored::Colorize;


pub fn section_header(text: &str) {
    // Prints a header line (bold yellow with a timestamp) followed by an underline.
    let now: DateTime<Local> = Local::now();
    let date = format!("({})", now.format("%Y-%m-%d %H:%M:%S"));
    let underline = "─".repeat(min(text.len() + date.len() + 1, terminal_width()));
    eprintln!();
    eprintln!("{} {}", text.bold().bright_yellow(), date.dimmed());
    eprintln!("{}", underline.dimmed());
}


pub fn explanation(text: &str) {
    // Prints a dimmed description of the step that is about to run, wrapped to the terminal.
    let wrapped = textwrap::fill(text, terminal_width());
    for line in wrapped.lines() {
        eprintln!("{}", line.dimmed());
    }
    eprintln!();
}


fn terminal_width() -> usize {
    match term_size::dimensions_stderr() {
        Some((width, _)) => min(width, 80),
        None => 80,
    }
}
