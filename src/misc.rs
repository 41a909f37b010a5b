// This file contains miscellaneous functions used by various parts of Radstruct.

// Copyright 2025 Ryan Wick (rrwick@gmail.com)
// https://github.com/rrwick/Radstruct

// This file is part of Radstruct. Radstruct is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Radstruct
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Radstruct. If not, see <http://www.gnu.org/licenses/>.

use indicatif::{ProgressBar, ProgressStyle};
use flate2::read::GzDecoder;
use std::fs::{File, create_dir_all};
use std::io::{prelude::*, BufReader, BufWriter, Read};
use std::path::Path;
use std::time::Duration;


pub fn create_dir(dir_path: &Path) {
    match create_dir_all(dir_path) {
        Ok(_) => {},
        Err(e) => quit_with_error(&format!("failed to create directory {}\n{}", dir_path.display(), e)),
    }
}


pub fn check_if_file_exists(filename: &Path) {
    // Quits with an error if the given path is not an existing file.
    if !filename.exists() {
        quit_with_error(&format!("file does not exist: {}", filename.display()));
    }
    if !filename.is_file() {
        quit_with_error(&format!("{} is not a file", filename.display()));
    }
}


pub fn check_if_dir_exists(dir: &Path) {
    // Quits with an error if the given path is not an existing directory.
    if !dir.exists() {
        quit_with_error(&format!("directory does not exist: {}", dir.display()));
    }
    if !dir.is_dir() {
        quit_with_error(&format!("{} is not a directory", dir.display()));
    }
}


pub fn check_if_dir_is_not_dir(dir: &Path) {
    // Quits with an error if the given path exists but is not a directory (not existing is okay).
    if dir.exists() && !dir.is_dir() {
        quit_with_error(&format!("{} exists but is not a directory", dir.display()));
    }
}


#[cfg(not(test))]
pub fn quit_with_error(text: &str) -> ! {
    // For friendly error messages, this function normally just prints the error and quits.
    eprintln!();
    eprintln!("Error: {}", text);
    std::process::exit(1);
}
#[cfg(test)]
pub fn quit_with_error(text: &str) -> ! {
    // But when running unit tests, this function instead panics so I can catch it for the test.
    panic!("{}", text);
}


pub fn is_file_gzipped(filename: &Path) -> bool {
    // This function returns true if the file appears to be gzipped (based on the first two bytes)
    // and false if not. If it can't open the file or read the first two bytes, it will quit with
    // an error message.
    let open_result = File::open(filename);
    match open_result {
        Ok(_)  => (),
        Err(e) => quit_with_error(&format!("unable to open {}\n{}", filename.display(), e)),
    }
    let file = open_result.unwrap();
    let mut reader = BufReader::new(file);
    let mut buf = vec![0u8; 2];
    let read_result = reader.read_exact(&mut buf);
    match read_result {
        Ok(_)  => (),
        Err(e) => quit_with_error(&format!("{} is too small\n{}", filename.display(), e)),
    }
    buf[0] == 31 && buf[1] == 139
}


pub fn text_file_reader(filename: &Path) -> BufReader<Box<dyn Read>> {
    // Returns a line reader for a text file that works on both unzipped and gzipped files.
    let file = File::open(filename).unwrap_or_else(|e| {
        quit_with_error(&format!("unable to open {}\n{}", filename.display(), e));
    });
    let reader: Box<dyn Read> = if is_file_gzipped(filename) { Box::new(GzDecoder::new(file)) }
                                                        else { Box::new(file) };
    BufReader::new(reader)
}


pub fn load_file_lines(filename: &Path) -> Vec<String> {
    let reader = text_file_reader(filename);
    reader.lines().map(|line_result| {
        line_result.unwrap_or_else(|e| {
            quit_with_error(&format!("failed to read line from {}\n{}", filename.display(), e));
        })
    }).collect()
}


pub fn create_file_writer(filename: &Path) -> BufWriter<File> {
    let file = File::create(filename).unwrap_or_else(|e| {
        quit_with_error(&format!("unable to create {}\n{}", filename.display(), e));
    });
    BufWriter::new(file)
}


pub fn write_two_column_table(filename: &Path, rows: &[(String, f64)]) {
    // Saves a flat id-to-value table, one tab-separated pair per line.
    let mut writer = create_file_writer(filename);
    for (id, value) in rows {
        writeln!(writer, "{}\t{}", id, format_float(*value)).unwrap_or_else(|e| {
            quit_with_error(&format!("unable to write {}\n{}", filename.display(), e));
        });
    }
}


pub fn format_float(num: f64) -> String {
    // Formats a float with up to six decimal places but then drops trailing zeros.
    let mut formatted = format!("{:.6}", num);
    if !formatted.contains('.') { return formatted }
    while formatted.chars().last().unwrap() == '0' { formatted.pop(); }
    if formatted.chars().last().unwrap() == '.' { formatted.pop(); }
    formatted
}


pub fn format_float_sigfigs(num: f64, sigfigs: usize) -> String {
    // Formats a float to the given number of significant figures.
    if num == 0.0 || !num.is_finite() { return format!("{}", num) }
    let magnitude = num.abs().log10().floor() as i32;
    let decimals = (sigfigs as i32 - 1 - magnitude).max(0) as usize;
    format!("{:.*}", decimals, num)
}


pub fn spinner(message: &str) -> ProgressBar {
    if cfg!(test) {
        ProgressBar::hidden() // don't show a spinner during unit tests
    } else {
        let pb = ProgressBar::new_spinner();
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_style(
            ProgressStyle::default_spinner()
                .tick_strings(&vec!["⠋", "⠙", "⠚", "⠞", "⠖", "⠦", "⠴", "⠲", "⠳", "⠓"])  // dots3 from github.com/sindresorhus/cli-spinners
                .template("{spinner} {msg}").unwrap(),
        );
        pb.set_message(message.to_string().clone());
        pb
    }
}


#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use super::*;
    use crate::tests::{make_test_file, make_gzipped_test_file};

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(0.0), "0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(0.11), "0.11");
        assert_eq!(format_float(0.111111), "0.111111");
        assert_eq!(format_float(0.1111111), "0.111111");
        assert_eq!(format_float(10.0), "10");
    }

    #[test]
    fn test_format_float_sigfigs() {
        assert_eq!(format_float_sigfigs(1.2, 1), "1");
        assert_eq!(format_float_sigfigs(1.2, 2), "1.2");
        assert_eq!(format_float_sigfigs(1.2, 4), "1.200");
        assert_eq!(format_float_sigfigs(123.4, 2), "123");
        assert_eq!(format_float_sigfigs(0.01234, 3), "0.0123");
    }

    #[test]
    fn test_load_file_lines() {
        let temp_dir = tempdir().unwrap();
        let plain = temp_dir.path().join("plain.txt");
        let gzipped = temp_dir.path().join("gzipped.txt.gz");
        make_test_file(&plain, "abc\ndef\n");
        make_gzipped_test_file(&gzipped, "abc\ndef\n");
        assert_eq!(load_file_lines(&plain), vec!["abc", "def"]);
        assert_eq!(load_file_lines(&gzipped), vec!["abc", "def"]);
        assert!(!is_file_gzipped(&plain));
        assert!(is_file_gzipped(&gzipped));
    }

    #[test]
    fn test_write_two_column_table() {
        let temp_dir = tempdir().unwrap();
        let table = temp_dir.path().join("table.txt");
        write_two_column_table(&table, &[("a".to_string(), 0.5), ("b".to_string(), 1.0)]);
        assert_eq!(load_file_lines(&table), vec!["a\t0.5", "b\t1"]);
    }
}
