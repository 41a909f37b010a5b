// This file contains the code for the radstruct table subcommand.

// Copyright 2025 Ryan Wick (rrwick@gmail.com)
// https://github.com/rrwick/Radstruct

// This file is part of Radstruct. Radstruct is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Radstruct
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Radstruct. If not, see <http://www.gnu.org/licenses/>.

use fxhash::FxHashSet;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::metrics::{EncodeMetrics, FilterMetrics};
use crate::misc::{check_if_dir_exists, quit_with_error, format_float_sigfigs};


pub fn table(results_dir: Option<PathBuf>, name: String, fields: String, sigfigs: usize) {
    check_settings(&results_dir, sigfigs);
    let fields = parse_fields(fields);
    if let Some(results_dir) = results_dir {
        print_values(&results_dir, name, fields, sigfigs);
    } else {
        print_header(fields);
    }
}


fn check_settings(results_dir: &Option<PathBuf>, sigfigs: usize) {
    if let Some(dir) = results_dir.as_ref() {
        check_if_dir_exists(dir);
    }
    if sigfigs == 0 {
        quit_with_error("--sigfigs must be 1 or greater");
    }
}


fn parse_fields(comma_delimited_fields: String) -> Vec<String> {
    let fields: Vec<String> = comma_delimited_fields.replace(" ", "").split(',')
                                                    .map(|s| s.to_string()).collect();
    let mut valid_fields = FxHashSet::default();
    valid_fields.extend(EncodeMetrics::get_field_names());
    valid_fields.extend(FilterMetrics::get_field_names());
    for field in &fields {
        if !valid_fields.contains(field) {
            quit_with_error(&format!("{} is not a valid field name", field));
        }
    }
    fields
}


fn print_header(fields: Vec<String>) {
    println!("name\t{}", fields.join("\t"));
}


fn print_values(results_dir: &Path, name: String, fields: Vec<String>, sigfigs: usize) {
    if name.contains('\t') {
        quit_with_error("--name cannot contain tab characters")
    }
    print!("{}", name);

    let yaml_files = find_all_yaml_files(results_dir);
    let encode_yaml = get_one_copy_yaml(&yaml_files, "encode.yaml");
    let filter_yaml = get_one_copy_yaml(&yaml_files, "filter.yaml");

    let mut map: HashMap<String, Value> = HashMap::new();
    if let Some(path) = encode_yaml { map.extend(load_single_yaml_to_map(&path)); }
    if let Some(path) = filter_yaml { map.extend(load_single_yaml_to_map(&path)); }

    for field in fields {
        print!("\t");
        if let Some(value) = map.get(&field) {
            print!("{}", format_value(value, sigfigs));
        }
    }
    println!();
}


fn load_single_yaml_to_map(yaml_path: &Path) -> HashMap<String, Value> {
    let content = fs::read_to_string(yaml_path)
        .unwrap_or_else(|_| quit_with_error("Could not read YAML file"));
    serde_yaml::from_str(&content)
        .unwrap_or_else(|_| quit_with_error("Failed to parse YAML file"))
}


fn find_all_yaml_files(results_dir: &Path) -> Vec<PathBuf> {
    let mut yaml_files = Vec::new();
    visit_dirs_for_yaml_files(results_dir, &mut yaml_files);
    yaml_files.sort();
    yaml_files
}


fn visit_dirs_for_yaml_files(dir: &Path, yaml_files: &mut Vec<PathBuf>) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                visit_dirs_for_yaml_files(&path, yaml_files);
            } else if path.extension().is_some_and(|ext| ext == "yaml") {
                yaml_files.push(path);
            }
        }
    }
}


fn get_one_copy_yaml(yaml_files: &[PathBuf], filename: &str) -> Option<PathBuf> {
    // Returns the YAML file in the given path with a matching filename. No match is okay and one
    // match is okay, but multiple matches will result in an error.
    let found_files = yaml_files.iter()
        .filter(|path| path.file_name().is_some_and(|name| name == filename)).collect::<Vec<_>>();
    match found_files.len() {
        0 => None,
        1 => Some(found_files[0].clone()),
        _ => quit_with_error(&format!("Multiple {} files found", filename)),
    }
}


fn format_value(value: &Value, sigfigs: usize) -> String {
    // This function formats serde_yaml::Value types. Sequences are formatted with square brackets
    // and commas (no spaces). Mappings are formatted with curly brackets, colons and commas (no
    // spaces).
    match value {
        Value::Number(n) => format_number(n, sigfigs),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Sequence(s) => format_sequence(s, sigfigs),
        Value::Mapping(m) => format_mapping(m, sigfigs),
        _ => String::new(),
    }
}


fn format_number(n: &serde_yaml::Number, sigfigs: usize) -> String {
    if n.is_i64() || n.is_u64()      { n.to_string() }
    else if let Some(f) = n.as_f64() { format_float_sigfigs(f, sigfigs) }
    else                             { n.to_string() }
}


fn format_sequence(s: &[Value], sigfigs: usize) -> String {
    format!("[{}]", s.iter().map(|v| format_value(v, sigfigs)).collect::<Vec<_>>().join(","))
}


fn format_mapping(m: &serde_yaml::Mapping, sigfigs: usize) -> String {
    format!("{{{}}}",
            m.iter().map(|(k, v)| format!("{}:{}",
                                          format_value(k, sigfigs),
                                          format_value(v, sigfigs))).collect::<Vec<_>>().join(","))
}
