// This file contains the code for reading and writing Radstruct's YAML files of metrics.

// Copyright 2025 Ryan Wick (rrwick@gmail.com)
// https://github.com/rrwick/Radstruct

// This file is part of Radstruct. Radstruct is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Radstruct
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Radstruct. If not, see <http://www.gnu.org/licenses/>.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io;
use std::io::Write;
use std::path::Path;


#[derive(Serialize, Deserialize, Debug, Default)]
pub struct EncodeMetrics {
    pub encoded_sample_count: u32,
    pub encoded_locus_count: u32,
}

impl EncodeMetrics {
    pub fn new() -> Self { Self::default() }

    pub fn save_to_yaml(&self, filename: &Path) { save_yaml(filename, self).unwrap(); }
}


#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct FilterIterationMetrics {
    pub iteration: u32,
    pub sample_call_rate_cutoff: f64,
    pub variant_call_rate_cutoff: f64,
    pub kept_sample_count: u32,
    pub kept_variant_count: u32,
    pub ts_tv_ratio: f64,
}


#[derive(Serialize, Deserialize, Debug, Default)]
pub struct FilterMetrics {
    pub input_sample_count: u32,
    pub input_variant_count: u32,
    pub output_sample_count: u32,
    pub output_variant_count: u32,
    pub iteration_count: u32,
    pub ts_tv_ratio: f64,
    pub iterations: Vec<FilterIterationMetrics>,
}

impl FilterMetrics {
    pub fn new() -> Self { Self::default() }

    pub fn save_to_yaml(&self, filename: &Path) { save_yaml(filename, self).unwrap(); }
}


fn save_yaml<T: Serialize>(yaml_filename: &Path, data: T) -> io::Result<()> {
    let yaml_string = serde_yaml::to_string(&data).unwrap();
    let mut file = File::create(yaml_filename)?;
    file.write_all(yaml_string.as_bytes())?;
    Ok(())
}


// This macro adds get_val_by_name and get_field_names methods to the metric structs.
macro_rules! impl_metrics_helpers {
    ($struct_name:ty) => {
        impl $struct_name {
            pub fn get_val_by_name(&self, name: &str) -> Option<String> {
                serde_json::to_value(self).ok()?.get(name).map(|v| v.to_string())
            }
            pub fn get_field_names() -> Vec<String> {
                let mut field_names: Vec<String> = match serde_json::to_value(Self::default())
                    .expect("serialisation failed").as_object()
                {
                    Some(map) => map.keys().cloned().collect(),
                    None => Vec::new(),
                };
                field_names.sort();
                field_names
            }
        }
    };
}
impl_metrics_helpers!(EncodeMetrics);
impl_metrics_helpers!(FilterMetrics);
