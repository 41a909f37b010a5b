// This is the main file of Radstruct and where execution starts. It mainly handles the CLI and
// then calls into other files to run whichever subcommand the user chose.

// Copyright 2025 Ryan Wick (rrwick@gmail.com)
// https://github.com/rrwick/Radstruct

// This file is part of Radstruct. Radstruct is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Radstruct
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Radstruct. If not, see <http://www.gnu.org/licenses/>.

use std::path::PathBuf;
use clap::{Parser, Subcommand, crate_version};

mod convert;
mod encode;
mod filter;
mod log;
mod metrics;
mod misc;
mod structure;
mod table;
mod vcf;


#[derive(Parser)]
#[clap(name = "Radstruct",
       version = concat!("v", crate_version!()),
       about = "a tool for ddRADseq VCF quality control and STRUCTURE/distruct conversion\n\
                Documenation: https://github.com/rrwick/Radstruct/wiki",
       before_help = concat!(r#"  _____           _     _                   _   "#, "\n",
                             r#" |  __ \         | |   | |                 | |  "#, "\n",
                             r#" | |__) |__ _  __| |___| |_ _ __ _   _  ___| |_ "#, "\n",
                             r#" |  _  // _` |/ _` / __| __| '__| | | |/ __| __|"#, "\n",
                             r#" | | \ \ (_| | (_| \__ \ |_| |  | |_| | (__| |_ "#, "\n",
                             r#" |_|  \_\__,_|\__,_|___/\__|_|   \__,_|\___|\__|"#))]
#[command(author, version, long_about = None, disable_help_subcommand = true,
          propagate_version = true)]
#[clap(subcommand_required = true)]
#[clap(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {

    /// convert STRUCTURE result files into distruct input files
    Convert {
        /// STRUCTURE result files (one or more required)
        #[clap(short = 'i', long = "in_files", required = true, num_args = 1..)]
        in_files: Vec<PathBuf>,

        /// Directory where distruct input files will be saved (required)
        #[clap(short = 'o', long = "out_dir", required = true)]
        out_dir: PathBuf,
    },

    /// encode a VCF genotype matrix as STRUCTURE input
    Encode {
        /// Input VCF file (required)
        #[clap(short = 'i', long = "in_vcf", required = true)]
        in_vcf: PathBuf,

        /// Directory where STRUCTURE input files will be saved (required)
        #[clap(short = 'o', long = "out_dir", required = true)]
        out_dir: PathBuf,

        /// Base name for the STRUCTURE input files
        #[clap(short = 'n', long = "name", hide_default_value = true,
               help = "Base name for the STRUCTURE input files [default: VCF filename stem]")]
        name: Option<String>,
    },

    /// remove low-call-rate samples and low-quality variants from a VCF
    Filter {
        /// Input VCF file (required)
        #[clap(short = 'i', long = "in_vcf", required = true)]
        in_vcf: PathBuf,

        /// Directory where the filtered VCF and per-iteration tables will be saved (required)
        #[clap(short = 'o', long = "out_dir", required = true)]
        out_dir: PathBuf,

        /// Minimum per-sample call rate for the first filtering pass
        #[clap(short = 's', long = "sample_call_rate", default_value = "0.5")]
        sample_call_rate: f64,

        /// Minimum per-variant call rate for the first filtering pass
        #[clap(short = 'v', long = "variant_call_rate", default_value = "0.5")]
        variant_call_rate: f64,

        /// Minimum minor allele frequency for variants
        #[clap(short = 'a', long = "min_maf", default_value = "0.05")]
        min_maf: f64,

        /// Call-rate cutoff for samples and variants from the second pass onward
        #[clap(long = "strict_call_rate", default_value = "0.9")]
        strict_call_rate: f64,
    },

    /// create TSV line from YAML files
    Table {
        /// Radstruct output directory (if absent, a header line will be output)
        #[clap(short = 'r', long = "results_dir")]
        results_dir: Option<PathBuf>,

        /// Sample name
        #[clap(short = 'n', long = "name", default_value = "", hide_default_value = true,
               help = "Sample name [default: blank]")]
        name: String,

        /// Comma-delimited list of YAML fields to include
        #[clap(short = 'f', long = "fields",
               default_value = "encoded_sample_count, encoded_locus_count, \
                                input_sample_count, input_variant_count, \
                                output_sample_count, output_variant_count, \
                                iteration_count, ts_tv_ratio")]
        fields: String,

        /// Significant figures to use for floating point numbers
        #[clap(short = 's', long = "sigfigs", default_value = "3")]
        sigfigs: usize,
    },
}


fn main() {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Convert { in_files, out_dir }) => {
            convert::convert(in_files, out_dir);
        },
        Some(Commands::Encode { in_vcf, out_dir, name }) => {
            encode::encode(in_vcf, out_dir, name);
        },
        Some(Commands::Filter { in_vcf, out_dir, sample_call_rate, variant_call_rate, min_maf,
                                strict_call_rate }) => {
            filter::filter(in_vcf, out_dir, sample_call_rate, variant_call_rate, min_maf,
                           strict_call_rate);
        },
        Some(Commands::Table { results_dir, name, fields, sigfigs }) => {
            table::table(results_dir, name, fields, sigfigs);
        },
        None => {}
    }
}
