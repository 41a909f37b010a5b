// This file contains the code for the radstruct convert subcommand.

// Copyright 2025 Ryan Wick (rrwick@gmail.com)
// https://github.com/rrwick/Radstruct

// This file is part of Radstruct. Radstruct is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Radstruct
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Radstruct. If not, see <http://www.gnu.org/licenses/>.

use std::io::prelude::*;
use std::path::{Path, PathBuf};

use crate::log::{section_header, explanation};
use crate::misc::{check_if_dir_is_not_dir, check_if_file_exists, create_dir, create_file_writer};
use crate::structure::{IndividualRecord, StructureRun};


pub fn convert(in_files: Vec<PathBuf>, out_dir: PathBuf) {
    check_settings(&in_files, &out_dir);
    create_dir(&out_dir);
    starting_message();
    print_settings(&in_files, &out_dir);
    convert_all(&in_files, &out_dir);
    finished_message(&out_dir);
}


fn check_settings(in_files: &[PathBuf], out_dir: &Path) {
    for in_file in in_files {
        check_if_file_exists(in_file);
    }
    check_if_dir_is_not_dir(out_dir);
}


fn starting_message() {
    section_header("Starting radstruct convert");
    explanation("This command parses STRUCTURE result files, orders the individuals in each by \
                 their membership in the dominant cluster and writes the indivq, popq and \
                 drawparams files that distruct plots from.");
}


fn print_settings(in_files: &[PathBuf], out_dir: &Path) {
    eprintln!("Settings:");
    for in_file in in_files {
        eprintln!("  --in_files {}", in_file.display());
    }
    eprintln!("  --out_dir {}", out_dir.display());
    eprintln!();
}


fn convert_all(in_files: &[PathBuf], out_dir: &Path) {
    section_header("Converting STRUCTURE results");
    explanation("Individuals keep their original indices and labels, so CLUMPP can still match \
                 them up across replicate runs at the same K.");
    for in_file in in_files {
        let run = StructureRun::from_file(in_file);
        let base = in_file.file_name().unwrap_or_default().to_string_lossy().to_string();
        eprintln!("{}: {} individuals, {} clusters", in_file.display(), run.n, run.k);
        let indivq_path = out_dir.join(format!("{}.indivq", base));
        let popq_path = out_dir.join(format!("{}.popq", base));
        let drawparams_path = out_dir.join(format!("{}.drawparams", base));
        save_indivq(&run, &indivq_path);
        save_popq(&run, &popq_path);
        save_drawparams(&run, &base, &drawparams_path);
        eprintln!("  {}", indivq_path.display());
        eprintln!("  {}", popq_path.display());
        eprintln!("  {}", drawparams_path.display());
        eprintln!();
    }
}


fn save_indivq(run: &StructureRun, indivq_path: &Path) {
    let mut writer = create_file_writer(indivq_path);
    for record in run.presentation_order() {
        writeln!(writer, "{}", indivq_line(record)).unwrap();
    }
}


fn indivq_line(record: &IndividualRecord) -> String {
    let memberships: String = record.memberships.iter()
        .map(|q| format!(" {:.3}", q)).collect();
    format!("{:>4} {:<12} ({}) {:>4} : {}",
            record.index, record.label, record.missing, 1, memberships)
}


fn save_popq(run: &StructureRun, popq_path: &Path) {
    let mut writer = create_file_writer(popq_path);
    writeln!(writer, "{}", popq_line(run)).unwrap();
}


fn popq_line(run: &StructureRun) -> String {
    // Everything goes in a single population. Proportions are normalised by the total of all
    // membership values rather than the individual count, and the line ends with the count.
    let totals = run.cluster_totals();
    let grand_total: f64 = totals.iter().sum();
    let proportions: String = totals.iter()
        .map(|t| format!(" {:.3}", t / grand_total)).collect();
    format!("{:>4}: {} {:>6}", 1, proportions, run.n)
}


fn save_drawparams(run: &StructureRun, base: &str, drawparams_path: &Path) {
    let mut writer = create_file_writer(drawparams_path);
    write!(writer, "{}", drawparams_text(base, run.k, run.n)).unwrap();
}


fn drawparams_text(base: &str, k: usize, num_inds: usize) -> String {
    // Layout constants are distruct's own defaults; only K, the counts and the filenames change
    // from run to run.
    format!("\
#define INFILE_POPQ {base}.popq
#define INFILE_INDIVQ {base}.indivq
#define INFILE_LABEL_BELOW {base}.names
#define INFILE_LABEL_ATOP {base}.languages
#define INFILE_CLUST_PERM {base}.perm
#define OUTFILE {base}.ps

#define K {k}
#define NUMPOPS 1
#define NUMINDS {num_inds}

#define PRINT_INDIVS 1
#define PRINT_LABEL_ATOP 0
#define PRINT_LABEL_BELOW 0
#define PRINT_SEP 1

#define FONTHEIGHT 6
#define DIST_ABOVE 5
#define DIST_BELOW -7
#define BOXHEIGHT 36
#define INDIVWIDTH 1.5

#define ORIENTATION 0
#define XORIGIN 72
#define YORIGIN 288
#define XSCALE 1
#define YSCALE 1
#define ANGLE_LABEL_ATOP 60
#define ANGLE_LABEL_BELOW 60
#define LINEWIDTH_RIM 3
#define LINEWIDTH_SEP 1
#define LINEWIDTH_IND 3
#define GRAYSCALE 0
#define ECHO_DATA 1
#define REPRINT_DATA 1
#define PRINT_INFILE_NAME 0
#define PRINT_COLOR_BREWER 1
")
}


fn finished_message(out_dir: &Path) {
    section_header("Finished!");
    eprintln!("Directory with distruct input files: {}", out_dir.display());
    eprintln!();
}
