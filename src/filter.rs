// This file contains the code for the radstruct filter subcommand.

// Copyright 2025 Ryan Wick (rrwick@gmail.com)
// https://github.com/rrwick/Radstruct

// This file is part of Radstruct. Radstruct is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Radstruct
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Radstruct. If not, see <http://www.gnu.org/licenses/>.

use std::path::{Path, PathBuf};

use crate::log::{section_header, explanation};
use crate::metrics::{FilterIterationMetrics, FilterMetrics};
use crate::misc::{check_if_dir_is_not_dir, check_if_file_exists, create_dir, format_float,
                  format_float_sigfigs, quit_with_error, write_two_column_table};
use crate::vcf::{VcfFile, vcf_stem};


pub fn filter(in_vcf: PathBuf, out_dir: PathBuf, sample_call_rate: f64, variant_call_rate: f64,
              min_maf: f64, strict_call_rate: f64) {
    let cutoffs = Cutoffs { sample_call_rate, variant_call_rate, min_maf, strict_call_rate };
    check_settings(&in_vcf, &out_dir, &cutoffs);
    create_dir(&out_dir);
    starting_message();
    print_settings(&in_vcf, &out_dir, &cutoffs);
    let vcf = load_vcf(&in_vcf);
    let outcome = run_filter(&vcf, &cutoffs, &out_dir);
    let out_vcf = save_filtered_vcf(&vcf, &outcome, &in_vcf, &out_dir);
    save_metrics(&vcf, &outcome, &out_dir);
    finished_message(&out_vcf);
}


pub struct Cutoffs {
    pub sample_call_rate: f64,
    pub variant_call_rate: f64,
    pub min_maf: f64,
    pub strict_call_rate: f64,
}

impl Cutoffs {
    fn call_rate_cutoffs(&self, iteration: u32) -> (f64, f64) {
        // Two-phase schedule: the first pass runs at the caller's cutoffs to clear out obvious
        // failures, and every later pass uses the strict cutoff for both samples and variants.
        if iteration == 0 {
            (self.sample_call_rate, self.variant_call_rate)
        } else {
            (self.strict_call_rate, self.strict_call_rate)
        }
    }
}


pub struct FilterOutcome {
    pub kept_samples: Vec<usize>,
    pub kept_variants: Vec<usize>,
    pub iterations: Vec<FilterIterationMetrics>,
}


fn check_settings(in_vcf: &Path, out_dir: &Path, cutoffs: &Cutoffs) {
    check_if_file_exists(in_vcf);
    check_if_dir_is_not_dir(out_dir);
    check_cutoff(cutoffs.sample_call_rate, "--sample_call_rate");
    check_cutoff(cutoffs.variant_call_rate, "--variant_call_rate");
    check_cutoff(cutoffs.min_maf, "--min_maf");
    check_cutoff(cutoffs.strict_call_rate, "--strict_call_rate");
}


fn check_cutoff(value: f64, name: &str) {
    if !(0.0..=1.0).contains(&value) {
        quit_with_error(&format!("{} must be between 0 and 1", name));
    }
}


fn starting_message() {
    section_header("Starting radstruct filter");
    explanation("This command removes low-call-rate samples and low-call-rate/low-MAF variants \
                 from a VCF in alternating passes until neither list changes, then saves the \
                 surviving matrix with its INFO statistics recomputed.");
}


fn print_settings(in_vcf: &Path, out_dir: &Path, cutoffs: &Cutoffs) {
    eprintln!("Settings:");
    eprintln!("  --in_vcf {}", in_vcf.display());
    eprintln!("  --out_dir {}", out_dir.display());
    eprintln!("  --sample_call_rate {}", format_float(cutoffs.sample_call_rate));
    eprintln!("  --variant_call_rate {}", format_float(cutoffs.variant_call_rate));
    eprintln!("  --min_maf {}", format_float(cutoffs.min_maf));
    eprintln!("  --strict_call_rate {}", format_float(cutoffs.strict_call_rate));
    eprintln!();
}


fn load_vcf(in_vcf: &Path) -> VcfFile {
    section_header("Loading VCF");
    explanation("The full genotype matrix is now loaded into memory.");
    let vcf = VcfFile::load(in_vcf);
    if vcf.variants.is_empty() {
        quit_with_error(&format!("{} contains no variants", in_vcf.display()));
    }
    vcf.print_basic_info();
    vcf
}


pub fn run_filter(vcf: &VcfFile, cutoffs: &Cutoffs, out_dir: &Path) -> FilterOutcome {
    // The fixed-point loop. Each iteration filters samples, then filters variants against the
    // already-updated sample list. Convergence compares list membership, not just lengths.
    section_header("Filtering genotype matrix");
    explanation("Call rates and minor allele frequencies are recomputed each iteration over the \
                 surviving rows and columns, and each iteration's values are dumped to \
                 per-iteration tables for plotting.");
    let mut kept_samples = vcf.all_samples();
    let mut kept_variants = vcf.all_variants();
    let mut iterations = Vec::new();
    let mut iteration = 0u32;
    loop {
        let (sample_cutoff, variant_cutoff) = cutoffs.call_rate_cutoffs(iteration);
        let new_samples = sample_pass(vcf, &kept_samples, &kept_variants, sample_cutoff,
                                      iteration, out_dir);
        let new_variants = variant_pass(vcf, &new_samples, &kept_variants, variant_cutoff,
                                        cutoffs.min_maf, iteration, out_dir);
        let ts_tv_ratio = vcf.ts_tv_ratio(&new_variants);
        eprintln!("Iteration {}: {} samples, {} variants, ts/tv {}",
                  iteration, new_samples.len(), new_variants.len(),
                  format_float_sigfigs(ts_tv_ratio, 3));
        iterations.push(FilterIterationMetrics {
            iteration,
            sample_call_rate_cutoff: sample_cutoff,
            variant_call_rate_cutoff: variant_cutoff,
            kept_sample_count: new_samples.len() as u32,
            kept_variant_count: new_variants.len() as u32,
            ts_tv_ratio,
        });
        let converged = new_samples == kept_samples && new_variants == kept_variants;
        kept_samples = new_samples;
        kept_variants = new_variants;
        if converged {
            break;
        }
        iteration += 1;
    }
    eprintln!();
    FilterOutcome { kept_samples, kept_variants, iterations }
}


fn sample_pass(vcf: &VcfFile, kept_samples: &[usize], kept_variants: &[usize], cutoff: f64,
               iteration: u32, out_dir: &Path) -> Vec<usize> {
    let rates: Vec<(usize, f64)> = kept_samples.iter()
        .map(|&s| (s, vcf.sample_call_rate(s, kept_variants))).collect();
    let table: Vec<(String, f64)> = rates.iter()
        .map(|&(s, rate)| (vcf.sample_names[s].clone(), rate)).collect();
    write_two_column_table(&out_dir.join(format!("sample_call_rate_iter_{}.txt", iteration)),
                           &table);
    rates.into_iter().filter(|&(_, rate)| rate >= cutoff).map(|(s, _)| s).collect()
}


fn variant_pass(vcf: &VcfFile, kept_samples: &[usize], kept_variants: &[usize],
                call_rate_cutoff: f64, min_maf: f64, iteration: u32,
                out_dir: &Path) -> Vec<usize> {
    let call_rates: Vec<(usize, f64)> = kept_variants.iter()
        .map(|&v| (v, vcf.variants[v].call_rate(kept_samples))).collect();
    let mafs: Vec<(usize, f64)> = kept_variants.iter()
        .map(|&v| (v, vcf.variants[v].minor_allele_frequency(kept_samples))).collect();
    write_two_column_table(&out_dir.join(format!("snp_call_rate_iter_{}.txt", iteration)),
                           &variant_table(vcf, &call_rates));
    write_two_column_table(&out_dir.join(format!("maf_iter_{}.txt", iteration)),
                           &variant_table(vcf, &mafs));
    call_rates.iter().zip(mafs.iter())
        .filter(|&(&(_, rate), &(_, maf))| rate >= call_rate_cutoff && maf >= min_maf)
        .map(|(&(v, _), _)| v).collect()
}


fn variant_table(vcf: &VcfFile, values: &[(usize, f64)]) -> Vec<(String, f64)> {
    values.iter().map(|&(v, value)| (vcf.variants[v].id.clone(), value)).collect()
}


fn save_filtered_vcf(vcf: &VcfFile, outcome: &FilterOutcome, in_vcf: &Path,
                     out_dir: &Path) -> PathBuf {
    section_header("Saving filtered VCF");
    explanation("The surviving samples and variants are saved as a new VCF with NS, DP, AD and \
                 AF recomputed from the retained genotypes.");
    let out_vcf = out_dir.join(format!("{}.filtered.vcf", vcf_stem(in_vcf)));
    vcf.save_subset(&out_vcf, &outcome.kept_samples, &outcome.kept_variants).unwrap();
    eprintln!("{} of {} samples kept",
              outcome.kept_samples.len(), vcf.sample_names.len());
    eprintln!("{} of {} variants kept",
              outcome.kept_variants.len(), vcf.variants.len());
    eprintln!();
    out_vcf
}


fn save_metrics(vcf: &VcfFile, outcome: &FilterOutcome, out_dir: &Path) {
    let mut metrics = FilterMetrics::new();
    metrics.input_sample_count = vcf.sample_names.len() as u32;
    metrics.input_variant_count = vcf.variants.len() as u32;
    metrics.output_sample_count = outcome.kept_samples.len() as u32;
    metrics.output_variant_count = outcome.kept_variants.len() as u32;
    metrics.iteration_count = outcome.iterations.len() as u32;
    metrics.ts_tv_ratio = outcome.iterations.last().map_or(f64::NAN, |i| i.ts_tv_ratio);
    metrics.iterations = outcome.iterations.clone();
    metrics.save_to_yaml(&out_dir.join("filter.yaml"));
}


fn finished_message(out_vcf: &Path) {
    section_header("Finished!");
    eprintln!("Filtered VCF: {}", out_vcf.display());
    eprintln!();
}
