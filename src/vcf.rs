// This file contains Radstruct's in-memory representation of a VCF genotype matrix, along with
// the code for loading it from file and for saving a filtered subset back to file.

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
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use crate::misc::{create_file_writer, format_float, format_float_sigfigs, quit_with_error,
                  spinner, text_file_reader};


pub const GENOTYPE_FORMAT: &str = "GT:DP:AD:GQ:GL";

// Zero likelihoods have no finite Phred-scaled value, so they are capped at this when saving.
const MAX_PHRED_LIKELIHOOD: i64 = 9999;


#[derive(Debug, Clone, PartialEq)]
pub enum Genotype {
    Missing,
    Called { gt: u8, dp: i32, ad: i32, gq: i32, gl: [f64; 3] },
}

impl Genotype {
    pub fn from_field(field: &str, filename: &Path, line_num: usize) -> Genotype {
        // Parses one per-sample GT:DP:AD:GQ:GL field. A missing call (./.) makes the entire
        // genotype missing, whatever the other subfields hold.
        let parts: Vec<&str> = field.split(':').collect();
        if parts[0] == "./." {
            return Genotype::Missing;
        }
        let gt = match parts[0] {
            "0/0" => 0,
            "0/1" => 1,
            "1/1" => 2,
            _ => malformed(filename, line_num,
                           &format!("unrecognised genotype call '{}'", parts[0])),
        };
        if parts.len() != 5 {
            malformed(filename, line_num,
                      &format!("genotype field '{}' does not match {}", field, GENOTYPE_FORMAT));
        }
        let dp = parse_subfield(parts[1], "DP", filename, line_num);
        let ad = parse_subfield(parts[2], "AD", filename, line_num);
        let gq = parse_subfield(parts[3], "GQ", filename, line_num);
        let gl_parts: Vec<&str> = parts[4].split(',').collect();
        if gl_parts.len() != 3 {
            malformed(filename, line_num,
                      &format!("GL subfield '{}' does not contain three values", parts[4]));
        }
        let mut gl = [0.0; 3];
        for (i, gl_part) in gl_parts.iter().enumerate() {
            gl[i] = gl_part.parse::<f64>().unwrap_or_else(|_| {
                malformed(filename, line_num,
                          &format!("cannot parse '{}' as a genotype likelihood", gl_part))
            });
        }
        Genotype::Called { gt, dp, ad, gq, gl }
    }

    pub fn is_called(&self) -> bool {
        matches!(self, Genotype::Called { .. })
    }

    pub fn dosage(&self) -> Option<u8> {
        // The number of alternate alleles in the call (0, 1 or 2), if the call isn't missing.
        match self {
            Genotype::Missing => None,
            Genotype::Called { gt, .. } => Some(*gt),
        }
    }

    fn format_field(&self) -> String {
        match self {
            Genotype::Missing => "./.".to_string(),
            Genotype::Called { gt, dp, ad, gq, gl } => {
                let gt_text = match gt { 0 => "0/0", 1 => "0/1", _ => "1/1" };
                let phred: Vec<String> = gl.iter()
                    .map(|l| phred_scaled(*l).to_string()).collect();
                format!("{}:{}:{}:{}:{}", gt_text, dp, ad, gq, phred.join(","))
            },
        }
    }
}


fn phred_scaled(likelihood: f64) -> i64 {
    if likelihood <= 0.0 {
        MAX_PHRED_LIKELIHOOD
    } else {
        (-10.0 * likelihood.log10()).round() as i64
    }
}


fn parse_subfield(text: &str, name: &str, filename: &Path, line_num: usize) -> i32 {
    text.parse::<i32>().unwrap_or_else(|_| {
        malformed(filename, line_num, &format!("cannot parse '{}' as the {} subfield", text, name))
    })
}


fn malformed(filename: &Path, line_num: usize, details: &str) -> ! {
    quit_with_error(&format!("malformed VCF: {} line {}: {}",
                             filename.display(), line_num, details));
}


#[derive(Debug, Clone)]
pub struct Variant {
    pub chrom: String,
    pub pos: u64,
    pub id: String,
    pub ref_allele: char,
    pub alt_allele: char,
    pub qual: String,
    pub filter: String,
    pub genotypes: Vec<Genotype>,
}

impl Variant {
    fn from_line(line: &str, sample_count: usize, filename: &Path, line_num: usize) -> Variant {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() != 9 + sample_count {
            malformed(filename, line_num,
                      &format!("{} columns found but {} expected",
                               parts.len(), 9 + sample_count));
        }
        let pos = parts[1].parse::<u64>().unwrap_or_else(|_| {
            malformed(filename, line_num, &format!("cannot parse '{}' as a position", parts[1]))
        });
        let ref_allele = single_base_allele(parts[3], filename, line_num);
        let alt_allele = single_base_allele(parts[4], filename, line_num);
        if parts[8] != GENOTYPE_FORMAT {
            malformed(filename, line_num,
                      &format!("FORMAT column is '{}' but only {} is supported",
                               parts[8], GENOTYPE_FORMAT));
        }
        let genotypes = parts[9..].iter()
            .map(|f| Genotype::from_field(f, filename, line_num)).collect();
        Variant { chrom: parts[0].to_string(), pos, id: parts[2].to_string(),
                  ref_allele, alt_allele,
                  qual: parts[5].to_string(), filter: parts[6].to_string(), genotypes }
    }

    pub fn is_transition(&self) -> bool {
        matches!((self.ref_allele, self.alt_allele),
                 ('A', 'G') | ('G', 'A') | ('C', 'T') | ('T', 'C'))
    }

    pub fn call_rate(&self, samples: &[usize]) -> f64 {
        if samples.is_empty() { return 0.0 }
        let called = samples.iter().filter(|&&s| self.genotypes[s].is_called()).count();
        called as f64 / samples.len() as f64
    }

    pub fn alt_allele_frequency(&self, samples: &[usize]) -> f64 {
        let (dosage_sum, called) = self.dosage_counts(samples);
        if called == 0 { return 0.0 }
        dosage_sum as f64 / (2.0 * called as f64)
    }

    pub fn minor_allele_frequency(&self, samples: &[usize]) -> f64 {
        // A variant with no non-missing calls among the given samples gets a MAF of zero, so it
        // always fails a positive MAF cutoff.
        let (dosage_sum, called) = self.dosage_counts(samples);
        if called == 0 { return 0.0 }
        let af = dosage_sum as f64 / (2.0 * called as f64);
        af.min(1.0 - af)
    }

    fn dosage_counts(&self, samples: &[usize]) -> (u32, u32) {
        let mut dosage_sum = 0;
        let mut called = 0;
        for &s in samples {
            if let Some(dosage) = self.genotypes[s].dosage() {
                dosage_sum += dosage as u32;
                called += 1;
            }
        }
        (dosage_sum, called)
    }
}


fn single_base_allele(text: &str, filename: &Path, line_num: usize) -> char {
    if text.len() == 1 {
        let base = text.chars().next().unwrap();
        if matches!(base, 'A' | 'C' | 'G' | 'T') {
            return base;
        }
    }
    malformed(filename, line_num, &format!("'{}' is not a single-base allele", text));
}


#[derive(Debug, Clone)]
pub struct VcfFile {
    pub filename: PathBuf,
    pub meta_lines: Vec<String>,
    pub sample_names: Vec<String>,
    pub variants: Vec<Variant>,
}

impl VcfFile {
    pub fn load(filename: &Path) -> VcfFile {
        // Reads the entire VCF into memory. Radstruct's downstream steps need the full matrix for
        // their per-sample and per-variant statistics, so no streaming here.
        let pb = spinner("loading VCF file...");
        let mut meta_lines = Vec::new();
        let mut sample_names: Option<Vec<String>> = None;
        let mut variants = Vec::new();
        for (i, line_result) in text_file_reader(filename).lines().enumerate() {
            let line_num = i + 1;
            let line = line_result.unwrap_or_else(|e| {
                quit_with_error(&format!("failed to read line from {}\n{}",
                                         filename.display(), e));
            });
            if line.is_empty() {
                continue;
            }
            if line.starts_with("#CHROM") {
                sample_names = Some(parse_header_line(&line, filename));
            } else if line.starts_with('#') {
                meta_lines.push(line);
            } else {
                match &sample_names {
                    Some(names) => variants.push(Variant::from_line(&line, names.len(),
                                                                    filename, line_num)),
                    None => malformed(filename, line_num,
                                      "data line found before the #CHROM header line"),
                }
            }
        }
        pb.finish_and_clear();
        let sample_names = sample_names.unwrap_or_else(|| {
            quit_with_error(&format!("malformed VCF: {} has no #CHROM header line",
                                     filename.display()));
        });
        VcfFile { filename: filename.to_path_buf(), meta_lines, sample_names, variants }
    }

    pub fn all_samples(&self) -> Vec<usize> {
        (0..self.sample_names.len()).collect()
    }

    pub fn all_variants(&self) -> Vec<usize> {
        (0..self.variants.len()).collect()
    }

    pub fn sample_call_rate(&self, sample: usize, variants: &[usize]) -> f64 {
        if variants.is_empty() { return 0.0 }
        let called = variants.iter()
            .filter(|&&v| self.variants[v].genotypes[sample].is_called()).count();
        called as f64 / variants.len() as f64
    }

    pub fn ts_tv_counts(&self, variants: &[usize]) -> (u32, u32) {
        let ts = variants.iter().filter(|&&v| self.variants[v].is_transition()).count() as u32;
        (ts, variants.len() as u32 - ts)
    }

    pub fn ts_tv_ratio(&self, variants: &[usize]) -> f64 {
        let (ts, tv) = self.ts_tv_counts(variants);
        ts as f64 / tv as f64
    }

    pub fn print_basic_info(&self) {
        eprintln!("{} samples, {} variants",
                  self.sample_names.len(), self.variants.len());
        eprintln!("ts/tv: {}", format_float_sigfigs(self.ts_tv_ratio(&self.all_variants()), 3));
        eprintln!();
    }

    pub fn save_subset(&self, filename: &Path, samples: &[usize],
                       variants: &[usize]) -> io::Result<()> {
        // Saves the given samples and variants as a new VCF. The INFO column is recomputed from
        // the retained genotypes (stale input values would misrepresent the subset) and genotype
        // likelihoods are saved as Phred-scaled integers.
        let mut writer = create_file_writer(filename);
        for meta_line in &self.meta_lines {
            writeln!(writer, "{}", meta_line)?;
        }
        write!(writer, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT")?;
        for &s in samples {
            write!(writer, "\t{}", self.sample_names[s])?;
        }
        writeln!(writer)?;
        for &v in variants {
            let variant = &self.variants[v];
            write!(writer, "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                   variant.chrom, variant.pos, variant.id,
                   variant.ref_allele, variant.alt_allele,
                   variant.qual, variant.filter,
                   recomputed_info(variant, samples), GENOTYPE_FORMAT)?;
            for &s in samples {
                write!(writer, "\t{}", variant.genotypes[s].format_field())?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}


pub fn vcf_stem(filename: &Path) -> String {
    // The input filename without its .vcf/.vcf.gz extension, for naming output files.
    let name = filename.file_name().unwrap_or_default().to_string_lossy();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    let name = name.strip_suffix(".vcf").unwrap_or(name);
    name.to_string()
}


fn parse_header_line(line: &str, filename: &Path) -> Vec<String> {
    let parts: Vec<&str> = line.split('\t').collect();
    if parts.len() < 10 {
        quit_with_error(&format!("malformed VCF: the #CHROM line of {} defines no sample columns",
                                 filename.display()));
    }
    let sample_names: Vec<String> = parts[9..].iter().map(|s| s.to_string()).collect();
    let mut seen = FxHashSet::default();
    for name in &sample_names {
        if !seen.insert(name) {
            quit_with_error(&format!("malformed VCF: {} has a duplicate sample name: {}",
                                     filename.display(), name));
        }
    }
    sample_names
}


fn recomputed_info(variant: &Variant, samples: &[usize]) -> String {
    let mut ns = 0;
    let mut dp_sum = 0i64;
    let mut ad_sum = 0i64;
    for &s in samples {
        if let Genotype::Called { dp, ad, .. } = variant.genotypes[s] {
            ns += 1;
            dp_sum += dp as i64;
            ad_sum += ad as i64;
        }
    }
    format!("NS={};DP={};AD={};AF={}", ns, dp_sum, ad_sum,
            format_float(variant.alt_allele_frequency(samples)))
}


#[cfg(test)]
mod tests {
    use std::panic;
    use tempfile::tempdir;
    use super::*;
    use crate::misc::load_file_lines;
    use crate::tests::{assert_almost_eq, make_test_file, make_gzipped_test_file, toy_vcf_text};

    fn load_toy_vcf() -> VcfFile {
        let temp_dir = tempdir().unwrap();
        let vcf_path = temp_dir.path().join("toy.vcf");
        make_test_file(&vcf_path, &toy_vcf_text());
        VcfFile::load(&vcf_path)
    }

    #[test]
    fn test_load_toy_vcf() {
        let vcf = load_toy_vcf();
        assert_eq!(vcf.sample_names, vec!["sample_1", "sample_2", "sample_3", "sample_4"]);
        assert_eq!(vcf.variants.len(), 5);
        assert_eq!(vcf.variants[0].id, "snp_a");
        assert_eq!(vcf.variants[0].pos, 101);
        assert!(vcf.variants[0].genotypes[0].is_called());
        assert!(!vcf.variants[0].genotypes[2].is_called());
        assert_eq!(vcf.variants[4].genotypes[1].dosage(), Some(2));
    }

    #[test]
    fn test_load_gzipped_vcf() {
        let temp_dir = tempdir().unwrap();
        let vcf_path = temp_dir.path().join("toy.vcf.gz");
        make_gzipped_test_file(&vcf_path, &toy_vcf_text());
        let vcf = VcfFile::load(&vcf_path);
        assert_eq!(vcf.sample_names.len(), 4);
        assert_eq!(vcf.variants.len(), 5);
    }

    #[test]
    fn test_transitions() {
        let vcf = load_toy_vcf();
        let transitions: Vec<bool> = vcf.variants.iter().map(|v| v.is_transition()).collect();
        assert_eq!(transitions, vec![true, true, false, false, true]);
        assert_eq!(vcf.ts_tv_counts(&vcf.all_variants()), (3, 2));
        assert_eq!(vcf.ts_tv_counts(&[0, 1, 4]), (3, 0));
    }

    #[test]
    fn test_call_rates() {
        let vcf = load_toy_vcf();
        let all_variants = vcf.all_variants();
        assert_almost_eq(vcf.sample_call_rate(0, &all_variants), 1.0, 1e-9);
        assert_almost_eq(vcf.sample_call_rate(2, &all_variants), 0.4, 1e-9);
        assert_almost_eq(vcf.sample_call_rate(3, &all_variants), 0.4, 1e-9);
        assert_almost_eq(vcf.variants[0].call_rate(&[0, 1]), 1.0, 1e-9);
        assert_almost_eq(vcf.variants[0].call_rate(&[0, 1, 2, 3]), 0.5, 1e-9);
        assert_eq!(vcf.variants[0].call_rate(&[]), 0.0);
    }

    #[test]
    fn test_minor_allele_frequency() {
        let vcf = load_toy_vcf();
        assert_almost_eq(vcf.variants[0].minor_allele_frequency(&[0, 1]), 0.25, 1e-9);
        assert_almost_eq(vcf.variants[2].minor_allele_frequency(&[0, 1]), 0.5, 1e-9);
        assert_almost_eq(vcf.variants[3].minor_allele_frequency(&[0, 1]), 0.0, 1e-9);

        // The alternate allele frequency of variant 5 over samples 1 and 2 is 0.75, so the minor
        // allele frequency reflects back to 0.25.
        assert_almost_eq(vcf.variants[4].alt_allele_frequency(&[0, 1]), 0.75, 1e-9);
        assert_almost_eq(vcf.variants[4].minor_allele_frequency(&[0, 1]), 0.25, 1e-9);

        // Samples 3 and 4 have no calls at variant 1, so its MAF over them is zero.
        assert_eq!(vcf.variants[0].minor_allele_frequency(&[2, 3]), 0.0);
    }

    #[test]
    fn test_genotype_field_parsing() {
        let path = PathBuf::from("test.vcf");
        assert_eq!(Genotype::from_field("./.", &path, 1), Genotype::Missing);
        assert_eq!(Genotype::from_field("./.:-1:-1:-1:-1,-1,-1", &path, 1), Genotype::Missing);
        let genotype = Genotype::from_field("0/1:12:6:99:0.02,0.95,0.03", &path, 1);
        match genotype {
            Genotype::Called { gt, dp, ad, gq, gl } => {
                assert_eq!((gt, dp, ad, gq), (1, 12, 6, 99));
                assert_almost_eq(gl[1], 0.95, 1e-9);
            },
            Genotype::Missing => panic!("expected a called genotype"),
        }
        assert!(panic::catch_unwind(|| Genotype::from_field("2/2:1:1:1:1,1,1",
                                                            &path, 1)).is_err());
        assert!(panic::catch_unwind(|| Genotype::from_field("0/1:12:6:99",
                                                            &path, 1)).is_err());
        assert!(panic::catch_unwind(|| Genotype::from_field("0/1:12:6:99:0.1,abc,0.1",
                                                            &path, 1)).is_err());
    }

    #[test]
    fn test_vcf_stem() {
        assert_eq!(vcf_stem(Path::new("dir/toy.vcf")), "toy");
        assert_eq!(vcf_stem(Path::new("dir/toy.vcf.gz")), "toy");
        assert_eq!(vcf_stem(Path::new("toy")), "toy");
    }

    #[test]
    fn test_phred_scaled() {
        assert_eq!(phred_scaled(1.0), 0);
        assert_eq!(phred_scaled(0.95), 0);
        assert_eq!(phred_scaled(0.02), 17);
        assert_eq!(phred_scaled(0.03), 15);
        assert_eq!(phred_scaled(0.0), MAX_PHRED_LIKELIHOOD);
    }

    #[test]
    fn test_malformed_vcfs() {
        let temp_dir = tempdir().unwrap();
        let vcf_path = temp_dir.path().join("bad.vcf");

        make_test_file(&vcf_path, "##fileformat=VCFv4.2\n");
        assert!(panic::catch_unwind(|| VcfFile::load(&vcf_path)).is_err());

        make_test_file(&vcf_path, "##fileformat=VCFv4.2\n\
                                   #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\n");
        assert!(panic::catch_unwind(|| VcfFile::load(&vcf_path)).is_err());

        make_test_file(&vcf_path, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t\
                                   s1\ts1\n");
        assert!(panic::catch_unwind(|| VcfFile::load(&vcf_path)).is_err());

        make_test_file(&vcf_path,
                       "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\n\
                        chr1\t100\tv1\tA\tG\t50\tPASS\t.\tGT:DP:AD:GQ:GL\n");
        assert!(panic::catch_unwind(|| VcfFile::load(&vcf_path)).is_err());

        make_test_file(&vcf_path,
                       "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ts1\n\
                        chr1\t100\tv1\tAT\tG\t50\tPASS\t.\tGT:DP:AD:GQ:GL\t0/0:9:0:99:1,0,0\n");
        assert!(panic::catch_unwind(|| VcfFile::load(&vcf_path)).is_err());

        make_test_file(&vcf_path,
                       "chr1\t100\tv1\tA\tG\t50\tPASS\t.\tGT:DP:AD:GQ:GL\t0/0:9:0:99:1,0,0\n");
        assert!(panic::catch_unwind(|| VcfFile::load(&vcf_path)).is_err());
    }

    #[test]
    fn test_save_subset() {
        let temp_dir = tempdir().unwrap();
        let vcf_path = temp_dir.path().join("toy.vcf");
        let out_path = temp_dir.path().join("subset.vcf");
        make_test_file(&vcf_path, &toy_vcf_text());
        let vcf = VcfFile::load(&vcf_path);
        vcf.save_subset(&out_path, &[0, 1], &[0, 1, 2, 4]).unwrap();

        let lines = load_file_lines(&out_path);
        assert!(lines[0].starts_with("##"));
        let header: Vec<&str> = lines.iter().find(|l| l.starts_with("#CHROM")).unwrap()
            .split('\t').collect();
        assert_eq!(&header[9..], &["sample_1", "sample_2"]);
        let data: Vec<&String> = lines.iter().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(data.len(), 4);

        // Variant 1 keeps one het and one hom-ref call over the two samples, so NS=2 and AF=0.25.
        let fields: Vec<&str> = data[0].split('\t').collect();
        assert_eq!(fields[7], "NS=2;DP=21;AD=6;AF=0.25");
        assert!(fields[9].starts_with("0/1:"));

        // Likelihoods come back Phred-scaled.
        assert_eq!(fields[9], "0/1:12:6:99:17,0,15");

        // The subset parses cleanly on reload.
        let reloaded = VcfFile::load(&out_path);
        assert_eq!(reloaded.sample_names.len(), 2);
        assert_eq!(reloaded.variants.len(), 4);
    }
}
