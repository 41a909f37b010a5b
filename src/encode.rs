// This file contains the code for the radstruct encode subcommand.

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
use crate::metrics::EncodeMetrics;
use crate::misc::{check_if_dir_is_not_dir, check_if_file_exists, create_dir, create_file_writer};
use crate::vcf::{Genotype, VcfFile, vcf_stem};


pub fn encode(in_vcf: PathBuf, out_dir: PathBuf, name: Option<String>) {
    let name = name.unwrap_or_else(|| vcf_stem(&in_vcf));
    check_settings(&in_vcf, &out_dir);
    create_dir(&out_dir);
    starting_message();
    print_settings(&in_vcf, &out_dir, &name);
    let vcf = load_vcf(&in_vcf);
    let structure_path = save_structure_file(&vcf, &out_dir, &name);
    save_parameter_files(&vcf, &out_dir, &name);
    save_metrics(&vcf, &out_dir);
    finished_message(&structure_path);
}


fn check_settings(in_vcf: &Path, out_dir: &Path) {
    check_if_file_exists(in_vcf);
    check_if_dir_is_not_dir(out_dir);
}


fn starting_message() {
    section_header("Starting radstruct encode");
    explanation("This command encodes a VCF genotype matrix in the input format of the STRUCTURE \
                 program (one locus per column, two rows per individual) and writes matching \
                 mainparams and extraparams files.");
}


fn print_settings(in_vcf: &Path, out_dir: &Path, name: &str) {
    eprintln!("Settings:");
    eprintln!("  --in_vcf {}", in_vcf.display());
    eprintln!("  --out_dir {}", out_dir.display());
    eprintln!("  --name {}", name);
    eprintln!();
}


fn load_vcf(in_vcf: &Path) -> VcfFile {
    section_header("Loading VCF");
    explanation("The full genotype matrix is now loaded into memory.");
    let vcf = VcfFile::load(in_vcf);
    vcf.print_basic_info();
    vcf
}


pub fn allele_rows(genotype: &Genotype) -> [i32; 2] {
    // STRUCTURE represents a diploid call as two single-allele rows, with -9 as its missing-data
    // value. Heterozygous calls put the reference allele in the first row.
    match genotype.dosage() {
        None => [-9, -9],
        Some(0) => [0, 0],
        Some(1) => [0, 1],
        Some(_) => [1, 1],
    }
}


fn save_structure_file(vcf: &VcfFile, out_dir: &Path, name: &str) -> PathBuf {
    section_header("Writing STRUCTURE input");
    explanation("Each individual becomes two rows in the STRUCTURE matrix, one per allele.");
    let structure_path = out_dir.join(format!("{}.structure", name));
    let mut writer = create_file_writer(&structure_path);
    let header: String = (0..vcf.variants.len()).map(|i| format!("\tsnp_{}", i)).collect();
    writeln!(writer, "{}", header).unwrap();
    for (s, sample_name) in vcf.sample_names.iter().enumerate() {
        for row in 0..2 {
            write!(writer, "{}", sample_name).unwrap();
            for variant in &vcf.variants {
                write!(writer, "\t{}", allele_rows(&variant.genotypes[s])[row]).unwrap();
            }
            writeln!(writer).unwrap();
        }
    }
    eprintln!("{}", structure_path.display());
    eprintln!();
    structure_path
}


fn save_parameter_files(vcf: &VcfFile, out_dir: &Path, name: &str) {
    section_header("Writing STRUCTURE parameter files");
    explanation("NUMINDS and NUMLOCI are filled in from the encoded matrix. The remaining \
                 parameters are the usual defaults and can be overridden on the STRUCTURE \
                 command line.");
    let mainparams_path = out_dir.join("mainparams");
    let extraparams_path = out_dir.join("extraparams");
    let mut writer = create_file_writer(&mainparams_path);
    write!(writer, "{}", mainparams_text(name, vcf.sample_names.len(),
                                         vcf.variants.len())).unwrap();
    let mut writer = create_file_writer(&extraparams_path);
    write!(writer, "{}", extraparams_text()).unwrap();
    eprintln!("{}", mainparams_path.display());
    eprintln!("{}", extraparams_path.display());
    eprintln!();
}


fn save_metrics(vcf: &VcfFile, out_dir: &Path) {
    let mut metrics = EncodeMetrics::new();
    metrics.encoded_sample_count = vcf.sample_names.len() as u32;
    metrics.encoded_locus_count = vcf.variants.len() as u32;
    metrics.save_to_yaml(&out_dir.join("encode.yaml"));
}


fn finished_message(structure_path: &Path) {
    section_header("Finished!");
    eprintln!("STRUCTURE input matrix: {}", structure_path.display());
    eprintln!();
}


fn mainparams_text(name: &str, num_inds: usize, num_loci: usize) -> String {
    format!("\
#define INFILE {name}.structure
#define OUTFILE {name}_structure_results
#define NUMINDS {num_inds}
#define NUMLOCI {num_loci}
#define MAXPOPS 2
#define BURNIN 10000
#define NUMREPS 20000

#define PLOIDY 2
#define MISSING -9
#define ONEROWPERIND 0

#define LABEL 1
#define POPDATA 0
#define POPFLAG 0
#define LOCDATA 0
#define PHENOTYPE 0
#define EXTRACOLS 0
#define MARKERNAMES 1
#define RECESSIVEALLELES 0
#define MAPDISTANCES 0

#define PHASED 0
#define PHASEINFO 0
#define MARKOVPHASE 0
#define NOTAMBIGUOUS -999
")
}


fn extraparams_text() -> &'static str {
    "\
#define NOADMIX 0
#define LINKAGE 0
#define USEPOPINFO 0
#define LOCPRIOR 0
#define FREQSCORR 1
#define ONEFST 0
#define INFERALPHA 1
#define POPALPHAS 0
#define ALPHA 1.0
#define INFERLAMBDA 0
#define POPSPECIFICLAMBDA 0
#define LAMBDA 1.0

#define FPRIORMEAN 0.01
#define FPRIORSD 0.05
#define UNIFPRIORALPHA 1
#define ALPHAMAX 10.0
#define ALPHAPRIORA 1.0
#define ALPHAPRIORB 2.0
#define ALPHAPROPSD 0.025

#define STARTATPOPINFO 0
#define RANDOMIZE 1
#define SEED 2245
#define METROFREQ 10
#define REPORTHITRATE 0
#define COMPUTEPROB 1
#define ADMBURNIN 500
#define UPDATEFREQ 100
"
}


#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use super::*;
    use crate::misc::load_file_lines;
    use crate::tests::{make_test_file, toy_vcf_text};

    fn genotype_class(rows: [i32; 2]) -> i32 {
        // Reads a pair of allele rows back into a genotype class, for round-trip checks.
        match rows {
            [-9, -9] => -1,
            [0, 0] => 0,
            [0, 1] | [1, 0] => 1,
            [1, 1] => 2,
            _ => panic!("not a valid allele-row pair: {:?}", rows),
        }
    }

    #[test]
    fn test_allele_rows_round_trip() {
        let missing = Genotype::Missing;
        let hom_ref = Genotype::Called { gt: 0, dp: 1, ad: 0, gq: 1, gl: [1.0, 0.0, 0.0] };
        let het     = Genotype::Called { gt: 1, dp: 1, ad: 1, gq: 1, gl: [0.0, 1.0, 0.0] };
        let hom_alt = Genotype::Called { gt: 2, dp: 1, ad: 2, gq: 1, gl: [0.0, 0.0, 1.0] };
        assert_eq!(allele_rows(&missing), [-9, -9]);
        assert_eq!(genotype_class(allele_rows(&missing)), -1);
        assert_eq!(genotype_class(allele_rows(&hom_ref)), 0);
        assert_eq!(genotype_class(allele_rows(&het)), 1);
        assert_eq!(genotype_class(allele_rows(&hom_alt)), 2);

        // One row of a het call must carry each allele, in either order.
        let het_rows = allele_rows(&het);
        assert_eq!(het_rows[0] + het_rows[1], 1);
    }

    #[test]
    fn test_encode_files() {
        let temp_dir = tempdir().unwrap();
        let vcf_path = temp_dir.path().join("toy.vcf");
        let out_dir = temp_dir.path().join("encoded");
        make_test_file(&vcf_path, &toy_vcf_text());
        encode(vcf_path, out_dir.clone(), None);

        let structure_lines = load_file_lines(&out_dir.join("toy.structure"));
        assert_eq!(structure_lines.len(), 9);  // locus header plus two rows per sample
        assert_eq!(structure_lines[0], "\tsnp_0\tsnp_1\tsnp_2\tsnp_3\tsnp_4");

        // sample_1 is het/hom-ref/het/hom-ref/het across the five variants.
        assert_eq!(structure_lines[1], "sample_1\t0\t0\t0\t0\t0");
        assert_eq!(structure_lines[2], "sample_1\t1\t0\t1\t0\t1");

        // sample_3 is missing at variants 1, 3 and 4.
        assert_eq!(structure_lines[5], "sample_3\t-9\t0\t-9\t-9\t0");
        assert_eq!(structure_lines[6], "sample_3\t-9\t0\t-9\t-9\t0");

        let mainparams = load_file_lines(&out_dir.join("mainparams"));
        assert!(mainparams.contains(&"#define INFILE toy.structure".to_string()));
        assert!(mainparams.contains(&"#define NUMINDS 4".to_string()));
        assert!(mainparams.contains(&"#define NUMLOCI 5".to_string()));
        assert!(mainparams.contains(&"#define ONEROWPERIND 0".to_string()));

        let extraparams = load_file_lines(&out_dir.join("extraparams"));
        assert!(extraparams.contains(&"#define NOADMIX 0".to_string()));
    }

    #[test]
    fn test_encode_no_variants() {
        // A VCF with no data lines still encodes, just to an empty matrix.
        let temp_dir = tempdir().unwrap();
        let vcf_path = temp_dir.path().join("empty.vcf");
        let out_dir = temp_dir.path().join("encoded");
        make_test_file(&vcf_path, "##fileformat=VCFv4.2\n\
                                   #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\t\
                                   s1\ts2\n");
        encode(vcf_path, out_dir.clone(), Some("empty".to_string()));
        let structure_lines = load_file_lines(&out_dir.join("empty.structure"));
        assert_eq!(structure_lines, vec!["", "s1", "s1", "s2", "s2"]);
        let mainparams = load_file_lines(&out_dir.join("mainparams"));
        assert!(mainparams.contains(&"#define NUMLOCI 0".to_string()));
    }
}
