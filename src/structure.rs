// This file contains Radstruct's parser for the result files written by the STRUCTURE program,
// along with the cluster-membership queries used when exporting distruct input.

// Copyright 2025 Ryan Wick (rrwick@gmail.com)
// https://github.com/rrwick/Radstruct

// This file is part of Radstruct. Radstruct is free software: you can redistribute it and/or
// modify it under the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later version. Radstruct
// is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the
// implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details. You should have received a copy of the GNU General Public
// License along with Radstruct. If not, see <http://www.gnu.org/licenses/>.

use regex::Regex;
use std::path::Path;

use crate::misc::{load_file_lines, quit_with_error};


#[derive(Debug, Clone, PartialEq)]
pub struct IndividualRecord {
    pub index: u32,
    pub label: String,
    pub missing: u32,
    pub memberships: Vec<f64>,
}

impl IndividualRecord {
    fn from_line(line: &str, k: usize, filename: &Path, line_num: usize) -> IndividualRecord {
        // STRUCTURE's inferred-ancestry lines look like:
        //   1 ind_a    (0)    1 :  0.900 0.100
        // where the population column before the colon only appears when the input had one.
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let colon = tokens.iter().position(|t| *t == ":").unwrap_or_else(|| {
            malformed_line(filename, line_num, "individual record has no ':' separator");
        });
        if colon < 3 {
            malformed_line(filename, line_num, "individual record has too few columns");
        }
        let index = tokens[0].parse::<u32>().unwrap_or_else(|_| {
            malformed_line(filename, line_num,
                           &format!("cannot parse '{}' as an individual index", tokens[0]));
        });
        let label = tokens[1].to_string();
        let missing = tokens[2].strip_prefix('(').and_then(|t| t.strip_suffix(')'))
            .and_then(|t| t.parse::<u32>().ok()).unwrap_or_else(|| {
                malformed_line(filename, line_num,
                               &format!("cannot parse '{}' as a missing-data count", tokens[2]));
            });
        let memberships: Vec<f64> = tokens[colon + 1..].iter().map(|t| {
            let value = t.parse::<f64>().unwrap_or_else(|_| {
                malformed_line(filename, line_num,
                               &format!("cannot parse '{}' as a cluster membership", t));
            });
            if !value.is_finite() {
                malformed_line(filename, line_num,
                               &format!("'{}' is not a finite cluster membership", t));
            }
            value
        }).collect();
        if memberships.len() != k {
            malformed_line(filename, line_num,
                           &format!("{} cluster memberships found but {} expected",
                                    memberships.len(), k));
        }
        IndividualRecord { index, label, missing, memberships }
    }
}


#[derive(Debug, Clone)]
pub struct StructureRun {
    pub k: usize,
    pub n: usize,
    pub individuals: Vec<IndividualRecord>,
}

impl StructureRun {
    pub fn from_file(filename: &Path) -> StructureRun {
        let lines = load_file_lines(filename);
        StructureRun::from_lines(&lines, filename)
    }

    pub fn from_lines(lines: &[String], filename: &Path) -> StructureRun {
        // Scans for the three anchor lines STRUCTURE always prints ("N individuals",
        // "K populations assumed" and the "Inferred clusters" column header), then reads exactly
        // n record lines. If a file holds multiple concatenated runs, the last one wins.
        let individuals_re = Regex::new(r"(\d+) individuals").unwrap();
        let populations_re = Regex::new(r"(\d+) populations assumed").unwrap();
        let mut n: Option<usize> = None;
        let mut k: Option<usize> = None;
        let mut run: Option<StructureRun> = None;
        for (i, line) in lines.iter().enumerate() {
            if let Some(captures) = individuals_re.captures(line) {
                n = captures[1].parse().ok();
            } else if let Some(captures) = populations_re.captures(line) {
                k = captures[1].parse().ok();
            } else if line.trim_end().ends_with("Inferred clusters") {
                run = Some(StructureRun::read_cluster_block(lines, i, n, k, filename));
            }
        }
        run.unwrap_or_else(|| {
            malformed(filename, "no 'Inferred clusters' block found");
        })
    }

    fn read_cluster_block(lines: &[String], header_index: usize, n: Option<usize>,
                          k: Option<usize>, filename: &Path) -> StructureRun {
        let n = n.unwrap_or_else(|| {
            malformed(filename, "no individual count found before the inferred-clusters block");
        });
        let k = k.unwrap_or_else(|| {
            malformed(filename, "no assumed population count found before the \
                                 inferred-clusters block");
        });
        if n == 0 || k == 0 {
            malformed(filename, "individual and population counts must be at least 1");
        }
        let mut individuals = Vec::with_capacity(n);
        for j in 0..n {
            let line_index = header_index + 1 + j;
            let line = lines.get(line_index).unwrap_or_else(|| {
                malformed(filename, &format!("{} individual records expected but only {} found",
                                             n, j));
            });
            individuals.push(IndividualRecord::from_line(line, k, filename, line_index + 1));
        }
        StructureRun { k, n, individuals }
    }

    pub fn cluster_totals(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.k];
        for record in &self.individuals {
            for (c, membership) in record.memberships.iter().enumerate() {
                totals[c] += membership;
            }
        }
        totals
    }

    pub fn dominant_cluster(&self) -> usize {
        // The cluster with the largest column-wise membership total (ties go to the first).
        let totals = self.cluster_totals();
        let mut best = 0;
        for (c, total) in totals.iter().enumerate() {
            if *total > totals[best] {
                best = c;
            }
        }
        best
    }

    pub fn presentation_order(&self) -> Vec<&IndividualRecord> {
        // Individuals ordered by descending membership in the dominant cluster, so bar plots of
        // the run read cleanly. The parsed records themselves stay in file order; this is only a
        // view. Reconciling cluster labels across replicate runs is CLUMPP's job, not ours.
        let dominant = self.dominant_cluster();
        let mut ordered: Vec<&IndividualRecord> = self.individuals.iter().collect();
        ordered.sort_by(|a, b| b.memberships[dominant].total_cmp(&a.memberships[dominant]));
        ordered
    }
}


fn malformed(filename: &Path, details: &str) -> ! {
    quit_with_error(&format!("malformed STRUCTURE output: {}: {}", filename.display(), details));
}


fn malformed_line(filename: &Path, line_num: usize, details: &str) -> ! {
    quit_with_error(&format!("malformed STRUCTURE output: {} line {}: {}",
                             filename.display(), line_num, details));
}


#[cfg(test)]
mod tests {
    use std::panic;
    use std::path::PathBuf;
    use super::*;
    use crate::tests::{assert_almost_eq, structure_result_text};

    fn to_lines(text: &str) -> Vec<String> {
        text.lines().map(|l| l.to_string()).collect()
    }

    fn toy_run() -> StructureRun {
        StructureRun::from_lines(&to_lines(&structure_result_text()),
                                 &PathBuf::from("run1_f"))
    }

    #[test]
    fn test_parse_toy_run() {
        let run = toy_run();
        assert_eq!(run.n, 3);
        assert_eq!(run.k, 2);
        assert_eq!(run.individuals.len(), 3);

        // Records come back in file order with full membership precision.
        assert_eq!(run.individuals[0].index, 1);
        assert_eq!(run.individuals[0].label, "ind_a");
        assert_eq!(run.individuals[1].missing, 3);
        assert_almost_eq(run.individuals[0].memberships[0], 0.9, 1e-6);
        assert_almost_eq(run.individuals[1].memberships[1], 0.8, 1e-6);
        assert_almost_eq(run.individuals[2].memberships[0], 0.5, 1e-6);
    }

    #[test]
    fn test_parse_with_population_column() {
        let text = "  3 individuals\n\
                    2 populations assumed\n\
                    Label (%Miss) Pop:  Inferred clusters\n\
                    1 ind_a (0) 1 :  0.900 0.100\n\
                    2 ind_b (3) 1 :  0.200 0.800\n\
                    3 ind_c (0) 1 :  0.500 0.500\n";
        let run = StructureRun::from_lines(&to_lines(text), &PathBuf::from("run2_f"));
        assert_eq!(run.n, 3);
        assert_almost_eq(run.individuals[1].memberships[0], 0.2, 1e-6);
    }

    #[test]
    fn test_parse_errors() {
        let path = PathBuf::from("bad_f");

        // No anchors at all.
        let text = "nothing useful here\n";
        assert!(panic::catch_unwind(|| StructureRun::from_lines(&to_lines(text),
                                                                &path)).is_err());

        // Fewer records than the individual count promises.
        let text = "  3 individuals\n2 populations assumed\nInferred clusters\n\
                    1 ind_a (0) :  0.9 0.1\n2 ind_b (0) :  0.2 0.8\n";
        assert!(panic::catch_unwind(|| StructureRun::from_lines(&to_lines(text),
                                                                &path)).is_err());

        // A non-numeric membership value.
        let text = "  2 individuals\n2 populations assumed\nInferred clusters\n\
                    1 ind_a (0) :  0.9 0.1\n2 ind_b (0) :  0.2 bad\n";
        assert!(panic::catch_unwind(|| StructureRun::from_lines(&to_lines(text),
                                                                &path)).is_err());

        // The wrong number of membership values for the assumed K.
        let text = "  1 individuals\n3 populations assumed\nInferred clusters\n\
                    1 ind_a (0) :  0.9 0.1\n";
        assert!(panic::catch_unwind(|| StructureRun::from_lines(&to_lines(text),
                                                                &path)).is_err());

        // An anchor block with no preceding individual count.
        let text = "2 populations assumed\nInferred clusters\n1 ind_a (0) :  0.9 0.1\n";
        assert!(panic::catch_unwind(|| StructureRun::from_lines(&to_lines(text),
                                                                &path)).is_err());
    }

    #[test]
    fn test_last_run_wins() {
        let text = "  2 individuals\n2 populations assumed\nInferred clusters\n\
                    1 ind_a (0) :  0.9 0.1\n2 ind_b (0) :  0.2 0.8\n\
                    \n\
                    3 populations assumed\nInferred clusters\n\
                    1 ind_a (0) :  0.5 0.3 0.2\n2 ind_b (0) :  0.1 0.6 0.3\n";
        let run = StructureRun::from_lines(&to_lines(text), &PathBuf::from("multi_f"));
        assert_eq!(run.k, 3);
        assert_eq!(run.n, 2);
        assert_almost_eq(run.individuals[1].memberships[1], 0.6, 1e-6);
    }

    #[test]
    fn test_dominant_cluster() {
        let run = toy_run();
        // Cluster totals are 1.6 and 1.4, so cluster 0 dominates.
        let totals = run.cluster_totals();
        assert_almost_eq(totals[0], 1.6, 1e-6);
        assert_almost_eq(totals[1], 1.4, 1e-6);
        assert_eq!(run.dominant_cluster(), 0);
    }

    #[test]
    fn test_presentation_order() {
        let run = toy_run();
        let ordered = run.presentation_order();
        let dominant_memberships: Vec<f64> = ordered.iter()
            .map(|r| r.memberships[0]).collect();
        assert_eq!(dominant_memberships, vec![0.9, 0.5, 0.2]);
        let labels: Vec<&str> = ordered.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["ind_a", "ind_c", "ind_b"]);

        // The parsed records themselves are untouched by ordering.
        assert_eq!(run.individuals[0].label, "ind_a");
        assert_eq!(run.individuals[1].label, "ind_b");
    }

    #[test]
    fn test_presentation_order_is_stable() {
        let mut run = toy_run();
        run.individuals[1].memberships = vec![0.5, 0.5];  // ties ind_b with ind_c
        let labels: Vec<&str> = run.presentation_order().iter()
            .map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["ind_a", "ind_b", "ind_c"]);
    }
}
