//! Result collection and CSV persistence.
//!
//! A run of instance `inst` with configuration label `label` and execution
//! number `n` produces:
//!
//! ```text
//! <root>/B-GRASP_<label>/<inst>/results_<n>.csv   non-dominated solutions
//! <root>/B-GRASP_<label>/<inst>/add_data.csv      one summary row per execution
//! ```

use crate::heuristics::grasp::GraspResult;
use crate::solution::{round2, Solution};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// One solution as written to the result files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    /// Selected node ids, sorted and joined as `"a - b - c"`
    #[serde(rename = "Solution")]
    pub solution: String,
    #[serde(rename = "MaxSum")]
    pub max_sum: f64,
    #[serde(rename = "MaxMin")]
    pub max_min: f64,
    #[serde(rename = "Cost")]
    pub cost: f64,
    #[serde(rename = "Capacity")]
    pub capacity: f64,
}

impl From<&Solution<'_>> for SolutionRecord {
    fn from(solution: &Solution<'_>) -> Self {
        let objectives = solution.objectives();
        SolutionRecord {
            solution: solution.node_list(),
            max_sum: objectives.max_sum,
            max_min: objectives.max_min,
            cost: solution.total_cost(),
            capacity: solution.total_capacity(),
        }
    }
}

/// Summary row of one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ex_number: u32,
    /// Elapsed seconds, rounded to 2 decimals
    pub time: f64,
    pub all_sols: usize,
    pub nd_sols: usize,
    pub started_at: String,
}

impl RunSummary {
    pub fn new(execution: u32, result: &GraspResult, started_at: DateTime<Local>) -> Self {
        RunSummary {
            ex_number: execution,
            time: round2(result.elapsed.as_secs_f64()),
            all_sols: result.solutions.len(),
            nd_sols: result.front_size(),
            started_at: started_at.to_rfc3339(),
        }
    }
}

/// Writes the results of numbered executions under a root directory
#[derive(Debug, Clone)]
pub struct ResultCollector {
    root: PathBuf,
    label: String,
    execution: u32,
}

impl ResultCollector {
    pub fn new<P: AsRef<Path>>(root: P, label: impl Into<String>, execution: u32) -> Self {
        ResultCollector {
            root: root.as_ref().to_path_buf(),
            label: label.into(),
            execution,
        }
    }

    pub fn execution(&self) -> u32 {
        self.execution
    }

    /// Directory holding the files of an instance
    pub fn output_dir(&self, instance_name: &str) -> PathBuf {
        self.root.join(format!("B-GRASP_{}", self.label)).join(instance_name)
    }

    /// Write the non-dominated solutions and append the run summary.
    ///
    /// Returns the path of the solution file.
    pub fn save(&self, instance_name: &str, result: &GraspResult, started_at: DateTime<Local>) -> Result<PathBuf> {
        let dir = self.output_dir(instance_name);
        fs::create_dir_all(&dir).with_context(|| format!("cannot create {}", dir.display()))?;

        let results_path = dir.join(format!("results_{}.csv", self.execution));
        let records: Vec<SolutionRecord> = result.front().map(SolutionRecord::from).collect();
        write_records(&results_path, &records)?;

        let summary = RunSummary::new(self.execution, result, started_at);
        append_summary(&dir.join("add_data.csv"), &summary)?;

        log::info!(
            "Saved {} non-dominated solutions to {}",
            records.len(),
            results_path.display()
        );
        Ok(results_path)
    }
}

/// Write solution records to a CSV file, replacing it
pub fn write_records(path: &Path, records: &[SolutionRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("cannot write {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read solution records back from a CSV file
pub fn read_records(path: &Path) -> Result<Vec<SolutionRecord>> {
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("cannot read {}", path.display()))?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record.with_context(|| format!("malformed record in {}", path.display()))?);
    }
    Ok(records)
}

/// Append a summary row, writing the header only for a new file
fn append_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let is_new = !path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new().has_headers(is_new).from_writer(file);
    writer.serialize(summary)?;
    writer.flush()?;
    Ok(())
}

/// Read every summary row of an `add_data.csv` file
pub fn read_summaries(path: &Path) -> Result<Vec<RunSummary>> {
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("cannot read {}", path.display()))?;
    reader
        .deserialize()
        .collect::<std::result::Result<Vec<RunSummary>, _>>()
        .with_context(|| format!("malformed summary in {}", path.display()))
}
