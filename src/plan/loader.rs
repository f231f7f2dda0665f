//! Load plan bundles (JSON) and actual records (CSV), export trajectories (CSV)

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result};
use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};

use super::{ActualRecord, PlanInputs};
use crate::calendar::YearMonth;
use crate::projection::{ProjectionConfig, Trajectory};
use crate::scenario::ScenarioOverride;

/// Everything needed to run a plan, as stored on disk
///
/// The plan inputs sit at the top level; `config` and `scenario` are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanBundle {
    #[serde(flatten)]
    pub inputs: PlanInputs,

    #[serde(default)]
    pub config: ProjectionConfig,

    #[serde(default)]
    pub scenario: Option<ScenarioOverride>,
}

impl PlanBundle {
    pub fn from_json(json: &str) -> Result<Self> {
        let bundle: Self = serde_json::from_str(json).context("Failed to parse plan bundle")?;
        bundle.inputs.validate().context("Plan bundle failed validation")?;
        Ok(bundle)
    }
}

/// Load and validate a plan bundle from a JSON file
pub fn load_bundle<P: AsRef<Path>>(path: P) -> Result<PlanBundle> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan bundle {}", path.display()))?;
    PlanBundle::from_json(&json).with_context(|| format!("Invalid plan bundle {}", path.display()))
}

/// Raw CSV row for one recorded month
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Year")]
    year: i32,
    #[serde(rename = "Month")]
    month: u32,
    #[serde(rename = "StartingBalance")]
    starting_balance: f64,
    #[serde(rename = "EndingBalance")]
    ending_balance: f64,
    #[serde(rename = "Contribution")]
    contribution: f64,
    #[serde(rename = "Return")]
    investment_return: f64,
}

impl CsvRow {
    fn into_record(self) -> Result<ActualRecord> {
        let record = ActualRecord {
            month: YearMonth::new(self.year, self.month)?,
            starting_balance: self.starting_balance,
            ending_balance: self.ending_balance,
            contribution: self.contribution,
            investment_return: self.investment_return,
        };
        record.validate()?;
        Ok(record)
    }
}

/// Load actual records from a CSV file
pub fn load_actuals<P: AsRef<Path>>(path: P) -> Result<Vec<ActualRecord>> {
    let path = path.as_ref();
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open actuals file {}", path.display()))?;
    load_actuals_from_reader(file).with_context(|| format!("Invalid actuals file {}", path.display()))
}

/// Load actual records from any reader (e.g., string buffer, network stream)
pub fn load_actuals_from_reader<R: Read>(reader: R) -> Result<Vec<ActualRecord>> {
    let mut csv_reader = Reader::from_reader(reader);
    let mut records = Vec::new();

    for (line, result) in csv_reader.deserialize().enumerate() {
        let row: CsvRow = result.with_context(|| format!("Bad actuals row {}", line + 1))?;
        let record = row
            .into_record()
            .with_context(|| format!("Bad actuals row {}", line + 1))?;
        records.push(record);
    }

    Ok(records)
}

/// CSV row for one projected month
#[derive(Debug, Serialize)]
struct TrajectoryRow {
    #[serde(rename = "Month")]
    month: String,
    #[serde(rename = "MonthIndex")]
    month_index: u32,
    #[serde(rename = "Phase")]
    phase: String,
    #[serde(rename = "Source")]
    source: String,
    #[serde(rename = "NominalBalance")]
    nominal_balance: f64,
    #[serde(rename = "RealBalance")]
    real_balance: f64,
    #[serde(rename = "Cashflow")]
    cashflow: f64,
}

/// Write a trajectory to any writer as CSV
pub fn write_trajectory<W: Write>(writer: W, trajectory: &Trajectory) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);

    for point in &trajectory.points {
        csv_writer.serialize(TrajectoryRow {
            month: point.date.to_string(),
            month_index: point.month_index,
            phase: format!("{:?}", point.phase),
            source: format!("{:?}", point.source),
            nominal_balance: point.nominal_balance,
            real_balance: point.real_balance,
            cashflow: point.cashflow,
        })?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write a trajectory to a CSV file
pub fn write_trajectory_csv<P: AsRef<Path>>(path: P, trajectory: &Trajectory) -> Result<()> {
    let path = path.as_ref();
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_trajectory(file, trajectory).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::TerminalPolicy;
    use crate::projection::ProjectionEngine;

    const ACTUALS: &str = "\
Year,Month,StartingBalance,EndingBalance,Contribution,Return
2024,1,0,1005.5,1000,5.5
2024,2,1005.5,2012.1,1000,6.6
";

    const BUNDLE: &str = r#"{
        "plan": {
            "plan_id": 42,
            "initial_capital": 5000,
            "start": "2024-01",
            "accumulation_end": "2054-01",
            "final_age": 65,
            "terminal_policy": "2",
            "legacy_amount": 100000
        },
        "profile": { "birth_date": "1989-01-15" },
        "revisions": [
            { "effective": "2024-01", "monthly_contribution": 1000, "monthly_income": 4000,
              "expected_return": 0.06, "inflation": 0.03, "inflate_income": true }
        ],
        "events": [
            { "anchor": "2030-06", "amount": -20000, "mode": "installment", "count": 4, "interval_months": 12 }
        ],
        "config": { "max_months": 120 }
    }"#;

    #[test]
    fn test_load_actuals_from_reader() {
        let records = load_actuals_from_reader(ACTUALS.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].month, YearMonth::new(2024, 2).unwrap());
        assert_eq!(records[1].ending_balance, 2012.1);
        assert_eq!(records[0].investment_return, 5.5);
    }

    #[test]
    fn test_bad_actuals_row() {
        let csv = "Year,Month,StartingBalance,EndingBalance,Contribution,Return\n2024,13,0,1,1,0\n";
        let err = load_actuals_from_reader(csv.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("row 1"));
    }

    #[test]
    fn test_parse_bundle() {
        let bundle = PlanBundle::from_json(BUNDLE).unwrap();
        assert_eq!(bundle.inputs.plan.plan_id, 42);
        assert_eq!(bundle.inputs.plan.terminal_policy, TerminalPolicy::LegacyPreserving);
        assert_eq!(bundle.inputs.plan.limiting_age, 100);
        assert_eq!(bundle.inputs.revisions[0].inflate_income, Some(true));
        assert_eq!(bundle.inputs.events[0].count, 4);
        assert_eq!(bundle.config.max_months, Some(120));
        assert!(bundle.config.use_actuals);
        assert!(bundle.scenario.is_none());
    }

    #[test]
    fn test_bundle_rejects_unknown_policy() {
        let json = BUNDLE.replace(r#""terminal_policy": "2""#, r#""terminal_policy": "7""#);
        assert!(PlanBundle::from_json(&json).is_err());
    }

    #[test]
    fn test_write_trajectory() {
        let bundle = PlanBundle::from_json(BUNDLE).unwrap();
        let trajectory = ProjectionEngine::new(&bundle.inputs, bundle.config.clone())
            .project()
            .unwrap();

        let mut out = Vec::new();
        write_trajectory(&mut out, &trajectory).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("Month,MonthIndex,Phase,Source,NominalBalance,RealBalance,Cashflow")
        );
        assert!(lines.next().unwrap().starts_with("2024-01,0,Accumulating,Projected,"));
        assert_eq!(text.lines().count(), 121);
    }
}
