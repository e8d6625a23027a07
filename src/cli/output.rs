//! Output formatting for CLI commands.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::bootstrap::BootstrapReport;
use crate::classifier::ModelInfo;
use crate::cli::args::{DeptClassArgs, OutputFormat};
use crate::department::Department;
use crate::engine::{PersistenceOutcome, PredictionResult, StatusSnapshot, TrainingOutcome};
use crate::error::Result;

/// Results that have a human-readable rendering.
pub trait HumanReadable {
    fn render_human(&self) -> String;
}

/// Output a result in the selected format.
pub fn output_result<T: Serialize + HumanReadable>(
    message: &str,
    result: &T,
    args: &DeptClassArgs,
) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                println!("{message}");
                println!();
            }
            print!("{}", result.render_human());
        }
        OutputFormat::Json => {
            let json = if args.pretty {
                serde_json::to_string_pretty(result)?
            } else {
                serde_json::to_string(result)?
            };
            println!("{json}");
        }
    }
    Ok(())
}

fn percent(value: f64) -> String {
    format!("{:5.1}%", value * 100.0)
}

impl HumanReadable for PredictionResult {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Question:   {}", self.question);
        let _ = writeln!(
            out,
            "Department: {} ({})",
            self.predicted_department,
            self.predicted_department.description()
        );
        let _ = writeln!(out, "Confidence: {}", percent(self.confidence).trim());
        let source = if self.is_mock { " [mock]" } else { "" };
        let _ = writeln!(out, "Model:      {}{source}", self.model_used);
        for (department, probability) in &self.predictions {
            let marker = if *department == self.predicted_department { "*" } else { " " };
            let _ = writeln!(out, "  {marker} {:<12}{}", department.name(), percent(*probability));
        }
        if let Some(error) = &self.error {
            let _ = writeln!(out, "Error:      {error}");
        }
        out
    }
}

impl HumanReadable for Vec<PredictionResult> {
    fn render_human(&self) -> String {
        self.iter()
            .map(HumanReadable::render_human)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl HumanReadable for TrainingOutcome {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.message);
        if !self.success {
            return out;
        }
        let departments: Vec<&str> = self.departments.iter().map(|d| d.name()).collect();
        let _ = writeln!(
            out,
            "Samples: {}   Departments: {}",
            self.total_samples,
            departments.join(", ")
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "{:<20} {:>9} {:>9}  Status", "Model", "Accuracy", "Time");
        let _ = writeln!(out, "{}", "─".repeat(52));
        for report in &self.results {
            let _ = writeln!(
                out,
                "{:<20} {:>9} {:>7}ms  {}",
                report.model_type,
                percent(report.accuracy),
                report.training_time_ms,
                report.status
            );
        }
        out
    }
}

impl HumanReadable for StatusSnapshot {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Model Status:");
        let _ = writeln!(out, "═════════════");
        for model in &self.models {
            let state = if model.is_trained { "trained" } else { "not trained" };
            let _ = writeln!(
                out,
                "{:<20} {:<26} {state}",
                model.identifier, model.display_name
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Vectorizer fitted: {}",
            if self.vectorizer_fitted { "yes" } else { "no" }
        );
        let _ = writeln!(out, "Departments ({}): {}", self.total_departments, {
            let names: Vec<&str> = self.departments.iter().map(|d| d.name()).collect();
            names.join(", ")
        });
        out
    }
}

impl HumanReadable for Vec<ModelInfo> {
    fn render_human(&self) -> String {
        let mut out = String::new();
        for model in self {
            let _ = writeln!(out, "{:<20} {}", model.identifier, model.display_name);
        }
        out
    }
}

/// One department as listed by the CLI.
#[derive(Debug, Serialize, Deserialize)]
pub struct DepartmentEntry {
    pub name: Department,
    pub code: String,
    pub description: String,
}

impl From<Department> for DepartmentEntry {
    fn from(department: Department) -> Self {
        Self {
            name: department,
            code: department.code().to_string(),
            description: department.description().to_string(),
        }
    }
}

impl HumanReadable for Vec<DepartmentEntry> {
    fn render_human(&self) -> String {
        let mut out = String::new();
        for entry in self {
            let _ = writeln!(out, "{:<12} {:<6} {}", entry.name.name(), entry.code, entry.description);
        }
        out
    }
}

impl HumanReadable for PersistenceOutcome {
    fn render_human(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.message);
        if !self.components.is_empty() {
            let _ = writeln!(out, "Components: {}", self.components.join(", "));
        }
        for error in &self.errors {
            let _ = writeln!(out, "  error: {error}");
        }
        out
    }
}

impl HumanReadable for BootstrapReport {
    fn render_human(&self) -> String {
        let mut out = self.load.render_human();
        if let Some(training) = &self.training {
            out.push_str(&training.render_human());
        }
        if let Some(save) = &self.save {
            out.push_str(&save.render_human());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPredictor;

    #[test]
    fn test_prediction_rendering() {
        let result = MockPredictor::fallback("Where is my payslip?", "SVM", "no model");
        let text = result.render_human();
        assert!(text.contains("Question:   Where is my payslip?"));
        assert!(text.contains("Department: IT (Information Technology)"));
        assert!(text.contains("[mock]"));
        assert!(text.contains("Error:      no model"));
        assert_eq!(text.lines().filter(|l| l.contains('%')).count(), 6);
    }

    #[test]
    fn test_department_entries() {
        let entries: Vec<DepartmentEntry> =
            Department::ALL.into_iter().map(DepartmentEntry::from).collect();
        let text = entries.render_human();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("PROD"));

        let json = serde_json::to_string(&entries[1]).unwrap();
        assert!(json.contains("\"name\":\"Finance\""));
    }
}
