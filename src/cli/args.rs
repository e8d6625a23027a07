//! Command line argument parsing for the deptclass CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// deptclass - route free-text questions to the right department
#[derive(Parser, Debug, Clone)]
#[command(name = "deptclass")]
#[command(about = "Classify free-text questions into organizational departments")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct DeptClassArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Engine configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding saved models (overrides the configuration file)
    #[arg(long, value_name = "DIR", env = "DEPTCLASS_MODELS_DIR", global = true)]
    pub models_dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl DeptClassArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train every model and save them
    Train(TrainArgs),

    /// Classify a question
    Classify(ClassifyArgs),

    /// Show which models are trained
    Status,

    /// List the registered models
    Models,

    /// List the departments
    Departments,

    /// Save the current models
    Save,

    /// Load saved models
    Load,

    /// Classify the bundled test questions
    #[command(name = "sample-questions")]
    SampleQuestions(SampleQuestionsArgs),
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Training data file: {"questions": [...], "departments": [...]}.
    /// Defaults to the bundled sample corpus.
    #[arg(short, long, value_name = "DATA_FILE")]
    pub data: Option<PathBuf>,

    /// Don't save the trained models
    #[arg(long)]
    pub no_save: bool,
}

/// Arguments for classification
#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    /// Question to classify
    #[arg(value_name = "QUESTION")]
    pub question: String,

    /// Model identifier (default: the configured default model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Classify with every registered model
    #[arg(long, conflicts_with = "model")]
    pub all: bool,
}

/// Arguments for the test questions
#[derive(Parser, Debug, Clone)]
pub struct SampleQuestionsArgs {
    /// Model identifier (default: the configured default model)
    #[arg(short, long)]
    pub model: Option<String>,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity() {
        let args = DeptClassArgs::parse_from(["deptclass", "status"]);
        assert_eq!(args.verbosity(), 1);

        let args = DeptClassArgs::parse_from(["deptclass", "-vv", "status"]);
        assert_eq!(args.verbosity(), 2);

        let args = DeptClassArgs::parse_from(["deptclass", "-q", "-vvv", "status"]);
        assert_eq!(args.verbosity(), 0);
    }

    #[test]
    fn test_classify_args() {
        let args = DeptClassArgs::parse_from([
            "deptclass",
            "--format",
            "json",
            "classify",
            "How do I reset my password?",
            "--model",
            "SVM",
        ]);
        assert_eq!(args.output_format, OutputFormat::Json);
        match args.command {
            Command::Classify(classify) => {
                assert_eq!(classify.question, "How do I reset my password?");
                assert_eq!(classify.model.as_deref(), Some("SVM"));
                assert!(!classify.all);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_train_args() {
        let args =
            DeptClassArgs::parse_from(["deptclass", "train", "--data", "data.json", "--no-save"]);
        match args.command {
            Command::Train(train) => {
                assert_eq!(train.data, Some(PathBuf::from("data.json")));
                assert!(train.no_save);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_all_conflicts_with_model() {
        let result = DeptClassArgs::try_parse_from([
            "deptclass", "classify", "q", "--all", "--model", "SVM",
        ]);
        assert!(result.is_err());
    }
}
