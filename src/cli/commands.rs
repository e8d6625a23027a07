//! Command implementations for the deptclass CLI.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::bootstrap;
use crate::classifier::ModelKind;
use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::EngineConfig;
use crate::engine::{ClassificationEngine, PredictionResult};
use crate::sample_data;

/// Labeled questions as read from a training data file.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainingData {
    pub questions: Vec<String>,
    pub departments: Vec<String>,
}

impl TrainingData {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read training data {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid training data in {}", path.display()))
    }
}

/// Execute a CLI command.
pub fn execute_command(args: DeptClassArgs) -> Result<()> {
    let config = load_config(&args)?;
    let models_dir = config.models_directory.clone();
    let engine = ClassificationEngine::new(config).context("invalid engine configuration")?;

    if !matches!(args.command, Command::Train(_)) {
        let report = bootstrap::initialize(&engine, &models_dir);
        if !report.is_ready() {
            log::warn!("No trained models available; predictions will be mocked");
        }
    }

    match &args.command {
        Command::Train(train_args) => train(&engine, &models_dir, train_args, &args),
        Command::Classify(classify_args) => classify(&engine, classify_args, &args),
        Command::Status => Ok(output_result("Engine status", &engine.status(), &args)?),
        Command::Models => Ok(output_result(
            "Registered models",
            &engine.list_models(),
            &args,
        )?),
        Command::Departments => {
            let entries: Vec<DepartmentEntry> = engine
                .list_departments()
                .into_iter()
                .map(DepartmentEntry::from)
                .collect();
            Ok(output_result("Departments", &entries, &args)?)
        }
        Command::Save => {
            let outcome = engine.save(&models_dir);
            output_result("Save", &outcome, &args)?;
            if !outcome.success {
                bail!("failed to save models to {}", models_dir.display());
            }
            Ok(())
        }
        Command::Load => {
            let outcome = engine.load(&models_dir);
            output_result("Load", &outcome, &args)?;
            if !outcome.success {
                bail!("failed to load models from {}", models_dir.display());
            }
            Ok(())
        }
        Command::SampleQuestions(sample_args) => sample_questions(&engine, sample_args, &args),
    }
}

/// Configuration from `--config` (or defaults), with `--models-dir` applied.
fn load_config(args: &DeptClassArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("cannot load configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &args.models_dir {
        config.models_directory = dir.clone();
    }
    Ok(config)
}

/// Train every model on a data file or the sample corpus.
fn train(
    engine: &ClassificationEngine,
    models_dir: &Path,
    args: &TrainArgs,
    cli_args: &DeptClassArgs,
) -> Result<()> {
    let outcome = match &args.data {
        Some(path) => {
            if cli_args.verbosity() > 1 {
                println!("Loading training data from: {}", path.display());
            }
            let data = TrainingData::from_file(path)?;
            engine.train(&data.questions, &data.departments)
        }
        None => {
            let (questions, departments) = sample_data::training_set();
            engine.train(&questions, &departments)
        }
    };

    output_result("Training", &outcome, cli_args)?;
    if !outcome.success {
        bail!("{}", outcome.message);
    }

    if !args.no_save {
        let saved = engine.save(models_dir);
        output_result("Save", &saved, cli_args)?;
        if !saved.success {
            bail!("failed to save models to {}", models_dir.display());
        }
    }
    Ok(())
}

fn model_or_default<'a>(engine: &'a ClassificationEngine, model: &'a Option<String>) -> &'a str {
    model.as_deref().unwrap_or(&engine.config().default_model)
}

fn classify(
    engine: &ClassificationEngine,
    args: &ClassifyArgs,
    cli_args: &DeptClassArgs,
) -> Result<()> {
    if args.all {
        let results: Vec<PredictionResult> = ModelKind::ALL
            .into_iter()
            .map(|kind| engine.classify(&args.question, kind.identifier()))
            .collect();
        output_result("Classification (all models)", &results, cli_args)?;
        return Ok(());
    }

    let model = model_or_default(engine, &args.model);
    if ModelKind::from_identifier(model).is_none() {
        log::warn!("Unknown model '{model}', the prediction will be mocked");
    }
    let result = engine.classify(&args.question, model);
    output_result("Classification", &result, cli_args)?;
    Ok(())
}

fn sample_questions(
    engine: &ClassificationEngine,
    args: &SampleQuestionsArgs,
    cli_args: &DeptClassArgs,
) -> Result<()> {
    let model = model_or_default(engine, &args.model);
    let results: Vec<PredictionResult> = sample_data::test_questions()
        .into_iter()
        .map(|question| engine.classify(question, model))
        .collect();
    output_result("Sample questions", &results, cli_args)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use clap::Parser;

    use super::*;

    fn parse(rest: &[&str]) -> DeptClassArgs {
        DeptClassArgs::parse_from(std::iter::once("deptclass").chain(rest.iter().copied()))
    }

    #[test]
    fn test_training_data_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"questions": ["How do I reset my password?"], "departments": ["IT"]}}"#
        )
        .unwrap();
        let data = TrainingData::from_file(file.path()).unwrap();
        assert_eq!(data.questions.len(), 1);
        assert_eq!(data.departments, ["IT"]);

        assert!(TrainingData::from_file("/nonexistent/data.json").is_err());
    }

    #[test]
    fn test_models_dir_overrides_config() {
        let args = parse(&["--models-dir", "/tmp/models", "status"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.models_directory, PathBuf::from("/tmp/models"));
    }

    #[test]
    fn test_train_and_classify_commands() {
        let dir = tempfile::tempdir().unwrap();
        let dir_arg = dir.path().to_str().unwrap();
        let args = parse(&[
            "-q",
            "--format",
            "json",
            "--models-dir",
            dir_arg,
            "train",
        ]);
        execute_command(args).unwrap();
        assert!(dir.path().join("SVM.bin").exists());

        let args = parse(&[
            "-q",
            "--format",
            "json",
            "--models-dir",
            dir_arg,
            "classify",
            "How do I reset my password?",
            "--all",
        ]);
        execute_command(args).unwrap();
    }
}
