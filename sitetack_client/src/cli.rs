// src/cli.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sitetack_client::client::ApiHandler;
use sitetack_client::config::Config;
use sitetack_client::export::DownloadShelf;
use sitetack_client::form::{SubmissionForm, EXAMPLE_RECORD};
use sitetack_client::models::PredictionResponse;
use sitetack_client::reference::{ReferenceCatalog, ReferenceKind};
use sitetack_client::render::{display_results_with_highlighting, Marker};
use sitetack_client::session::{parse_threshold, ResultsPanel, Session, SubmissionOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MarkerArg {
    /// `<span class="bg-warning">` around highlighted residues
    Html,
    /// ANSI yellow background
    Terminal,
}

impl From<MarkerArg> for Marker {
    fn from(arg: MarkerArg) -> Self {
        match arg {
            MarkerArg::Html => Marker::Html,
            MarkerArg::Terminal => Marker::Terminal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum KindArg {
    Ptms,
    Organisms,
    Labels,
}

impl From<KindArg> for ReferenceKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Ptms => ReferenceKind::Ptms,
            KindArg::Organisms => ReferenceKind::Organisms,
            KindArg::Labels => ReferenceKind::Labels,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "Client for the Sitetack PTM site prediction service", long_about = None)]
pub struct Cli {
    /// Base URL of the prediction service (overrides SITETACK_URL and sitetack.json)
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit sequences and show the highlighted result
    Predict {
        /// PTM option key (first option of /ptms when omitted)
        #[arg(long)]
        ptm: Option<String>,
        /// Organism option key (first option of /organisms when omitted)
        #[arg(long)]
        organism: Option<String>,
        /// Label option key (first option of /labels when omitted)
        #[arg(long)]
        label: Option<String>,
        /// Sequence text, sent as-is
        #[arg(long, conflicts_with_all = ["fasta", "example"])]
        text: Option<String>,
        /// Read the sequence text from a file
        #[arg(long, conflicts_with = "example")]
        fasta: Option<PathBuf>,
        /// Use the built-in sample record
        #[arg(long)]
        example: bool,
        /// Highlight sites with probability strictly above this value
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<String>,
        /// Directory for predictionResults.json and predictionResults.csv
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = MarkerArg::Terminal)]
        marker: MarkerArg,
    },
    /// List the options of a reference endpoint
    Options {
        #[arg(value_enum)]
        kind: KindArg,
        /// Print the description of this option instead of the first one
        #[arg(long)]
        select: Option<String>,
    },
    /// Re-render a saved predictionResults.json at another threshold
    Render {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<String>,
        #[arg(long, value_enum, default_value_t = MarkerArg::Terminal)]
        marker: MarkerArg,
    },
    /// Regenerate both downloads from a saved predictionResults.json
    Export {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },
    /// Print the sample record
    Example,
}

impl Cli {
    pub fn execute(self) -> Result<()> {
        let mut config = Config::load()?;
        if let Some(url) = self.url {
            config.base_url = url;
        }

        match self.command {
            Commands::Predict {
                ptm,
                organism,
                label,
                text,
                fasta,
                example,
                threshold,
                out_dir,
                marker,
            } => {
                let handler = ApiHandler::new(&config.base_url, &config.user_agent, config.timeout())?;
                let mut session = Session::new(config.threshold, marker.into());
                if let Some(raw) = &threshold {
                    session.set_threshold(raw);
                }
                if ptm.is_none() || organism.is_none() || label.is_none() {
                    session.load_reference_data(&handler);
                    for kind in [ReferenceKind::Ptms, ReferenceKind::Organisms, ReferenceKind::Labels] {
                        let catalog = session.catalog(kind);
                        if let (Some(key), Some(description)) = (catalog.selected(), catalog.description()) {
                            info!("Default {} option {}: {}", kind.endpoint(), key, description);
                        }
                    }
                }

                let mut form = session.form();
                if let Some(ptm) = ptm {
                    form.ptm = ptm;
                }
                if let Some(organism) = organism {
                    form.organism = organism;
                }
                if let Some(label) = label {
                    form.label = label;
                }
                fill_text(&mut form, text, fasta.as_deref(), example)?;

                let outcome = session.submit(&handler, &form);
                print_panel(session.panel());
                match outcome {
                    SubmissionOutcome::Applied => {
                        let dir = out_dir.unwrap_or(config.out_dir);
                        session.downloads().write_to(&dir)?;
                        Ok(())
                    }
                    SubmissionOutcome::Failed(_) => bail!("submission failed"),
                    SubmissionOutcome::Superseded => Ok(()),
                }
            }
            Commands::Options { kind, select } => {
                let kind = ReferenceKind::from(kind);
                let handler = ApiHandler::new(&config.base_url, &config.user_agent, config.timeout())?;
                let mut catalog = ReferenceCatalog::load(&handler, kind);
                if catalog.is_empty() {
                    bail!("no options available from {}", kind.endpoint());
                }
                for (key, option) in catalog.options() {
                    println!("{}\t{}", key, option.name);
                }
                if let Some(key) = select {
                    catalog.select(&key);
                }
                if let Some(description) = catalog.description() {
                    println!();
                    println!("{}", description);
                }
                Ok(())
            }
            Commands::Render { input, threshold, marker } => {
                let model = read_saved_result(&input)?;
                let threshold = threshold
                    .as_deref()
                    .map(parse_threshold)
                    .unwrap_or(config.threshold);
                print!("{}", display_results_with_highlighting(&model, threshold, marker.into()));
                Ok(())
            }
            Commands::Export { input, out_dir } => {
                let model = read_saved_result(&input)?;
                let mut shelf = DownloadShelf::default();
                shelf.offer_all(&model)?;
                shelf.write_to(&out_dir.unwrap_or(config.out_dir))?;
                Ok(())
            }
            Commands::Example => {
                println!("{}", EXAMPLE_RECORD);
                Ok(())
            }
        }
    }
}

fn fill_text(
    form: &mut SubmissionForm,
    text: Option<String>,
    fasta: Option<&Path>,
    example: bool,
) -> Result<()> {
    if example {
        form.load_example();
    } else if let Some(path) = fasta {
        form.load_text_file(path)
            .with_context(|| format!("reading {}", path.display()))?;
    } else if let Some(text) = text {
        form.text = text;
    }
    Ok(())
}

fn read_saved_result(path: &Path) -> Result<PredictionResponse> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let model: PredictionResponse =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    info!(
        "Loaded {} sequences from {}",
        model.sequence_predictions.len(),
        path.display()
    );
    model.warn_on_inconsistencies();
    Ok(model)
}

/// Splits a panel into what belongs on stdout and what belongs on stderr.
fn panel_streams(panel: &ResultsPanel) -> (&str, Option<&str>) {
    match panel {
        ResultsPanel::Empty => ("", None),
        ResultsPanel::Results(text) => (text.as_str(), None),
        // Alerts stay off stdout so piped results never contain them
        ResultsPanel::Alert(message) => ("", Some(message.as_str())),
    }
}

fn print_panel(panel: &ResultsPanel) {
    let (out, alert) = panel_streams(panel);
    print!("{}", out);
    if let Some(message) = alert {
        eprintln!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_flag_wins_over_nothing() {
        let mut form = SubmissionForm::default();
        fill_text(&mut form, None, None, true).unwrap();
        assert_eq!(form.text, EXAMPLE_RECORD);
    }

    #[test]
    fn saved_result_round_trips_through_export() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("saved.json");
        fs::write(
            &input,
            r#"{"sequence_predictions":[{"sequence_name":"p","sequence":"KK","site_predictions":[{"site":2,"amino_acid":"K","probability":0.6}]}]}"#,
        )
        .unwrap();
        let model = read_saved_result(&input).unwrap();
        assert_eq!(model.site_count(), 1);
        assert!(read_saved_result(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn alerts_go_to_stderr_only() {
        let alert = ResultsPanel::Alert("organism is required".to_string());
        assert_eq!(panel_streams(&alert), ("", Some("organism is required")));

        let results = ResultsPanel::Results("Sequence Name: p\nSequence: K\n\n".to_string());
        assert_eq!(panel_streams(&results), ("Sequence Name: p\nSequence: K\n\n", None));
        assert_eq!(panel_streams(&ResultsPanel::Empty), ("", None));
    }

    #[test]
    fn options_kind_maps_to_endpoint() {
        let cli = Cli::try_parse_from(["sitetack_client", "options", "organisms"]).unwrap();
        match cli.command {
            Commands::Options { kind, select } => {
                assert_eq!(ReferenceKind::from(kind).endpoint(), "/organisms");
                assert!(select.is_none());
            }
            _ => panic!("expected options"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn predict_arguments_parse() {
        let cli = Cli::try_parse_from([
            "sitetack_client",
            "predict",
            "--ptm",
            "PHOSPHORYLATION_Y",
            "--example",
            "--threshold",
            "0.8",
            "--marker",
            "html",
        ])
        .unwrap();
        match cli.command {
            Commands::Predict { ptm, example, threshold, marker, .. } => {
                assert_eq!(ptm.as_deref(), Some("PHOSPHORYLATION_Y"));
                assert!(example);
                assert_eq!(threshold.as_deref(), Some("0.8"));
                assert_eq!(Marker::from(marker), Marker::Html);
            }
            _ => panic!("expected predict"),
        }
        assert!(Cli::try_parse_from(["sitetack_client", "predict", "--text", "K", "--example"]).is_err());
    }
}
