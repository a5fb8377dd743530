mod display;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::Level;
use triage_ai::Service;
use triage_core::{ArtifactPaths, DEFAULT_TOP_K, ServiceConfig, SymptomInput, Variant};

#[derive(Debug, Parser)]
#[command(
    name = "triage",
    version,
    about = "Symptom-to-diagnosis prediction from pre-trained classifier artifacts",
    long_about = "triage loads a trained classifier (plus optional vectorizer and advice \
        table) and answers prediction requests.\n\n\
        EXAMPLES:\n\
        \n  triage status\n\
        \n  triage predict \"fever, cough, sore throat\"\n\
        \n  triage --variant chat predict --features 1,0,1,1\n\
        \n  echo '{\"symptoms\": \"fever\"}' | triage handle"
)]
struct Cli {
    /// Increase verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(flatten)]
    service: ServiceArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ServiceArgs {
    /// Classifier artifact (.json linear model or pipeline, .onnx)
    #[arg(long, env = "TRIAGE_MODEL", default_value = "models/model.json", global = true)]
    model: PathBuf,

    /// Separate TF-IDF vectorizer artifact
    #[arg(long, env = "TRIAGE_VECTORIZER", global = true)]
    vectorizer: Option<PathBuf>,

    /// Advice table keyed by label
    #[arg(long, env = "TRIAGE_ADVICE", global = true)]
    advice: Option<PathBuf>,

    /// Request/response shape: diagnosis, symptom or chat
    #[arg(long, env = "TRIAGE_VARIANT", default_value = "diagnosis", global = true)]
    variant: Variant,

    /// Number of ranked candidates to return
    #[arg(long, env = "TRIAGE_TOP_K", default_value_t = DEFAULT_TOP_K, global = true)]
    top_k: usize,

    /// Seed for advice selection (entropy when unset)
    #[arg(long, env = "TRIAGE_SEED", global = true)]
    seed: Option<u64>,
}

impl ServiceArgs {
    fn paths(&self) -> ArtifactPaths {
        let mut paths = ArtifactPaths::new(self.model.clone());
        if let Some(v) = &self.vectorizer {
            paths = paths.with_vectorizer(v.clone());
        }
        if let Some(a) = &self.advice {
            paths = paths.with_advice(a.clone());
        }
        paths
    }

    fn config(&self) -> ServiceConfig {
        ServiceConfig {
            variant: self.variant,
            top_k: self.top_k,
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report whether the model loaded
    Status {
        /// Print the status object as JSON
        #[arg(long)]
        json: bool,
    },

    /// Predict from free text or a feature vector
    Predict(PredictArgs),

    /// Run one request body through the service and print the response
    Handle {
        /// Request body (read from stdin when omitted)
        #[arg(long, value_name = "JSON")]
        body: Option<String>,
    },
}

#[derive(Debug, Args)]
struct PredictArgs {
    /// Symptom description
    #[arg(value_name = "TEXT", conflicts_with = "features")]
    text: Option<String>,

    /// Comma-separated feature vector, e.g. 1,0,1
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    features: Vec<f64>,

    /// Print the response JSON instead of a card
    #[arg(long)]
    json: bool,
}

impl PredictArgs {
    fn input(&self) -> SymptomInput {
        if self.features.is_empty() {
            SymptomInput::Text(self.text.as_deref().unwrap_or_default().trim().to_string())
        } else {
            SymptomInput::Features(self.features.clone())
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    tracing::debug!("triage v{}", env!("CARGO_PKG_VERSION"));

    let service = Service::from_paths(&cli.service.paths(), cli.service.config());
    let mut rng = cli.service.rng();

    match cli.command {
        Command::Status { json } => {
            let status = service.status();
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print!("{}", display::render_status(&status));
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Predict(args) => {
            let prediction = service
                .predict(&args.input(), &mut rng)
                .context("prediction failed")?;
            if args.json {
                let body = service.success_body(&prediction);
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                display::print_prediction(&prediction, service.variant());
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Handle { body } => {
            let raw = match body {
                Some(b) => b,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading request body from stdin")?;
                    buf
                }
            };
            let response = service.handle_json(&raw, &mut rng);
            println!("{}", serde_json::to_string_pretty(&response.body)?);
            eprintln!("status: {}", response.status);
            Ok(if response.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["triage", "status"]).unwrap();
        assert_eq!(cli.service.model, PathBuf::from("models/model.json"));
        assert_eq!(cli.service.variant, Variant::Diagnosis);
        assert_eq!(cli.service.top_k, DEFAULT_TOP_K);
        assert!(cli.service.seed.is_none());
        assert!(matches!(cli.command, Command::Status { json: false }));
    }

    #[test]
    fn predict_text() {
        let cli = Cli::try_parse_from(["triage", "predict", "  fever and cough "]).unwrap();
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.input(), SymptomInput::Text("fever and cough".into()));
    }

    #[test]
    fn predict_features_with_global_flags() {
        let cli = Cli::try_parse_from([
            "triage",
            "predict",
            "--features",
            "1,0,1.5",
            "--variant",
            "chat",
            "--top-k",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.service.variant, Variant::Chat);
        assert_eq!(cli.service.config().top_k, 5);
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.input(), SymptomInput::Features(vec![1.0, 0.0, 1.5]));
    }

    #[test]
    fn text_and_features_conflict() {
        assert!(
            Cli::try_parse_from(["triage", "predict", "fever", "--features", "1,0"]).is_err()
        );
    }

    #[test]
    fn unknown_variant_rejected() {
        assert!(Cli::try_parse_from(["triage", "--variant", "xray", "status"]).is_err());
    }

    #[test]
    fn artifact_paths_from_flags() {
        let cli = Cli::try_parse_from([
            "triage",
            "--model",
            "m/clf.json",
            "--vectorizer",
            "m/tfidf.json",
            "--advice",
            "m/diseases.json",
            "handle",
            "--body",
            "{}",
        ])
        .unwrap();
        let paths = cli.service.paths();
        assert_eq!(paths.model, PathBuf::from("m/clf.json"));
        assert_eq!(paths.vectorizer, Some(PathBuf::from("m/tfidf.json")));
        assert_eq!(paths.advice, Some(PathBuf::from("m/diseases.json")));
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        use rand::Rng;
        let cli = Cli::try_parse_from(["triage", "--seed", "7", "status"]).unwrap();
        let a: u64 = cli.service.rng().r#gen();
        let b: u64 = cli.service.rng().r#gen();
        assert_eq!(a, b);
    }

    #[test]
    fn cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
