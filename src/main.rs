use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use dotenv::dotenv;
use std::path::{Path, PathBuf};

use concept_rules::concept::{Concept, ConceptSnapshot, ConceptStore, ConceptValue};
use concept_rules::config::{extraction, visibility_report, ConfigLoader, RuleConfig};
use concept_rules::expression;
use concept_rules::scenario::{ScenarioBook, ScenarioRunner};
use concept_rules::server::{self, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Rule configuration file (JSON or YAML)
    #[arg(short, long, global = true, env = "CONCEPT_RULES_CONFIG")]
    config: Option<PathBuf>,

    /// Concept snapshot file (JSON or YAML) to start from
    #[arg(long, global = true)]
    concepts: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate an expression and print its trace
    Eval {
        /// The expression to evaluate
        #[arg(short, long)]
        expr: String,

        /// Set a concept, as NAME=VALUE or NAME=VALUE:inactive
        #[arg(long = "set", value_parser = parse_concept_arg)]
        set: Vec<(String, Concept)>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the concepts the configuration uses
    Concepts {
        /// Print where each concept is used
        #[arg(long)]
        report: bool,
    },
    /// Show which tabs, sections, orders and criteria are visible
    Visibility,
    /// Author and run test scenarios
    Scenario {
        #[command(subcommand)]
        command: ScenarioCommands,
    },
    /// Print the JSON Schema of a document type
    Schema {
        #[arg(value_enum)]
        kind: SchemaKind,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(short, long, env = "CONCEPT_RULES_PORT", default_value_t = 3000)]
        port: u16,

        /// Scenario book to serve
        #[arg(long)]
        book: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ScenarioCommands {
    /// Run a path and report the result
    Run {
        #[arg(long)]
        book: PathBuf,
        #[arg(long)]
        scenario: String,
        #[arg(long)]
        path: String,
        /// Write the result back into the book
        #[arg(long)]
        save: bool,
    },
    /// Add one path per true/false combination of the given concepts
    Generate {
        #[arg(long)]
        book: PathBuf,
        #[arg(long)]
        scenario: String,
        /// Concept names, the first being the most significant bit
        #[arg(long = "concept", required = true)]
        concepts: Vec<String>,
        #[arg(long, default_value = "Auto-generated path")]
        prefix: String,
        /// Do not fill unspecified concepts from the book's defaults
        #[arg(long)]
        no_defaults: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SchemaKind {
    Book,
    Snapshot,
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let baseline = match &args.concepts {
        Some(path) => load_snapshot(path)?,
        None => ConceptSnapshot::new(),
    };

    match args.command {
        Commands::Eval { expr, set, json } => {
            let concepts = set
                .into_iter()
                .fold(baseline, |snapshot, (name, concept)| snapshot.with(name, concept));
            let outcome = expression::evaluate(&expr, &concepts);

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                for (index, step) in outcome.steps.iter().enumerate() {
                    let result = step
                        .result
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("{:>3}. [{}] {}", index + 1, result, step.explanation);
                    println!("     {}", step.expression);
                }
                println!("Result: {}", outcome.result);
            }
        }
        Commands::Concepts { report } => {
            let config = load_config(args.config.as_deref())?;
            let references = extraction::extract_concepts(&config);
            if report {
                print!("{}", extraction::usage_report(&references));
            } else {
                for (tab, sections) in extraction::group_by_tab_and_section(&references) {
                    println!("{}", tab);
                    for (section, names) in sections {
                        println!("  {}: {}", section, names.join(", "));
                    }
                }
            }
        }
        Commands::Visibility => {
            let config = load_config(args.config.as_deref())?;
            for entry in visibility_report(&config, &baseline) {
                println!(
                    "{:<9} {:<7} {}",
                    entry.kind.as_str(),
                    if entry.visible { "visible" } else { "hidden" },
                    entry.target
                );
            }
        }
        Commands::Scenario { command } => match command {
            ScenarioCommands::Run {
                book: book_path,
                scenario,
                path,
                save,
            } => {
                let config = load_config(args.config.as_deref())?;
                let mut book = ScenarioBook::load(&book_path)?;
                let result =
                    ScenarioRunner::new(&config).execute_path(&book, &scenario, &path, &baseline)?;

                println!("{}", serde_json::to_string_pretty(&result)?);
                let success = result.success;
                if save {
                    book.record_result(result);
                    book.save(&book_path)?;
                }
                if !success {
                    std::process::exit(1);
                }
            }
            ScenarioCommands::Generate {
                book: book_path,
                scenario,
                concepts,
                prefix,
                no_defaults,
            } => {
                let mut book = ScenarioBook::load(&book_path)?;
                let paths = book.generate_paths(&scenario, &concepts, &prefix, !no_defaults)?;
                book.save(&book_path)?;
                println!("Generated {} path(s)", paths.len());
            }
        },
        Commands::Schema { kind } => {
            let schema = match kind {
                SchemaKind::Book => schemars::schema_for!(ScenarioBook),
                SchemaKind::Snapshot => schemars::schema_for!(ConceptSnapshot),
                SchemaKind::Config => schemars::schema_for!(RuleConfig),
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Commands::Serve { port, book } => {
            let config = load_config(args.config.as_deref())?;
            let book = match book {
                Some(path) => ScenarioBook::load(path)?,
                None => ScenarioBook::new(),
            };

            let store = ConceptStore::from_snapshot(baseline);
            let references = extraction::extract_concepts(&config);
            let added = store
                .initialize(extraction::unique_names(&references))
                .await;
            log::info!("Initialized {} concept(s) from configuration", added);

            server::serve(AppState::new(store, config, book), port).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RuleConfig> {
    let Some(path) = path else {
        bail!("No configuration given; pass --config or set CONCEPT_RULES_CONFIG");
    };
    ConfigLoader::new()
        .load_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn load_snapshot(path: &Path) -> anyhow::Result<ConceptSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read concepts from {}", path.display()))?;
    let snapshot: ConceptSnapshot = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    Ok(snapshot)
}

/// Parse `NAME=VALUE` or `NAME=VALUE:inactive`
fn parse_concept_arg(arg: &str) -> Result<(String, Concept), String> {
    let (name, rest) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", arg))?;
    if name.is_empty() {
        return Err(format!("missing concept name in '{}'", arg));
    }

    let (raw, is_active) = match rest.strip_suffix(":inactive") {
        Some(raw) => (raw, false),
        None => (rest, true),
    };
    let value = match raw {
        "true" => ConceptValue::Boolean(true),
        "false" => ConceptValue::Boolean(false),
        // "inf" and "NaN" parse as f64 but are kept as text
        _ => match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => ConceptValue::Number(n),
            _ => ConceptValue::Text(raw.to_string()),
        },
    };

    Ok((name.to_string(), Concept::new(value, is_active)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_concept_arg() {
        let (name, concept) = parse_concept_arg("K_LOW=true").unwrap();
        assert_eq!(name, "K_LOW");
        assert_eq!(concept, Concept::active(true));

        let (_, concept) = parse_concept_arg("K_LEVEL=3.1:inactive").unwrap();
        assert_eq!(concept, Concept::inactive(3.1));

        let (_, concept) = parse_concept_arg("ROUTE=IV").unwrap();
        assert_eq!(concept.value, ConceptValue::Text("IV".to_string()));

        for raw in ["inf", "-Infinity", "NaN"] {
            let (_, concept) = parse_concept_arg(&format!("K_LEVEL={}", raw)).unwrap();
            assert_eq!(concept.value, ConceptValue::Text(raw.to_string()));
        }

        assert!(parse_concept_arg("K_LOW").is_err());
        assert!(parse_concept_arg("=true").is_err());
    }
}
