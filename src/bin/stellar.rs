// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Stellar command-line interface
//!
//! Evaluates, validates and inspects expressions against JSON events.

use anyhow::{Context as _, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process;
use stellar::{EngineConfig, JsonVariableResolver, StellarEngine};

#[derive(Parser)]
#[command(name = "stellar")]
#[command(about = "Evaluate Stellar expressions against JSON events")]
#[command(version)]
struct Cli {
    /// JSON file with engine settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression
    Evaluate {
        /// Expression to evaluate
        expression: String,
        /// JSON object holding the variables ("-" reads stdin)
        #[arg(long)]
        vars: Option<String>,
        /// Single variable as name=value; the value is read as JSON, else as a string
        #[arg(long = "var", value_name = "NAME=VALUE")]
        var: Vec<String>,
        /// Pretty-print JSON output
        #[arg(short, long)]
        pretty: bool,
        /// Require a boolean result
        #[arg(long)]
        predicate: bool,
    },
    /// Check that an expression compiles
    Validate {
        /// Expression to validate
        expression: String,
    },
    /// List the variables an expression reads
    Variables {
        /// Expression to inspect
        expression: String,
    },
    /// Describe every available function
    Functions,
}

fn main() {
    human_panic::setup_panic!();
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let engine = StellarEngine::with_config(load_config(cli.config.as_deref())?);

    match cli.command {
        Commands::Evaluate {
            expression,
            vars,
            var,
            pretty,
            predicate,
        } => {
            let event = load_variables(vars.as_deref(), &var)?;
            let resolver = JsonVariableResolver::new(&event);
            if predicate {
                println!("{}", engine.evaluate_predicate(&expression, &resolver)?);
            } else {
                let result = engine.evaluate(&expression, &resolver)?;
                let output = if pretty {
                    serde_json::to_string_pretty(&result)?
                } else {
                    serde_json::to_string(&result)?
                };
                println!("{output}");
            }
        }
        Commands::Validate { expression } => {
            engine.validate(&expression)?;
            println!("✓ Expression is valid");
        }
        Commands::Variables { expression } => {
            let mut names: Vec<String> = engine.variables_used(&expression)?.into_iter().collect();
            names.sort();
            for name in names {
                println!("{name}");
            }
        }
        Commands::Functions => {
            for descriptor in engine.functions() {
                println!("{descriptor}\n");
            }
        }
    }
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading config file '{}'", path.display()))?;
    EngineConfig::from_json_str(&text).with_context(|| format!("parsing config file '{}'", path.display()))
}

fn load_variables(source: Option<&str>, assignments: &[String]) -> Result<JsonValue> {
    let mut variables = match source {
        None => Map::new(),
        Some(source) => {
            let text = if source == "-" {
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .context("reading variables from stdin")?;
                buffer
            } else {
                fs::read_to_string(source)
                    .with_context(|| format!("reading variables file '{source}'"))?
            };
            match serde_json::from_str(&text).context("parsing variables")? {
                JsonValue::Object(object) => object,
                other => bail!("variables must be a JSON object, found {other}"),
            }
        }
    };

    for assignment in assignments {
        let Some((name, raw)) = assignment.split_once('=') else {
            bail!("variable '{assignment}' is not of the form NAME=VALUE");
        };
        let value = serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.to_string()));
        variables.insert(name.to_string(), value);
    }
    Ok(JsonValue::Object(variables))
}
