//! `promptfit`: trim prompts to a token budget and extract schema-checked
//! JSON from model replies.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use promptfit_cli::commands::{
    extract_with_retries, fit_prompt, load_schema, read_input, render_example, trim_text,
    validate_response,
};
use promptfit_cli::{CliError, CommandModel, CommandModelConfig, TokenizerKind};
use promptfit_core::trim::{DEFAULT_CHARS_PER_TOKEN, DEFAULT_CONTEXT_SIZE, DEFAULT_MIN_CHUNK_SIZE};
use promptfit_core::{StructuredExtractor, TrimConfig};

#[derive(Parser)]
#[command(name = "promptfit", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Args)]
struct TrimArgs {
    /// Token budget; for `extract` it covers the schema instructions too
    #[arg(long, env = "CONTEXT_SIZE", default_value_t = DEFAULT_CONTEXT_SIZE)]
    context_size: usize,

    /// Token counter
    #[arg(long, value_enum, default_value_t = TokenizerKind::O200k)]
    tokenizer: TokenizerKind,

    /// Characters assumed per token when sizing a cut
    #[arg(long, default_value_t = DEFAULT_CHARS_PER_TOKEN)]
    chars_per_token: usize,

    /// Below this many characters, cut without splitting
    #[arg(long, default_value_t = DEFAULT_MIN_CHUNK_SIZE)]
    min_chunk_size: usize,
}

impl TrimArgs {
    fn config(&self) -> TrimConfig {
        TrimConfig::default()
            .with_context_size(self.context_size)
            .with_chars_per_token(self.chars_per_token)
            .with_min_chunk_size(self.min_chunk_size)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Trim text to fit a token budget
    Trim {
        /// Input file (stdin when omitted or `-`)
        input: Option<PathBuf>,

        #[command(flatten)]
        trim: TrimArgs,
    },

    /// Print the example JSON a schema synthesizes
    Example {
        /// Schema file
        schema: PathBuf,

        /// Print the equivalent JSON Schema instead
        #[arg(long)]
        json_schema: bool,
    },

    /// Check a saved model response against a schema
    Validate {
        /// Schema file
        #[arg(short, long)]
        schema: PathBuf,

        /// Response file (stdin when omitted or `-`)
        response: Option<PathBuf>,
    },

    /// Trim a prompt and extract structured output through a model command
    Extract {
        /// Schema file
        #[arg(short, long)]
        schema: PathBuf,

        /// Prompt file (stdin when omitted or `-`)
        prompt: Option<PathBuf>,

        /// Model command; receives the prompt on stdin, replies on stdout
        #[arg(short, long, env = "PROMPTFIT_MODEL_COMMAND")]
        command: String,

        /// Seconds before the model command is killed
        #[arg(long, env = "PROMPTFIT_TIMEOUT_SECS", default_value_t = 300)]
        timeout_secs: u64,

        /// System preamble placed before the prompt
        #[arg(long)]
        system: Option<String>,

        /// Model calls allowed, re-prompting with feedback after failures
        #[arg(long, default_value_t = 1)]
        max_attempts: usize,

        #[command(flatten)]
        trim: TrimArgs,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli.command).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: {error}");
            for violation in error.violations() {
                eprintln!("  - {violation}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<String, CliError> {
    match command {
        Commands::Trim { input, trim } => {
            let text = read_input(input.as_deref())?;
            trim_text(&text, trim.tokenizer, trim.config())
        }
        Commands::Example {
            schema,
            json_schema,
        } => render_example(&load_schema(&schema)?, json_schema),
        Commands::Validate { schema, response } => {
            let schema = load_schema(&schema)?;
            let response = read_input(response.as_deref())?;
            let value = validate_response(&schema, &response)?;
            serde_json::to_string_pretty(&value).map_err(CliError::Render)
        }
        Commands::Extract {
            schema,
            prompt,
            command,
            timeout_secs,
            system,
            max_attempts,
            trim,
        } => {
            let mut extractor = StructuredExtractor::new(load_schema(&schema)?);
            if let Some(system) = system {
                extractor = extractor.with_system(system);
            }
            let prompt = read_input(prompt.as_deref())?;
            let prompt = fit_prompt(&extractor, &prompt, trim.tokenizer, trim.config())?;

            let model = CommandModel::from_command_line(&command)?.with_config(
                CommandModelConfig::default().with_timeout(Duration::from_secs(timeout_secs)),
            );

            let value = extract_with_retries(&model, &extractor, &prompt, max_attempts).await?;
            serde_json::to_string_pretty(&value).map_err(CliError::Render)
        }
    }
}
