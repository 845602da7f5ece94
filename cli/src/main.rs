use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use jsonschema_cue_core::host::{self, Expr};
use jsonschema_cue_core::{extract, generate, Config, GenerateConfig, Version};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "jsonschema-cue")]
#[command(about = "Translate between JSON Schema and CUE")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate a JSON Schema document to CUE
    Extract {
        /// Input JSON Schema file
        input: PathBuf,

        /// Output CUE file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Generate a JSON Schema from a host value
    Generate {
        /// Input file holding a serialized host expression
        input: PathBuf,

        /// Output JSON Schema file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        generate: GenerateArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Extract a JSON Schema and generate it back from the result
    Roundtrip {
        /// Input JSON Schema file
        input: PathBuf,

        /// Output JSON Schema file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        extract: ExtractArgs,

        #[command(flatten)]
        generate: GenerateArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct ExtractArgs {
    /// Extraction settings file (JSON, kebab-case keys); flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON reference of the location holding the schemas
    #[arg(long)]
    root: Option<String>,

    /// Treat the value at --root as a single schema
    #[arg(long)]
    single_root: bool,

    /// Schema version assumed when the document has no $schema
    #[arg(long)]
    default_version: Option<Version>,

    /// Report unsupported features and unknown keywords
    #[arg(long)]
    strict: bool,

    /// Package name for the output file
    #[arg(long)]
    pkg_name: Option<String>,
}

impl ExtractArgs {
    fn to_config(&self) -> Result<Config> {
        let mut cfg: Config = match &self.config {
            Some(path) => read_json(path, "config")?,
            None => Config::default(),
        };
        if self.root.is_some() {
            cfg.root = self.root.clone();
        }
        if self.pkg_name.is_some() {
            cfg.pkg_name = self.pkg_name.clone();
        }
        if let Some(version) = self.default_version {
            cfg.default_version = version;
        }
        cfg.single_root |= self.single_root;
        cfg.strict |= self.strict;
        Ok(cfg)
    }
}

#[derive(Args)]
struct GenerateArgs {
    /// Only emit additionalProperties for explicitly closed or open structs
    #[arg(long)]
    explicit_open: bool,
}

impl GenerateArgs {
    fn to_config(&self) -> GenerateConfig {
        GenerateConfig {
            explicit_open: self.explicit_open,
            ..GenerateConfig::default()
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for the translated output
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Extract {
            input,
            output,
            extract: args,
        } => {
            let schema: serde_json::Value = read_json(&input, "schema")?;
            let cfg = args.to_config()?;
            let file = extract(&schema, &cfg)
                .map_err(|e| anyhow::Error::from(e).context("Extraction failed"))?;
            write_text(&file.to_string(), output.as_deref())?;
        }
        Commands::Generate {
            input,
            output,
            generate: args,
            format,
        } => {
            let expr: Expr = read_json(&input, "host value")?;
            let value = host::Value::from_expr(expr);
            let schema = generate(&value, &args.to_config())
                .map_err(|e| anyhow::Error::from(e).context("Generation failed"))?;
            write_json(&schema, output.as_deref(), format)?;
        }
        Commands::Roundtrip {
            input,
            output,
            extract: extract_args,
            generate: generate_args,
            format,
        } => {
            let schema: serde_json::Value = read_json(&input, "schema")?;
            let file = extract(&schema, &extract_args.to_config()?)
                .map_err(|e| anyhow::Error::from(e).context("Extraction failed"))?;
            tracing::debug!(cue = %file, "extracted");
            let pkg = host::compile(&file).context("Failed to load extracted value")?;
            let value = host::Value::new(pkg);
            let schema = generate(&value, &generate_args.to_config())
                .map_err(|e| anyhow::Error::from(e).context("Generation failed"))?;
            write_json(&schema, output.as_deref(), format)?;
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {what} file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {what} from: {}", path.display()))
}

fn output_writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => {
            let file = File::create(p)
                .with_context(|| format!("Failed to create output file: {}", p.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn write_text(text: &str, path: Option<&Path>) -> Result<()> {
    let mut writer = output_writer(path)?;
    writer
        .write_all(text.as_bytes())
        .context("Failed to write output")?;
    writer.flush().context("Failed to write output")?;
    Ok(())
}

fn write_json<T: serde::Serialize>(
    val: &T,
    path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let mut writer = output_writer(path)?;

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    // Ensure trailing newline
    writeln!(writer).context("Failed to write trailing newline")?;
    writer.flush().context("Failed to write output")?;

    Ok(())
}
