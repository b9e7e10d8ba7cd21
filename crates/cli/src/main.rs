mod echo;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use pagedown_core::fetch::{DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT_MS};
use pagedown_core::{
    BulletListMarker, CodeBlockStyle, ConversionOptions, ConversionResult, Converter, ConverterConfig, EmDelimiter,
    HeadingStyle, PagedownError, StrongDelimiter,
};
use tracing_subscriber::EnvFilter;
use url::Url;

use echo::{format_size, print_banner, print_error, print_info, print_step, print_success, print_timing, print_warning};

pub(crate) const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convert web pages into clean Markdown
#[derive(Parser, Debug)]
#[command(name = "pagedown")]
#[command(version)]
#[command(about = "Convert web pages into clean Markdown", long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print the result and metadata as JSON
    #[arg(long)]
    json: bool,

    /// Omit the title and metadata header
    #[arg(long)]
    no_metadata: bool,

    /// Heading style (atx, setext)
    #[arg(long, default_value_t = HeadingStyle::Atx, value_name = "STYLE")]
    heading_style: HeadingStyle,

    /// Bullet list marker (-, *, +)
    #[arg(long, default_value_t = BulletListMarker::Dash, value_name = "MARKER")]
    bullet: BulletListMarker,

    /// Code block style (fenced, indented)
    #[arg(long, default_value_t = CodeBlockStyle::Fenced, value_name = "STYLE")]
    code_style: CodeBlockStyle,

    /// Emphasis delimiter (*, _)
    #[arg(long, default_value = "*", value_name = "DELIM")]
    em_delimiter: EmDelimiter,

    /// Strong delimiter (**, __)
    #[arg(long, default_value = "**", value_name = "DELIM")]
    strong_delimiter: StrongDelimiter,

    /// HTTP timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS, value_name = "MS")]
    timeout: u64,

    /// Maximum response size in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BYTES, value_name = "BYTES")]
    max_bytes: usize,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Text length an extraction attempt must reach to be accepted
    #[arg(long, default_value = "500", value_name = "NUM")]
    char_threshold: usize,

    /// Keep all class attributes when cleaning content
    #[arg(long)]
    keep_classes: bool,

    /// Show progress and enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions {
            include_metadata: !self.no_metadata,
            heading_style: self.heading_style,
            bullet_list_marker: self.bullet,
            code_block_style: self.code_style,
            em_delimiter: self.em_delimiter,
            strong_delimiter: self.strong_delimiter,
        }
    }

    fn converter_config(&self) -> ConverterConfig {
        let mut builder = ConverterConfig::builder()
            .timeout_ms(self.timeout)
            .max_bytes(self.max_bytes)
            .char_threshold(self.char_threshold)
            .keep_classes(self.keep_classes);
        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.as_str());
        }
        builder.build()
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// True for inputs with a scheme and authority, such as `https://host/path`.
fn is_url(input: &str) -> bool {
    Url::parse(input).is_ok_and(|url| !url.cannot_be_a_base())
}

fn read_input(input: &str) -> anyhow::Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read from stdin")?;
        Ok(buffer)
    } else {
        fs::read_to_string(input).with_context(|| format!("Failed to read file: {}", input))
    }
}

fn report(result: Result<ConversionResult, PagedownError>) -> anyhow::Result<ConversionResult> {
    result.map_err(|err| {
        print_error(err.user_message());
        anyhow::Error::new(err).context("Conversion failed")
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let converter = Converter::with_config(args.converter_config());
    let options = args.conversion_options();
    let started = Instant::now();

    let result = if is_url(&args.input) {
        if args.verbose {
            print_step(1, 2, &format!("Converting {}", args.input.bright_white().underline()));
        }
        report(converter.convert_url(&args.input, &options).await)?
    } else {
        if args.verbose {
            let source = if args.input == "-" { "stdin" } else { args.input.as_str() };
            print_step(1, 2, &format!("Reading from {}", source.bright_white()));
        }
        let html = read_input(&args.input)?;
        if args.verbose {
            eprintln!("  {} {}", "Size:".dimmed(), format_size(html.len()).bright_white());
        }
        report(converter.convert_html(&html, None, &options))?
    };

    if args.verbose {
        match &result.metadata.title {
            Some(title) => eprintln!("  {} {}", "Title:".dimmed(), title.bright_white()),
            None => print_warning("No title found"),
        }
        if let Some(length) = result.metadata.length {
            eprintln!("  {} {}", "Length:".dimmed(), format!("{length} chars").bright_white());
        }
        print_timing("Conversion", started.elapsed());
        eprintln!();
        print_step(2, 2, "Writing output");
    }

    let mut output = if args.json {
        serde_json::to_string_pretty(&result).context("Failed to serialize result")?
    } else {
        result.markdown
    };
    output.push('\n');

    match args.output {
        Some(path) => {
            fs::write(&path, output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", output);
        }
    }

    Ok(())
}
