use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{Context, IntoDiagnostic, Result};
use trellis_core::{
    ContentModelDocument, DomToModelOptions, EditorOptions, ModelToDomOptions, content_model_to_html,
    html_to_content_model, normalize_content_model,
};

#[derive(Parser)]
#[command(version, about = "Inspect how HTML maps onto the trellis content model", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Editor options as camelCase JSON
    #[arg(long, global = true, env = "TRELLIS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse HTML and print the content model as JSON
    Parse {
        /// HTML file, or `-` for stdin
        input: PathBuf,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
    /// Parse HTML and write the model back out
    Roundtrip {
        /// HTML file, or `-` for stdin
        input: PathBuf,
    },
    /// Normalize a content model JSON document and print its HTML
    Normalize {
        /// Model JSON as printed by `parse`, or `-` for stdin
        input: PathBuf,
        /// Print the normalized model as JSON instead of HTML
        #[arg(long)]
        json: bool,
    },
}

fn init_miette() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    miette::set_panic_hook();
    Ok(())
}

fn main() -> Result<()> {
    init_miette()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let options = load_options(cli.config.as_deref())?;

    let output = match cli.command {
        Commands::Parse { input, compact } => parse(&read_input(&input)?, &options, compact)?,
        Commands::Roundtrip { input } => roundtrip(&read_input(&input)?, &options),
        Commands::Normalize { input, json } => normalize(&read_input(&input)?, &options, json)?,
    };
    println!("{output}");
    Ok(())
}

fn load_options(path: Option<&Path>) -> Result<EditorOptions> {
    let Some(path) = path else {
        return Ok(EditorOptions::default());
    };
    let json = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
    let options = EditorOptions::from_json(&json)?;
    tracing::debug!(config = %path.display(), "loaded editor options");
    Ok(options)
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))
}

fn parse_options(options: &EditorOptions) -> DomToModelOptions {
    DomToModelOptions::default().with_default_format(options.default_segment_format.clone())
}

fn write_options(options: &EditorOptions) -> ModelToDomOptions {
    ModelToDomOptions {
        optimize: options.optimize,
        reuse_cached_elements: options.reuse_cached_elements,
        ..Default::default()
    }
}

fn parse(html: &str, options: &EditorOptions, compact: bool) -> Result<String> {
    let model = html_to_content_model(html, &parse_options(options));
    tracing::info!(blocks = model.blocks.len(), "parsed");
    if compact {
        serde_json::to_string(&model).into_diagnostic()
    } else {
        serde_json::to_string_pretty(&model).into_diagnostic()
    }
}

fn roundtrip(html: &str, options: &EditorOptions) -> String {
    let model = html_to_content_model(html, &parse_options(options));
    content_model_to_html(&model, &write_options(options))
}

fn normalize(json: &str, options: &EditorOptions, as_json: bool) -> Result<String> {
    let mut model: ContentModelDocument = serde_json::from_str(json)
        .into_diagnostic()
        .wrap_err("input is not a content model document")?;
    let changed = normalize_content_model(&mut model);
    tracing::info!(changed, "normalized");
    if as_json {
        serde_json::to_string_pretty(&model).into_diagnostic()
    } else {
        Ok(content_model_to_html(&model, &write_options(options)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let html = roundtrip("<p>Hello <b>World</b></p>", &EditorOptions::default());
        insta::assert_snapshot!(html, @"<p>Hello <b>World</b></p>");
    }

    #[test]
    fn test_parse_then_normalize() {
        let options = EditorOptions::default();
        let json = parse("<p>Hello <i>there</i></p>", &options, true).unwrap();
        let html = normalize(&json, &options, false).unwrap();
        assert_eq!(html, "<p>Hello <i>there</i></p>");
    }

    #[test]
    fn test_parse_output_is_model_json() {
        let json = parse("<p>one</p><h2>two</h2>", &EditorOptions::default(), false).unwrap();
        let model: ContentModelDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(model.blocks.len(), 2);
        assert_eq!(model.paragraphs()[1].text(), "two");
    }

    #[test]
    fn test_normalize_rejects_non_model() {
        assert!(normalize("42", &EditorOptions::default(), false).is_err());
    }

    #[test]
    fn test_config_drives_optimizer() {
        let options = EditorOptions::from_json(r#"{"optimize": false}"#).unwrap();
        assert!(!write_options(&options).optimize);
    }
}
