use clap::Parser;
use knitgen::utils::{logger, validation::Validate};
use knitgen::{CliConfig, OutputFormat, PatternArtifact, PatternError, PatternWorkflow};
use std::sync::Arc;

/// Exit status when `--strict` is set and the pattern has validation errors.
const STRICT_VALIDATION_EXIT: i32 = 4;

fn main() {
    let config = CliConfig::parse();

    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting knitgen CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    let tables = match config.load_tables() {
        Ok(tables) => tables,
        Err(e) => {
            tracing::error!("❌ Could not load tables: {}", e);
            fail(&e);
        }
    };

    let workflow = PatternWorkflow::new(Arc::new(tables));

    match workflow.generate(&config.request) {
        Ok(artifact) => {
            match render(&artifact, config.format) {
                Ok(rendered) => println!("{}", rendered),
                Err(e) => {
                    tracing::error!("❌ Rendering failed: {:#}", e);
                    eprintln!("❌ Could not render the pattern: {:#}", e);
                    std::process::exit(1);
                }
            }

            if !artifact.validation.is_valid() {
                for error in artifact.validation.errors() {
                    eprintln!("⚠️ {}", error);
                }
                if config.strict {
                    tracing::error!("❌ Pattern failed validation in strict mode");
                    std::process::exit(STRICT_VALIDATION_EXIT);
                }
            }
        }
        Err(e) => {
            tracing::error!(
                "❌ Pattern generation failed: {} (stage: {:?})",
                e,
                e.failed_stage()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            fail(&e);
        }
    }
}

fn fail(e: &PatternError) -> ! {
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

fn render(artifact: &PatternArtifact, format: OutputFormat) -> anyhow::Result<String> {
    let outputs = &artifact.outputs;
    let rendered = match format {
        OutputFormat::Markdown => outputs.markdown.clone(),
        OutputFormat::Text => outputs.text.clone(),
        OutputFormat::Json => serde_json::to_string_pretty(&outputs.json)?,
        OutputFormat::Summary => serde_json::to_string_pretty(&outputs.summary)?,
        OutputFormat::Artifact => serde_json::to_string_pretty(artifact)?,
    };
    Ok(rendered)
}
