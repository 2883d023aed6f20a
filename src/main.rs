use std::env;
use std::path::PathBuf;

use anyhow::anyhow;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use podcast_tts::{ProviderKind, SynthesisResult, TtsDispatcher, TtsServiceConfig};

const USAGE: &str = "Usage:
  podcast-tts [--config <yaml>] [--provider <name>] speak <speaker> <text> <out-stem>
  podcast-tts [--config <yaml>] [--provider <name>] script <file> <out-stem>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Handle global options, then the command
    let mut args = env::args().skip(1).peekable();
    let mut config_path: Option<PathBuf> = None;
    let mut provider: Option<ProviderKind> = None;

    while let Some(arg) = args.peek() {
        match arg.as_str() {
            "-c" | "--config" => {
                args.next();
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                config_path = Some(PathBuf::from(path));
            }
            "-p" | "--provider" => {
                args.next();
                let name = args
                    .next()
                    .ok_or_else(|| anyhow!("--provider requires a provider name"))?;
                provider = Some(name.parse()?);
            }
            _ => break,
        }
    }

    // Load configuration
    let config = match &config_path {
        Some(path) => TtsServiceConfig::from_file(path),
        None => TtsServiceConfig::from_env(),
    }
    .map_err(|e| anyhow!(e.to_string()))?;

    let dispatcher = TtsDispatcher::from_config(&config)?;
    for kind in ProviderKind::ALL {
        if !config.has_credentials(kind) {
            warn!("{kind} backend has no credentials configured");
        }
    }
    let mut options = config.default_options();

    let command = args.next().ok_or_else(|| anyhow!("Missing command\n{USAGE}"))?;
    match command.as_str() {
        "speak" => {
            let (Some(speaker), Some(text), Some(out_stem)) = (args.next(), args.next(), args.next())
            else {
                anyhow::bail!("'speak' needs <speaker> <text> <out-stem>\n{USAGE}");
            };
            if let Some(extra) = args.next() {
                anyhow::bail!("Unexpected argument '{extra}' after 'speak'");
            }
            if provider.is_some() {
                options.provider = provider;
            }

            let result = dispatcher.synthesize(&text, &speaker, &options).await?;
            write_result(&result, &out_stem).await?;
        }
        "script" => {
            let (Some(file), Some(out_stem)) = (args.next(), args.next()) else {
                anyhow::bail!("'script' needs <file> <out-stem>\n{USAGE}");
            };
            if let Some(extra) = args.next() {
                anyhow::bail!("Unexpected argument '{extra}' after 'script'");
            }
            // Leave routing to the dispatcher unless a provider was named
            options.provider = provider;

            let contents = tokio::fs::read_to_string(&file)
                .await
                .map_err(|e| anyhow!("Failed to read script {file}: {e}"))?;
            let lines: Vec<String> = contents.lines().map(str::to_string).collect();

            let result = dispatcher.synthesize_script(&lines, &options).await?;
            write_result(&result, &out_stem).await?;
        }
        other => {
            anyhow::bail!("Unknown command '{other}'. Supported commands: speak, script\n{USAGE}");
        }
    }

    info!("{}", dispatcher.req_manager().metrics().summary());
    Ok(())
}

async fn write_result(result: &SynthesisResult, out_stem: &str) -> anyhow::Result<()> {
    let path = result.file_name(out_stem);
    tokio::fs::write(&path, &result.audio)
        .await
        .map_err(|e| anyhow!("Failed to write {path}: {e}"))?;
    println!("Wrote {} bytes of {} to {path}", result.len(), result.mime_type);
    Ok(())
}
