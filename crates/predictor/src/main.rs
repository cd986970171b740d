mod chain;
mod client;
mod error;
mod response;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use contract_tag_eval::retry::RetryPolicy;
use contract_tag_eval::{Field, RecordLine};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::chain::chain_name;
use crate::client::{PerplexityClient, DEFAULT_ENDPOINT, DEFAULT_MODEL};

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Generate contract tag predictions for every address in a ground-truth file."
)]
struct Args {
    #[arg(
        long,
        default_value = "data/ground-truth/data-set1-mini.jsonl",
        help = "Ground truth JSON Lines file supplying the addresses"
    )]
    input: PathBuf,

    #[arg(long, help = "Output file [default: data/predictions/<input stem>_result.jsonl]")]
    output: Option<PathBuf>,

    #[arg(long, env = "PERPLEXITY_API_KEY", hide_env_values = true)]
    api_key: String,

    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    #[arg(long, default_value_t = 3, help = "Retries for rate-limited or failed requests")]
    max_retries: u32,

    #[arg(long, default_value_t = 1000, help = "Pause between contracts in milliseconds")]
    delay_ms: u64,
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "predictions".to_string());
    PathBuf::from("data/predictions").join(format!("{stem}_result.jsonl"))
}

/// Reads the `Contract Address` of every non-blank line, in file order.
fn read_addresses(path: &Path) -> Result<Vec<String>> {
    let payload = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let key = Field::ContractAddress.json_key();
    payload
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let value: Value = serde_json::from_str(line)
                .with_context(|| format!("{}:{}: invalid JSON", path.display(), idx + 1))?;
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .with_context(|| format!("{}:{}: missing '{key}'", path.display(), idx + 1))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tag_predict=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let output = args.output.clone().unwrap_or_else(|| default_output(&args.input));

    let addresses = read_addresses(&args.input)?;
    tracing::info!(count = addresses.len(), path = %args.input.display(), "loaded addresses");

    let retry = RetryPolicy::new(
        args.max_retries.saturating_add(1),
        Duration::from_millis(args.delay_ms.max(1)),
        Duration::from_secs(30),
    );
    let client = PerplexityClient::new(&args.endpoint, &args.api_key, &args.model, retry)
        .context("failed to build HTTP client")?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);

    let mut failed = Vec::new();
    for (idx, address) in addresses.iter().enumerate() {
        if idx > 0 {
            tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
        }
        tracing::info!(address = %address, chain = chain_name(address), "requesting prediction");
        let line = match client.predict(address).await {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(address = %address, error = %err, "no valid prediction");
                failed.push(address.as_str());
                RecordLine::empty(address.as_str())
            }
        };
        serde_json::to_writer(&mut writer, &line)?;
        writer.write_all(b"\n")?;
        // Keep partial output usable if the run is interrupted.
        writer.flush()?;
    }

    tracing::info!(
        processed = addresses.len(),
        succeeded = addresses.len() - failed.len(),
        failed = failed.len(),
        path = %output.display(),
        "predictions written"
    );
    for address in &failed {
        tracing::info!(address = %address, "failed address");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn output_defaults_next_to_predictions() {
        assert_eq!(
            default_output(Path::new("data/ground-truth/data-set1-mini.jsonl")),
            PathBuf::from("data/predictions/data-set1-mini_result.jsonl")
        );
    }

    #[test]
    fn reads_addresses_in_order() {
        let temp = assert_fs::TempDir::new().unwrap();
        let truth = temp.child("truth.jsonl");
        truth
            .write_str("{\"Contract Address\":\"eip155:10:0xdef\"}\n\n{\"Contract Address\":\"eip155:1:0xabc\",\"Project Name\":\"Uniswap\"}\n")
            .unwrap();
        let addresses = read_addresses(truth.path()).unwrap();
        assert_eq!(addresses, vec!["eip155:10:0xdef", "eip155:1:0xabc"]);
    }

    #[test]
    fn rejects_lines_without_address() {
        let temp = assert_fs::TempDir::new().unwrap();
        let truth = temp.child("truth.jsonl");
        truth.write_str("{\"Project Name\":\"Uniswap\"}\n").unwrap();
        let err = read_addresses(truth.path()).unwrap_err();
        assert!(err.to_string().contains("missing 'Contract Address'"));
    }
}
