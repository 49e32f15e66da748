use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use earlysign::config::Command;
use earlysign::{Analysis, Analyzer, ClientConfig, Config, InferenceClient, ProgressEvent};

const EXAMPLES: &[&str] = &[
    "I had a relaxing day at the park with my family.",
    "Lately I feel empty and it's hard to get out of bed.",
];

const WARMUP_POLL: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,earlysign=debug".into());
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let client_config = ClientConfig::from(&config);
    let labels = config.label_map()?;
    let threshold = config.validated_threshold()?;
    tracing::info!(
        model_id = %client_config.model_id,
        authenticated = client_config.token.is_some(),
        max_attempts = client_config.retry.max_attempts,
        "Starting classifier client"
    );

    let (progress_tx, progress_rx) = flume::unbounded();
    let client = Arc::new(InferenceClient::new(&client_config)?.with_progress(progress_tx));

    let printer = tokio::spawn(print_progress(progress_rx, std::io::stderr()));

    if config.warmup_secs > 0 && !matches!(config.command, Command::Ping) {
        eprintln!("Warming up model (first call can take up to a minute)...");
        let ready = client
            .wait_until_ready(Duration::from_secs(config.warmup_secs), WARMUP_POLL)
            .await;
        if !ready {
            eprintln!("Model is not ready yet; requests may be slow.");
        }
    }

    let analyzer = Analyzer::new(client.clone(), labels, threshold, config.min_chars)?;

    match config.command {
        Command::Ping => {
            let status = client.ping().await;
            println!("{}: {}", client_config.model_id, status.as_str());
            if let earlysign::ModelStatus::Unreachable(detail) = status {
                println!("  {detail}");
            }
        }
        Command::Analyze { text, raw } => match analyzer.analyze(&text).await {
            Ok(analysis) => {
                print_verdict(&analysis);
                if raw {
                    println!("{}", serde_json::to_string_pretty(&analysis.raw)?);
                }
            }
            Err(err) => report_failure(&client, &err).await,
        },
        Command::Examples => {
            let results = analyzer.analyze_batch(EXAMPLES).await;
            for (text, result) in EXAMPLES.iter().zip(results) {
                match result {
                    Ok(analysis) => println!("{}  {text}", analysis.verdict),
                    Err(err) => println!("Error on example: {err}  {text}"),
                }
            }
        }
    }

    // The client and the analyzer hold the only senders; the printer drains
    // what is queued and exits once both are gone.
    drop(analyzer);
    drop(client);
    printer.await?;

    Ok(())
}

/// Write a line per retry to `out` until every sender is dropped.
async fn print_progress<W: Write>(events: flume::Receiver<ProgressEvent>, mut out: W) -> W {
    while let Ok(event) = events.recv_async().await {
        if let ProgressEvent::Retrying {
            attempt,
            reason,
            delay,
        } = event
        {
            let _ = writeln!(out, "attempt {attempt} failed ({reason}); retrying in {delay:?}");
        }
    }
    out
}

fn print_verdict(analysis: &Analysis) {
    let marker = if analysis.verdict.concerning { "!" } else { "ok" };
    println!("[{marker}] {}", analysis.verdict);
}

/// Print the failure and, for anything but bad input, a ping of the model
/// so the user can tell an unreachable endpoint from a misconfigured one.
async fn report_failure(client: &InferenceClient, err: &earlysign::ClassifyError) {
    println!("API error: {err}");
    if !matches!(err, earlysign::ClassifyError::InvalidInput { .. }) {
        let status = client.ping().await;
        println!("Model status: {}", status.as_str());
    }
}
