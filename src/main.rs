//! takebot CLI entry point.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use takebot::config::Config;
use takebot::guild::{GuildBot, GuildRegistry};
use takebot::training::{self, FileOutcome};
use takebot::{InboundMessage, scheduler};
use tokio::io::AsyncBufReadExt as _;
use tracing_subscriber::EnvFilter;

/// Guild used for everything run from the command line.
const LOCAL_GUILD: u64 = 0;
const LOCAL_CHANNEL: u64 = 0;
const MENTION_PREFIX: &str = "@bot";

#[derive(Parser)]
#[command(name = "takebot")]
#[command(about = "A chat bot that learns how a guild talks and posts its own takes")]
struct Cli {
    /// Path to config file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train on a dataset (or the whole training root) and save the model
    Train {
        dataset: Option<String>,
        /// Only train on this file within the dataset
        #[arg(long)]
        file: Option<String>,
        /// Name to save the model under
        #[arg(long, default_value = "default")]
        save: String,
    },
    /// Print takes from a saved model
    Take {
        #[arg(long, default_value = "default")]
        model: String,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
        /// Answer this message instead of posting unprompted
        #[arg(long)]
        reply: Option<String>,
    },
    /// Print a rant from a saved model
    Rant {
        #[arg(long, default_value = "default")]
        model: String,
        /// Sentences to generate (defaults to the configured rant size)
        #[arg(long)]
        size: Option<usize>,
    },
    /// Show bot status for a saved model
    Status {
        #[arg(long)]
        model: Option<String>,
    },
    /// List datasets under the training root
    Datasets,
    /// List saved models
    Models,
    /// Count the lines of a corpus file
    Lines { dataset: String, file: String },
    /// Record messages from stdin as a corpus file, one message per line
    Record {
        name: String,
        #[arg(long, default_value = "users")]
        dataset: String,
    },
    /// Chat with the bot on stdin; lines starting with `@bot` mention it
    Chat {
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)
            .with_context(|| format!("failed to load config from {}", config_path.display()))?
    } else {
        Config::load().with_context(|| "failed to load configuration")?
    };

    tracing::debug!(
        training_root = %config.training_root.display(),
        model_root = %config.model_root.display(),
        "configuration loaded"
    );

    match cli.command {
        Command::Train { dataset, file, save } => train(config, dataset, file, &save).await,
        Command::Take { model, count, reply } => {
            let mut bot = local_bot(&config, Some(&model))?;
            for _ in 0..count {
                if let Some(take) = bot.generate_take(reply.as_deref(), false) {
                    println!("{take}");
                }
            }
            Ok(())
        }
        Command::Rant { model, size } => {
            let mut bot = local_bot(&config, Some(&model))?;
            if let Some(rant) = bot.generate_rant(size, false) {
                println!("{rant}");
            }
            Ok(())
        }
        Command::Status { model } => {
            let bot = local_bot(&config, model.as_deref())?;
            println!("{bot}");
            Ok(())
        }
        Command::Datasets => {
            let datasets = training::list_datasets(&config.training_root).with_context(|| {
                format!("failed to list datasets in {}", config.training_root.display())
            })?;
            println!("Available datasets: {}", datasets.join(", "));
            Ok(())
        }
        Command::Models => {
            let models = takebot::model::list_saved(&config.model_root).with_context(|| {
                format!("failed to list models in {}", config.model_root.display())
            })?;
            println!("Saved models: {}", models.join(", "));
            Ok(())
        }
        Command::Lines { dataset, file } => {
            let path = config.training_root.join(&dataset).join(&file);
            let lines = training::count_corpus_lines(&path)?;
            println!("{lines} lines found in {dataset}/{file}");
            Ok(())
        }
        Command::Record { name, dataset } => {
            let mut messages = Vec::new();
            let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                messages.push(line);
            }
            let path = training::write_corpus(&config.training_root, &dataset, &name, &messages)?;
            println!("Recorded {} messages to {}", messages.len(), path.display());
            Ok(())
        }
        Command::Chat { model } => chat(config, model).await,
    }
}

/// A bot for the local guild, posting to the local channel.
fn local_bot(config: &Config, model: Option<&str>) -> anyhow::Result<GuildBot> {
    let mut bot = GuildBot::new(LOCAL_GUILD, config)?;
    bot.set_channel(Some(LOCAL_CHANNEL));

    if let Some(name) = model {
        bot.load_model(name)
            .with_context(|| format!("failed to load model \"{name}\""))?;
    }
    Ok(bot)
}

async fn train(config: Config, dataset: Option<String>, file: Option<String>, save: &str) -> anyhow::Result<()> {
    let registry: GuildRegistry = GuildRegistry::new(Arc::new(config));
    let label = dataset.clone().unwrap_or_else(|| "<root>".into());

    let report = registry
        .train(LOCAL_GUILD, dataset, file)
        .await
        .with_context(|| format!("failed to train on {label}"))?;

    for outcome in &report.outcomes {
        match outcome {
            FileOutcome::Trained { file, lines } => println!("trained {file}: {lines} lines"),
            FileOutcome::Skipped { file, reason } => println!("skipped {file}: {reason}"),
        }
    }

    let bot = registry.bot(LOCAL_GUILD).await?;
    let path = bot.lock().await.save_model(save)?;
    println!(
        "Trained on {label} (order {}, {} lines), saved to {}",
        report.state_size,
        report.lines_trained(),
        path.display()
    );
    Ok(())
}

async fn chat(config: Config, model: Option<String>) -> anyhow::Result<()> {
    let tick = tokio::time::Duration::from_secs(config.random_tick_secs);
    let registry: Arc<GuildRegistry> = Arc::new(GuildRegistry::new(Arc::new(config)));

    {
        let bot = registry.bot(LOCAL_GUILD).await?;
        let mut bot = bot.lock().await;
        bot.set_channel(Some(LOCAL_CHANNEL));
        if let Some(name) = &model {
            bot.load_model(name)
                .with_context(|| format!("failed to load model \"{name}\""))?;
        }
    }

    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::channel(16);
    let ticker = scheduler::spawn_random_ticker(registry.clone(), tick, outbound_tx.clone());
    let printer = tokio::spawn(async move {
        while let Some(outbound) = outbound_rx.recv().await {
            println!("bot> {}", outbound.text);
        }
    });

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut message_id = 0;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };

        message_id += 1;
        let (content, mentions_bot) = match line.strip_prefix(MENTION_PREFIX) {
            Some(rest) => (rest.trim_start().to_string(), true),
            None => (line, false),
        };

        let message = InboundMessage {
            guild_id: LOCAL_GUILD,
            channel_id: LOCAL_CHANNEL,
            message_id,
            author_id: 1,
            content,
            mentions_bot,
            author_is_trusted: true,
        };

        if let Some(outbound) = registry.handle_message(&message).await?
            && outbound_tx.send(outbound).await.is_err()
        {
            break;
        }
    }

    ticker.abort();
    drop(outbound_tx);
    printer.await.ok();
    Ok(())
}
