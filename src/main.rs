use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use steam_lowest::config::{BotConfig, CONFIG_KEYS};
use steam_lowest::logging::init_tracing;
use steam_lowest::reply::{Reply, ReplySink, Segment};
use steam_lowest::util::env;
use steam_lowest::PriceBot;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "steam-lowest", version, about = "Steam price and history-low lookup")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Current CN price, history low and comparison-region price for a game name or store link
    Lowest {
        /// Game name or https://store.steampowered.com/app/<id> link
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Also print the merged result as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Search the aggregator and list matching games with thumbnails and prices
    Search {
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
}

fn print_reply(reply: &Reply) {
    for segment in &reply.segments {
        match segment {
            Segment::Text(text) => println!("{text}"),
            Segment::ImageUrl(url) => println!("[image] {url}"),
            Segment::ImageBase64 { content_type, data } => println!(
                "[image {}; {} base64 chars]",
                content_type.as_deref().unwrap_or("unknown"),
                data.len()
            ),
        }
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env::init_env();
    init_tracing("info")?;
    env::preflight_check("steam-lowest", &[], CONFIG_KEYS)?;

    let config = BotConfig::from_env().context("loading configuration")?;
    info!(compare_region = %config.compare_region, "config loaded");
    let bot = PriceBot::new(config)?;

    let (sink, mut rx) = ReplySink::channel();
    let printer = tokio::spawn(async move {
        while let Some(reply) = rx.recv().await {
            print_reply(&reply);
        }
    });

    match cli.command {
        Commands::Lowest { query, json } => {
            let raw = query.join(" ");
            let result = bot.lowest_price(&raw, &sink).await;
            drop(sink);
            printer.await?;
            if json {
                if let Some(result) = result {
                    println!("{}", serde_json::to_string_pretty(&result)?);
                }
            }
        }
        Commands::Search { name } => {
            bot.search_games(&name.join(" "), &sink).await;
            drop(sink);
            printer.await?;
        }
    }

    Ok(())
}
