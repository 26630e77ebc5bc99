mod api;
mod config;
mod extract;
mod market;
mod page;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "notion_publish",
    about = "Prepare and submit Notion marketplace template drafts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a page's title as JSON
    GetTitle {
        /// Notion page URL (or raw page id)
        url: String,
    },
    /// Print a page's block-tree summary as JSON
    GetContent {
        /// Notion page URL (or raw page id)
        url: String,
        /// Levels of nested blocks to descend into below the page
        #[arg(long, default_value_t = extract::DEFAULT_MAX_DEPTH)]
        depth: u32,
    },
    /// Upload cover/screenshot images from a directory, print the image payload
    UploadImages {
        /// Directory holding the template's jpg/png images
        dir: PathBuf,
        /// Session Cookie header (default: ~/.config/notion/cookies.txt)
        #[arg(long)]
        cookies: Option<String>,
        /// Active user id (default: ~/.config/notion/user_id.txt)
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Submit a template-draft JSON object to the marketplace
    Submit {
        /// Draft payload as a JSON string
        data: String,
        /// Session Cookie header (default: ~/.config/notion/cookies.txt)
        #[arg(long)]
        cookies: Option<String>,
        /// Active user id (default: ~/.config/notion/user_id.txt)
        #[arg(long)]
        user_id: Option<String>,
    },
    /// Save a Cookie header pasted from the browser for the internal API
    SaveCookies,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::GetTitle { url } => {
            let client = api::ApiClient::new(config::api_key()?);
            let page_id = page::page_id_from_url(&url);
            let title = client.page_title(&page_id).await?;
            println!("{}", serde_json::json!({ "title": title }));
        }
        Commands::GetContent { url, depth } => {
            let client = api::ApiClient::new(config::api_key()?);
            let page_id = page::page_id_from_url(&url);
            let content = client.page_content(&page_id, depth).await?;
            println!("{}", serde_json::to_string_pretty(&content)?);
        }
        Commands::UploadImages { dir, cookies, user_id } => {
            let creds = resolve_credentials(cookies, user_id)?;
            let images = market::find_images(&dir)?;
            if images.count() == 0 {
                println!("No images found in {}", dir.display());
                return Ok(());
            }
            info!("Uploading {} images from {}", images.count(), dir.display());
            let client = market::MarketClient::new(creds);
            let payload = client.upload_set(&images).await?;
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::Submit { data, cookies, user_id } => {
            let creds = resolve_credentials(cookies, user_id)?;
            let draft: serde_json::Value =
                serde_json::from_str(&data).context("Draft data is not valid JSON")?;
            let client = market::MarketClient::new(creds);
            let response = client.submit_template(&draft).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::SaveCookies => save_cookies()?,
    }

    Ok(())
}

fn resolve_credentials(
    cookies: Option<String>,
    user_id: Option<String>,
) -> Result<config::Credentials> {
    match (cookies, user_id) {
        (Some(cookies), Some(user_id)) => Ok(config::Credentials { cookies, user_id }),
        _ => {
            info!("Reading credentials from ~/.config/notion/");
            config::credentials()
        }
    }
}

fn save_cookies() -> Result<()> {
    println!("Open https://www.notion.so/profile/templates in your browser,");
    println!("open DevTools > Network, refresh, pick any request to notion.so,");
    println!("and copy the full Cookie request header.");

    let cookies: String = dialoguer::Input::new()
        .with_prompt("Cookie header")
        .interact_text()?;
    let cookies = cookies.trim().to_string();
    if cookies.is_empty() {
        bail!("No cookies provided");
    }

    let user_id = match config::user_id_from_cookies(&cookies) {
        Some(id) => id,
        None => {
            println!("Could not find notion_user_id in the pasted cookies.");
            dialoguer::Input::new()
                .with_prompt("notion_user_id")
                .interact_text()?
        }
    };

    let (cookie_path, user_id_path) = config::save_credentials(&cookies, &user_id)?;
    println!("Saved cookies to {}", cookie_path.display());
    println!("Saved user id to {}", user_id_path.display());
    Ok(())
}
