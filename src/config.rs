use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Session credentials for the internal web API.
pub struct Credentials {
    pub cookies: String,
    pub user_id: String,
}

fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("notion"))
}

/// Integration API key from `~/.config/notion/api_key`.
pub fn api_key() -> Result<String> {
    let path = config_dir()?.join("api_key");
    let key = fs::read_to_string(&path)
        .with_context(|| format!("Notion API key not found at {}", path.display()))?;
    Ok(key.trim().to_string())
}

/// Session cookies and user id saved by `save-cookies`.
pub fn credentials() -> Result<Credentials> {
    let dir = config_dir()?;

    let cookie_path = dir.join("cookies.txt");
    let cookies = fs::read_to_string(&cookie_path).with_context(|| {
        format!(
            "Cookies not found at {}\nRun 'notion_publish save-cookies' first",
            cookie_path.display()
        )
    })?;

    let user_id_path = dir.join("user_id.txt");
    let user_id = fs::read_to_string(&user_id_path).with_context(|| {
        format!(
            "User ID not found at {}\nRun 'notion_publish save-cookies' first",
            user_id_path.display()
        )
    })?;

    Ok(Credentials {
        cookies: cookies.trim().to_string(),
        user_id: user_id.trim().to_string(),
    })
}

/// Persist a pasted Cookie header and user id; returns the written paths.
pub fn save_credentials(cookies: &str, user_id: &str) -> Result<(PathBuf, PathBuf)> {
    let dir = config_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Could not create config directory {}", dir.display()))?;

    let cookie_path = dir.join("cookies.txt");
    fs::write(&cookie_path, cookies)
        .with_context(|| format!("Could not write {}", cookie_path.display()))?;

    let user_id_path = dir.join("user_id.txt");
    fs::write(&user_id_path, user_id)
        .with_context(|| format!("Could not write {}", user_id_path.display()))?;

    Ok((cookie_path, user_id_path))
}

/// Pull the `notion_user_id` value out of a raw Cookie header.
pub fn user_id_from_cookies(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix("notion_user_id="))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
