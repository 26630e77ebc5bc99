use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::multipart;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::config::Credentials;

const INTERNAL_API: &str = "https://www.notion.so/api/v3";
const CLIENT_VERSION: &str = "23.13.20260227.0159";
const TEMPLATE_FORM_URL: &str = "https://www.notion.so/profile/templates/form/new";
const MAX_SCREENSHOTS: usize = 4;

/// Client for the internal web API (session cookies), used for marketplace
/// image uploads and template-draft submission.
pub struct MarketClient {
    client: reqwest::Client,
    cookies: String,
    user_id: String,
}

#[derive(Debug, Serialize)]
pub struct UploadedImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// Cover and screenshot images discovered in a template's image directory.
#[derive(Debug, Default)]
pub struct ImageSet {
    pub desktop: Option<PathBuf>,
    pub mobile: Option<PathBuf>,
    pub screenshots: Vec<PathBuf>,
    pub mobile_screenshots: Vec<PathBuf>,
}

impl ImageSet {
    pub fn count(&self) -> usize {
        self.desktop.iter().count()
            + self.mobile.iter().count()
            + self.screenshots.len()
            + self.mobile_screenshots.len()
    }
}

/// Classify a directory of jpg/png files by naming convention: a desktop
/// cover (desktop/cover/image), a mobile cover (mobile + image), numbered
/// "pc" screenshots and numbered "mobile" screenshots, capped at 4 each.
pub fn find_images(dir: &Path) -> Result<ImageSet> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Image directory not found: {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    files.sort();

    let desktop = files
        .iter()
        .find(|f| {
            let name = lower_name(f);
            ["desktop", "cover", "image"].iter().any(|k| name.contains(k))
                && !name.contains("mobile")
        })
        .cloned();

    let mobile = files
        .iter()
        .find(|f| {
            let name = lower_name(f);
            name.contains("mobile") && name.contains("image")
        })
        .cloned();

    let screenshots = files
        .iter()
        .filter(|f| lower_name(f).contains("pc") && Some(*f) != desktop.as_ref())
        .take(MAX_SCREENSHOTS)
        .cloned()
        .collect();

    let mobile_screenshots = files
        .iter()
        .filter(|f| {
            let name = lower_name(f);
            name.contains("mobile")
                && Some(*f) != mobile.as_ref()
                && name.chars().any(|c| c.is_ascii_digit())
        })
        .take(MAX_SCREENSHOTS)
        .cloned()
        .collect();

    Ok(ImageSet {
        desktop,
        mobile,
        screenshots,
        mobile_screenshots,
    })
}

impl MarketClient {
    pub fn new(creds: Credentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            cookies: creds.cookies,
            user_id: creds.user_id,
        }
    }

    fn post(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/{}", INTERNAL_API, endpoint))
            .header("accept", "*/*")
            .header("content-type", "application/json")
            .header("cookie", &self.cookies)
            .header("notion-audit-log-platform", "web")
            .header("notion-client-version", CLIENT_VERSION)
            .header("origin", "https://www.notion.so")
            .header("referer", TEMPLATE_FORM_URL)
            .header("x-notion-active-user-header", &self.user_id)
    }

    /// Upload every discovered image and assemble the submission's image
    /// payload (`image`, `mobileImage`, `screenshots`, `mobileScreenshots`).
    pub async fn upload_set(&self, images: &ImageSet) -> Result<Value> {
        let pb = ProgressBar::new(images.count() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );

        let mut payload = serde_json::Map::new();

        if let Some(desktop) = &images.desktop {
            info!("Uploading desktop cover: {}", file_name(desktop));
            pb.set_message(file_name(desktop));
            let uploaded = self.upload_image(desktop).await?;
            payload.insert("image".to_string(), serde_json::to_value(uploaded)?);
            pb.inc(1);
        }

        if let Some(mobile) = &images.mobile {
            info!("Uploading mobile cover: {}", file_name(mobile));
            pb.set_message(file_name(mobile));
            let uploaded = self.upload_image(mobile).await?;
            payload.insert("mobileImage".to_string(), serde_json::to_value(uploaded)?);
            pb.inc(1);
        }

        for (key, shots) in [
            ("screenshots", &images.screenshots),
            ("mobileScreenshots", &images.mobile_screenshots),
        ] {
            if shots.is_empty() {
                continue;
            }
            let mut uploaded = Vec::with_capacity(shots.len());
            for shot in shots {
                info!("Uploading screenshot: {}", file_name(shot));
                pb.set_message(file_name(shot));
                uploaded.push(self.upload_image(shot).await?);
                pb.inc(1);
            }
            payload.insert(key.to_string(), serde_json::to_value(uploaded)?);
        }

        pb.finish_and_clear();
        Ok(Value::Object(payload))
    }

    /// Upload one image: ask the internal API for a signed S3 grant, then
    /// push the bytes with whichever shape the grant calls for (multipart
    /// POST with its form fields, or a legacy signed PUT).
    pub async fn upload_image(&self, path: &Path) -> Result<UploadedImage> {
        let bytes =
            fs::read(path).with_context(|| format!("Could not read image {}", path.display()))?;
        let name = file_name(path);
        let content_type = content_type_for(path);

        let grant: Value = self
            .post("getUploadFileUrl")
            .json(&json!({
                "bucket": "public",
                "name": name,
                "contentType": content_type,
                "supportExtraHeaders": true,
                "contentLength": bytes.len(),
            }))
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("Upload URL request for {} was rejected", name))?
            .json()
            .await?;

        match grant.get("type").and_then(Value::as_str).unwrap_or("PUT") {
            "POST" => {
                let post_url = grant
                    .get("signedUploadPostUrl")
                    .and_then(Value::as_str)
                    .context("Upload grant missing signedUploadPostUrl")?;

                // S3 POST policies require the form fields before the file part.
                let mut form = multipart::Form::new();
                if let Some(fields) = grant.get("fields").and_then(Value::as_object) {
                    for (key, value) in fields {
                        form = form.text(
                            key.clone(),
                            value.as_str().unwrap_or_default().to_string(),
                        );
                    }
                }
                form = form.part(
                    "file",
                    multipart::Part::bytes(bytes)
                        .file_name(name.clone())
                        .mime_str(content_type)?,
                );

                self.client
                    .post(post_url)
                    .multipart(form)
                    .send()
                    .await?
                    .error_for_status()
                    .with_context(|| format!("S3 upload of {} failed", name))?;
            }
            _ => {
                let put_url = grant
                    .get("signedPutUrl")
                    .and_then(Value::as_str)
                    .context("Upload grant missing signedPutUrl")?;

                self.client
                    .put(put_url)
                    .header("Content-Type", content_type)
                    .body(bytes)
                    .send()
                    .await?
                    .error_for_status()
                    .with_context(|| format!("S3 upload of {} failed", name))?;
            }
        }

        let url = grant
            .get("url")
            .and_then(Value::as_str)
            .context("Upload grant missing url")?
            .to_string();
        let (width, height) = dimensions_for(&name);

        Ok(UploadedImage { url, width, height })
    }

    /// Submit a template draft to the marketplace; non-2xx is fatal.
    pub async fn submit_template(&self, draft: &Value) -> Result<Value> {
        let response = self
            .post("submitTemplateDraft")
            .json(draft)
            .send()
            .await?
            .error_for_status()
            .context("Template draft submission was rejected")?;
        Ok(response.json().await?)
    }
}

fn is_image(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .as_deref(),
        Some("jpg") | Some("jpeg") | Some("png")
    )
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

/// Marketplace display dimensions, inferred from the filename the same way
/// the web form does: wide desktop covers vs tall mobile captures.
fn dimensions_for(name: &str) -> (u32, u32) {
    let name = name.to_lowercase();
    if name.contains("desktop") || name.contains("pc") || name.contains("image") {
        (1920, 1200)
    } else {
        (750, 2668)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

fn lower_name(path: &Path) -> String {
    file_name(path).to_lowercase()
}
