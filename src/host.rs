use std::collections::HashMap;

use anyhow::{Context, Result};
use log::info;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::{DedupeOptions, HostConfig};

/// One remote image record, as returned by the host's search API.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    /// Stable identifier, used as the dedupe key everywhere.
    pub public_id: String,
    pub secure_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    resources: Vec<Asset>,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    /// Per-identifier outcome, e.g. `"deleted"` or `"not_found"`.
    #[serde(default)]
    deleted: HashMap<String, String>,
}

/// The remote operations the batch pipeline depends on. A trait so the
/// pipeline can run against an in-memory host in tests.
pub trait AssetHost {
    /// Enumerate every image asset, following pagination to the end.
    /// Enumeration order is arbitrary but stable for one run.
    fn list_assets(&self) -> Result<Vec<Asset>>;

    /// Fetch the server-side-resized thumbnail bytes used for hashing.
    fn fetch_thumbnail(&self, asset: &Asset) -> Result<Vec<u8>>;

    /// Issue one batch deletion call and return the per-id status map.
    fn delete_assets(&self, public_ids: &[String]) -> Result<HashMap<String, String>>;
}

/// Blocking HTTP client for the Cloudinary admin and delivery APIs.
pub struct CloudinaryHost {
    config: HostConfig,
    client: Client,
    page_size: u32,
    thumb_size: u32,
}

impl CloudinaryHost {
    pub fn new(config: HostConfig, opts: &DedupeOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(opts.timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            config,
            client,
            page_size: opts.page_size,
            thumb_size: opts.thumb_size,
        })
    }

    fn api_url(&self, tail: &str) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{}",
            self.config.cloud_name, tail
        )
    }

    fn search_page(&self, cursor: Option<&str>) -> Result<SearchPage> {
        let mut body = json!({
            "expression": "resource_type:image",
            "max_results": self.page_size,
        });
        if let Some(cursor) = cursor {
            body["next_cursor"] = json!(cursor);
        }

        self.client
            .post(self.api_url("resources/search"))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .json(&body)
            .send()
            .and_then(|r| r.error_for_status())
            .context("asset search request failed")?
            .json::<SearchPage>()
            .context("failed to parse search response")
    }
}

impl AssetHost for CloudinaryHost {
    fn list_assets(&self) -> Result<Vec<Asset>> {
        let mut assets: Vec<Asset> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_no = 0u32;

        loop {
            page_no += 1;
            let page = self.search_page(cursor.as_deref())?;
            info!(
                "page {page_no}: {} assets (total {})",
                page.resources.len(),
                assets.len() + page.resources.len()
            );
            assets.extend(page.resources);
            cursor = page.next_cursor;
            if cursor.is_none() {
                break;
            }
        }

        Ok(assets)
    }

    fn fetch_thumbnail(&self, asset: &Asset) -> Result<Vec<u8>> {
        let url = thumbnail_url(&asset.secure_url, self.thumb_size);
        let bytes = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("thumbnail fetch failed for {}", asset.public_id))?
            .bytes()
            .with_context(|| format!("thumbnail body read failed for {}", asset.public_id))?;
        Ok(bytes.to_vec())
    }

    fn delete_assets(&self, public_ids: &[String]) -> Result<HashMap<String, String>> {
        let form: Vec<(&str, &str)> = public_ids
            .iter()
            .map(|id| ("public_ids[]", id.as_str()))
            .collect();

        let response = self
            .client
            .delete(self.api_url("resources/image/upload"))
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .form(&form)
            .send()
            .and_then(|r| r.error_for_status())
            .context("batch deletion request failed")?
            .json::<DeleteResponse>()
            .context("failed to parse deletion response")?;

        Ok(response.deleted)
    }
}

/// Rewrite a delivery URL to request a server-side `size`×`size` crop,
/// bounding transfer and decode cost for hashing.
pub fn thumbnail_url(url: &str, size: u32) -> String {
    url.replace("/upload/", &format!("/upload/c_fill,w_{size},h_{size}/"))
}
