// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin outbound HTTP client to the controller, grounded on
//! `upstream::client::UpstreamClient`'s shape almost verbatim.

use reqwest::Client;

/// HTTP client wrapper for the controller API.
pub struct ControllerClient {
    base_url: String,
    client: Client,
}

impl ControllerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { base_url: base_url.into(), client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `PATCH /placard/url` with `{"url": url}`, or the literal sentinel
    /// `"lock"` string when `url` is `None`. Falls back to the legacy
    /// `PATCH /placard` route on a 404 from the primary one.
    pub async fn patch_placard_url(&self, url: Option<&str>) -> anyhow::Result<()> {
        let body = serde_json::json!({ "url": url.unwrap_or("lock") });
        let resp = self.client.patch(self.url("/placard/url")).json(&body).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            self.client.patch(self.url("/placard")).json(&body).send().await?.error_for_status()?;
            return Ok(());
        }
        resp.error_for_status()?;
        Ok(())
    }

    /// `PATCH /current`, forwarding only `lock`, `end_time`, `last_interaction`.
    pub async fn patch_current_experience(&self, fields: serde_json::Value) -> anyhow::Result<()> {
        let mut body = serde_json::Map::new();
        if let Some(obj) = fields.as_object() {
            for key in ["lock", "end_time", "last_interaction"] {
                if let Some(v) = obj.get(key) {
                    body.insert(key.to_owned(), v.clone());
                }
            }
        }
        self.client
            .patch(self.url("/current"))
            .json(&serde_json::Value::Object(body))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// `GET /placard/url` — used by the watchdog to detect a cleared URL.
    pub async fn get_placard(&self) -> anyhow::Result<serde_json::Value> {
        let resp = self.client.get(self.url("/placard/url")).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }

    pub async fn get_experiences(&self) -> anyhow::Result<serde_json::Value> {
        let resp = self.client.get(self.url("/experiences")).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }

    pub async fn get_collections(&self) -> anyhow::Result<serde_json::Value> {
        let resp = self.client.get(self.url("/collections")).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }

    pub async fn get_current(&self) -> anyhow::Result<serde_json::Value> {
        let resp = self.client.get(self.url("/current")).send().await?;
        Ok(resp.error_for_status()?.json().await?)
    }

    pub async fn put_current(&self, body: serde_json::Value) -> anyhow::Result<()> {
        self.client.put(self.url("/current")).json(&body).send().await?.error_for_status()?;
        Ok(())
    }
}
