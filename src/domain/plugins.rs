use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::Result;

/// Per-feed transform configuration. A pipeline step activates only when its
/// key is present; every field is independent of the others.
///
/// Serialized into the `plugins` column and exchanged over the wire in
/// camelCase, e.g. `{"jq": ".feed", "rewriteImageUrl": {"name": "data-src"}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginConfig {
    /// Proxy URL for the feed fetch and any scrape fetches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Extra request headers for the feed fetch and any scrape fetches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_header: Option<HashMap<String, String>>,
    /// jq program applied to the raw body before feed parsing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jq: Option<String>,
    /// Keep only the first N parsed items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// URL template applied to each item's URL before scraping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_rewrite: Option<String>,
    /// CSS selector whose matching subtrees replace the item content after
    /// re-fetching the item URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scraper: Option<String>,
    /// CSS selector of elements stripped from the item content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite_image_url: Option<RewriteImageUrl>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteImageUrl {
    /// Attribute holding the image URL; defaults to `src`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional URL template applied to the resolved image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
}

impl PluginConfig {
    pub fn parse(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Apply an RFC 7386 merge-patch: present keys overwrite, `null` keys
    /// clear, absent keys keep their stored value.
    pub fn merge_patch(&self, patch: &Value) -> Result<Self> {
        let mut doc = serde_json::to_value(self)?;
        merge(&mut doc, patch);
        Ok(serde_json::from_value(doc)?)
    }
}

fn merge(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(entries) => {
            if !target.is_object() {
                *target = Value::Object(Default::default());
            }
            let map = target.as_object_mut().expect("object ensured above");
            for (key, value) in entries {
                if value.is_null() {
                    map.remove(key);
                } else {
                    merge(map.entry(key.clone()).or_insert(Value::Null), value);
                }
            }
        }
        _ => *target = patch.clone(),
    }
}
