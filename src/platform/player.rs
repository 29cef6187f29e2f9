//! Locating and fetching the player script referenced by a watch page

use crate::cipher::ScriptVersion;
use crate::error::RysigError;
use crate::platform::client::VideoClient;
use crate::utils::url::{extract_video_id, watch_url};
use regex::Regex;
use tracing::debug;
use url::Url;

/// Extract the player script URL from watch page HTML
///
/// Relative URLs are resolved against `base_url`.
pub fn extract_player_js_url(html: &str, base_url: &str) -> Result<String, RysigError> {
    #[allow(clippy::useless_vec)]
    let player_patterns = vec![
        // ytcfg: "jsUrl":"/s/player/0a1b2c3d/player_ias.vflset/en_US/base.js"
        r#""jsUrl"\s*:\s*"([^"]+)""#,
        // "PLAYER_JS_URL":"..."
        r#""PLAYER_JS_URL"\s*:\s*"([^"]+)""#,
        // <script src="/s/player/0a1b2c3d/player_ias.vflset/en_US/base.js" nonce="...">
        r#"<script[^>]+src="([^"]*/base\.js)""#,
    ];

    for pattern in player_patterns {
        let regex = Regex::new(pattern)?;
        if let Some(found) = regex.captures(html).and_then(|c| c.get(1)) {
            let raw = found.as_str().replace("\\/", "/");
            let url = Url::parse(base_url)?.join(&raw)?;
            debug!("Found player script URL: {}", url);
            return Ok(url.to_string());
        }
    }

    Err(RysigError::PlayerScriptNotFound)
}

/// Player script text together with its version
#[derive(Debug, Clone)]
pub struct PlayerScript {
    pub url: String,
    pub version: ScriptVersion,
    pub source: String,
}

/// Fetches watch pages and player scripts over a caller-supplied client
#[derive(Debug, Clone)]
pub struct PlayerFetcher {
    client: VideoClient,
}

impl PlayerFetcher {
    pub fn new(client: VideoClient) -> Self {
        Self { client }
    }

    /// Watch page URL for a video URL or raw video ID
    pub fn watch_url(&self, video: &str) -> Result<String, RysigError> {
        let video_id = extract_video_id(video)?;
        watch_url(&self.client.config().base_url, &video_id)
    }

    /// Fetch player.js URL from video page
    pub async fn fetch_player_js_url(&self, video: &str) -> Result<String, RysigError> {
        let page_url = self.watch_url(video)?;
        let html = self.client.get_text(&page_url).await?;
        extract_player_js_url(&html, &self.client.config().base_url)
    }

    /// Fetch player.js content
    pub async fn fetch_player_js(&self, player_js_url: &str) -> Result<PlayerScript, RysigError> {
        let source = self.client.get_text(player_js_url).await?;
        debug!(
            "Fetched player script {} ({} bytes)",
            player_js_url,
            source.len()
        );

        Ok(PlayerScript {
            url: player_js_url.to_string(),
            version: ScriptVersion::from_player_url(player_js_url),
            source,
        })
    }
}
