//! Signature deciphering against live player scripts

use crate::cipher::{DriverHint, ResolvedCipher, ScriptVersion};
use crate::error::RysigError;
use crate::platform::client::VideoClient;
use crate::platform::player::PlayerFetcher;
use crate::utils::cache::CipherCache;
use crate::utils::url::SignatureCipher;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Resolves and memoizes one cipher per player script version
///
/// Classification and recording run at most once per cached script version;
/// every signature of that version reuses the shared [`ResolvedCipher`].
#[derive(Clone)]
pub struct SignatureDecipherer {
    fetcher: PlayerFetcher,
    cache: CipherCache,
    driver_hint: DriverHint,
}

impl SignatureDecipherer {
    /// Create a new decipherer over a caller-supplied client
    pub fn new(client: VideoClient) -> Self {
        Self {
            fetcher: PlayerFetcher::new(client),
            cache: CipherCache::new(),
            driver_hint: DriverHint::Auto,
        }
    }

    pub fn with_cache_settings(mut self, ttl: Duration, capacity: u64) -> Self {
        self.cache = CipherCache::with_settings(ttl, capacity);
        self
    }

    pub fn with_cache_ttl(self, ttl: Duration) -> Self {
        self.with_cache_settings(ttl, CipherCache::DEFAULT_CAPACITY)
    }

    pub fn with_cache_capacity(self, capacity: u64) -> Self {
        self.with_cache_settings(CipherCache::DEFAULT_TTL, capacity)
    }

    pub fn with_driver_hint(mut self, hint: DriverHint) -> Self {
        self.driver_hint = hint;
        self
    }

    pub fn cache(&self) -> &CipherCache {
        &self.cache
    }

    /// Cipher for an already fetched script, resolved on first use
    pub async fn cipher_for_script(
        &self,
        version: ScriptVersion,
        script: &str,
    ) -> Result<Arc<ResolvedCipher>, RysigError> {
        let key = version.clone();
        self.cache
            .get_or_try_resolve(key, async { self.resolve(version, script) })
            .await
    }

    /// Cipher for the player script a video's watch page references
    ///
    /// The script itself is only fetched when its version is not cached.
    pub async fn cipher_for_video(&self, video: &str) -> Result<Arc<ResolvedCipher>, RysigError> {
        let player_url = self.fetcher.fetch_player_js_url(video).await?;
        let version = ScriptVersion::from_player_url(&player_url);

        self.cache
            .get_or_try_resolve(version.clone(), async {
                let script = self.fetcher.fetch_player_js(&player_url).await?;
                self.resolve(version, &script.source)
            })
            .await
    }

    fn resolve(
        &self,
        version: ScriptVersion,
        script: &str,
    ) -> Result<Arc<ResolvedCipher>, RysigError> {
        debug!("Cipher cache miss for {}", version);
        match ResolvedCipher::from_script(script, version, &self.driver_hint) {
            Ok(cipher) => Ok(Arc::new(cipher)),
            Err(e) => {
                if e.is_format_change() {
                    warn!("Player obfuscation format may have changed: {}", e);
                }
                Err(e)
            }
        }
    }

    /// Decipher one signature for a video
    ///
    /// A failure here concerns this signature only; the cached cipher stays.
    pub async fn decipher_signature(
        &self,
        signature: &str,
        video: &str,
    ) -> Result<String, RysigError> {
        let cipher = self.cipher_for_video(video).await?;
        Ok(cipher.decipher(signature)?)
    }

    /// Stream URL for a format's `signatureCipher` value
    pub async fn resolve_stream_url(
        &self,
        signature_cipher: &str,
        video: &str,
    ) -> Result<String, RysigError> {
        let parsed = SignatureCipher::parse(signature_cipher)?;
        let deciphered = self.decipher_signature(&parsed.signature, video).await?;
        let url = parsed.stream_url(&deciphered)?;
        info!("Resolved stream URL for {}", video);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::Operation;
    use crate::platform::client::HttpClientConfig;

    const PLAYER: &str = r#"var _yt={};(function(g){
        var Xq={Ab:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c},
        Zr:function(a){a.reverse()},
        k9:function(a,b){a.splice(b,1)}};
        var Kt=function(a){a=a.split("");Xq.Ab(a,2);Xq.Zr(a,17);Xq.k9(a,0);return a.join("")};
        g.sig=function(c){c&&(c=Kt(decodeURIComponent(c)));return c};
    })(_yt);"#;

    async fn server_with_player() -> (mockito::ServerGuard, Vec<mockito::Mock>) {
        let mut server = mockito::Server::new_async().await;
        let page = server
            .mock("GET", "/watch")
            .match_query(mockito::Matcher::Any)
            .with_body(r#"<script>ytcfg.set({"jsUrl":"/s/player/v42/base.js"})</script>"#)
            .create_async()
            .await;
        let script = server
            .mock("GET", "/s/player/v42/base.js")
            .with_body(PLAYER)
            .expect(1)
            .create_async()
            .await;
        (server, vec![page, script])
    }

    fn decipherer(server: &mockito::ServerGuard) -> SignatureDecipherer {
        let client = VideoClient::new(HttpClientConfig {
            base_url: server.url(),
            ..HttpClientConfig::default()
        })
        .unwrap();
        SignatureDecipherer::new(client)
    }

    #[tokio::test]
    async fn test_decipher_signature_caches_per_script_version() {
        let (server, mocks) = server_with_player().await;
        let decipherer = decipherer(&server);

        let first = decipherer
            .decipher_signature("abcdef", "dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(first, "edabc");

        let second = decipherer
            .decipher_signature("uvwxyz", "https://youtu.be/dQw4w9WgXcQ")
            .await
            .unwrap();
        assert_eq!(second, "yxuvw");

        // Script fetched once for both signatures
        mocks[1].assert_async().await;
        assert!(decipherer
            .cache()
            .get(&ScriptVersion::new("v42"))
            .await
            .is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_resolve_once() {
        let (server, mocks) = server_with_player().await;
        let decipherer = decipherer(&server);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let decipherer = decipherer.clone();
                tokio::spawn(async move { decipherer.cipher_for_video("dQw4w9WgXcQ").await })
            })
            .collect();

        let mut ciphers = Vec::new();
        for handle in handles {
            ciphers.push(handle.await.unwrap().unwrap());
        }

        mocks[1].assert_async().await;
        assert!(ciphers.iter().all(|c| Arc::ptr_eq(c, &ciphers[0])));
        assert_eq!(ciphers[0].decipher("abcdef").unwrap(), "edabc");
    }

    #[tokio::test]
    async fn test_interpretation_error_keeps_cache() {
        let (server, _mocks) = server_with_player().await;
        let decipherer = decipherer(&server);

        let err = decipherer
            .decipher_signature("", "dQw4w9WgXcQ")
            .await
            .unwrap_err();
        assert!(matches!(err, RysigError::Interpretation(_)));
        assert!(decipherer
            .cache()
            .get(&ScriptVersion::new("v42"))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_resolve_stream_url() {
        let (server, _mocks) = server_with_player().await;
        let decipherer = decipherer(&server);

        let url = decipherer
            .resolve_stream_url(
                "s=abcdef&sp=sig&url=https%3A%2F%2Fr1.example.com%2Fvideoplayback%3Fitag%3D18",
                "dQw4w9WgXcQ",
            )
            .await
            .unwrap();
        assert_eq!(url, "https://r1.example.com/videoplayback?itag=18&sig=edabc");
    }

    #[tokio::test]
    async fn test_cipher_for_script_reports_format_change() {
        let client = VideoClient::new(HttpClientConfig::default()).unwrap();
        let decipherer = SignatureDecipherer::new(client);

        let err = decipherer
            .cipher_for_script(ScriptVersion::new("broken"), "var a=1;")
            .await
            .unwrap_err();
        assert!(err.is_format_change());
        assert!(decipherer
            .cache()
            .get(&ScriptVersion::new("broken"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_failed_resolution_is_retried() {
        let client = VideoClient::new(HttpClientConfig::default()).unwrap();
        let decipherer = SignatureDecipherer::new(client).with_cache_capacity(4);
        let version = ScriptVersion::new("v7");

        assert!(decipherer
            .cipher_for_script(version.clone(), "var a=1;")
            .await
            .is_err());
        let cipher = decipherer
            .cipher_for_script(version.clone(), PLAYER)
            .await
            .unwrap();
        assert_eq!(cipher.version(), &version);
        assert_eq!(cipher.decipher("abcdef").unwrap(), "edabc");
    }

    #[tokio::test]
    async fn test_named_driver_hint() {
        let client = VideoClient::new(HttpClientConfig::default()).unwrap();
        let decipherer = SignatureDecipherer::new(client)
            .with_cache_ttl(Duration::from_secs(60))
            .with_driver_hint(DriverHint::Name("Kt".to_string()));

        let cipher = decipherer
            .cipher_for_script(ScriptVersion::from_content(PLAYER), PLAYER)
            .await
            .unwrap();
        assert_eq!(
            cipher.recipe().operations(),
            &[Operation::Swap(2), Operation::Reverse, Operation::RemoveAt(0)]
        );
    }
}
