//! URL utilities: video IDs, signature cipher parameters and stream URL assembly

use crate::error::RysigError;
use url::Url;

/// Query parameter name the deciphered signature goes under by default
pub const DEFAULT_SIGNATURE_PARAM: &str = "signature";

fn is_raw_video_id(input: &str) -> bool {
    input.len() == 11
        && input
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Extract video ID from a raw ID or the usual watch, short and embed URLs
pub fn extract_video_id(url: &str) -> Result<String, RysigError> {
    if is_raw_video_id(url) {
        return Ok(url.to_string());
    }

    let parsed = Url::parse(url)?;

    match parsed.host_str() {
        Some("youtu.be") => {
            let path = parsed.path().trim_start_matches('/');
            if path.is_empty() {
                return Err(RysigError::InvalidUrl("Missing video ID".to_string()));
            }
            Ok(path.to_string())
        }
        Some("youtube.com") | Some("www.youtube.com") | Some("m.youtube.com") => {
            let path = parsed.path();
            if path.starts_with("/watch") {
                return parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.to_string())
                    .ok_or_else(|| RysigError::InvalidUrl("Missing v parameter".to_string()));
            }

            for prefix in ["/shorts/", "/embed/", "/live/"] {
                if let Some(video_id) = path.strip_prefix(prefix) {
                    if video_id.is_empty() {
                        return Err(RysigError::InvalidUrl(format!(
                            "Missing video ID in {} path",
                            prefix.trim_matches('/')
                        )));
                    }
                    return Ok(video_id.to_string());
                }
            }

            Err(RysigError::InvalidUrl(
                "Unsupported video URL format".to_string(),
            ))
        }
        _ => Err(RysigError::InvalidUrl(
            "Not a supported video platform URL".to_string(),
        )),
    }
}

/// Watch page URL for a video on `base_url`
pub fn watch_url(base_url: &str, video_id: &str) -> Result<String, RysigError> {
    let mut url = Url::parse(base_url)?.join("/watch")?;
    url.query_pairs_mut().append_pair("v", video_id);
    Ok(url.to_string())
}

/// Parameters of a format's `signatureCipher` (or legacy `cipher`) field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureCipher {
    /// Stream URL still missing its signature
    pub url: String,
    /// Ciphered signature
    pub signature: String,
    /// Query parameter the deciphered signature belongs under
    pub signature_param: String,
}

impl SignatureCipher {
    /// Parse the form-encoded `s=...&sp=...&url=...` string
    pub fn parse(query: &str) -> Result<Self, RysigError> {
        let mut url = None;
        let mut signature = None;
        let mut signature_param = None;

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "url" => url = Some(value.into_owned()),
                "s" => signature = Some(value.into_owned()),
                "sp" => signature_param = Some(value.into_owned()),
                _ => {}
            }
        }

        let url = url.ok_or_else(|| RysigError::InvalidSignatureCipher("missing url".to_string()))?;
        let signature = signature
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RysigError::InvalidSignatureCipher("missing s".to_string()))?;

        Ok(Self {
            url,
            signature,
            signature_param: signature_param
                .filter(|sp| !sp.is_empty())
                .unwrap_or_else(|| DEFAULT_SIGNATURE_PARAM.to_string()),
        })
    }

    /// Stream URL carrying the deciphered signature
    pub fn stream_url(&self, deciphered: &str) -> Result<String, RysigError> {
        append_query_param(&self.url, &self.signature_param, deciphered)
    }
}

/// Set `name=value` on `url`, replacing any existing values of `name`
pub fn append_query_param(url: &str, name: &str, value: &str) -> Result<String, RysigError> {
    let mut parsed = Url::parse(url)?;
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != name)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut query = parsed.query_pairs_mut();
        query.clear();
        for (key, value) in &kept {
            query.append_pair(key, value);
        }
        query.append_pair(name, value);
    }

    Ok(parsed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        assert_eq!(
            extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );

        assert_eq!(
            extract_video_id("https://www.youtube.com/shorts/brZCOVlyPPo").unwrap(),
            "brZCOVlyPPo"
        );

        assert_eq!(
            extract_video_id("https://www.youtube.com/embed/brZCOVlyPPo").unwrap(),
            "brZCOVlyPPo"
        );

        assert_eq!(extract_video_id("dQw4w9WgXcQ").unwrap(), "dQw4w9WgXcQ");

        // Test error cases
        assert!(extract_video_id("https://www.youtube.com/watch").is_err());
        assert!(extract_video_id("https://example.com").is_err());
    }

    #[test]
    fn test_extract_video_id_edge_cases() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10s").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert_eq!(
            extract_video_id("https://YOUTU.BE/dQw4w9WgXcQ").unwrap(),
            "dQw4w9WgXcQ"
        );
        assert!(extract_video_id("https://youtu.be/").is_err());
        assert!(extract_video_id("https://www.youtube.com/shorts/").is_err());
        assert!(extract_video_id("https://www.youtube.com/channel/UCxxx").is_err());
        assert!(extract_video_id("not-a-url").is_err());
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(
            watch_url("https://www.youtube.com", "dQw4w9WgXcQ").unwrap(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            watch_url("http://127.0.0.1:1234/", "abc").unwrap(),
            "http://127.0.0.1:1234/watch?v=abc"
        );
    }

    #[test]
    fn test_signature_cipher_parse() {
        let cipher = SignatureCipher::parse(
            "s=AOq0QJ8w%3D%3Dabc&sp=sig&url=https%3A%2F%2Fr1.example.com%2Fvideoplayback%3Fitag%3D18",
        )
        .unwrap();
        assert_eq!(cipher.signature, "AOq0QJ8w==abc");
        assert_eq!(cipher.signature_param, "sig");
        assert_eq!(cipher.url, "https://r1.example.com/videoplayback?itag=18");
    }

    #[test]
    fn test_signature_cipher_defaults_and_errors() {
        let cipher =
            SignatureCipher::parse("s=abc&url=https%3A%2F%2Fr1.example.com%2Fvp").unwrap();
        assert_eq!(cipher.signature_param, DEFAULT_SIGNATURE_PARAM);

        assert!(matches!(
            SignatureCipher::parse("sp=sig&url=https%3A%2F%2Fr1.example.com"),
            Err(RysigError::InvalidSignatureCipher(_))
        ));
        assert!(matches!(
            SignatureCipher::parse("s=abc"),
            Err(RysigError::InvalidSignatureCipher(_))
        ));
    }

    #[test]
    fn test_stream_url() {
        let cipher = SignatureCipher::parse(
            "s=abc&sp=sig&url=https%3A%2F%2Fr1.example.com%2Fvideoplayback%3Fitag%3D18%26sig%3Dold",
        )
        .unwrap();
        assert_eq!(
            cipher.stream_url("cba").unwrap(),
            "https://r1.example.com/videoplayback?itag=18&sig=cba"
        );
    }

    #[test]
    fn test_append_query_param() {
        assert_eq!(
            append_query_param("https://example.com/vp", "signature", "a/b=").unwrap(),
            "https://example.com/vp?signature=a%2Fb%3D"
        );
        assert!(append_query_param("not a url", "s", "x").is_err());
    }
}
