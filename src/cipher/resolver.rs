//! One script version's resolved cipher

use crate::cipher::classifier::{classify_functions, FunctionNameSet};
use crate::cipher::recipe::Recipe;
use crate::cipher::recorder::{record_functions, DriverHint};
use crate::cipher::script::{find_functions, tokenize};
use crate::error::{InterpretationError, RysigError};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, info};

/// Identifier of one build of the player script
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ScriptVersion(String);

impl ScriptVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Version from a player URL such as `/s/player/0a1b2c3d/player_ias.vflset/en_US/base.js`
    ///
    /// URLs without a player path segment are used whole.
    pub fn from_player_url(url: &str) -> Self {
        let version = Regex::new(r"/s/player/([a-zA-Z0-9_-]+)/")
            .ok()
            .and_then(|regex| regex.captures(url))
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string());

        match version {
            Some(version) => Self(version),
            None => Self(url.to_string()),
        }
    }

    /// Version from a SHA-256 digest of the script text
    pub fn from_content(script: &str) -> Self {
        let digest = Sha256::digest(script.as_bytes());
        Self(format!("sha256:{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScriptVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Helper names and recipe built together from one script text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCipher {
    version: ScriptVersion,
    names: FunctionNameSet,
    recipe: Recipe,
}

impl ResolvedCipher {
    /// Classify the helpers and record the driver's recipe
    ///
    /// The script is tokenized once and shared by both passes.
    pub fn from_script(
        script: &str,
        version: ScriptVersion,
        hint: &DriverHint,
    ) -> Result<Self, RysigError> {
        debug!("Resolving cipher for script version {}", version);

        let tokens = tokenize(script);
        let functions = find_functions(&tokens);
        let names = classify_functions(&functions)?;
        debug!(
            "Helpers: swap={} reverse={} remove_at={}",
            names.swap(),
            names.reverse(),
            names.remove_at()
        );

        let located = match hint {
            DriverHint::Auto => DriverHint::locate(script),
            DriverHint::Name(_) => None,
        };
        let recipe = record_functions(&functions, hint, &names, located.as_deref())?;
        info!(
            "Resolved cipher for {}: {} operations",
            version,
            recipe.len()
        );

        Ok(Self {
            version,
            names,
            recipe,
        })
    }

    pub fn version(&self) -> &ScriptVersion {
        &self.version
    }

    pub fn names(&self) -> &FunctionNameSet {
        &self.names
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Decrypt one ciphered signature
    pub fn decipher(&self, signature: &str) -> Result<String, InterpretationError> {
        self.recipe.apply(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::recipe::Operation;
    use crate::error::{ClassificationError, RecordingError};

    const PLAYER: &str = r#"
        var Xq={Ab:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c},
        Zr:function(a){a.reverse()},
        k9:function(a,b){a.splice(b,1)}};
        Kt=function(a){a=a.split("");Xq.Ab(a,2);Xq.Zr(a,17);Xq.k9(a,0);return a.join("")};
        g.sig=function(c){c&&(c=Kt(decodeURIComponent(c)));return c};
    "#;

    #[test]
    fn test_from_script() {
        let cipher =
            ResolvedCipher::from_script(PLAYER, ScriptVersion::new("v1"), &DriverHint::Auto)
                .unwrap();
        assert_eq!(cipher.names().swap(), "Ab");
        assert_eq!(
            cipher.recipe().operations(),
            &[Operation::Swap(2), Operation::Reverse, Operation::RemoveAt(0)]
        );
        assert_eq!(cipher.decipher("abcdef").unwrap(), "edabc");
        assert_eq!(cipher.version().as_str(), "v1");
    }

    #[test]
    fn test_from_script_failures() {
        let err = ResolvedCipher::from_script(
            "var x=function(a){a.reverse()};",
            ScriptVersion::new("v1"),
            &DriverHint::Auto,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RysigError::Classification(ClassificationError::NotFound(_))
        ));

        let toolkit_only = &PLAYER[..PLAYER.find("Kt=").unwrap()];
        let err = ResolvedCipher::from_script(
            toolkit_only,
            ScriptVersion::new("v1"),
            &DriverHint::Auto,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RysigError::Recording(RecordingError::NoDriverFound)
        ));
    }

    #[test]
    fn test_interpretation_error_keeps_cipher_usable() {
        let cipher =
            ResolvedCipher::from_script(PLAYER, ScriptVersion::new("v1"), &DriverHint::Auto)
                .unwrap();
        assert!(cipher.decipher("").is_err());
        assert_eq!(cipher.decipher("abcdef").unwrap(), "edabc");
    }

    #[test]
    fn test_script_version_from_player_url() {
        let version = ScriptVersion::from_player_url(
            "https://www.youtube.com/s/player/0a1b2c3d/player_ias.vflset/en_US/base.js",
        );
        assert_eq!(version.as_str(), "0a1b2c3d");

        let version = ScriptVersion::from_player_url("https://cdn.example.com/player.js");
        assert_eq!(version.as_str(), "https://cdn.example.com/player.js");
    }

    #[test]
    fn test_script_version_from_content() {
        let a = ScriptVersion::from_content("var a=1;");
        let b = ScriptVersion::from_content("var a=2;");
        assert_ne!(a, b);
        assert_eq!(a, ScriptVersion::from_content("var a=1;"));
        assert!(a.as_str().starts_with("sha256:"));
        assert_eq!(a.as_str().len(), "sha256:".len() + 64);
    }
}
