//! Source text to transportable payload and back.

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use lattice_topology::{Document, ParseResult, ParseWarning, theme_id};
use serde::Serialize;

use crate::binary::{self, EncodeOptions};
use crate::capacity::{self, SymbolEstimate};
use crate::compression;
use crate::config::PackagerConfig;
use crate::dictionary::Dictionary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    /// Bytes to embed: gzip framed when compression is on.
    pub payload: Vec<u8>,
    /// Size of the binary form before compression.
    pub binary_len: usize,
    pub compressed: bool,
    pub warnings: Vec<ParseWarning>,
    /// Smallest symbol holding the payload at the configured level.
    pub estimate: Option<SymbolEstimate>,
}

impl Package {
    pub fn to_url_fragment(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.payload)
    }

    pub fn fits(&self) -> bool {
        self.estimate.is_some()
    }
}

pub struct Packager {
    config: PackagerConfig,
    dictionary: Dictionary,
}

impl Packager {
    pub fn new(config: PackagerConfig) -> Self {
        Self::with_dictionary(config, Dictionary::new())
    }

    /// A packager sharing a session dictionary with the other side.
    pub fn with_dictionary(config: PackagerConfig, dictionary: Dictionary) -> Self {
        Self { config, dictionary }
    }

    pub fn config(&self) -> &PackagerConfig {
        &self.config
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    pub fn dictionary_mut(&mut self) -> &mut Dictionary {
        &mut self.dictionary
    }

    pub fn parse(&self, source: &str) -> ParseResult {
        lattice_topology::parse(source)
    }

    fn encode_options(&self) -> EncodeOptions {
        let default_theme = theme_id(&self.config.default_theme).unwrap_or_else(|| {
            log::warn!(
                "unknown default theme '{}', using default",
                self.config.default_theme
            );
            0
        });
        EncodeOptions {
            feature_flags: self.config.feature_flags,
            default_theme,
        }
    }

    /// Encode an already parsed document.
    pub async fn pack_document(&self, document: &Document) -> Result<Package> {
        let binary = binary::encode_with(document, &self.dictionary, &self.encode_options())
            .context("Failed to encode document")?;
        let binary_len = binary.len();
        let payload = if self.config.compress {
            compression::compress(&binary)
                .await
                .context("Failed to compress payload")?
        } else {
            binary
        };
        let compressed = compression::is_framed(&payload);
        let estimate = capacity::estimate(payload.len(), self.config.error_correction);
        match &estimate {
            Some(estimate) => log::debug!(
                "packed {binary_len} -> {} bytes, version {} at {}",
                payload.len(),
                estimate.version,
                estimate.level
            ),
            None => log::warn!(
                "payload of {} bytes exceeds every symbol at level {}",
                payload.len(),
                self.config.error_correction
            ),
        }
        Ok(Package {
            payload,
            binary_len,
            compressed,
            warnings: Vec::new(),
            estimate,
        })
    }

    pub async fn pack(&self, source: &str) -> Result<Package> {
        let ParseResult { document, warnings } = self.parse(source);
        for warning in &warnings {
            log::debug!("{warning}");
        }
        let mut package = self.pack_document(&document).await?;
        package.warnings = warnings;
        Ok(package)
    }

    pub async fn unpack(&self, bytes: &[u8]) -> Result<Document> {
        let binary = compression::decompress_auto(bytes)
            .await
            .context("Failed to decompress payload")?;
        let document =
            binary::decode(&binary, &self.dictionary).context("Failed to decode payload")?;
        Ok(document)
    }

    /// Unpack a base64url fragment as produced by [`Package::to_url_fragment`].
    pub async fn unpack_fragment(&self, fragment: &str) -> Result<Document> {
        let bytes = URL_SAFE_NO_PAD
            .decode(fragment.trim().trim_start_matches('#'))
            .context("Payload fragment is not base64url")?;
        self.unpack(&bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::ErrorCorrection;
    use lattice_topology::WarningKind;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "\
@theme dark
@title shop
header|welcome back
list
  item|$o coins
  item|$u bonus
  item|$c total
footer|help";

    #[test]
    fn test_pack_and_unpack() {
        let packager = Packager::new(PackagerConfig::default());
        let package = smol::block_on(packager.pack(SOURCE)).unwrap();
        assert_eq!(package.compressed, compression::GZIP_AVAILABLE);
        assert!(package.warnings.is_empty());
        assert!(package.fits());
        assert_eq!(package.estimate.unwrap().level, ErrorCorrection::M);

        let document = smol::block_on(packager.unpack(&package.payload)).unwrap();
        assert_eq!(document, packager.parse(SOURCE).document);
    }

    #[test]
    fn test_uncompressed_payload_is_the_binary() {
        let packager = Packager::new(PackagerConfig {
            compress: false,
            ..Default::default()
        });
        let package = smol::block_on(packager.pack(SOURCE)).unwrap();
        assert!(!package.compressed);
        assert_eq!(package.payload.len(), package.binary_len);
        assert_eq!(package.payload[0], binary::FORMAT_ID);
        let document = smol::block_on(packager.unpack(&package.payload)).unwrap();
        assert_eq!(document.directive("theme"), Some("dark"));
    }

    #[test]
    fn test_url_fragment_roundtrip() {
        let packager = Packager::new(PackagerConfig::default());
        let package = smol::block_on(packager.pack(SOURCE)).unwrap();
        let fragment = package.to_url_fragment();
        assert_eq!(fragment.len(), capacity::base64url_len(package.payload.len()));
        assert!(!fragment.contains(['+', '/', '=']));

        let from_fragment =
            smol::block_on(packager.unpack_fragment(&format!("#{fragment}"))).unwrap();
        assert_eq!(from_fragment, packager.parse(SOURCE).document);
        assert!(smol::block_on(packager.unpack_fragment("not base64!")).is_err());
    }

    #[test]
    fn test_warnings_and_header_settings_carry_through() {
        let packager = Packager::new(PackagerConfig {
            compress: false,
            feature_flags: 0b10_1010,
            default_theme: "sepia".into(),
            ..Default::default()
        });
        let package = smol::block_on(packager.pack("cardd|hello")).unwrap();
        assert_eq!(package.warnings.len(), 1);
        assert_eq!(package.warnings[0].kind, WarningKind::UnknownClass);

        let decoded = binary::decode_with(&package.payload, packager.dictionary()).unwrap();
        assert_eq!(decoded.feature_flags, 0b10_1010);
        assert_eq!(decoded.theme_id, theme_id("sepia").unwrap());
    }

    #[test]
    fn test_oversized_payload_has_no_estimate() {
        let packager = Packager::new(PackagerConfig {
            compress: false,
            error_correction: ErrorCorrection::H,
            ..Default::default()
        });
        let source: String = (0..400).map(|ix| format!("text|unique{ix}\n")).collect();
        let package = smol::block_on(packager.pack(&source)).unwrap();
        assert!(package.payload.len() > capacity::max_capacity(ErrorCorrection::H));
        assert!(!package.fits());
    }

    #[test]
    fn test_garbage_fails_to_unpack() {
        let packager = Packager::new(PackagerConfig::default());
        assert!(smol::block_on(packager.unpack(&[0x4C, 9, 0, 0])).is_err());
        assert!(smol::block_on(packager.unpack(&[0x1F, 0x8B, 0, 1])).is_err());
    }
}
