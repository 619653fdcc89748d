use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for structured document chunking.
///
/// All sizes are measured in characters (Unicode scalar values).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Target chunk size (soft limit, atomic units may exceed it)
    pub chunk_size: usize,

    /// Maximum length of trailing context copied into the next chunk
    pub chunk_overlap: usize,

    /// Fences up to this size are kept whole; larger ones are split
    /// at declaration boundaries
    pub code_block_max_size: usize,

    /// Keep fenced code blocks intact when they fit `code_block_max_size`
    pub preserve_code_blocks: bool,

    /// Never split function/class definitions inside fenced code
    pub preserve_functions: bool,

    /// Start a new chunk at every markdown header
    pub preserve_markdown_structure: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1500,
            chunk_overlap: 200,
            code_block_max_size: 3000,
            preserve_code_blocks: true,
            preserve_functions: true,
            preserve_markdown_structure: true,
        }
    }
}

impl ChunkerConfig {
    /// Create config optimized for embeddings (smaller, focused chunks)
    pub fn for_embeddings() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            ..Default::default()
        }
    }

    /// Create config optimized for LLM context (larger, comprehensive chunks)
    pub fn for_llm_context() -> Self {
        Self {
            chunk_size: 4000,
            chunk_overlap: 400,
            code_block_max_size: 8000,
            ..Default::default()
        }
    }

    /// Code and structure preserving config sized around `chunk_size`.
    ///
    /// Overlap is a fifth of the chunk size, capped at 200 characters.
    pub fn smart(chunk_size: usize, preserve_code: bool, preserve_structure: bool) -> Self {
        Self {
            chunk_size,
            chunk_overlap: (chunk_size / 5).min(200),
            preserve_code_blocks: preserve_code,
            preserve_functions: preserve_code,
            preserve_markdown_structure: preserve_structure,
            ..Default::default()
        }
    }

    /// Parse a config from JSON or TOML bytes. Missing fields take defaults.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        match serde_json::from_slice::<Self>(bytes) {
            Ok(config) => Ok(config),
            Err(json_err) => {
                let utf8 = std::str::from_utf8(bytes)
                    .map_err(|err| ChunkerError::config_parse(format!("{json_err}; {err}")))?;
                toml::from_str::<Self>(utf8).map_err(|toml_err| {
                    ChunkerError::config_parse(format!(
                        "config is not valid JSON ({json_err}) or TOML ({toml_err})"
                    ))
                })
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be > 0".to_string());
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            ));
        }

        if self.code_block_max_size == 0 {
            return Err("code_block_max_size must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_valid() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 1500);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.code_block_max_size, 3000);
        assert!(config.preserve_code_blocks);
        assert!(config.preserve_functions);
        assert!(config.preserve_markdown_structure);
    }

    #[test]
    fn test_preset_configs_valid() {
        assert!(ChunkerConfig::for_embeddings().validate().is_ok());
        assert!(ChunkerConfig::for_llm_context().validate().is_ok());
        assert!(ChunkerConfig::smart(1500, true, true).validate().is_ok());
        assert!(ChunkerConfig::smart(100, false, false).validate().is_ok());
    }

    #[test]
    fn smart_caps_overlap() {
        assert_eq!(ChunkerConfig::smart(5000, true, true).chunk_overlap, 200);
        assert_eq!(ChunkerConfig::smart(500, true, true).chunk_overlap, 100);

        let plain = ChunkerConfig::smart(800, false, true);
        assert!(!plain.preserve_code_blocks);
        assert!(!plain.preserve_functions);
        assert!(plain.preserve_markdown_structure);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ChunkerConfig::default();

        config.chunk_size = 0;
        assert!(config.validate().is_err());

        config.chunk_size = 100;
        config.chunk_overlap = 100;
        assert!(config.validate().is_err());

        config.chunk_overlap = 20;
        config.code_block_max_size = 0;
        assert!(config.validate().is_err());

        config.code_block_max_size = 300;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_json_with_defaults() {
        let config = ChunkerConfig::from_slice(br#"{"chunk_size": 800}"#).unwrap();
        assert_eq!(
            config,
            ChunkerConfig {
                chunk_size: 800,
                ..Default::default()
            }
        );
    }

    #[test]
    fn parses_toml() {
        let raw = b"chunk_overlap = 50\npreserve_functions = false\n";
        let config = ChunkerConfig::from_slice(raw).unwrap();
        assert_eq!(config.chunk_overlap, 50);
        assert!(!config.preserve_functions);
        assert_eq!(config.chunk_size, 1500);
    }

    #[test]
    fn rejects_garbage() {
        let err = ChunkerConfig::from_slice(b"chunk_size = [").unwrap_err();
        assert!(matches!(err, ChunkerError::ConfigParse(_)));
    }
}
