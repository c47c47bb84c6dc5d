use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::ParseError;

/// Reader for node label lists ("12,13,14,..."), the exchange format between set exports
pub struct NodeListParser;

impl NodeListParser {
    pub fn parse_file(path: &Path) -> Result<Vec<usize>, ParseError> {
        let text = fs::read_to_string(path)?;
        let labels = Self::parse_str(&text)?;
        debug!("read {} labels from {}", labels.len(), path.display());
        Ok(labels)
    }

    /// Comma and/or newline separated labels; empty tokens (trailing commas) are ignored
    pub fn parse_str(text: &str) -> Result<Vec<usize>, ParseError> {
        text.split(|c: char| c == ',' || c == '\n')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<usize>()
                    .map_err(|e| ParseError::NumberParse(format!("invalid node label '{}': {}", token, e)))
            })
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        assert_eq!(NodeListParser::parse_str("1,2, 3,\n4\r\n").unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(NodeListParser::parse_str("").unwrap(), Vec::<usize>::new());
    }

    #[test]
    fn test_bad_label_names_token() {
        let err = NodeListParser::parse_str("1,two,3").unwrap_err();
        assert!(err.to_string().contains("'two'"));
    }
}
