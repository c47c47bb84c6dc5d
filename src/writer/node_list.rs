use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::WriterError;

pub struct NodeListWriter;

impl NodeListWriter {
    pub fn to_text(labels: &[usize]) -> String {
        labels.iter().map(usize::to_string).collect::<Vec<_>>().join(",")
    }

    /// Write labels as a single comma separated line
    pub fn write(labels: &[usize], output_path: &Path) -> Result<(), WriterError> {
        fs::write(output_path, Self::to_text(labels)).map_err(|source| WriterError::Io {
            path: output_path.to_path_buf(),
            source,
        })?;
        info!("{} node labels exported to {}", labels.len(), output_path.display());
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_separated() {
        assert_eq!(NodeListWriter::to_text(&[3, 1, 2]), "3,1,2");
        assert_eq!(NodeListWriter::to_text(&[]), "");
    }
}
