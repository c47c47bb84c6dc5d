//! Compression-site table used for multi-site runs.
//!
//! ```text
//! site_name,center_x,center_y,center_z,upper_x,upper_y,upper_z,lower_x,lower_y,lower_z
//! Site1,0.0,0.0,0.0,0.0,0.0,10.0,0.0,0.0,-10.0
//! ```
//!
//! The first line is a header and is always skipped. A bad row never aborts the
//! table: it is dropped and reported as a [`SiteWarning`].

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::ParseError;
use crate::structs_and_impls::{Point, Site};

const FIELDS_PER_RECORD: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub enum SiteWarning {
    MalformedRecord { line: usize, reason: String },
}

impl fmt::Display for SiteWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteWarning::MalformedRecord { line, reason } => {
                write!(f, "skipping site record on line {}: {}", line, reason)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteTable {
    pub sites: Vec<Site>,
    pub warnings: Vec<SiteWarning>,
}

pub struct SitesCsvParser;

impl SitesCsvParser {
    pub fn parse_file(path: &Path) -> Result<SiteTable, ParseError> {
        let text = fs::read_to_string(path)?;
        let table = Self::parse_str(&text);
        info!("found {} sites in {}", table.sites.len(), path.display());
        Ok(table)
    }

    pub fn parse_str(text: &str) -> SiteTable {
        let mut table = SiteTable::default();

        // Skip header line
        for (index, line) in text.lines().enumerate().skip(1) {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            match Self::parse_record(trimmed) {
                Ok(site) => table.sites.push(site),
                Err(reason) => {
                    let warning = SiteWarning::MalformedRecord { line: index + 1, reason };
                    warn!("{}", warning);
                    table.warnings.push(warning);
                }
            }
        }

        table
    }

    fn parse_record(line: &str) -> Result<Site, String> {
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if parts.len() < FIELDS_PER_RECORD {
            return Err(format!(
                "expected {} fields, found {} in '{}'",
                FIELDS_PER_RECORD,
                parts.len(),
                line
            ));
        }
        if parts[0].is_empty() {
            return Err("empty site name".to_string());
        }

        let mut values = [0.0_f64; FIELDS_PER_RECORD - 1];
        for (slot, field) in values.iter_mut().zip(&parts[1..FIELDS_PER_RECORD]) {
            *slot = field
                .parse::<f64>()
                .map_err(|e| format!("invalid coordinate '{}' for site '{}': {}", field, parts[0], e))?;
        }

        Ok(Site::new(
            parts[0],
            Point::new(values[0], values[1], values[2]),
            Point::new(values[3], values[4], values[5]),
            Point::new(values[6], values[7], values[8]),
        ))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sites() {
        let table = SitesCsvParser::parse_str(
            "site_name,center_x,center_y,center_z,upper_x,upper_y,upper_z,lower_x,lower_y,lower_z\n\
             Site1,0.0,0.0,0.0,0.0,0.0,10.0,0.0,0.0,-10.0\n\
             \n\
             Site 2, 5.0, 0.0, 5.0, 5.0, 0.0, 15.0, 5.0, 0.0, -5.0\n",
        );
        assert!(table.warnings.is_empty());
        assert_eq!(table.sites.len(), 2);
        assert_eq!(table.sites[1].name, "Site 2");
        assert_eq!(table.sites[1].upper, Point::new(5.0, 0.0, 15.0));
        assert_eq!(table.sites[1].set_prefix(), "SITE_2_BAND");
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let table = SitesCsvParser::parse_str(
            "header\n\
             Short,1,2,3\n\
             Bad,0,0,0,0,0,x,0,0,-1\n\
             Good,0,0,0,0,0,1,0,0,-1\n",
        );
        assert_eq!(table.sites.len(), 1);
        assert_eq!(table.sites[0].name, "Good");
        assert_eq!(table.warnings.len(), 2);
        assert!(matches!(&table.warnings[0], SiteWarning::MalformedRecord { line: 2, .. }));
        assert!(table.warnings[1].to_string().contains("line 3"));
        assert!(table.warnings[1].to_string().contains("'x'"));
    }

    #[test]
    fn test_header_only() {
        assert_eq!(SitesCsvParser::parse_str("site_name,center_x\n"), SiteTable::default());
    }
}
