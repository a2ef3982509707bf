use crate::{
    config::Config,
    model::{ExpectedCategory, TestCase},
};
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct Row {
    email: String,
    expected_result: String,
    category: String,
}

pub fn load(cfg: &Config, path: &Path) -> Result<Vec<TestCase>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening dataset: {}", path.display()))?;
    let cases = parse(cfg, file).with_context(|| format!("reading dataset: {}", path.display()))?;
    info!("loaded {} test cases from {}", cases.len(), path.display());
    Ok(cases)
}

/// Parse `email,expected_result,category` rows. Row numbers in errors count the
/// header as line 1.
pub fn parse<R: Read>(cfg: &Config, reader: R) -> Result<Vec<TestCase>> {
    let shape = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut cases = Vec::new();
    for (i, row) in rdr.deserialize::<Row>().enumerate() {
        let line = i + 2;
        let row = row.with_context(|| format!("row {line}"))?;
        if row.email.is_empty() {
            bail!("row {line}: empty email");
        }
        let expected = ExpectedCategory::parse(&row.expected_result).ok_or_else(|| {
            anyhow!(
                "row {line}: unknown expected_result {:?} (want valid, invalid or disposable)",
                row.expected_result
            )
        })?;
        if cfg.dataset.warn_on_malformed_email && !shape.is_match(&row.email) {
            warn!("row {line}: {:?} does not look like an email address", row.email);
        }
        cases.push(TestCase {
            email: row.email,
            expected,
            dataset_label: row.category,
        });
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_trims() {
        let raw = "email,expected_result,category\n alice@example.com , Valid ,corporate\nbob@mailinator.com,disposable,throwaway\n";
        let cases = parse(&Config::default(), raw.as_bytes()).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].email, "alice@example.com");
        assert_eq!(cases[0].expected, ExpectedCategory::Valid);
        assert_eq!(cases[1].dataset_label, "throwaway");
    }

    #[test]
    fn unknown_expectation_names_row() {
        let raw = "email,expected_result,category\na@b.co,valid,x\nc@d.co,risky,x\n";
        let err = parse(&Config::default(), raw.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("row 3"));
    }

    #[test]
    fn missing_column_is_error() {
        let raw = "email,category\na@b.co,x\n";
        assert!(parse(&Config::default(), raw.as_bytes()).is_err());
    }

    #[test]
    fn malformed_address_still_loads() {
        let raw = "email,expected_result,category\nnot-an-address,invalid,syntax\n";
        let cases = parse(&Config::default(), raw.as_bytes()).unwrap();
        assert_eq!(cases[0].email, "not-an-address");
    }
}
