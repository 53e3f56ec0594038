//! CSV intake for bulk onboarding from a spreadsheet export.

use std::io::Read;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer};

use super::domain::CompanyDraft;

#[derive(Debug, thiserror::Error)]
pub enum CompanyImportError {
    #[error("malformed company export: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unrecognised start date '{value}'")]
    StartDate { row: usize, value: String },
    #[error("row {row}: unrecognised ad spend '{value}'")]
    AdSpend { row: usize, value: String },
}

/// Parses rows with `Name`, `Start Date`, and optional `Contact`, `Email`, `Phone`, `Ad Spend` columns.
pub fn parse_company_drafts<R: Read>(reader: R) -> Result<Vec<CompanyDraft>, CompanyImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut drafts = Vec::new();

    for (index, record) in csv_reader.deserialize::<CompanyRow>().enumerate() {
        let row = record?;
        // header is line 1
        let line = index + 2;

        let start_date =
            parse_date(&row.start_date).ok_or_else(|| CompanyImportError::StartDate {
                row: line,
                value: row.start_date.clone(),
            })?;
        let ad_spend = match row.ad_spend.as_deref() {
            Some(raw) => parse_money(raw).ok_or_else(|| CompanyImportError::AdSpend {
                row: line,
                value: raw.to_string(),
            })?,
            None => 0.0,
        };

        drafts.push(CompanyDraft {
            name: row.name,
            contact_name: row.contact,
            email: row.email,
            phone: row.phone,
            start_date,
            ad_spend,
        });
    }

    Ok(drafts)
}

#[derive(Debug, Deserialize)]
struct CompanyRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Contact", default, deserialize_with = "empty_string_as_none")]
    contact: Option<String>,
    #[serde(rename = "Email", default, deserialize_with = "empty_string_as_none")]
    email: Option<String>,
    #[serde(rename = "Phone", default, deserialize_with = "empty_string_as_none")]
    phone: Option<String>,
    #[serde(rename = "Start Date")]
    start_date: String,
    #[serde(rename = "Ad Spend", default, deserialize_with = "empty_string_as_none")]
    ad_spend: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    NaiveDate::parse_from_str(trimmed, "%m/%d/%Y").ok()
}

fn parse_money(value: &str) -> Option<f64> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|ch| *ch != '$' && *ch != ',')
        .collect();
    cleaned.parse::<f64>().ok().filter(|amount| amount.is_finite())
}
