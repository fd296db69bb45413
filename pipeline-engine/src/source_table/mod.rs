pub mod postgres;

use std::collections::HashMap;
use std::str::FromStr;

use ingest::LoaderType;

use crate::data::pipeline_run::PipelineRunId;
use crate::data::source_table::{CollectType, StOid};
use crate::error::{Error, Result};
use crate::principal::Principal;

/// The "loose string map of form values" named in spec.md §4.5, parameterizing every source-table
/// CRUD operation. Kept as a plain map rather than a typed struct because the caller (an HTTP
/// form post, a query string) only ever has strings and unknown fields are explicitly ignored.
pub type FormData = HashMap<String, String>;

fn required_field<'f>(form: &'f FormData, field: &str) -> Result<&'f str> {
    match form.get(field).map(String::as_str) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::BadRequest(format!("'{field}' is required"))),
    }
}

fn blank_to_null(form: &FormData, field: &str) -> Option<String> {
    match form.get(field).map(String::as_str) {
        Some(value) if !value.trim().is_empty() => Some(value.to_owned()),
        _ => None,
    }
}

fn flag(form: &FormData, field: &str) -> bool {
    form.get(field).map(String::as_str) == Some("on")
}

/// Typed fields extracted from a [`FormData`] per the per-field rules table in spec.md §4.5,
/// ready to bind into an INSERT/UPDATE statement.
#[derive(Debug, Clone)]
pub struct SourceTableFields {
    pub table_name: String,
    pub file_id: String,
    pub file_name: String,
    pub loader_type: LoaderType,
    pub sub_table: Option<String>,
    pub delimiter: Option<String>,
    pub url: Option<String>,
    pub comments: Option<String>,
    pub collect_type: Option<CollectType>,
    pub qualified: bool,
    pub analyze: bool,
    pub load: bool,
}

impl SourceTableFields {
    /// Translate `form` per spec.md §4.5's field table: `table_name`/`file_id` required
    /// non-null; `file_name` required and derives `loader_type`, additionally requiring
    /// `sub_table` for Excel/MDB; `delimiter`/`url`/`comments` null if blank; `collect_type`
    /// must parse into the enum; `qualified`/`analyze`/`load` are true iff the value is `"on"`.
    /// Unknown fields are ignored.
    pub fn parse(form: &FormData) -> Result<Self> {
        let table_name = required_field(form, "table_name")?.to_owned();
        let file_id = required_field(form, "file_id")?.to_owned();
        let file_name = required_field(form, "file_name")?.to_owned();
        let loader_type = LoaderType::from_file_name(&file_name).map_err(|error| {
            Error::BadRequest(format!("'{file_name}' has an unsupported extension: {error}"))
        })?;

        let sub_table = blank_to_null(form, "sub_table");
        if loader_type.requires_sub_table() && sub_table.is_none() {
            return Err(Error::BadRequest("Sub Table must be not null".to_owned()));
        }

        let collect_type = match form.get("collect_type").map(String::as_str) {
            Some(value) if !value.is_empty() => Some(CollectType::from_str(value)?),
            _ => None,
        };

        Ok(Self {
            table_name,
            file_id,
            file_name,
            loader_type,
            sub_table,
            delimiter: blank_to_null(form, "delimiter"),
            url: blank_to_null(form, "url"),
            comments: blank_to_null(form, "comments"),
            collect_type,
            qualified: flag(form, "qualified"),
            analyze: flag(form, "analyze"),
            load: flag(form, "load"),
        })
    }
}

fn parse_run_id(form: &FormData) -> Result<PipelineRunId> {
    let raw = required_field(form, "run_id")?;
    raw.parse()
        .map_err(|_| Error::BadRequest(format!("'{raw}' is not a valid run_id")))
}

fn parse_st_oid(form: &FormData) -> Result<StOid> {
    let raw = required_field(form, "st_oid")?;
    raw.parse()
        .map_err(|_| Error::BadRequest(format!("'{raw}' is not a valid st_oid")))
}

/// The four source-table management operations from spec.md §4.5, each of which: extracts the
/// run (and, for update/delete, the target row) id from the form, authorizes the caller against
/// the run's stage slot, translates the remaining fields, and executes one SQL statement.
pub trait SourceTableService
where
    Self: Send + Sync,
{
    async fn list(
        &self,
        principal: &Principal,
        run_id: PipelineRunId,
    ) -> Result<Vec<crate::data::source_table::SourceTable>>;

    async fn create(&self, principal: &Principal, form: &FormData) -> Result<(StOid, u64)>;

    async fn update(&self, principal: &Principal, form: &FormData) -> Result<(StOid, u64)>;

    async fn delete(&self, principal: &Principal, form: &FormData) -> Result<(StOid, u64)>;
}

#[cfg(test)]
mod test {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> FormData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_requires_table_name_file_id_and_file_name() {
        let empty = form(&[]);
        assert!(SourceTableFields::parse(&empty).is_err());
    }

    #[test]
    fn parse_derives_loader_type_from_extension() {
        let fields = SourceTableFields::parse(&form(&[
            ("table_name", "FOO"),
            ("file_id", "F1"),
            ("file_name", "data.csv"),
        ]))
        .expect("valid fields");
        assert_eq!(fields.loader_type, LoaderType::Flat);
    }

    #[test]
    fn parse_requires_sub_table_for_excel() {
        let error = SourceTableFields::parse(&form(&[
            ("table_name", "FOO"),
            ("file_id", "F1"),
            ("file_name", "foo.xlsx"),
        ]))
        .unwrap_err();
        assert!(matches!(error, Error::BadRequest(message) if message.contains("Sub Table")));
    }

    #[test]
    fn parse_accepts_excel_with_sub_table() {
        let fields = SourceTableFields::parse(&form(&[
            ("table_name", "FOO"),
            ("file_id", "F1"),
            ("file_name", "foo.xlsx"),
            ("sub_table", "Sheet1"),
        ]))
        .expect("valid fields");
        assert_eq!(fields.loader_type, LoaderType::Excel);
        assert_eq!(fields.sub_table.as_deref(), Some("Sheet1"));
    }

    #[test]
    fn parse_treats_blank_optional_fields_as_null() {
        let fields = SourceTableFields::parse(&form(&[
            ("table_name", "FOO"),
            ("file_id", "F1"),
            ("file_name", "data.csv"),
            ("delimiter", ""),
            ("url", ""),
            ("comments", ""),
        ]))
        .expect("valid fields");
        assert_eq!(fields.delimiter, None);
        assert_eq!(fields.url, None);
        assert_eq!(fields.comments, None);
    }

    #[test]
    fn parse_reads_checkbox_flags_only_from_on() {
        let fields = SourceTableFields::parse(&form(&[
            ("table_name", "FOO"),
            ("file_id", "F1"),
            ("file_name", "data.csv"),
            ("qualified", "on"),
            ("analyze", "true"),
        ]))
        .expect("valid fields");
        assert!(fields.qualified);
        assert!(!fields.analyze);
        assert!(!fields.load);
    }

    #[test]
    fn parse_run_id_rejects_non_numeric_values() {
        assert!(parse_run_id(&form(&[("run_id", "abc")])).is_err());
        assert!(parse_run_id(&form(&[("run_id", "7")])).is_ok());
    }

    #[test]
    fn parse_st_oid_rejects_missing_value() {
        assert!(parse_st_oid(&form(&[])).is_err());
    }
}
