use crate::{db::DbPool, entities::crate_record, errors::ServiceError};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};

/// Raw crate input as it arrives from a form post or loosely typed JSON.
/// Everything is optional here; validation happens in [`NewCrate::try_from_draft`].
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CrateDraft {
    pub run_number: Option<String>,
    pub puc: Option<String>,
    pub farm_name: Option<String>,
    pub commodity: Option<String>,
    pub variety: Option<String>,
    pub grade_class: Option<String>,
    pub size: Option<String>,
    pub weight: Option<String>,
    pub date_received: Option<String>,
    pub inspector_notes: Option<String>,
}

/// A validated crate ready to persist. Required fields are guaranteed
/// non-empty; optional empty strings have been normalized to absent.
#[derive(Clone, Debug)]
pub struct NewCrate {
    pub run_number: Option<String>,
    pub puc: String,
    pub farm_name: String,
    pub commodity: String,
    pub variety: Option<String>,
    pub grade_class: Option<String>,
    pub size: Option<String>,
    pub weight: Option<Decimal>,
    pub date_received: Option<NaiveDate>,
    pub inspector_notes: Option<String>,
}

impl NewCrate {
    /// Validates a draft. No mutation happens before this succeeds.
    pub fn try_from_draft(draft: CrateDraft) -> Result<Self, ServiceError> {
        Ok(Self {
            run_number: optional(draft.run_number),
            puc: required(draft.puc, "puc")?,
            farm_name: required(draft.farm_name, "farm_name")?,
            commodity: required(draft.commodity, "commodity")?,
            variety: optional(draft.variety),
            grade_class: optional(draft.grade_class),
            size: optional(draft.size),
            weight: parse_weight(draft.weight.as_deref())?,
            date_received: parse_date(draft.date_received.as_deref())?,
            inspector_notes: optional(draft.inspector_notes),
        })
    }
}

/// Normalizes an optional field: empty strings become absent.
fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &str) -> Result<String, ServiceError> {
    optional(value).ok_or_else(|| ServiceError::ValidationError(format!("{} is required", field)))
}

/// Empty or absent weight is fine (stored as NULL); a non-empty value that
/// does not parse is rejected. The asymmetry is deliberate.
pub fn parse_weight(raw: Option<&str>) -> Result<Option<Decimal>, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Decimal::from_str(value).map(Some).map_err(|_| {
            ServiceError::ValidationError(format!("weight must be a number, got '{}'", value))
        }),
    }
}

/// Same asymmetry as [`parse_weight`]: absent/empty defaults to today at
/// insert time, a non-empty malformed date is rejected.
pub fn parse_date(raw: Option<&str>) -> Result<Option<NaiveDate>, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                ServiceError::ValidationError(format!(
                    "date_received must be an ISO date (YYYY-MM-DD), got '{}'",
                    value
                ))
            }),
    }
}

/// Dashboard filters. Absent or empty fields impose no constraint.
#[derive(Clone, Debug, Default)]
pub struct CrateFilter {
    /// Exact match
    pub run_number: Option<String>,
    /// Case-insensitive substring match
    pub puc: Option<String>,
    /// Case-insensitive substring match
    pub commodity: Option<String>,
    /// Case-insensitive substring match
    pub farm_name: Option<String>,
}

/// Aggregate totals over a filtered result set
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CrateTotals {
    pub count: usize,
    pub total_weight: Decimal,
}

/// A filtered listing plus its totals
#[derive(Clone, Debug)]
pub struct FilteredCrates {
    pub crates: Vec<crate_record::Model>,
    pub totals: CrateTotals,
}

/// Wire serialization of a crate record. Kept separate from the entity so a
/// schema change has to touch this mapping deliberately.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrateRecord {
    pub id: i32,
    pub run_number: Option<String>,
    pub puc: String,
    pub farm_name: String,
    pub commodity: String,
    pub variety: Option<String>,
    pub grade_class: Option<String>,
    pub size: Option<String>,
    pub weight: Option<Decimal>,
    pub date_received: NaiveDate,
    pub inspector_notes: Option<String>,
    pub created_at: String,
}

impl From<crate_record::Model> for CrateRecord {
    fn from(m: crate_record::Model) -> Self {
        Self {
            id: m.id,
            run_number: m.run_number,
            puc: m.puc,
            farm_name: m.farm_name,
            commodity: m.commodity,
            variety: m.variety,
            grade_class: m.grade_class,
            size: m.size,
            weight: m.weight,
            date_received: m.date_received,
            inspector_notes: m.inspector_notes,
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

/// A rendered CSV export ready for download
#[derive(Clone, Debug)]
pub struct CsvExport {
    pub filename: String,
    pub body: String,
}

/// Fixed CSV column order
const CSV_COLUMNS: [&str; 11] = [
    "id",
    "run_number",
    "puc",
    "farm_name",
    "commodity",
    "variety",
    "grade_class",
    "size",
    "weight",
    "date_received",
    "inspector_notes",
];

/// Service owning the crate store: insert, list/filter, fetch and export
#[derive(Clone)]
pub struct CrateService {
    db: Arc<DbPool>,
}

impl CrateService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Validates and persists a new crate record. All-or-nothing: nothing is
    /// written unless the whole draft validates. Returns the stored record
    /// with its assigned id.
    #[instrument(skip(self, draft))]
    pub async fn create(&self, draft: CrateDraft) -> Result<crate_record::Model, ServiceError> {
        let new_crate = NewCrate::try_from_draft(draft)?;
        let now = Utc::now();
        let date_received = new_crate.date_received.unwrap_or_else(|| now.date_naive());

        let model = crate_record::ActiveModel {
            run_number: Set(new_crate.run_number),
            puc: Set(new_crate.puc),
            farm_name: Set(new_crate.farm_name),
            commodity: Set(new_crate.commodity),
            variety: Set(new_crate.variety),
            grade_class: Set(new_crate.grade_class),
            size: Set(new_crate.size),
            weight: Set(new_crate.weight),
            date_received: Set(date_received),
            inspector_notes: Set(new_crate.inspector_notes),
            created_at: Set(now),
            ..Default::default()
        };

        let record = model.insert(&*self.db).await?;
        info!(crate_id = record.id, commodity = %record.commodity, "crate recorded");
        Ok(record)
    }

    /// Lists crates matching the filter, most recently dated first (ties
    /// broken by id descending), together with totals over the result set.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &CrateFilter) -> Result<FilteredCrates, ServiceError> {
        let mut cond = Condition::all();
        if let Some(run) = present(&filter.run_number) {
            cond = cond.add(crate_record::Column::RunNumber.eq(run));
        }
        if let Some(puc) = present(&filter.puc) {
            cond = cond.add(contains_ci(crate_record::Column::Puc, puc));
        }
        if let Some(commodity) = present(&filter.commodity) {
            cond = cond.add(contains_ci(crate_record::Column::Commodity, commodity));
        }
        if let Some(farm) = present(&filter.farm_name) {
            cond = cond.add(contains_ci(crate_record::Column::FarmName, farm));
        }

        let crates = crate_record::Entity::find()
            .filter(cond)
            .order_by_desc(crate_record::Column::DateReceived)
            .order_by_desc(crate_record::Column::Id)
            .all(&*self.db)
            .await?;

        let totals = CrateTotals {
            count: crates.len(),
            total_weight: crates
                .iter()
                .map(|c| c.weight.unwrap_or(Decimal::ZERO))
                .sum(),
        };

        Ok(FilteredCrates { crates, totals })
    }

    /// All records ordered by id descending, for the JSON listing.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<crate_record::Model>, ServiceError> {
        let crates = crate_record::Entity::find()
            .order_by_desc(crate_record::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(crates)
    }

    /// Fetches a single record by id.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<crate_record::Model, ServiceError> {
        crate_record::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Crate with id {} not found", id)))
    }

    /// Renders every record (ordered by date received descending, ties in
    /// store order) as a CSV attachment.
    #[instrument(skip(self))]
    pub async fn export_csv(&self) -> Result<CsvExport, ServiceError> {
        let crates = crate_record::Entity::find()
            .order_by_desc(crate_record::Column::DateReceived)
            .all(&*self.db)
            .await?;

        Ok(CsvExport {
            filename: export_filename(Utc::now()),
            body: build_csv(&crates),
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Case-insensitive substring match: LOWER(col) LIKE %needle%
fn contains_ci(
    col: crate_record::Column,
    needle: &str,
) -> sea_orm::sea_query::SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(format!("%{}%", needle.to_lowercase()))
}

/// Attachment filename: qc_export_<UTC YYYYMMDD_HHMMSS>.csv
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("qc_export_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// One header row, one row per record, fixed column order.
pub fn build_csv(records: &[crate_record::Model]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_COLUMNS.join(","));

    for record in records {
        let notes = record
            .inspector_notes
            .as_deref()
            .unwrap_or_default()
            .replace('\n', "\\n");
        let row = [
            record.id.to_string(),
            record.run_number.clone().unwrap_or_default(),
            record.puc.clone(),
            record.farm_name.clone(),
            record.commodity.clone(),
            record.variety.clone().unwrap_or_default(),
            record.grade_class.clone().unwrap_or_default(),
            record.size.clone().unwrap_or_default(),
            record.weight.map(|w| w.to_string()).unwrap_or_default(),
            record.date_received.format("%Y-%m-%d").to_string(),
            notes,
        ];
        lines.push(
            row.iter()
                .map(|field| escape_field(field))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    let mut body = lines.join("\n");
    body.push('\n');
    body
}

fn escape_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        let escaped = value.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_record() -> crate_record::Model {
        crate_record::Model {
            id: 1,
            run_number: Some("RUN-7".into()),
            puc: "P123".into(),
            farm_name: "Mooiuitsig".into(),
            commodity: "Apples".into(),
            variety: Some("Granny Smith".into()),
            grade_class: None,
            size: None,
            weight: Some(Decimal::new(18_250, 3)),
            date_received: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            inspector_notes: Some("line1\nline2".into()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 2, 8, 30, 0).unwrap(),
        }
    }

    #[test]
    fn draft_validation_requires_core_fields() {
        let draft = CrateDraft {
            farm_name: Some("Farm".into()),
            commodity: Some("Apples".into()),
            ..Default::default()
        };
        let err = NewCrate::try_from_draft(draft).unwrap_err();
        assert!(err.to_string().contains("puc is required"));

        // Empty string counts as missing
        let draft = CrateDraft {
            puc: Some("P1".into()),
            farm_name: Some(String::new()),
            commodity: Some("Apples".into()),
            ..Default::default()
        };
        let err = NewCrate::try_from_draft(draft).unwrap_err();
        assert!(err.to_string().contains("farm_name is required"));
    }

    #[test]
    fn draft_validation_normalizes_empty_optionals() {
        let draft = CrateDraft {
            puc: Some("P1".into()),
            farm_name: Some("Farm".into()),
            commodity: Some("Apples".into()),
            run_number: Some(String::new()),
            variety: Some(String::new()),
            weight: Some(String::new()),
            date_received: Some(String::new()),
            ..Default::default()
        };
        let new_crate = NewCrate::try_from_draft(draft).unwrap();
        assert_eq!(new_crate.run_number, None);
        assert_eq!(new_crate.variety, None);
        assert_eq!(new_crate.weight, None);
        assert_eq!(new_crate.date_received, None);
    }

    #[test]
    fn weight_parse_asymmetry() {
        assert_eq!(parse_weight(None).unwrap(), None);
        assert_eq!(parse_weight(Some("")).unwrap(), None);
        assert_eq!(
            parse_weight(Some("12.5")).unwrap(),
            Some(Decimal::new(125, 1))
        );
        assert!(parse_weight(Some("heavy")).is_err());
    }

    #[test]
    fn date_parse_asymmetry() {
        assert_eq!(parse_date(None).unwrap(), None);
        assert_eq!(parse_date(Some("")).unwrap(), None);
        assert_eq!(
            parse_date(Some("2024-01-31")).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31)
        );
        assert!(parse_date(Some("31/01/2024")).is_err());
        assert!(parse_date(Some("2024-13-01")).is_err());
    }

    #[test]
    fn csv_escapes_newlines_in_notes() {
        let body = build_csv(&[sample_record()]);
        let mut lines = body.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,run_number,puc,farm_name,commodity,variety,grade_class,size,weight,date_received,inspector_notes"
        );
        let row = lines.next().unwrap();
        // Literal backslash-n, two characters, keeps the record on one line
        assert!(row.ends_with("line1\\nline2"));
        assert!(row.contains("2024-01-02"));
        assert!(row.contains("18.250"));
        assert!(lines.next().is_none());
    }

    #[test]
    fn csv_renders_absent_fields_as_empty_cells() {
        let mut record = sample_record();
        record.run_number = None;
        record.weight = None;
        record.inspector_notes = None;
        let body = build_csv(&[record]);
        let row = body.lines().nth(1).unwrap();
        assert!(row.starts_with("1,,P123,"));
        assert!(row.ends_with("2024-01-02,"));
    }

    #[test]
    fn csv_quotes_fields_containing_delimiters() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn export_filename_is_timestamped() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(export_filename(now), "qc_export_20240305_140709.csv");
    }
}
