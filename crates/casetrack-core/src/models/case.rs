use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::media::CaseMedia;
use crate::error::{AppError, AppResult};
use crate::validation::{non_blank, parse_date, parse_float, parse_hour, parse_integer};

/// Investigation status of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "case_status"))]
pub enum CaseStatus {
    Open,
    Investigating,
    Closed,
}

impl FromStr for CaseStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(CaseStatus::Open),
            "investigating" => Ok(CaseStatus::Investigating),
            "closed" => Ok(CaseStatus::Closed),
            _ => Err(AppError::InvalidInput(format!(
                "status must be one of Open, Investigating, Closed (got '{}')",
                s
            ))),
        }
    }
}

impl Display for CaseStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            CaseStatus::Open => write!(f, "Open"),
            CaseStatus::Investigating => write!(f, "Investigating"),
            CaseStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// A recorded crime incident with its evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrimeCase {
    pub id: Uuid,
    /// Human-entered display label; not unique
    pub code: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub crime_type: String,
    #[schema(value_type = String, format = Date, example = "2024-01-01")]
    pub date: NaiveDate,
    #[serde(with = "hour_format")]
    #[schema(value_type = String, example = "10:00")]
    pub hour: NaiveTime,
    pub status: CaseStatus,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub victim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuadrante: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escape_route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspect_description: Option<String>,
    /// Insertion order; the first image is the cover
    #[serde(default)]
    pub media: Vec<CaseMedia>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `HH:MM` wire format for the incident hour. Seconds are accepted on input
/// and written back as `HH:MM:SS` when present.
pub mod hour_format {
    use chrono::{NaiveTime, Timelike};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(hour: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        let pattern = if hour.second() == 0 { "%H:%M" } else { "%H:%M:%S" };
        serializer.serialize_str(&hour.format(pattern).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        crate::validation::parse_hour(&raw).map_err(serde::de::Error::custom)
    }
}

/// Numeric value as sent by clients: JSON numbers or numeric text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl NumericInput {
    pub fn is_blank(&self) -> bool {
        matches!(self, NumericInput::Text(t) if t.trim().is_empty())
    }
}

impl From<i64> for NumericInput {
    fn from(value: i64) -> Self {
        NumericInput::Integer(value)
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Number(value)
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

/// Loosely typed case body used by both create and update requests.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaseInput {
    #[schema(value_type = Option<i64>)]
    pub code: Option<NumericInput>,
    pub title: Option<String>,
    pub place: Option<String>,
    pub description: Option<String>,
    pub crime_type: Option<String>,
    #[schema(example = "2024-01-01")]
    pub date: Option<String>,
    #[schema(example = "10:00")]
    pub hour: Option<String>,
    #[schema(example = "Open")]
    pub status: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub latitude: Option<NumericInput>,
    #[schema(value_type = Option<f64>)]
    pub longitude: Option<NumericInput>,
    pub suspect: Option<String>,
    pub victim: Option<String>,
    #[schema(value_type = Option<i32>)]
    pub cuadrante: Option<NumericInput>,
    #[schema(value_type = Option<i32>)]
    pub sector: Option<NumericInput>,
    pub escape_route: Option<String>,
    pub suspect_description: Option<String>,
}

/// Validated fields of a case about to be created.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct NewCase {
    pub code: i64,
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: String,
    pub place: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100, message = "crimeType must be between 1 and 100 characters"))]
    pub crime_type: String,
    pub date: NaiveDate,
    pub hour: NaiveTime,
    pub status: CaseStatus,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be within [-90, 90]"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude must be within [-180, 180]"))]
    pub longitude: f64,
    pub suspect: Option<String>,
    pub victim: Option<String>,
    pub cuadrante: Option<i32>,
    pub sector: Option<i32>,
    pub escape_route: Option<String>,
    pub suspect_description: Option<String>,
}

/// Partial update. `None` leaves a field unchanged; for optional fields
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct CasePatch {
    pub code: Option<i64>,
    #[validate(length(min = 1, max = 255, message = "title must be between 1 and 255 characters"))]
    pub title: Option<String>,
    pub place: Option<Option<String>>,
    pub description: Option<Option<String>>,
    #[validate(length(min = 1, max = 100, message = "crimeType must be between 1 and 100 characters"))]
    pub crime_type: Option<String>,
    pub date: Option<NaiveDate>,
    pub hour: Option<NaiveTime>,
    pub status: Option<CaseStatus>,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be within [-90, 90]"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude must be within [-180, 180]"))]
    pub longitude: Option<f64>,
    pub suspect: Option<Option<String>>,
    pub victim: Option<Option<String>>,
    pub cuadrante: Option<Option<i32>>,
    pub sector: Option<Option<i32>>,
    pub escape_route: Option<Option<String>>,
    pub suspect_description: Option<Option<String>>,
}

/// Mandatory fields in the order they are reported when missing.
pub const REQUIRED_CASE_FIELDS: [&str; 8] = [
    "code",
    "title",
    "crimeType",
    "date",
    "hour",
    "status",
    "latitude",
    "longitude",
];

fn text_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn number_present(value: &Option<NumericInput>) -> bool {
    value.as_ref().is_some_and(|v| !v.is_blank())
}

/// Optional text: blank becomes absent.
fn optional_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn optional_small_int(field: &str, value: Option<&NumericInput>) -> AppResult<Option<i32>> {
    match value {
        None => Ok(None),
        Some(v) => match parse_integer(field, v)? {
            None => Ok(None),
            Some(n) => i32::try_from(n).map(Some).map_err(|_| {
                AppError::InvalidInput(format!("{} is out of range", field))
            }),
        },
    }
}

fn required<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| AppError::Validation {
        fields: vec![field.to_string()],
    })
}

impl CaseInput {
    /// Names of mandatory fields that are absent or blank, in reporting order.
    pub fn missing_fields(&self) -> Vec<String> {
        let present = [
            number_present(&self.code),
            text_present(&self.title),
            text_present(&self.crime_type),
            text_present(&self.date),
            text_present(&self.hour),
            text_present(&self.status),
            number_present(&self.latitude),
            number_present(&self.longitude),
        ];
        REQUIRED_CASE_FIELDS
            .iter()
            .zip(present)
            .filter(|(_, present)| !present)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Checks presence of every mandatory field, then parses and range-checks.
    pub fn into_new_case(self) -> AppResult<NewCase> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::Validation { fields: missing });
        }

        let code = required(parse_integer("code", &required(self.code, "code")?)?, "code")?;
        let latitude = required(
            parse_float("latitude", &required(self.latitude, "latitude")?)?,
            "latitude",
        )?;
        let longitude = required(
            parse_float("longitude", &required(self.longitude, "longitude")?)?,
            "longitude",
        )?;

        let new_case = NewCase {
            code,
            title: non_blank("title", self.title)?,
            place: optional_text(self.place),
            description: optional_text(self.description),
            crime_type: non_blank("crimeType", self.crime_type)?,
            date: parse_date(&non_blank("date", self.date)?)?,
            hour: parse_hour(&non_blank("hour", self.hour)?)?,
            status: non_blank("status", self.status)?.parse::<CaseStatus>()?,
            latitude,
            longitude,
            suspect: optional_text(self.suspect),
            victim: optional_text(self.victim),
            cuadrante: optional_small_int("cuadrante", self.cuadrante.as_ref())?,
            sector: optional_small_int("sector", self.sector.as_ref())?,
            escape_route: optional_text(self.escape_route),
            suspect_description: optional_text(self.suspect_description),
        };
        new_case.validate()?;
        Ok(new_case)
    }

    /// Converts supplied fields into a patch. Blank mandatory fields are
    /// rejected; blank optional fields clear the stored value.
    pub fn into_patch(self) -> AppResult<CasePatch> {
        fn mandatory_number<T>(
            field: &str,
            value: Option<NumericInput>,
            parse: impl Fn(&str, &NumericInput) -> AppResult<Option<T>>,
        ) -> AppResult<Option<T>> {
            match value {
                None => Ok(None),
                Some(v) => match parse(field, &v)? {
                    Some(n) => Ok(Some(n)),
                    None => Err(AppError::InvalidInput(format!("{} must not be empty", field))),
                },
            }
        }

        fn mandatory_text(field: &str, value: Option<String>) -> AppResult<Option<String>> {
            value.map(|v| non_blank(field, Some(v))).transpose()
        }

        let patch = CasePatch {
            code: mandatory_number("code", self.code, parse_integer)?,
            title: mandatory_text("title", self.title)?,
            place: self.place.map(|v| optional_text(Some(v))),
            description: self.description.map(|v| optional_text(Some(v))),
            crime_type: mandatory_text("crimeType", self.crime_type)?,
            date: mandatory_text("date", self.date)?
                .map(|d| parse_date(&d))
                .transpose()?,
            hour: mandatory_text("hour", self.hour)?
                .map(|h| parse_hour(&h))
                .transpose()?,
            status: mandatory_text("status", self.status)?
                .map(|s| s.parse::<CaseStatus>())
                .transpose()?,
            latitude: mandatory_number("latitude", self.latitude, parse_float)?,
            longitude: mandatory_number("longitude", self.longitude, parse_float)?,
            suspect: self.suspect.map(|v| optional_text(Some(v))),
            victim: self.victim.map(|v| optional_text(Some(v))),
            cuadrante: self
                .cuadrante
                .map(|v| optional_small_int("cuadrante", Some(&v)))
                .transpose()?,
            sector: self
                .sector
                .map(|v| optional_small_int("sector", Some(&v)))
                .transpose()?,
            escape_route: self.escape_route.map(|v| optional_text(Some(v))),
            suspect_description: self.suspect_description.map(|v| optional_text(Some(v))),
        };
        patch.validate()?;
        Ok(patch)
    }
}

impl NewCase {
    /// Builds the stored record with a fresh id and `created_at == updated_at`.
    pub fn into_case(self, id: Uuid, now: DateTime<Utc>) -> CrimeCase {
        CrimeCase {
            id,
            code: self.code,
            title: self.title,
            place: self.place,
            description: self.description,
            crime_type: self.crime_type,
            date: self.date,
            hour: self.hour,
            status: self.status,
            latitude: self.latitude,
            longitude: self.longitude,
            suspect: self.suspect,
            victim: self.victim,
            cuadrante: self.cuadrante,
            sector: self.sector,
            escape_route: self.escape_route,
            suspect_description: self.suspect_description,
            media: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl CasePatch {
    /// Merges the supplied fields into `case`. Timestamps are left to the caller.
    pub fn apply(&self, case: &mut CrimeCase) {
        if let Some(code) = self.code {
            case.code = code;
        }
        if let Some(title) = &self.title {
            case.title = title.clone();
        }
        if let Some(place) = &self.place {
            case.place = place.clone();
        }
        if let Some(description) = &self.description {
            case.description = description.clone();
        }
        if let Some(crime_type) = &self.crime_type {
            case.crime_type = crime_type.clone();
        }
        if let Some(date) = self.date {
            case.date = date;
        }
        if let Some(hour) = self.hour {
            case.hour = hour;
        }
        if let Some(status) = self.status {
            case.status = status;
        }
        if let Some(latitude) = self.latitude {
            case.latitude = latitude;
        }
        if let Some(longitude) = self.longitude {
            case.longitude = longitude;
        }
        if let Some(suspect) = &self.suspect {
            case.suspect = suspect.clone();
        }
        if let Some(victim) = &self.victim {
            case.victim = victim.clone();
        }
        if let Some(cuadrante) = self.cuadrante {
            case.cuadrante = cuadrante;
        }
        if let Some(sector) = self.sector {
            case.sector = sector;
        }
        if let Some(escape_route) = &self.escape_route {
            case.escape_route = escape_route.clone();
        }
        if let Some(suspect_description) = &self.suspect_description {
            case.suspect_description = suspect_description.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_input() -> CaseInput {
        CaseInput {
            code: Some(1i64.into()),
            title: Some("Robo tienda".to_string()),
            crime_type: Some("Robo".to_string()),
            date: Some("2024-01-01".to_string()),
            hour: Some("10:00".to_string()),
            status: Some("Open".to_string()),
            latitude: Some((-12.11).into()),
            longitude: Some((-76.99).into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_into_new_case_accepts_complete_input() {
        let new_case = scenario_input().into_new_case().unwrap();
        assert_eq!(new_case.code, 1);
        assert_eq!(new_case.status, CaseStatus::Open);
        assert_eq!(new_case.hour, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert!(new_case.place.is_none());
    }

    #[test]
    fn test_missing_fields_reported_in_order() {
        let input = CaseInput {
            title: Some("   ".to_string()),
            date: Some("2024-01-01".to_string()),
            latitude: Some("".into()),
            ..Default::default()
        };
        match input.into_new_case() {
            Err(AppError::Validation { fields }) => assert_eq!(
                fields,
                vec!["code", "title", "crimeType", "hour", "status", "latitude", "longitude"]
            ),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_text_is_coerced() {
        let input = CaseInput {
            code: Some("42".into()),
            latitude: Some("-12.5".into()),
            longitude: Some("-77".into()),
            cuadrante: Some("3".into()),
            ..scenario_input()
        };
        let new_case = input.into_new_case().unwrap();
        assert_eq!(new_case.code, 42);
        assert_eq!(new_case.latitude, -12.5);
        assert_eq!(new_case.longitude, -77.0);
        assert_eq!(new_case.cuadrante, Some(3));
    }

    #[test]
    fn test_out_of_range_coordinates_are_invalid() {
        let input = CaseInput {
            latitude: Some(91.0.into()),
            ..scenario_input()
        };
        assert!(matches!(
            input.into_new_case(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_unknown_status_is_invalid() {
        let input = CaseInput {
            status: Some("Archived".to_string()),
            ..scenario_input()
        };
        assert!(matches!(
            input.into_new_case(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_patch_leaves_absent_fields_untouched() {
        let mut case = scenario_input()
            .into_new_case()
            .unwrap()
            .into_case(Uuid::new_v4(), Utc::now());
        case.place = Some("Miraflores".to_string());

        let patch = CaseInput {
            status: Some("Closed".to_string()),
            latitude: Some("-12.2".into()),
            ..Default::default()
        }
        .into_patch()
        .unwrap();
        patch.apply(&mut case);

        assert_eq!(case.status, CaseStatus::Closed);
        assert_eq!(case.latitude, -12.2);
        assert_eq!(case.title, "Robo tienda");
        assert_eq!(case.place.as_deref(), Some("Miraflores"));
    }

    #[test]
    fn test_patch_blank_optional_clears_and_blank_mandatory_fails() {
        let patch = CaseInput {
            place: Some("".to_string()),
            ..Default::default()
        }
        .into_patch()
        .unwrap();
        assert_eq!(patch.place, Some(None));

        let err = CaseInput {
            title: Some(" ".to_string()),
            ..Default::default()
        }
        .into_patch()
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_serialization_omits_absent_optionals() {
        let case = scenario_input()
            .into_new_case()
            .unwrap()
            .into_case(Uuid::new_v4(), Utc::now());
        let json = serde_json::to_value(&case).unwrap();
        assert_eq!(json["crimeType"], "Robo");
        assert_eq!(json["hour"], "10:00");
        assert_eq!(json["date"], "2024-01-01");
        assert_eq!(json["status"], "Open");
        assert!(json.get("place").is_none());
        assert!(json.get("escapeRoute").is_none());
        assert_eq!(json["media"], serde_json::json!([]));
        assert_eq!(json["createdAt"], json["updatedAt"]);
    }

    #[test]
    fn test_hour_keeps_seconds_through_serde() {
        let mut input = scenario_input();
        input.hour = Some("10:00:30".to_string());
        let case = input
            .into_new_case()
            .unwrap()
            .into_case(Uuid::new_v4(), Utc::now());

        let json = serde_json::to_value(&case).unwrap();
        assert_eq!(json["hour"], "10:00:30");
        let back: CrimeCase = serde_json::from_value(json).unwrap();
        assert_eq!(back.hour, case.hour);
    }

    #[test]
    fn test_case_input_deserializes_mixed_numeric_forms() {
        let input: CaseInput = serde_json::from_value(serde_json::json!({
            "code": "7",
            "latitude": -12,
            "longitude": -76.5,
            "sector": null
        }))
        .unwrap();
        assert_eq!(input.code, Some(NumericInput::Text("7".to_string())));
        assert_eq!(input.latitude, Some(NumericInput::Integer(-12)));
        assert_eq!(input.longitude, Some(NumericInput::Number(-76.5)));
        assert!(input.sector.is_none());
    }
}
