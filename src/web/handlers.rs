use std::collections::BTreeMap;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::analysis::{
    CohortAggregator, GrowthMethod, GrowthRateEstimator, HistoricalSeriesProvider,
    PopulationAggregator, TimeSpec,
};
use crate::error::ForecastError;
use crate::models::{
    LocationFilter, LocationRequest, LocationScope, SubdistrictSelection, UnresolvedContribution,
    VillageSelection, VitalRates,
};

use super::state::AppState;

// ---------------------------------------------------------------------------
// Error wrapper
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    details: String,
}

#[derive(Debug)]
pub(crate) struct WebError(ForecastError);

impl From<ForecastError> for WebError {
    fn from(e: ForecastError) -> Self {
        WebError(e)
    }
}

impl std::fmt::Display for WebError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl actix_web::ResponseError for WebError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type) = match &self.0 {
            ForecastError::InvalidInput(_) | ForecastError::ParseError(_) => {
                (actix_web::http::StatusCode::BAD_REQUEST, "Bad Request")
            }
            ForecastError::NotFound(_) => (actix_web::http::StatusCode::NOT_FOUND, "Not Found"),
            ForecastError::Arithmetic(_) => (
                actix_web::http::StatusCode::UNPROCESSABLE_ENTITY,
                "Unprocessable Entity",
            ),
            _ => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
            ),
        };
        HttpResponse::build(status).json(ErrorBody {
            error: error_type.to_string(),
            details: self.0.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// A year or code sent either as a JSON number or as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(i64),
    Text(String),
}

impl Loose {
    fn parse(field: &str, value: Option<&Loose>) -> Result<Option<i64>, ForecastError> {
        match value {
            None => Ok(None),
            Some(Loose::Number(n)) => Ok(Some(*n)),
            Some(Loose::Text(s)) if s.trim().is_empty() => Ok(None),
            Some(Loose::Text(s)) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ForecastError::ParseError(format!("Invalid {field}: {s}"))),
        }
    }
}

fn year_field(field: &str, value: Option<&Loose>) -> Result<Option<i32>, ForecastError> {
    Loose::parse(field, value)?
        .map(|v| {
            i32::try_from(v)
                .map_err(|_| ForecastError::InvalidInput(format!("{field} out of range: {v}")))
        })
        .transpose()
}

fn code_field(field: &str, value: Option<&Loose>) -> Result<Option<u32>, ForecastError> {
    Loose::parse(field, value)?
        .map(|v| {
            u32::try_from(v)
                .map_err(|_| ForecastError::InvalidInput(format!("Invalid {field}: {v}")))
        })
        .transpose()
}

#[derive(Debug, Default, Deserialize)]
struct YearParams {
    #[serde(default)]
    year: Option<Loose>,
    #[serde(default)]
    start_year: Option<Loose>,
    #[serde(default)]
    end_year: Option<Loose>,
}

impl YearParams {
    fn time_spec(&self, state: &AppState) -> Result<TimeSpec, ForecastError> {
        TimeSpec::from_parts_within(
            year_field("year", self.year.as_ref())?,
            year_field("start_year", self.start_year.as_ref())?,
            year_field("end_year", self.end_year.as_ref())?,
            state.config.projection.max_range_years,
        )
    }
}

#[derive(Debug, Deserialize)]
struct IdProp {
    #[serde(default)]
    id: Option<Loose>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectionRequest {
    #[serde(flatten)]
    years: YearParams,
    #[serde(default)]
    villages_props: Vec<VillageSelection>,
    #[serde(default)]
    subdistrict_props: Vec<SubdistrictSelection>,
    #[serde(default)]
    methods: Option<Vec<GrowthMethod>>,
}

impl ProjectionRequest {
    fn location(&self, state: &AppState) -> LocationRequest {
        let mut request = LocationRequest {
            villages: self.villages_props.clone(),
            subdistricts: self.subdistrict_props.clone(),
        };
        state.dataset.fill_missing_populations(&mut request);
        request
    }
}

/// Rates per ten thousand. Blank form fields arrive as `null`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DemographicRates {
    #[serde(default)]
    birth_rate: Option<f64>,
    #[serde(default)]
    death_rate: Option<f64>,
    #[serde(default)]
    emigration_rate: Option<f64>,
    #[serde(default)]
    immigration_rate: Option<f64>,
}

impl DemographicRates {
    fn vital_rates(&self) -> Result<VitalRates, ForecastError> {
        let rate = |value: Option<f64>, field: &str| {
            value.ok_or_else(|| ForecastError::InvalidInput(format!("Missing {field}")))
        };
        Ok(VitalRates::from_per_ten_thousand(
            rate(self.birth_rate, "birthRate")?,
            rate(self.death_rate, "deathRate")?,
            rate(self.emigration_rate, "emigrationRate")?,
            rate(self.immigration_rate, "immigrationRate")?,
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct DemographicRequest {
    #[serde(flatten)]
    projection: ProjectionRequest,
    demographic: DemographicRates,
}

#[derive(Debug, Deserialize)]
pub struct CohortRequest {
    #[serde(flatten)]
    years: YearParams,
    #[serde(default)]
    villages_props: Vec<IdProp>,
    #[serde(default)]
    subdistrict_props: Option<IdProp>,
    #[serde(default)]
    district_props: Option<IdProp>,
    #[serde(default)]
    state_props: Option<IdProp>,
}

impl CohortRequest {
    fn filter(&self) -> Result<LocationFilter, ForecastError> {
        let id = |prop: &Option<IdProp>, field: &str| match prop {
            Some(p) => code_field(field, p.id.as_ref()),
            None => Ok(None),
        };
        let mut villages = Vec::new();
        for v in &self.villages_props {
            if let Some(code) = code_field("village id", v.id.as_ref())? {
                villages.push(code);
            }
        }
        Ok(LocationFilter {
            state: id(&self.state_props, "state id")?,
            district: id(&self.district_props, "district id")?,
            subdistrict: id(&self.subdistrict_props, "subdistrict id")?,
            villages,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct DistrictsRequest {
    state_code: u32,
}

#[derive(Debug, Deserialize)]
pub struct SubdistrictsRequest {
    district_code: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct VillagesRequest {
    subdistrict_code: Vec<u32>,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TimeSeriesResponse {
    #[serde(flatten)]
    series: BTreeMap<String, BTreeMap<i32, f64>>,
    unresolved: Vec<UnresolvedContribution>,
}

#[derive(Serialize)]
struct DemographicResponse {
    demographic: BTreeMap<i32, f64>,
    unresolved: Vec<UnresolvedContribution>,
}

// ---------------------------------------------------------------------------
// Location listing
// ---------------------------------------------------------------------------

pub async fn states(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.dataset.states())
}

pub async fn districts(
    state: web::Data<AppState>,
    body: web::Json<DistrictsRequest>,
) -> HttpResponse {
    HttpResponse::Ok().json(state.dataset.districts(body.state_code))
}

pub async fn subdistricts(
    state: web::Data<AppState>,
    body: web::Json<SubdistrictsRequest>,
) -> HttpResponse {
    HttpResponse::Ok().json(state.dataset.subdistricts(&body.district_code))
}

pub async fn villages(
    state: web::Data<AppState>,
    body: web::Json<VillagesRequest>,
) -> HttpResponse {
    HttpResponse::Ok().json(state.dataset.villages(&body.subdistrict_code))
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

pub async fn time_series(
    state: web::Data<AppState>,
    body: web::Json<ProjectionRequest>,
) -> Result<HttpResponse, WebError> {
    let time = body.years.time_spec(&state)?;
    let scope = LocationScope::resolve(&body.location(&state), &state.dataset)?;
    let methods = body
        .methods
        .clone()
        .unwrap_or_else(|| state.config.projection.methods.clone());

    let projection = PopulationAggregator::new(&state.dataset)
        .with_policy(state.config.projection.negative_values)
        .aggregate(&scope, &time, &methods)?;

    Ok(HttpResponse::Ok().json(TimeSeriesResponse {
        series: projection
            .series
            .into_iter()
            .map(|(method, years)| (method.to_string(), years))
            .collect(),
        unresolved: projection.unresolved,
    }))
}

pub async fn demographic(
    state: web::Data<AppState>,
    body: web::Json<DemographicRequest>,
) -> Result<HttpResponse, WebError> {
    let time = body.projection.years.time_spec(&state)?;
    let rates = body.demographic.vital_rates()?;
    let scope = LocationScope::resolve(&body.projection.location(&state), &state.dataset)?;

    let projection = PopulationAggregator::new(&state.dataset)
        .with_policy(state.config.projection.negative_values)
        .aggregate_vital(&scope, &time, &rates);

    Ok(HttpResponse::Ok().json(DemographicResponse {
        demographic: projection.series,
        unresolved: projection.unresolved,
    }))
}

pub async fn growth_rates(
    state: web::Data<AppState>,
    path: web::Path<u32>,
) -> Result<HttpResponse, WebError> {
    let code = path.into_inner();
    let series = state.dataset.historical_series(code)?;
    Ok(HttpResponse::Ok().json(GrowthRateEstimator::estimate_all(&series)?))
}

// ---------------------------------------------------------------------------
// Cohorts
// ---------------------------------------------------------------------------

pub async fn cohort(
    state: web::Data<AppState>,
    body: web::Json<CohortRequest>,
) -> Result<HttpResponse, WebError> {
    let time = body.years.time_spec(&state)?;
    let filter = body.filter()?;
    let records = state.dataset.cohort_records(&filter, &time)?;
    let mut summaries = CohortAggregator::summarize(&records, &time)?;

    let cohort = if time.is_single() {
        match summaries.pop() {
            Some(summary) => serde_json::to_value(summary).map_err(ForecastError::from)?,
            None => serde_json::Value::Null,
        }
    } else {
        serde_json::to_value(summaries).map_err(ForecastError::from)?
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({ "cohort": cohort })))
}
