use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::Value;

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    models::roles,
    ratings::{self, RatingLabel},
    response::ApiResponse,
    schema::collections::{
        CITIZENS, COLLECTION_VEHICLES, COMMUNITY_REPORTS, GREEN_CHAMPIONS, INCENTIVES, ULBS,
        WASTE_FACILITIES, WASTE_RECORDS, WASTE_WORKERS,
    },
    state::AppState,
    utils::json::lookup_f64,
};

const COUNTED: &[&str] = &[
    CITIZENS,
    WASTE_WORKERS,
    GREEN_CHAMPIONS,
    WASTE_FACILITIES,
    COLLECTION_VEHICLES,
    ULBS,
    WASTE_RECORDS,
    INCENTIVES,
    COMMUNITY_REPORTS,
];

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSummary {
    pub scored_citizens: usize,
    pub average_score: Option<f64>,
    pub distribution: BTreeMap<&'static str, usize>,
    pub total_reward_points: f64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FacilitySummary {
    pub total_capacity: f64,
    pub total_load: f64,
    pub utilization: Option<f64>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkforceSummary {
    pub rated_workers: usize,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub totals: BTreeMap<&'static str, usize>,
    pub compliance: ComplianceSummary,
    pub facilities: FacilitySummary,
    pub workforce: WorkforceSummary,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn average(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| round1(values.iter().sum::<f64>() / values.len() as f64))
}

pub fn summarize_compliance(citizens: &[Value]) -> ComplianceSummary {
    let scores: Vec<f64> = citizens.iter().filter_map(ratings::citizen_compliance).collect();
    let mut distribution: BTreeMap<&'static str, usize> =
        RatingLabel::ALL.iter().map(|label| (label.as_str(), 0)).collect();
    for score in &scores {
        *distribution
            .entry(RatingLabel::from_score(*score).as_str())
            .or_default() += 1;
    }
    let total_reward_points = citizens
        .iter()
        .filter_map(|citizen| lookup_f64(citizen, "rewardPoints"))
        .sum();

    ComplianceSummary {
        scored_citizens: scores.len(),
        average_score: average(&scores),
        distribution,
        total_reward_points,
    }
}

pub fn summarize_facilities(facilities: &[Value]) -> FacilitySummary {
    let total_capacity: f64 = facilities
        .iter()
        .filter_map(|f| lookup_f64(f, "capacity"))
        .sum();
    let total_load: f64 = facilities
        .iter()
        .filter_map(|f| lookup_f64(f, "currentLoad"))
        .sum();
    FacilitySummary {
        total_capacity,
        total_load,
        utilization: ratings::percentage(total_load, total_capacity).map(round1),
    }
}

pub fn summarize_workforce(workers: &[Value]) -> WorkforceSummary {
    let scores: Vec<f64> = workers
        .iter()
        .filter_map(ratings::worker_rating)
        .map(|rating| rating.score)
        .collect();
    WorkforceSummary {
        rated_workers: scores.len(),
        average_rating: average(&scores),
    }
}

pub async fn summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ApiResponse<AnalyticsSummary>>> {
    user.require_role(roles::STAFF)?;

    let mut totals = BTreeMap::new();
    for collection in COUNTED {
        totals.insert(*collection, state.store.count(collection).await?);
    }

    let citizens = state.store.list(CITIZENS).await?;
    let facilities = state.store.list(WASTE_FACILITIES).await?;
    let workers = state.store.list(WASTE_WORKERS).await?;

    Ok(Json(ApiResponse::ok(AnalyticsSummary {
        totals,
        compliance: summarize_compliance(&citizens),
        facilities: summarize_facilities(&facilities),
        workforce: summarize_workforce(&workers),
    })))
}
