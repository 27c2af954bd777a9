//! Location Service - Vietnamese provinces, districts and wards
//!
//! Reads go through a process-wide cache with a one hour TTL. Imports and
//! carrier syncs clear it.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use strsim::jaro_winkler;

use crate::domain::{DomainError, LocationBatch};
use crate::infrastructure::AppState;
use crate::models::{district, province, ward};
use crate::modules::integrations::ghn::GhnClient;
use crate::utils::text::{normalize_unit_name, slugify};

struct CacheEntry {
    data: Value,
    created_at: Instant,
}

static LOCATION_CACHE: Lazy<Mutex<HashMap<String, CacheEntry>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

const CACHE_TTL: Duration = Duration::from_secs(3600);
const MIN_QUERY_LEN: usize = 2;
/// Fallback similarity for carrier names that differ in spelling
const FUZZY_MATCH: f64 = 0.93;

pub fn clear_cache() {
    if let Ok(mut cache) = LOCATION_CACHE.lock() {
        cache.clear();
    }
    tracing::debug!("Location cache cleared");
}

/// Clears the cache when dropped, on success and on every early return.
struct CacheFlush;

impl Drop for CacheFlush {
    fn drop(&mut self) {
        clear_cache();
    }
}

/// Serve `key` from the cache, or compute and store it.
/// A contended lock just skips the cache.
async fn cached<T, F, Fut>(key: String, load: F) -> Result<Value, DomainError>
where
    T: Serialize,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    if let Ok(cache) = LOCATION_CACHE.try_lock()
        && let Some(entry) = cache.get(&key)
        && entry.created_at.elapsed() < CACHE_TTL
    {
        return Ok(entry.data.clone());
    }

    let data = serde_json::to_value(load().await?)
        .map_err(|e| DomainError::Internal(e.to_string()))?;

    if let Ok(mut cache) = LOCATION_CACHE.try_lock() {
        cache.retain(|_, e| e.created_at.elapsed() < CACHE_TTL);
        cache.insert(
            key,
            CacheEntry {
                data: data.clone(),
                created_at: Instant::now(),
            },
        );
    }
    Ok(data)
}

// ---------------------------------------------------------------------------
// Cached reads
// ---------------------------------------------------------------------------

pub async fn provinces(state: &AppState) -> Result<Value, DomainError> {
    cached("provinces".to_string(), || state.location_repo.provinces()).await
}

pub async fn province(state: &AppState, code: &str) -> Result<Value, DomainError> {
    cached(format!("province:{}", code), || async {
        state
            .location_repo
            .province(code)
            .await?
            .ok_or_else(|| DomainError::not_found("Province"))
    })
    .await
}

pub async fn districts(state: &AppState, province_code: &str) -> Result<Value, DomainError> {
    cached(format!("districts:{}", province_code), || {
        state.location_repo.districts_of(province_code)
    })
    .await
}

pub async fn district(state: &AppState, code: &str) -> Result<Value, DomainError> {
    cached(format!("district:{}", code), || async {
        state
            .location_repo
            .district(code)
            .await?
            .ok_or_else(|| DomainError::not_found("District"))
    })
    .await
}

pub async fn wards(state: &AppState, district_code: &str) -> Result<Value, DomainError> {
    cached(format!("wards:{}", district_code), || {
        state.location_repo.wards_of(district_code)
    })
    .await
}

pub async fn ward(state: &AppState, code: &str) -> Result<Value, DomainError> {
    cached(format!("ward:{}", code), || async {
        state
            .location_repo
            .ward(code)
            .await?
            .ok_or_else(|| DomainError::not_found("Ward"))
    })
    .await
}

// ---------------------------------------------------------------------------
// Search, resolve and validate
// ---------------------------------------------------------------------------

pub fn full_address(w: &ward::Model, d: &district::Model, p: &province::Model) -> String {
    format!(
        "{}, {}, {}",
        w.name_with_type, d.name_with_type, p.name_with_type
    )
}

pub async fn search(state: &AppState, q: &str, limit: u64) -> Result<Value, DomainError> {
    let q = q.trim();
    if q.chars().count() < MIN_QUERY_LEN {
        return Ok(json!({ "provinces": [], "districts": [], "wards": [] }));
    }
    let found = state
        .location_repo
        .search(&slugify(q), limit.clamp(1, 100))
        .await?;
    Ok(json!({
        "provinces": found.provinces,
        "districts": found.districts,
        "wards": found.wards,
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Province,
    District,
    Ward,
    #[default]
    All,
}

pub async fn autocomplete(
    state: &AppState,
    q: &str,
    level: Level,
    limit: u64,
) -> Result<Vec<Value>, DomainError> {
    let q = q.trim();
    if q.chars().count() < MIN_QUERY_LEN {
        return Ok(Vec::new());
    }
    let repo = &state.location_repo;
    let found = repo.search(&slugify(q), limit.clamp(1, 50)).await?;
    let mut results = Vec::new();

    if matches!(level, Level::Province | Level::All) {
        results.extend(found.provinces.iter().map(|p| {
            json!({ "code": p.code, "name": p.name_with_type, "type": "province", "parent": null })
        }));
    }

    if matches!(level, Level::District | Level::All) {
        for d in &found.districts {
            let parent = repo
                .province(&d.province_code)
                .await?
                .map(|p| json!({ "code": p.code, "name": p.name_with_type }));
            results.push(json!({
                "code": d.code,
                "name": d.name_with_type,
                "type": "district",
                "parent": parent,
            }));
        }
    }

    if matches!(level, Level::Ward | Level::All) {
        for w in &found.wards {
            let mut parent = Value::Null;
            if let Some(d) = repo.district(&w.district_code).await? {
                let grand = repo
                    .province(&d.province_code)
                    .await?
                    .map(|p| json!({ "code": p.code, "name": p.name_with_type }));
                parent = json!({
                    "code": d.code,
                    "name": d.name_with_type,
                    "province": grand,
                });
            }
            results.push(json!({
                "code": w.code,
                "name": w.name_with_type,
                "type": "ward",
                "parent": parent,
            }));
        }
    }

    Ok(results)
}

async fn hierarchy(
    state: &AppState,
    ward_code: &str,
) -> Result<Option<(ward::Model, district::Model, province::Model)>, DomainError> {
    let repo = &state.location_repo;
    let Some(w) = repo.ward(ward_code).await? else {
        return Ok(None);
    };
    let Some(d) = repo.district(&w.district_code).await? else {
        return Ok(None);
    };
    let Some(p) = repo.province(&d.province_code).await? else {
        return Ok(None);
    };
    Ok(Some((w, d, p)))
}

pub async fn resolve(state: &AppState, ward_code: &str) -> Result<Value, DomainError> {
    let (w, d, p) = hierarchy(state, ward_code)
        .await?
        .ok_or_else(|| DomainError::not_found("Ward"))?;
    Ok(json!({
        "ward_code": w.code,
        "district_code": d.code,
        "province_code": p.code,
        "full_address": full_address(&w, &d, &p),
        "ward": w,
        "district": d,
        "province": p,
    }))
}

/// True when the ward sits in the district and the district in the province.
pub async fn validate(
    state: &AppState,
    province_code: &str,
    district_code: &str,
    ward_code: &str,
) -> Result<bool, DomainError> {
    Ok(hierarchy(state, ward_code)
        .await?
        .is_some_and(|(_, d, p)| d.code == district_code && p.code == province_code))
}

pub async fn statistics(state: &AppState) -> Result<Value, DomainError> {
    let (provinces, districts, wards) = state.location_repo.counts().await?;
    Ok(json!({ "provinces": provinces, "districts": districts, "wards": wards }))
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ImportWard {
    pub code: String,
    pub name: String,
    pub name_with_type: Option<String>,
    #[serde(rename = "type", default)]
    pub division_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ImportDistrict {
    pub code: String,
    pub name: String,
    pub name_with_type: Option<String>,
    #[serde(rename = "type", default)]
    pub division_type: String,
    #[serde(default)]
    pub wards: Vec<ImportWard>,
}

#[derive(Debug, Deserialize)]
pub struct ImportProvince {
    pub code: String,
    pub name: String,
    pub name_with_type: Option<String>,
    #[serde(rename = "type", default)]
    pub division_type: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub districts: Vec<ImportDistrict>,
}

#[derive(Debug, Deserialize)]
pub struct ImportPayload {
    pub provinces: Vec<ImportProvince>,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ImportCounts {
    pub provinces: u64,
    pub districts: u64,
    pub wards: u64,
}

fn check_unit(level: &str, code: &str, name: &str) -> Result<(), DomainError> {
    if code.trim().is_empty() || name.trim().is_empty() {
        return Err(DomainError::Validation(format!(
            "Every {} needs a code and a name",
            level
        )));
    }
    Ok(())
}

fn validate_import(payload: &ImportPayload) -> Result<(), DomainError> {
    for p in &payload.provinces {
        check_unit("province", &p.code, &p.name)?;
        for d in &p.districts {
            check_unit("district", &d.code, &d.name)?;
            for w in &d.wards {
                check_unit("ward", &w.code, &w.name)?;
            }
        }
    }
    Ok(())
}

/// Upsert a nested province/district/ward tree in one transaction.
/// Carrier ids already stored are kept.
pub async fn import(state: &AppState, payload: ImportPayload) -> Result<ImportCounts, DomainError> {
    validate_import(&payload)?;
    let _flush = CacheFlush;
    let repo = &state.location_repo;
    let mut batch = LocationBatch::default();

    for p in payload.provinces {
        let existing = repo.province(&p.code).await?;
        let p_full = p.name_with_type.clone().unwrap_or_else(|| p.name.clone());
        batch.provinces.push(province::Model {
            code: p.code.clone(),
            name: p.name.clone(),
            name_with_type: p_full.clone(),
            slug: slugify(&p.name),
            division_type: p.division_type,
            search_slug: slugify(&p.name),
            ghn_id: existing.as_ref().and_then(|e| e.ghn_id),
            ghtk_id: existing.and_then(|e| e.ghtk_id),
            is_active: true,
            sort_order: p.sort_order,
        });

        for d in p.districts {
            let existing = repo.district(&d.code).await?;
            let d_full = d.name_with_type.clone().unwrap_or_else(|| d.name.clone());
            batch.districts.push(district::Model {
                code: d.code.clone(),
                province_code: p.code.clone(),
                name: d.name.clone(),
                name_with_type: d_full.clone(),
                slug: slugify(&d.name),
                division_type: d.division_type,
                search_slug: slugify(&d.name),
                path: format!("{}, {}", d.name, p.name),
                path_with_type: format!("{}, {}", d_full, p_full),
                ghn_id: existing.as_ref().and_then(|e| e.ghn_id),
                ghtk_id: existing.and_then(|e| e.ghtk_id),
                is_active: true,
            });

            for w in d.wards {
                let existing = repo.ward(&w.code).await?;
                let w_full = w.name_with_type.clone().unwrap_or_else(|| w.name.clone());
                batch.wards.push(ward::Model {
                    code: w.code,
                    district_code: d.code.clone(),
                    name: w.name.clone(),
                    name_with_type: w_full.clone(),
                    slug: slugify(&w.name),
                    division_type: w.division_type,
                    search_slug: slugify(&w.name),
                    path: format!("{}, {}, {}", w.name, d.name, p.name),
                    path_with_type: format!("{}, {}, {}", w_full, d_full, p_full),
                    ghn_code: existing.as_ref().and_then(|e| e.ghn_code.clone()),
                    ghtk_id: existing.and_then(|e| e.ghtk_id),
                    is_active: true,
                });
            }
        }
    }

    let counts = ImportCounts {
        provinces: batch.provinces.len() as u64,
        districts: batch.districts.len() as u64,
        wards: batch.wards.len() as u64,
    };
    repo.write_batch(batch).await?;
    tracing::info!(
        "Imported {} provinces, {} districts, {} wards",
        counts.provinces,
        counts.districts,
        counts.wards
    );
    Ok(counts)
}

// ---------------------------------------------------------------------------
// GHN sync
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct MatchCounts {
    pub matched: u64,
    pub unmatched: u64,
}

#[derive(Debug, Default, Serialize)]
pub struct SyncReport {
    pub provinces: MatchCounts,
    pub districts: MatchCounts,
    pub wards: MatchCounts,
}

/// Index of the local row whose name matches the carrier's name or one of its aliases.
fn best_match<'a, T>(
    carrier_name: &str,
    aliases: Option<&Vec<String>>,
    rows: &'a [T],
    name_of: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    let mut candidates = vec![normalize_unit_name(carrier_name)];
    if let Some(aliases) = aliases {
        candidates.extend(aliases.iter().map(|a| normalize_unit_name(a)));
    }

    let exact = rows.iter().find(|row| {
        let local = normalize_unit_name(name_of(row));
        candidates.iter().any(|c| *c == local)
    });
    if exact.is_some() {
        return exact;
    }

    let primary = &candidates[0];
    rows.iter()
        .map(|row| (row, jaro_winkler(primary, &normalize_unit_name(name_of(row)))))
        .filter(|(_, score)| *score >= FUZZY_MATCH)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(row, _)| row)
}

pub async fn sync_ghn(state: &AppState) -> Result<SyncReport, DomainError> {
    let token = state.config.ghn_api_token.as_ref().ok_or_else(|| {
        DomainError::BusinessRule("GHN_API_TOKEN is not configured".to_string())
    })?;
    let client = GhnClient::new(&state.http, &state.config.ghn_api_url, token);
    let _flush = CacheFlush;
    let repo = &state.location_repo;
    let mut report = SyncReport::default();
    let mut batch = LocationBatch::default();

    let local_provinces = repo.provinces().await?;
    for gp in client.provinces().await? {
        let Some(p) = best_match(
            &gp.province_name,
            gp.name_extension.as_ref(),
            &local_provinces,
            |p| p.name.as_str(),
        ) else {
            report.provinces.unmatched += 1;
            tracing::debug!("No province matches GHN {}", gp.province_name);
            continue;
        };
        report.provinces.matched += 1;
        batch.provinces.push(province::Model {
            ghn_id: Some(gp.province_id),
            ..p.clone()
        });

        let local_districts = repo.districts_of(&p.code).await?;
        for gd in client.districts(gp.province_id).await? {
            let Some(d) = best_match(
                &gd.district_name,
                gd.name_extension.as_ref(),
                &local_districts,
                |d| d.name.as_str(),
            ) else {
                report.districts.unmatched += 1;
                continue;
            };
            report.districts.matched += 1;
            batch.districts.push(district::Model {
                ghn_id: Some(gd.district_id),
                ..d.clone()
            });

            let local_wards = repo.wards_of(&d.code).await?;
            for gw in client.wards(gd.district_id).await? {
                match best_match(
                    &gw.ward_name,
                    gw.name_extension.as_ref(),
                    &local_wards,
                    |w| w.name.as_str(),
                ) {
                    Some(w) => {
                        report.wards.matched += 1;
                        batch.wards.push(ward::Model {
                            ghn_code: Some(gw.ward_code.clone()),
                            ..w.clone()
                        });
                    }
                    None => report.wards.unmatched += 1,
                }
            }
        }
    }

    // Nothing is written unless every carrier call succeeded
    repo.write_batch(batch).await?;
    tracing::info!(
        "GHN sync: provinces {}/{}, districts {}/{}, wards {}/{} matched",
        report.provinces.matched,
        report.provinces.matched + report.provinces.unmatched,
        report.districts.matched,
        report.districts.matched + report.districts.unmatched,
        report.wards.matched,
        report.wards.matched + report.wards.unmatched
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_with_and_without_prefix() {
        let rows = vec!["Hà Nội".to_string(), "Hồ Chí Minh".to_string()];
        let found = best_match("Thành phố Hà Nội", None, &rows, |s| s.as_str());
        assert_eq!(found.map(String::as_str), Some("Hà Nội"));

        let aliases = vec!["TP.HCM".to_string(), "Hồ Chí Minh".to_string()];
        let found = best_match("Sài Gòn", Some(&aliases), &rows, |s| s.as_str());
        assert_eq!(found.map(String::as_str), Some("Hồ Chí Minh"));
    }

    #[test]
    fn fuzzy_fallback_and_miss() {
        let rows = vec!["Phú Nhuận".to_string()];
        assert!(best_match("Phu Nhuan", None, &rows, |s| s.as_str()).is_some());
        assert!(best_match("Bình Thạnh", None, &rows, |s| s.as_str()).is_none());
    }
}
