//! Province / district lookup against the public administrative-units API
//!
//! Responses change a few times a year, so both lists are cached for
//! `ADDRESS_CACHE_TTL_SECS`.

use serde::{Deserialize, Serialize};
use shared::{AppError, ErrorCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::cache::TtlCache;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Province {
    pub code: u32,
    pub name: String,
    #[serde(default, alias = "division_type")]
    pub division_type: String,
    #[serde(default)]
    pub codename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct District {
    pub code: u32,
    pub name: String,
    #[serde(default, alias = "division_type")]
    pub division_type: String,
    #[serde(default)]
    pub codename: String,
    #[serde(alias = "province_code")]
    pub province_code: u32,
}

#[derive(Debug, Deserialize)]
struct ProvinceWithDistricts {
    #[serde(default)]
    districts: Vec<District>,
}

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("Address service request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Province not found: {0}")]
    ProvinceNotFound(u32),
}

impl From<AddressError> for AppError {
    fn from(err: AddressError) -> Self {
        match err {
            AddressError::Upstream(e) => {
                tracing::warn!(error = %e, "Address service unavailable");
                AppError::with_message(ErrorCode::NetworkError, "Address service unavailable")
            }
            AddressError::ProvinceNotFound(code) => {
                AppError::not_found(format!("Province {code}"))
            }
        }
    }
}

pub struct AddressDirectory {
    client: reqwest::Client,
    base_url: String,
    provinces: TtlCache<(), Arc<Vec<Province>>>,
    districts: TtlCache<u32, Arc<Vec<District>>>,
}

impl std::fmt::Debug for AddressDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressDirectory")
            .field("base_url", &self.base_url)
            .field("cached_district_lists", &self.districts.len())
            .finish()
    }
}

impl AddressDirectory {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            provinces: TtlCache::new(ttl),
            districts: TtlCache::new(ttl),
        }
    }

    pub async fn provinces(&self) -> Result<Arc<Vec<Province>>, AddressError> {
        if let Some(cached) = self.provinces.get(&()) {
            return Ok(cached);
        }
        let list: Vec<Province> = self
            .client
            .get(format!("{}/p/", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let list = Arc::new(list);
        self.provinces.insert((), list.clone());
        tracing::debug!(count = list.len(), "Province list refreshed");
        Ok(list)
    }

    pub async fn districts(&self, province_code: u32) -> Result<Arc<Vec<District>>, AddressError> {
        if let Some(cached) = self.districts.get(&province_code) {
            return Ok(cached);
        }
        let response = self
            .client
            .get(format!("{}/p/{province_code}", self.base_url))
            .query(&[("depth", "2")])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AddressError::ProvinceNotFound(province_code));
        }
        let province: ProvinceWithDistricts = response.error_for_status()?.json().await?;
        let list = Arc::new(province.districts);
        self.districts.insert(province_code, list.clone());
        Ok(list)
    }

    /// Called from the background sweeper
    pub fn purge_expired(&self) -> usize {
        self.provinces.purge_expired() + self.districts.purge_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn fake_api() -> (String, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/p/",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!([
                        { "name": "Thành phố Hà Nội", "code": 1, "division_type": "thành phố trung ương", "codename": "thanh_pho_ha_noi", "districts": [] },
                        { "name": "Thành phố Hồ Chí Minh", "code": 79, "division_type": "thành phố trung ương", "codename": "thanh_pho_ho_chi_minh", "districts": [] }
                    ]))
                }),
            )
            .route(
                "/p/{code}",
                get(|State(hits): State<Arc<AtomicUsize>>, Path(code): Path<u32>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    if code != 1 {
                        return Err(StatusCode::NOT_FOUND);
                    }
                    Ok::<Json<Value>, StatusCode>(Json(json!({
                        "name": "Thành phố Hà Nội",
                        "code": 1,
                        "districts": [
                            { "name": "Quận Ba Đình", "code": 1, "division_type": "quận", "codename": "quan_ba_dinh", "province_code": 1, "wards": [] },
                            { "name": "Quận Hoàn Kiếm", "code": 2, "division_type": "quận", "codename": "quan_hoan_kiem", "province_code": 1, "wards": [] }
                        ]
                    })))
                }),
            )
            .with_state(hits.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), hits)
    }

    #[tokio::test]
    async fn test_lists_are_cached() {
        let (base, hits) = fake_api().await;
        let directory = AddressDirectory::new(reqwest::Client::new(), base, Duration::from_secs(60));

        let provinces = directory.provinces().await.unwrap();
        assert_eq!(provinces.len(), 2);
        assert_eq!(provinces[1].code, 79);
        directory.provinces().await.unwrap();

        let districts = directory.districts(1).await.unwrap();
        assert_eq!(districts[1].name, "Quận Hoàn Kiếm");
        assert_eq!(districts[1].province_code, 1);
        directory.districts(1).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_province() {
        let (base, _) = fake_api().await;
        let directory = AddressDirectory::new(reqwest::Client::new(), base, Duration::from_secs(60));
        assert!(matches!(
            directory.districts(999).await,
            Err(AddressError::ProvinceNotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_expired_lists_are_refetched() {
        let (base, hits) = fake_api().await;
        let directory = AddressDirectory::new(reqwest::Client::new(), base, Duration::ZERO);
        directory.provinces().await.unwrap();
        directory.provinces().await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(directory.purge_expired(), 1);
    }
}
