//! GHN (Giao Hàng Nhanh) master-data client
//!
//! Province, district and ward identifiers used by GHN differ from the
//! administrative codes, so the location sync maps them by name.

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::domain::DomainError;

const SERVICE: &str = "ghn";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhnProvince {
    #[serde(rename = "ProvinceID")]
    pub province_id: i32,
    #[serde(rename = "ProvinceName")]
    pub province_name: String,
    #[serde(rename = "NameExtension", default)]
    pub name_extension: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhnDistrict {
    #[serde(rename = "DistrictID")]
    pub district_id: i32,
    #[serde(rename = "DistrictName")]
    pub district_name: String,
    #[serde(rename = "NameExtension", default)]
    pub name_extension: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhnWard {
    #[serde(rename = "WardCode")]
    pub ward_code: String,
    #[serde(rename = "WardName")]
    pub ward_name: String,
    #[serde(rename = "NameExtension", default)]
    pub name_extension: Option<Vec<String>>,
}

pub struct GhnClient<'a> {
    http: &'a reqwest::Client,
    base_url: &'a str,
    token: &'a Secret<String>,
}

impl<'a> GhnClient<'a> {
    pub fn new(http: &'a reqwest::Client, base_url: &'a str, token: &'a Secret<String>) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/'),
            token,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Vec<T>, DomainError> {
        let response = request
            .header("Token", self.token.expose_secret())
            .send()
            .await
            .map_err(|e| DomainError::external(SERVICE, format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DomainError::external(
                SERVICE,
                format!("GHN returned status {}", response.status()),
            ));
        }

        let envelope: Envelope<Vec<T>> = response
            .json()
            .await
            .map_err(|e| DomainError::external(SERVICE, format!("invalid response: {}", e)))?;

        if envelope.code != 200 {
            return Err(DomainError::external(
                SERVICE,
                format!("GHN error {}: {}", envelope.code, envelope.message),
            ));
        }

        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn provinces(&self) -> Result<Vec<GhnProvince>, DomainError> {
        let url = format!("{}/province", self.base_url);
        self.call(self.http.get(url)).await
    }

    pub async fn districts(&self, province_id: i32) -> Result<Vec<GhnDistrict>, DomainError> {
        let url = format!("{}/district", self.base_url);
        self.call(self.http.post(url).json(&json!({ "province_id": province_id })))
            .await
    }

    pub async fn wards(&self, district_id: i32) -> Result<Vec<GhnWard>, DomainError> {
        let url = format!("{}/ward", self.base_url);
        self.call(self.http.post(url).json(&json!({ "district_id": district_id })))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetches_provinces_with_token_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/province"))
            .and(header("Token", "ghn-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200,
                "message": "Success",
                "data": [{ "ProvinceID": 201, "ProvinceName": "Hà Nội", "NameExtension": ["Ha Noi"] }]
            })))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let token = Secret::new("ghn-token".to_string());
        let base_url = server.uri();
        let client = GhnClient::new(&http, &base_url, &token);

        let provinces = client.provinces().await.unwrap();
        assert_eq!(provinces.len(), 1);
        assert_eq!(provinces[0].province_id, 201);
    }

    #[tokio::test]
    async fn envelope_error_is_external_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/district"))
            .and(body_json(json!({ "province_id": 201 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 400, "message": "Token is not valid", "data": null
            })))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let token = Secret::new("bad".to_string());
        let base_url = server.uri();
        let client = GhnClient::new(&http, &base_url, &token);

        let err = client.districts(201).await.unwrap_err();
        assert_eq!(err.http_status(), 502);
    }

    #[tokio::test]
    async fn null_ward_list_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ward"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 200, "message": "Success", "data": null
            })))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let token = Secret::new("t".to_string());
        let base_url = server.uri();
        let client = GhnClient::new(&http, &base_url, &token);
        assert!(client.wards(1442).await.unwrap().is_empty());
    }
}
