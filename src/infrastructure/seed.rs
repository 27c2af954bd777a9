//! Small location dataset for local development (`SEED_LOCATIONS`).

use serde_json::json;

use crate::domain::DomainError;
use crate::infrastructure::AppState;
use crate::services::location_service::{self, ImportCounts, ImportPayload};

pub async fn seed_locations(state: &AppState) -> Result<ImportCounts, DomainError> {
    let payload: ImportPayload = serde_json::from_value(json!({
        "provinces": [
            {
                "code": "01",
                "name": "Hà Nội",
                "name_with_type": "Thành phố Hà Nội",
                "type": "thanh-pho",
                "sort_order": 1,
                "districts": [
                    {
                        "code": "001",
                        "name": "Ba Đình",
                        "name_with_type": "Quận Ba Đình",
                        "type": "quan",
                        "wards": [
                            { "code": "00001", "name": "Phúc Xá", "name_with_type": "Phường Phúc Xá", "type": "phuong" },
                            { "code": "00004", "name": "Trúc Bạch", "name_with_type": "Phường Trúc Bạch", "type": "phuong" },
                            { "code": "00006", "name": "Vĩnh Phúc", "name_with_type": "Phường Vĩnh Phúc", "type": "phuong" }
                        ]
                    },
                    {
                        "code": "002",
                        "name": "Hoàn Kiếm",
                        "name_with_type": "Quận Hoàn Kiếm",
                        "type": "quan",
                        "wards": [
                            { "code": "00037", "name": "Phúc Tân", "name_with_type": "Phường Phúc Tân", "type": "phuong" },
                            { "code": "00040", "name": "Đồng Xuân", "name_with_type": "Phường Đồng Xuân", "type": "phuong" }
                        ]
                    }
                ]
            },
            {
                "code": "79",
                "name": "Hồ Chí Minh",
                "name_with_type": "Thành phố Hồ Chí Minh",
                "type": "thanh-pho",
                "sort_order": 2,
                "districts": [
                    {
                        "code": "760",
                        "name": "1",
                        "name_with_type": "Quận 1",
                        "type": "quan",
                        "wards": [
                            { "code": "26734", "name": "Tân Định", "name_with_type": "Phường Tân Định", "type": "phuong" },
                            { "code": "26737", "name": "Đa Kao", "name_with_type": "Phường Đa Kao", "type": "phuong" },
                            { "code": "26740", "name": "Bến Nghé", "name_with_type": "Phường Bến Nghé", "type": "phuong" }
                        ]
                    }
                ]
            },
            {
                "code": "48",
                "name": "Đà Nẵng",
                "name_with_type": "Thành phố Đà Nẵng",
                "type": "thanh-pho",
                "sort_order": 3,
                "districts": [
                    {
                        "code": "490",
                        "name": "Liên Chiểu",
                        "name_with_type": "Quận Liên Chiểu",
                        "type": "quan",
                        "wards": [
                            { "code": "20194", "name": "Hòa Hiệp Bắc", "name_with_type": "Phường Hòa Hiệp Bắc", "type": "phuong" }
                        ]
                    }
                ]
            }
        ]
    }))
    .map_err(|e| DomainError::Internal(format!("Invalid seed dataset: {}", e)))?;

    location_service::import(state, payload).await
}
