//! Commercial business registration types
//!
//! Only the fields the access layer itself needs to validate, normalise or
//! count. Everything else travels as opaque JSON.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{CivicDeskError, Result};
use crate::impl_domain_status_conversions;

/// Review state of a business registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl_domain_status_conversions!(ValidationStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

impl ValidationStatus {
    /// Lenient parse of the states the backend has been seen to emit,
    /// including Spanish spellings. Unknown or missing values are pending.
    #[must_use]
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Pending;
        };
        match raw.trim().to_uppercase().as_str() {
            "APPROVED" | "APROBADO" | "VALIDATED" => Self::Approved,
            "REJECTED" | "RECHAZADO" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryService {
    Si,
    #[default]
    No,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalePlace {
    #[default]
    LocalFijo,
    Ambulante,
    Otro,
}

/// Registration payload for a new business
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBusiness {
    pub category_id: u64,
    pub commercial_name: String,
    pub representative_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub parish_community_sector: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub products_services: Vec<String>,
    #[serde(default)]
    pub accepts_whatsapp_orders: bool,
    #[serde(default)]
    pub delivery_service: DeliveryService,
    #[serde(default)]
    pub sale_place: SalePlace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_date: Option<NaiveDate>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub google_maps_coordinates: String,
    #[serde(default)]
    pub schedules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiktok: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub udel_support_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_udel_support: Option<bool>,
}

impl NewBusiness {
    /// Check the fields the backend refuses to do without.
    ///
    /// # Errors
    /// Returns `CivicDeskError::InvalidInput` naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        if self.category_id == 0 {
            return Err(CivicDeskError::InvalidInput("categoryId is required".into()));
        }
        if self.commercial_name.trim().is_empty() {
            return Err(CivicDeskError::InvalidInput("commercialName is required".into()));
        }
        if self.representative_name.trim().is_empty() {
            return Err(CivicDeskError::InvalidInput("representativeName is required".into()));
        }
        Ok(())
    }

    /// Trimmed copy with blank optionals dropped and the registration date
    /// defaulted to `today`.
    #[must_use]
    pub fn normalized(&self, today: NaiveDate) -> Self {
        fn trim_opt(value: Option<&String>) -> Option<String> {
            value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }

        Self {
            category_id: self.category_id,
            commercial_name: self.commercial_name.trim().to_string(),
            representative_name: self.representative_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            parish_community_sector: self.parish_community_sector.trim().to_string(),
            description: self.description.trim().to_string(),
            products_services: self.products_services.clone(),
            accepts_whatsapp_orders: self.accepts_whatsapp_orders,
            delivery_service: self.delivery_service,
            sale_place: self.sale_place,
            registration_date: Some(self.registration_date.unwrap_or(today)),
            address: self.address.trim().to_string(),
            google_maps_coordinates: self.google_maps_coordinates.trim().to_string(),
            schedules: self.schedules.clone(),
            facebook: trim_opt(self.facebook.as_ref()),
            instagram: trim_opt(self.instagram.as_ref()),
            tiktok: trim_opt(self.tiktok.as_ref()),
            website: trim_opt(self.website.as_ref()),
            whatsapp_number: trim_opt(self.whatsapp_number.as_ref()),
            udel_support_details: trim_opt(self.udel_support_details.as_ref()),
            received_udel_support: self.received_udel_support,
        }
    }
}

/// One binary file part of a multipart upload
#[derive(Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileAttachment {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), mime_type: None, bytes }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

impl fmt::Debug for FileAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileAttachment")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Files attached to a business registration; the identity document is
/// mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessFiles {
    pub cedula: FileAttachment,
    pub logo: Option<FileAttachment>,
    pub signature: Option<FileAttachment>,
    pub carousel: Vec<FileAttachment>,
}

impl BusinessFiles {
    pub fn new(cedula: FileAttachment) -> Self {
        Self { cedula, logo: None, signature: None, carousel: Vec::new() }
    }

    #[must_use]
    pub fn with_logo(mut self, logo: FileAttachment) -> Self {
        self.logo = Some(logo);
        self
    }

    #[must_use]
    pub fn with_signature(mut self, signature: FileAttachment) -> Self {
        self.signature = Some(signature);
        self
    }

    #[must_use]
    pub fn with_carousel_photo(mut self, photo: FileAttachment) -> Self {
        self.carousel.push(photo);
        self
    }
}

/// Zero-based page selection for listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub category: Option<String>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 0, size: 10, category: None }
    }
}

impl PageRequest {
    pub const fn new(page: u32, size: u32) -> Self {
        Self { page, size, category: None }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Query pairs in the order the backend documents them.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        pairs
    }
}

/// Review counters shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BusinessStats {
    pub total: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl BusinessStats {
    /// Count review states in a paginated listing.
    ///
    /// Accepts the listing wrapped as `{data: {content, totalElements}}`,
    /// bare `{content, totalElements}`, or a plain array. Returns `None` when
    /// no list of businesses can be found.
    #[must_use]
    pub fn from_listing(listing: &Value) -> Option<Self> {
        let page = listing
            .get("data")
            .filter(|d| d.get("content").is_some())
            .unwrap_or(listing);

        let items = match page {
            Value::Array(items) => items,
            other => other.get("content").and_then(Value::as_array)?,
        };

        let mut stats = Self {
            total: page
                .get("totalElements")
                .and_then(Value::as_u64)
                .unwrap_or(items.len() as u64),
            ..Self::default()
        };

        for item in items {
            let raw = item.get("validationStatus").and_then(Value::as_str);
            match ValidationStatus::normalize(raw) {
                ValidationStatus::Pending if raw.is_some() => stats.pending += 1,
                ValidationStatus::Pending => {}
                ValidationStatus::Approved => stats.approved += 1,
                ValidationStatus::Rejected => stats.rejected += 1,
            }
        }

        Some(stats)
    }
}

/// Counters served by the admin dashboard endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub pending_users: u64,
    pub approved_users: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_users: Option<u64>,
}

impl From<BusinessStats> for DashboardStats {
    fn from(stats: BusinessStats) -> Self {
        Self {
            total_users: stats.total,
            pending_users: stats.pending,
            approved_users: stats.approved,
            rejected_users: Some(stats.rejected),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> NewBusiness {
        NewBusiness {
            category_id: 3,
            commercial_name: "  Panaderia Central ".into(),
            representative_name: " Ana Torres".into(),
            facebook: Some("   ".into()),
            website: Some(" https://pan.example ".into()),
            ..NewBusiness::default()
        }
    }

    #[test]
    fn test_validate_required_fields() {
        assert!(sample().validate().is_ok());

        let missing_category = NewBusiness { category_id: 0, ..sample() };
        assert_eq!(
            missing_category.validate(),
            Err(CivicDeskError::InvalidInput("categoryId is required".into()))
        );

        let blank_name = NewBusiness { commercial_name: "   ".into(), ..sample() };
        assert!(blank_name.validate().is_err());
    }

    #[test]
    fn test_normalized_trims_and_defaults_date() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let normalized = sample().normalized(today);

        assert_eq!(normalized.commercial_name, "Panaderia Central");
        assert_eq!(normalized.representative_name, "Ana Torres");
        assert_eq!(normalized.facebook, None);
        assert_eq!(normalized.website.as_deref(), Some("https://pan.example"));
        assert_eq!(normalized.registration_date, Some(today));
    }

    #[test]
    fn test_serializes_camel_case_and_enum_codes() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let value = serde_json::to_value(sample().normalized(today)).unwrap();

        assert_eq!(value["categoryId"], json!(3));
        assert_eq!(value["deliveryService"], json!("NO"));
        assert_eq!(value["salePlace"], json!("LOCAL_FIJO"));
        assert_eq!(value["registrationDate"], json!("2026-03-01"));
        assert!(value.get("facebook").is_none());
    }

    #[test]
    fn test_validation_status_normalize() {
        assert_eq!(ValidationStatus::normalize(Some("aprobado")), ValidationStatus::Approved);
        assert_eq!(ValidationStatus::normalize(Some("VALIDATED")), ValidationStatus::Approved);
        assert_eq!(ValidationStatus::normalize(Some("Rechazado")), ValidationStatus::Rejected);
        assert_eq!(ValidationStatus::normalize(Some("pendiente")), ValidationStatus::Pending);
        assert_eq!(ValidationStatus::normalize(Some("archived")), ValidationStatus::Pending);
        assert_eq!(ValidationStatus::normalize(None), ValidationStatus::Pending);
    }

    #[test]
    fn test_validation_status_from_str() {
        assert_eq!("Approved".parse::<ValidationStatus>(), Ok(ValidationStatus::Approved));
        assert_eq!(ValidationStatus::Rejected.to_string(), "rejected");
        assert!("aprobado".parse::<ValidationStatus>().is_err());
    }

    #[test]
    fn test_page_request_query_pairs() {
        let pairs = PageRequest::new(2, 25).with_category("food").query_pairs();
        assert_eq!(
            pairs,
            vec![("page", "2".to_string()), ("size", "25".to_string()), ("category", "food".into())]
        );
    }

    #[test]
    fn test_stats_from_wrapped_listing() {
        let listing = json!({
            "data": {
                "totalElements": 40,
                "content": [
                    {"validationStatus": "PENDING"},
                    {"validationStatus": "APPROVED"},
                    {"validationStatus": "VALIDATED"},
                    {"validationStatus": "REJECTED"},
                    {"id": 9}
                ]
            }
        });

        let stats = BusinessStats::from_listing(&listing).unwrap();
        assert_eq!(stats, BusinessStats { total: 40, pending: 1, approved: 2, rejected: 1 });
    }

    #[test]
    fn test_dashboard_stats_from_business_stats() {
        let stats = BusinessStats { total: 9, pending: 4, approved: 3, rejected: 2 };
        let dashboard = DashboardStats::from(stats);
        assert_eq!(dashboard.total_users, 9);
        assert_eq!(dashboard.rejected_users, Some(2));

        let wire: DashboardStats = serde_json::from_value(
            json!({"totalUsers": 5, "pendingUsers": 1, "approvedUsers": 4}),
        )
        .unwrap();
        assert_eq!(wire.rejected_users, None);
    }

    #[test]
    fn test_stats_from_plain_array_and_missing_list() {
        let listing = json!([{"validationStatus": "PENDING"}, {"validationStatus": "PENDING"}]);
        let stats = BusinessStats::from_listing(&listing).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.pending, 2);

        assert!(BusinessStats::from_listing(&json!({"message": "nothing here"})).is_none());
    }
}
