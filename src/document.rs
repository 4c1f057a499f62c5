//! Document payload submitted to the documents API.
//!
//! Field names follow the API's JSON schema, which mixes snake_case and
//! camelCase keys. Dates travel as `YYYY-MM-DD` strings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A document to be created through the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub description: Option<Description>,
    pub doc_id: Option<String>,
    pub doc_status: Option<String>,
    pub doc_type: Option<String>,
    #[serde(rename = "importRequest")]
    pub import_request: bool,
    pub owner_inn: Option<String>,
    pub participant_inn: Option<String>,
    pub producer_inn: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub production_type: Option<String>,
    pub products: Option<Vec<Product>>,
    pub reg_date: Option<String>,
    pub reg_number: Option<String>,
}

/// Document description block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Description {
    #[serde(rename = "participantInn")]
    pub participant_inn: Option<String>,
}

/// A product listed in a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub certificate_document: Option<String>,
    pub certificate_document_date: Option<NaiveDate>,
    pub certificate_document_number: Option<String>,
    pub owner_inn: Option<String>,
    pub producer_inn: Option<String>,
    pub production_date: Option<NaiveDate>,
    pub tnved_code: Option<String>,
    pub uit_code: Option<String>,
    pub uitu_code: Option<String>,
}

impl Document {
    /// Load a document from a JSON string.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the document to the JSON body sent to the API.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn sample_document() -> Document {
        Document {
            description: Some(Description {
                participant_inn: Some("1234567890".to_string()),
            }),
            doc_id: Some("12345".to_string()),
            doc_status: Some("Draft".to_string()),
            doc_type: Some("LP_INTRODUCE_GOODS".to_string()),
            import_request: true,
            owner_inn: Some("0987654321".to_string()),
            participant_inn: Some("1234567890".to_string()),
            producer_inn: Some("5432109876".to_string()),
            production_date: NaiveDate::from_ymd_opt(2023, 7, 10),
            production_type: Some("OWN_PRODUCTION".to_string()),
            products: Some(vec![Product {
                certificate_document: Some("CONFORMITY_CERTIFICATE".to_string()),
                certificate_document_date: NaiveDate::from_ymd_opt(2023, 5, 15),
                certificate_document_number: Some("Cert123456".to_string()),
                owner_inn: Some("0987654321".to_string()),
                producer_inn: Some("5432109876".to_string()),
                production_date: NaiveDate::from_ymd_opt(2023, 6, 20),
                tnved_code: Some("6401100000".to_string()),
                uit_code: Some("UIT123".to_string()),
                uitu_code: Some("UITU567".to_string()),
            }]),
            reg_date: Some("2023-05-30".to_string()),
            reg_number: Some("Reg12345".to_string()),
        }
    }

    #[test]
    fn test_json_field_names_and_dates() {
        let value: Value = serde_json::from_str(&sample_document().to_json().unwrap()).unwrap();

        assert_eq!(value["description"]["participantInn"], "1234567890");
        assert_eq!(value["doc_id"], "12345");
        assert_eq!(value["importRequest"], true);
        assert_eq!(value["production_date"], "2023-07-10");
        assert_eq!(value["products"][0]["certificate_document_date"], "2023-05-15");
        assert_eq!(value["products"][0]["tnved_code"], "6401100000");
        assert_eq!(value["reg_date"], "2023-05-30");
    }

    #[test]
    fn test_empty_document_serializes_nulls() {
        let value: Value = serde_json::from_str(&Document::default().to_json().unwrap()).unwrap();

        assert_eq!(value["doc_id"], Value::Null);
        assert_eq!(value["products"], Value::Null);
        assert_eq!(value["importRequest"], false);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let document = Document::from_json(
            &json!({
                "doc_id": "abc",
                "production_date": "2024-02-29",
                "products": [{ "uit_code": "U1" }]
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(document.doc_id.as_deref(), Some("abc"));
        assert_eq!(document.production_date, NaiveDate::from_ymd_opt(2024, 2, 29));
        assert!(!document.import_request);
        let products = document.products.unwrap();
        assert_eq!(products[0].uit_code.as_deref(), Some("U1"));
        assert_eq!(products[0].tnved_code, None);
    }

    #[test]
    fn test_invalid_date_is_rejected() {
        let result = Document::from_json(r#"{"production_date": "10.07.2023"}"#);
        assert!(result.is_err());
    }
}
