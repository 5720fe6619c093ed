//! Supplier document tracking and procurement.
//!
//! Neither entity references clinical records.

use serde::{Deserialize, Serialize};

use super::{check_date, require_finite, require_text, ValidationError};

/// A tracked supplier document (invoice, delivery note, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct SupplierDocument {
    #[serde(rename = "IDSuivi", default)]
    pub id: Option<i64>,
    #[serde(rename = "RefDocument", alias = "Ref")]
    pub reference: String,
    #[serde(rename = "Fournisseur", default)]
    pub supplier: Option<String>,
    /// Date sent
    #[serde(rename = "Date_S", alias = "DateS", default)]
    pub sent_date: Option<String>,
    /// Date received
    #[serde(rename = "Date_R", alias = "DateR", default)]
    pub received_date: Option<String>,
    #[serde(rename = "Mode_R", alias = "ModeR", default)]
    pub receipt_mode: Option<String>,
    #[serde(rename = "Montant", default)]
    pub amount: Option<f64>,
    /// Entered by
    #[serde(rename = "Saisie", default)]
    pub entered_by: Option<String>,
    #[serde(rename = "Compatibilite", default)]
    pub compatibility: Option<String>,
    #[serde(rename = "ImageDoc_FileName", default)]
    pub document_file_name: Option<String>,
    #[serde(rename = "ImageDoc_FileType", default)]
    pub document_file_type: Option<String>,
    #[serde(rename = "ImageJustificatif_FileName", default)]
    pub receipt_file_name: Option<String>,
    #[serde(rename = "ImageJustificatif_FileType", default)]
    pub receipt_file_type: Option<String>,
    #[serde(rename = "Observation", default)]
    pub observation: Option<String>,
}

impl SupplierDocument {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("RefDocument", &self.reference)?;
        if let Some(amount) = self.amount {
            require_finite("Montant", amount)?;
        }
        check_date("Date_S", self.sent_date.as_deref())?;
        check_date("Date_R", self.received_date.as_deref())
    }
}

/// A procurement line (stock purchase).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, uniffi::Record)]
pub struct Procurement {
    #[serde(rename = "ID_App", default)]
    pub id: Option<i64>,
    #[serde(rename = "DateApp", default)]
    pub date: Option<String>,
    #[serde(rename = "Fournisseur", default)]
    pub supplier: Option<String>,
    /// Supplier tax identifier
    #[serde(rename = "IFF", default)]
    pub supplier_tax_id: Option<String>,
    #[serde(rename = "Produit")]
    pub product: String,
    #[serde(rename = "Quantite", default)]
    pub quantity: Option<i64>,
    #[serde(rename = "PrixUnitaire", default)]
    pub unit_price: Option<f64>,
}

impl Procurement {
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            ..Default::default()
        }
    }

    /// Quantity times unit price, when both are known.
    pub fn total(&self) -> Option<f64> {
        Some(self.quantity? as f64 * self.unit_price?)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("Produit", &self.product)?;
        if let Some(price) = self.unit_price {
            require_finite("PrixUnitaire", price)?;
        }
        check_date("DateApp", self.date.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procurement_total() {
        let mut p = Procurement::new("Gloves");
        assert_eq!(p.total(), None);
        p.quantity = Some(4);
        p.unit_price = Some(2.5);
        assert_eq!(p.total(), Some(10.0));
    }

    #[test]
    fn test_supplier_doc_short_names() {
        let doc: SupplierDocument = serde_json::from_str(
            r#"{"Ref":"F-2024-01","Fournisseur":"MedSupply","DateS":"2024-01-02"}"#,
        )
        .unwrap();
        assert_eq!(doc.reference, "F-2024-01");
        assert_eq!(doc.sent_date.as_deref(), Some("2024-01-02"));
        assert!(doc.validate().is_ok());
    }
}
