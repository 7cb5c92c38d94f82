//! Restaurant form.

use backoffice_core::TenantRecord;

use super::{FormMode, FormValues};
use crate::api::TenantPayload;
use crate::error::FieldErrors;

/// Restaurant form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantForm {
    pub name: String,
    pub address: String,
}

impl FormValues for TenantForm {
    type Record = TenantRecord;
    type Payload = TenantPayload;

    fn from_record(record: &TenantRecord) -> Self {
        Self {
            name: record.name.clone(),
            address: record.address.clone(),
        }
    }

    fn validate(&self, _mode: FormMode) -> Result<TenantPayload, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = self.name.trim();
        let address = self.address.trim();

        if name.is_empty() {
            errors.add("name", "Name is required");
        }
        if address.is_empty() {
            errors.add("address", "Address is required");
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(TenantPayload {
            name: name.to_string(),
            address: address.to_string(),
        })
    }
}
