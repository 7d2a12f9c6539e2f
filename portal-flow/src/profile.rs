use serde::{Deserialize, Serialize};

use crate::error::{PortalError, Result};

/// Patient identity used to fill the portal forms. Created once at run
/// start from the persisted configuration and read-only thereafter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub first_name: String,
    pub last_name: String,
    /// Health-insurance number.
    pub nam: String,
    pub card_seq_number: String,
    pub postal_code: String,
    pub birth_day: String,
    pub birth_month: String,
    pub birth_year: String,
    pub cellphone: String,
    pub email: String,
}

impl PatientProfile {
    /// A run may only start with every field populated. The first missing
    /// field is named in the error.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("nam", &self.nam),
            ("card_seq_number", &self.card_seq_number),
            ("postal_code", &self.postal_code),
            ("birth_day", &self.birth_day),
            ("birth_month", &self.birth_month),
            ("birth_year", &self.birth_year),
            ("cellphone", &self.cellphone),
            ("email", &self.email),
        ] {
            if value.trim().is_empty() {
                return Err(PortalError::InvalidProfile(format!("{name} is required")));
            }
        }
        Ok(())
    }

    /// NAM with whitespace stripped, as the hub form expects it.
    pub fn nam_compact(&self) -> String {
        self.nam.split_whitespace().collect()
    }
}
