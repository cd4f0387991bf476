// Personal information kept for responders
use serde::{Deserialize, Serialize};

/// Free-text fields, all optional in practice; stored under the user's id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersonalInfo {
    pub name: String,
    pub age: String,
    pub gender: String,
    pub blood_group: String,
    pub address: String,
    pub medical_note: String,
}

impl PersonalInfo {
    pub const FIELDS: [&'static str; 6] = ["name", "age", "gender", "bloodGroup", "address", "medicalNote"];

    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(&self.name),
            "age" => Some(&self.age),
            "gender" => Some(&self.gender),
            "bloodGroup" => Some(&self.blood_group),
            "address" => Some(&self.address),
            "medicalNote" => Some(&self.medical_note),
            _ => None,
        }
    }

    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "name" => self.name = value,
            "age" => self.age = value,
            "gender" => self.gender = value,
            "bloodGroup" => self.blood_group = value,
            "address" => self.address = value,
            "medicalNote" => self.medical_note = value,
            _ => {}
        }
    }

    /// Surrounding whitespace removed from every field
    pub fn trimmed(&self) -> Self {
        let mut info = PersonalInfo::default();
        for name in Self::FIELDS {
            if let Some(value) = self.field(name) {
                info.set_field(name, value.trim().to_string());
            }
        }
        info
    }
}
