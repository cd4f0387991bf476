// Emergency contacts and the trekking checklist
use crate::domain::error::SosError;
use serde::{Deserialize, Serialize};

/// A phone number the distress message is sent to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Contact(String);

impl Contact {
    pub fn parse(raw: &str) -> Result<Self, SosError> {
        let number = raw.trim();
        if number.is_empty() {
            return Err(SosError::InvalidInput(
                "Please enter a phone number.".to_string(),
            ));
        }
        Ok(Self(number.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn dial_url(&self) -> String {
        format!("tel:{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

impl ChecklistItem {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            completed: false,
        }
    }
}

/// Trekking preparation checklist, always persisted as a whole
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checklist {
    items: Vec<ChecklistItem>,
}

impl Default for Checklist {
    fn default() -> Self {
        let items = [
            "Emergency Contact Added",
            "Route Plan Ready",
            "Return Time Set",
            "Water Bottle Packed",
            "Phone Fully Charged",
        ]
        .iter()
        .enumerate()
        .map(|(i, text)| ChecklistItem::new((i + 1).to_string(), *text))
        .collect();

        Self { items }
    }
}

impl Checklist {
    pub fn new(items: Vec<ChecklistItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[ChecklistItem] {
        &self.items
    }

    pub fn toggle(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.completed = !item.completed;
                true
            }
            None => false,
        }
    }

    /// Append a new item; `id` must not collide with an existing one
    pub fn add(&mut self, id: String, text: &str) -> Result<ChecklistItem, SosError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SosError::InvalidInput("Checklist item is empty.".to_string()));
        }
        if self.items.iter().any(|item| item.id == id) {
            return Err(SosError::InvalidInput(format!(
                "Checklist item {} already exists.",
                id
            )));
        }
        let item = ChecklistItem::new(id, text);
        self.items.push(item.clone());
        Ok(item)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_parse() {
        assert_eq!(Contact::parse(" 6380960629 ").unwrap().as_str(), "6380960629");
        assert!(matches!(Contact::parse("   "), Err(SosError::InvalidInput(_))));
        assert_eq!(Contact::parse("112").unwrap().dial_url(), "tel:112");
    }

    #[test]
    fn test_default_checklist() {
        let checklist = Checklist::default();
        assert_eq!(checklist.items().len(), 5);
        assert_eq!(checklist.items()[0].id, "1");
        assert_eq!(checklist.items()[4].text, "Phone Fully Charged");
        assert!(checklist.items().iter().all(|i| !i.completed));
    }

    #[test]
    fn test_checklist_mutations() {
        let mut checklist = Checklist::default();
        assert!(checklist.toggle("2"));
        assert!(checklist.items()[1].completed);
        assert!(!checklist.toggle("missing"));

        checklist.add("99".to_string(), " Headlamp ").unwrap();
        assert_eq!(checklist.items().last().unwrap().text, "Headlamp");
        assert!(checklist.add("99".to_string(), "Duplicate").is_err());
        assert!(checklist.add("100".to_string(), "  ").is_err());

        assert!(checklist.remove("99"));
        assert!(!checklist.remove("99"));
        assert_eq!(checklist.items().len(), 5);
    }
}
