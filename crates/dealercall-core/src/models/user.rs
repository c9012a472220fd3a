//! Signed-in user as provided by the session layer

use serde::{Deserialize, Serialize};

/// The signed-in shopper
///
/// Only the fields the call layer reads are modelled; everything else the
/// profile service carries is ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Phone number as entered by the user (any punctuation)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finance: Option<FinanceProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal: Option<PersonalProfile>,
}

/// Personal preferences from the profile wizard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalProfile {
    #[serde(default)]
    pub feature_preferences: Vec<String>,
}

/// Where the user lives
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

/// Financing preferences from the profile wizard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_range: Option<BudgetRange>,
}

/// Budget bounds in USD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetRange {
    pub min: f64,
    pub max: f64,
}

impl User {
    /// Create a user with a name and no other profile data
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }

    /// Set the phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Set the home location
    pub fn with_location(mut self, city: impl Into<String>, state: impl Into<String>) -> Self {
        self.location = Some(Location {
            city: city.into(),
            state: state.into(),
        });
        self
    }

    /// Set the budget range
    pub fn with_budget(mut self, min: f64, max: f64) -> Self {
        self.finance = Some(FinanceProfile {
            budget_range: Some(BudgetRange { min, max }),
        });
        self
    }

    /// Set the preferred vehicle features
    pub fn with_feature_preferences<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.personal = Some(PersonalProfile {
            feature_preferences: features.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Phone number on file, if any
    ///
    /// A blank string counts as no phone.
    pub fn phone(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// "First Last", trimmed
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Default customer id used to scope call history: `first_last`, lowercased
    pub fn customer_id(&self) -> String {
        format!(
            "{}_{}",
            self.first_name.trim().to_lowercase(),
            self.last_name.trim().to_lowercase()
        )
    }

    /// Non-blank preferred features, in profile order
    pub fn feature_preferences(&self) -> Vec<String> {
        self.personal
            .iter()
            .flat_map(|p| &p.feature_preferences)
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Budget range from the finance profile, if set
    pub fn budget_range(&self) -> Option<BudgetRange> {
        self.finance.as_ref().and_then(|f| f.budget_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_phone_is_absent() {
        let user = User::new("Ada", "Lovelace").with_phone("   ");
        assert_eq!(user.phone(), None);

        let user = User::new("Ada", "Lovelace").with_phone(" 555-123-4567 ");
        assert_eq!(user.phone(), Some("555-123-4567"));
    }

    #[test]
    fn test_full_name_handles_missing_parts() {
        assert_eq!(User::new("Ada", "").full_name(), "Ada");
        assert_eq!(User::new("", "").full_name(), "");
        assert_eq!(User::new(" Ada ", "Lovelace").full_name(), "Ada Lovelace");
    }

    #[test]
    fn test_customer_id_from_name() {
        assert_eq!(User::new("Ada", "Lovelace").customer_id(), "ada_lovelace");
        assert_eq!(User::new(" Ada ", "De Morgan").customer_id(), "ada_de morgan");
    }

    #[test]
    fn test_feature_preferences_skip_blanks() {
        let user = User::new("Ada", "Lovelace").with_feature_preferences(["AWD", " ", "Sunroof "]);
        assert_eq!(user.feature_preferences(), vec!["AWD", "Sunroof"]);
        assert!(User::new("Ada", "Lovelace").feature_preferences().is_empty());
    }

    #[test]
    fn test_deserialize_profile_json() {
        let json = r#"{
            "_id": "u1",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@example.com",
            "phone": "5551234567",
            "location": {"city": "Austin", "state": "TX", "country": "US"},
            "finance": {"budgetRange": {"min": 20000, "max": 35000}},
            "personal": {"featurePreferences": ["Apple CarPlay", "Heated seats"]}
        }"#;

        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.phone(), Some("5551234567"));
        assert_eq!(user.location.as_ref().unwrap().city, "Austin");
        assert_eq!(
            user.budget_range(),
            Some(BudgetRange {
                min: 20000.0,
                max: 35000.0
            })
        );
        assert_eq!(user.feature_preferences(), vec!["Apple CarPlay", "Heated seats"]);
    }
}
