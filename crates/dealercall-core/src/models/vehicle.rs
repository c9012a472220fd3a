//! Vehicle the shopper is calling about

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A vehicle from inventory or the recommendation results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    pub year: u16,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim: Option<String>,
    /// Sticker price in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub financing_option: Option<FinancingOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dealership: Option<Dealership>,
}

impl Vehicle {
    pub fn new(
        make: impl Into<String>,
        model: impl Into<String>,
        year: u16,
        color: impl Into<String>,
    ) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            year,
            color: color.into(),
            ..Default::default()
        }
    }

    pub fn with_trim(mut self, trim: impl Into<String>) -> Self {
        self.trim = Some(trim.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_stock_number(mut self, stock_number: impl Into<String>) -> Self {
        self.stock_number = Some(stock_number.into());
        self
    }

    pub fn with_financing(mut self, option: FinancingOption) -> Self {
        self.financing_option = Some(option);
        self
    }

    pub fn with_dealership(mut self, dealership: Dealership) -> Self {
        self.dealership = Some(dealership);
        self
    }
}

/// Dealership holding the vehicle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dealership {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Dealership {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            city: None,
            state: None,
        }
    }

    pub fn located_in(mut self, city: impl Into<String>, state: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self.state = Some(state.into());
        self
    }

    /// "City, State" when both are known, otherwise empty
    pub fn location(&self) -> String {
        let city = self.city.as_deref().map(str::trim).unwrap_or_default();
        let state = self.state.as_deref().map(str::trim).unwrap_or_default();
        if city.is_empty() || state.is_empty() {
            String::new()
        } else {
            format!("{}, {}", city, state)
        }
    }
}

/// How the shopper intends to pay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinancingOption {
    #[serde(alias = "finance")]
    Finance,
    #[serde(alias = "lease")]
    Lease,
}

impl FinancingOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinancingOption::Finance => "Finance",
            FinancingOption::Lease => "Lease",
        }
    }
}

impl fmt::Display for FinancingOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinancingOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "finance" => Ok(FinancingOption::Finance),
            "lease" => Ok(FinancingOption::Lease),
            other => Err(format!(
                "unknown financing option '{}': expected finance or lease",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dealership_location_requires_both_parts() {
        let d = Dealership::new("Capitol Toyota").located_in("Austin", "TX");
        assert_eq!(d.location(), "Austin, TX");

        let d = Dealership {
            name: None,
            city: Some("Austin".into()),
            state: None,
        };
        assert_eq!(d.location(), "");

        let d = Dealership {
            name: None,
            city: Some(" ".into()),
            state: Some("TX".into()),
        };
        assert_eq!(d.location(), "");
    }

    #[test]
    fn test_financing_option_parse() {
        assert_eq!("Lease".parse::<FinancingOption>(), Ok(FinancingOption::Lease));
        assert_eq!(
            " finance ".parse::<FinancingOption>(),
            Ok(FinancingOption::Finance)
        );
        assert!("cash".parse::<FinancingOption>().is_err());
    }

    #[test]
    fn test_vehicle_deserialize_accepts_lowercase_financing() {
        let json = r#"{"make":"Toyota","model":"RAV4","year":2024,"color":"Blue","financingOption":"lease"}"#;
        let v: Vehicle = serde_json::from_str(json).unwrap();
        assert_eq!(v.financing_option, Some(FinancingOption::Lease));
        assert_eq!(v.trim, None);
    }
}
