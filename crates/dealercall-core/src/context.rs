//! Call context builder
//!
//! Maps `(User, Vehicle, financing option, metadata)` into the variables the
//! provider substitutes into the assistant's call script. The provider's
//! template substitution fails on missing keys, so every variable is always
//! present; unknown optional values are sent as empty strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{BudgetRange, Dealership, FinancingOption, User, Vehicle};

/// Financing label used when neither the caller nor the vehicle specifies one
const DEFAULT_FINANCING: FinancingOption = FinancingOption::Finance;

/// Normalized customer + vehicle context for one call attempt
#[derive(Debug, Clone, PartialEq)]
pub struct CallContext {
    pub first_name: String,
    pub last_name: String,
    /// "First Last", trimmed
    pub customer_name: String,
    /// Key the provider's call history is scoped by
    pub customer_id: String,
    /// Phone number as found on the user (may be empty)
    pub phone_number: String,
    pub make: String,
    pub model: String,
    pub year: u16,
    pub color: String,
    pub trim: Option<String>,
    pub price: Option<f64>,
    pub stock_number: Option<String>,
    pub financing_option: Option<FinancingOption>,
    pub dealership_name: Option<String>,
    pub dealership_city: Option<String>,
    pub dealership_state: Option<String>,
    /// "City, State" of the shopper, if known
    pub user_location: Option<String>,
    pub budget_range: Option<BudgetRange>,
    pub preferred_features: Vec<String>,
    /// Free-form caller metadata, forwarded untouched
    pub metadata: Map<String, Value>,
}

/// The provider's `assistantOverrides.variableValues` object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableValues {
    pub first_name: String,
    pub last_name: String,
    pub car_make: String,
    pub car_model: String,
    pub car_year: String,
    pub car_color: String,
    pub finance_or_lease: String,
    pub car_trim: String,
    pub car_price: String,
    pub car_stock_number: String,
    pub dealership_name: String,
    pub dealership_location: String,
}

impl CallContext {
    /// Build the context for a call
    ///
    /// `financing` overrides the vehicle's own financing option.
    pub fn build(
        user: &User,
        vehicle: &Vehicle,
        financing: Option<FinancingOption>,
        metadata: Map<String, Value>,
    ) -> Self {
        let dealership = vehicle.dealership.clone().unwrap_or_default();
        let user_location = user
            .location
            .as_ref()
            .filter(|l| !l.city.trim().is_empty() && !l.state.trim().is_empty())
            .map(|l| format!("{}, {}", l.city.trim(), l.state.trim()));

        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            customer_name: user.full_name(),
            customer_id: user.customer_id(),
            phone_number: user.phone().unwrap_or_default().to_string(),
            make: vehicle.make.clone(),
            model: vehicle.model.clone(),
            year: vehicle.year,
            color: vehicle.color.clone(),
            trim: vehicle.trim.clone(),
            price: vehicle.price,
            stock_number: vehicle.stock_number.clone(),
            financing_option: financing.or(vehicle.financing_option),
            dealership_name: dealership.name,
            dealership_city: dealership.city,
            dealership_state: dealership.state,
            user_location,
            budget_range: user.budget_range(),
            preferred_features: user.feature_preferences(),
            metadata,
        }
    }

    /// Replace the default `first_last` customer id
    ///
    /// Blank ids are ignored.
    pub fn with_customer_id(mut self, customer_id: impl Into<String>) -> Self {
        let customer_id = customer_id.into();
        if !customer_id.trim().is_empty() {
            self.customer_id = customer_id.trim().to_string();
        }
        self
    }

    /// Financing label sent to the provider
    pub fn financing_label(&self) -> &'static str {
        self.financing_option.unwrap_or(DEFAULT_FINANCING).as_str()
    }

    /// "City, State" of the dealership when both are known, else empty
    pub fn dealership_location(&self) -> String {
        Dealership {
            name: None,
            city: self.dealership_city.clone(),
            state: self.dealership_state.clone(),
        }
        .location()
    }

    /// Variables for script substitution
    pub fn variable_values(&self) -> VariableValues {
        VariableValues {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            car_make: self.make.clone(),
            car_model: self.model.clone(),
            car_year: self.year.to_string(),
            car_color: self.color.clone(),
            finance_or_lease: self.financing_label().to_string(),
            car_trim: self.trim.clone().unwrap_or_default(),
            car_price: self.price.map(format_usd).unwrap_or_default(),
            car_stock_number: self.stock_number.clone().unwrap_or_default(),
            dealership_name: self.dealership_name.clone().unwrap_or_default(),
            dealership_location: self.dealership_location(),
        }
    }

    /// Human-readable context, one fact per line
    pub fn summary(&self) -> String {
        let mut vehicle = format!("{} {} {}", self.year, self.make, self.model);
        if let Some(trim) = self.trim.as_deref().filter(|t| !t.is_empty()) {
            vehicle.push(' ');
            vehicle.push_str(trim);
        }

        let mut lines = vec![
            format!("Customer: {}", self.customer_name),
            format!("Vehicle: {} in {}", vehicle, self.color),
            format!("Financing: {}", self.financing_label()),
        ];

        if let Some(price) = self.price {
            lines.push(format!("Price: {}", format_usd(price)));
        }
        if let Some(location) = &self.user_location {
            lines.push(format!("Location: {}", location));
        }
        if let Some(budget) = self.budget_range {
            lines.push(format!(
                "Budget: {} - {}",
                format_usd_whole(budget.min),
                format_usd_whole(budget.max)
            ));
        }
        if !self.preferred_features.is_empty() {
            lines.push(format!(
                "Preferred Features: {}",
                self.preferred_features.join(", ")
            ));
        }

        lines.join("\n")
    }

    /// Metadata object sent with the call
    ///
    /// Caller metadata wins over the fields added here, except `customerId`,
    /// which always carries the context's customer id so history lookups
    /// find the call.
    pub fn metadata_payload(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert("customerFirstName".into(), self.first_name.clone().into());
        payload.insert("customerLastName".into(), self.last_name.clone().into());
        payload.insert("carMake".into(), self.make.clone().into());
        payload.insert("carModel".into(), self.model.clone().into());
        payload.insert("carYear".into(), self.year.into());
        payload.insert("carColor".into(), self.color.clone().into());
        payload.insert("financingOption".into(), self.financing_label().into());
        if let Some(stock) = &self.stock_number {
            payload.insert("carStockNumber".into(), stock.clone().into());
        }
        payload.insert("summary".into(), self.summary().into());

        for (key, value) in &self.metadata {
            payload.insert(key.clone(), value.clone());
        }
        payload.insert("customerId".into(), self.customer_id.clone().into());
        payload
    }
}

/// Format a USD amount as `$12,345.67`
pub fn format_usd(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!(
        "{}${}.{:02}",
        sign,
        group_thousands(cents / 100),
        cents % 100
    )
}

/// Format a USD amount as `$12,346`, rounded to whole dollars
pub fn format_usd_whole(amount: f64) -> String {
    let dollars = amount.round() as i64;
    let sign = if dollars < 0 { "-" } else { "" };
    format!("{}${}", sign, group_thousands(dollars.unsigned_abs()))
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn user() -> User {
        User::new("Ada", "Lovelace")
            .with_phone("(555) 123-4567")
            .with_location("Austin", "TX")
            .with_budget(20000.0, 35000.0)
    }

    fn rav4() -> Vehicle {
        Vehicle::new("Toyota", "RAV4", 2024, "Blueprint")
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(28500.0), "$28,500.00");
        assert_eq!(format_usd(999.5), "$999.50");
        assert_eq!(format_usd(1234567.891), "$1,234,567.89");
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(-42.0), "-$42.00");
        assert_eq!(format_usd_whole(34999.6), "$35,000");
    }

    #[test]
    fn test_minimal_vehicle_fills_every_variable() {
        let ctx = CallContext::build(&user(), &rav4(), None, Map::new());
        let vars = serde_json::to_value(ctx.variable_values()).unwrap();

        assert_eq!(
            vars,
            json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "carMake": "Toyota",
                "carModel": "RAV4",
                "carYear": "2024",
                "carColor": "Blueprint",
                "financeOrLease": "Finance",
                "carTrim": "",
                "carPrice": "",
                "carStockNumber": "",
                "dealershipName": "",
                "dealershipLocation": ""
            })
        );
    }

    #[test]
    fn test_full_vehicle_variables() {
        let vehicle = rav4()
            .with_trim("XLE")
            .with_price(32450.0)
            .with_stock_number("T1234")
            .with_financing(FinancingOption::Finance)
            .with_dealership(Dealership::new("Capitol Toyota").located_in("Austin", "TX"));

        let ctx = CallContext::build(&user(), &vehicle, Some(FinancingOption::Lease), Map::new());
        let vars = ctx.variable_values();

        assert_eq!(vars.finance_or_lease, "Lease");
        assert_eq!(vars.car_trim, "XLE");
        assert_eq!(vars.car_price, "$32,450.00");
        assert_eq!(vars.car_stock_number, "T1234");
        assert_eq!(vars.dealership_name, "Capitol Toyota");
        assert_eq!(vars.dealership_location, "Austin, TX");
    }

    #[test]
    fn test_dealership_location_needs_city_and_state() {
        let vehicle = rav4().with_dealership(Dealership {
            name: Some("Capitol Toyota".into()),
            city: Some("Austin".into()),
            state: None,
        });
        let ctx = CallContext::build(&user(), &vehicle, None, Map::new());
        assert_eq!(ctx.variable_values().dealership_location, "");
        assert_eq!(ctx.variable_values().dealership_name, "Capitol Toyota");
    }

    #[test]
    fn test_vehicle_financing_used_when_caller_silent() {
        let vehicle = rav4().with_financing(FinancingOption::Lease);
        let ctx = CallContext::build(&user(), &vehicle, None, Map::new());
        assert_eq!(ctx.financing_label(), "Lease");
    }

    #[test]
    fn test_names_copied_verbatim() {
        let user = User::new(" Ada ", "de Lovelace");
        let ctx = CallContext::build(&user, &rav4(), None, Map::new());
        assert_eq!(ctx.variable_values().first_name, " Ada ");
        assert_eq!(ctx.variable_values().last_name, "de Lovelace");
        assert_eq!(ctx.phone_number, "");
    }

    #[test]
    fn test_summary() {
        let vehicle = rav4().with_trim("XLE").with_price(32450.0);
        let ctx = CallContext::build(&user(), &vehicle, None, Map::new());

        assert_eq!(
            ctx.summary(),
            "Customer: Ada Lovelace\n\
             Vehicle: 2024 Toyota RAV4 XLE in Blueprint\n\
             Financing: Finance\n\
             Price: $32,450.00\n\
             Location: Austin, TX\n\
             Budget: $20,000 - $35,000"
        );
    }

    #[test]
    fn test_summary_lists_preferred_features() {
        let user = user().with_feature_preferences(["AWD", "Heated seats"]);
        let ctx = CallContext::build(&user, &rav4(), None, Map::new());

        assert!(ctx
            .summary()
            .ends_with("Budget: $20,000 - $35,000\nPreferred Features: AWD, Heated seats"));
    }

    #[test]
    fn test_customer_id_defaults_to_name() {
        let ctx = CallContext::build(&user(), &rav4(), None, Map::new());
        assert_eq!(ctx.customer_id, "ada_lovelace");
        assert_eq!(ctx.customer_name, "Ada Lovelace");

        let ctx = ctx.with_customer_id("  ");
        assert_eq!(ctx.customer_id, "ada_lovelace");

        let ctx = ctx.with_customer_id(" crm-42 ");
        assert_eq!(ctx.customer_id, "crm-42");
        assert_eq!(ctx.metadata_payload()["customerId"], json!("crm-42"));
    }

    #[test]
    fn test_metadata_payload_caller_keys_win() {
        let mut metadata = Map::new();
        metadata.insert("source".into(), json!("recommendations"));
        metadata.insert("carColor".into(), json!("Override"));
        metadata.insert("customerId".into(), json!("someone_else"));

        let ctx = CallContext::build(&user(), &rav4(), None, metadata);
        let payload = ctx.metadata_payload();

        assert_eq!(payload["source"], json!("recommendations"));
        assert_eq!(payload["carColor"], json!("Override"));
        assert_eq!(payload["carYear"], json!(2024));
        assert_eq!(payload["customerId"], json!("ada_lovelace"));
        assert!(payload["summary"].as_str().unwrap().starts_with("Customer: Ada"));
        assert!(!payload.contains_key("carStockNumber"));
    }
}
