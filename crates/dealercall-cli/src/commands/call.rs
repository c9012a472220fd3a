//! Call command - place an outbound call

use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use dealercall_client::{CallController, CallOptions};
use dealercall_core::{phone, CallContext, Dealership, FinancingOption, User, Vehicle};
use serde_json::Value;

use crate::output::{CallRow, OutputContext};

/// Shopper and vehicle for a call
#[derive(Debug, Clone, Args)]
pub struct CallArgs {
    /// Number to dial (10-15 digits, any formatting)
    #[arg(long)]
    pub phone: String,

    /// Shopper's first name
    #[arg(long)]
    pub first_name: String,

    /// Shopper's last name
    #[arg(long, default_value = "")]
    pub last_name: String,

    /// Feature the shopper cares about (repeatable)
    #[arg(long = "feature", value_name = "FEATURE")]
    pub features: Vec<String>,

    /// History key for the call (default: first_last, lowercased)
    #[arg(long)]
    pub customer_id: Option<String>,

    /// Vehicle make
    #[arg(long)]
    pub make: String,

    /// Vehicle model
    #[arg(long)]
    pub model: String,

    /// Model year
    #[arg(long)]
    pub year: u16,

    /// Exterior color
    #[arg(long)]
    pub color: String,

    #[arg(long)]
    pub trim: Option<String>,

    /// Listed price in USD
    #[arg(long)]
    pub price: Option<f64>,

    #[arg(long)]
    pub stock_number: Option<String>,

    /// finance or lease
    #[arg(long)]
    pub financing: Option<FinancingOption>,

    #[arg(long)]
    pub dealership: Option<String>,

    #[arg(long, requires = "dealership")]
    pub dealership_city: Option<String>,

    #[arg(long, requires = "dealership")]
    pub dealership_state: Option<String>,

    /// Use this assistant instead of the configured one
    #[arg(long)]
    pub assistant: Option<String>,

    /// Extra metadata, KEY=VALUE (repeatable)
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    pub metadata: Vec<String>,

    /// Poll until the call ends
    #[arg(long)]
    pub wait: bool,

    /// Seconds between polls with --wait
    #[arg(long, default_value = "5")]
    pub interval: u64,

    /// Give up waiting after this many seconds
    #[arg(long, default_value = "600")]
    pub wait_timeout: u64,
}

impl CallArgs {
    fn user(&self) -> User {
        let user = User::new(&self.first_name, &self.last_name).with_phone(&self.phone);
        if self.features.is_empty() {
            user
        } else {
            user.with_feature_preferences(&self.features)
        }
    }

    fn vehicle(&self) -> Vehicle {
        let mut vehicle = Vehicle::new(&self.make, &self.model, self.year, &self.color);
        if let Some(trim) = &self.trim {
            vehicle = vehicle.with_trim(trim);
        }
        if let Some(price) = self.price {
            vehicle = vehicle.with_price(price);
        }
        if let Some(stock) = &self.stock_number {
            vehicle = vehicle.with_stock_number(stock);
        }
        if let Some(name) = &self.dealership {
            let mut dealership = Dealership::new(name);
            dealership.city = self.dealership_city.clone();
            dealership.state = self.dealership_state.clone();
            vehicle = vehicle.with_dealership(dealership);
        }
        vehicle
    }

    fn options(&self) -> Result<CallOptions> {
        let mut options = CallOptions::default();
        options.assistant_id = self.assistant.clone();
        options.financing = self.financing;
        options.customer_id = self.customer_id.clone();
        for entry in &self.metadata {
            let (key, value) = parse_metadata(entry)?;
            options.metadata.insert(key, value);
        }
        Ok(options)
    }
}

/// `KEY=VALUE`; values that parse as JSON keep their type
fn parse_metadata(entry: &str) -> Result<(String, Value)> {
    let Some((key, value)) = entry.split_once('=') else {
        bail!("Invalid metadata '{}': expected KEY=VALUE", entry);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("Invalid metadata '{}': empty key", entry);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Place a call and optionally wait for it to end
pub async fn call(controller: &CallController, args: &CallArgs, ctx: &OutputContext) -> Result<()> {
    let user = args.user();
    let vehicle = args.vehicle();
    let options = args.options()?;

    let context = CallContext::build(&user, &vehicle, options.financing, options.metadata.clone());
    ctx.info(&context.summary());
    ctx.info(&format!(
        "\nCalling {} about the {} {} {}...",
        phone::format(&args.phone),
        vehicle.year,
        vehicle.make,
        vehicle.model
    ));

    let record = controller
        .initiate(&user, &vehicle, options)
        .await
        .context("Failed to place call")?;
    ctx.success(&format!("Call {} {}", record.id, record.status));

    let record = if args.wait {
        ctx.info("Waiting for the call to end...");
        controller
            .wait_for_terminal(
                &record.id,
                Duration::from_secs(args.interval.max(1)),
                Duration::from_secs(args.wait_timeout),
            )
            .await?
    } else {
        record
    };

    ctx.print_one(&CallRow::from(&record));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: CallArgs,
    }

    fn parse(extra: &[&str]) -> CallArgs {
        let mut argv = vec![
            "dealercall",
            "--phone",
            "555-123-4567",
            "--first-name",
            "Ada",
            "--make",
            "Toyota",
            "--model",
            "Camry",
            "--year",
            "2024",
            "--color",
            "Silver",
        ];
        argv.extend_from_slice(extra);
        Wrapper::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_parse_metadata() {
        assert_eq!(
            parse_metadata("source=web").unwrap(),
            ("source".to_string(), Value::String("web".into()))
        );
        assert_eq!(
            parse_metadata("visits=3").unwrap(),
            ("visits".to_string(), Value::from(3))
        );
        assert_eq!(
            parse_metadata("note=a=b").unwrap().1,
            Value::String("a=b".into())
        );
        assert!(parse_metadata("novalue").is_err());
        assert!(parse_metadata("=x").is_err());
    }

    #[test]
    fn test_builds_user_and_vehicle() {
        let args = parse(&[
            "--financing",
            "lease",
            "--dealership",
            "Sunrise Toyota",
            "--dealership-city",
            "Austin",
            "--dealership-state",
            "TX",
            "--meta",
            "source=cli",
            "--feature",
            "AWD",
            "--feature",
            "Sunroof",
            "--customer-id",
            "crm-42",
        ]);

        let user = args.user();
        assert_eq!(user.phone(), Some("555-123-4567"));
        assert_eq!(user.last_name, "");
        assert_eq!(user.feature_preferences(), vec!["AWD", "Sunroof"]);

        let vehicle = args.vehicle();
        assert_eq!(vehicle.year, 2024);
        assert_eq!(vehicle.dealership.unwrap().location(), "Austin, TX");

        let options = args.options().unwrap();
        assert_eq!(options.financing, Some(FinancingOption::Lease));
        assert_eq!(options.metadata["source"], "cli");
        assert_eq!(options.customer_id.as_deref(), Some("crm-42"));
    }

    #[test]
    fn test_dealership_city_requires_name() {
        let argv = [
            "dealercall",
            "--phone",
            "5551234567",
            "--first-name",
            "Ada",
            "--make",
            "Toyota",
            "--model",
            "Camry",
            "--year",
            "2024",
            "--color",
            "Silver",
            "--dealership-city",
            "Austin",
        ];
        assert!(Wrapper::try_parse_from(argv).is_err());
    }
}
