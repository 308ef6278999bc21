//! One-shot report execution
//!
//! Runs a report by name with a JSON request body and prints the same JSON
//! the HTTP endpoint would return.

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use salesctl_server::reports::{run_named, REPORT_NAMES};

use super::warehouse::WarehouseArgs;

/// Arguments for the report command
#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// Report name (see `salesctl reports`)
    pub name: String,

    /// Request body as JSON, e.g. '{"page": 1, "limit": 20}'
    #[arg(long, short = 'p', default_value = "{}")]
    pub params: String,

    /// Pretty-print the response
    #[arg(long)]
    pub pretty: bool,

    #[command(flatten)]
    pub warehouse: WarehouseArgs,
}

/// Parse the request body, rejecting unknown reports before connecting.
fn request_body(args: &ReportArgs) -> Result<Value> {
    if !REPORT_NAMES.contains(&args.name.as_str()) {
        anyhow::bail!(
            "unknown report '{}' (available: {})",
            args.name,
            REPORT_NAMES.join(", ")
        );
    }

    serde_json::from_str(&args.params).context("--params is not valid JSON")
}

pub async fn run_report(args: ReportArgs) -> Result<()> {
    let body = request_body(&args)?;
    let warehouse = args.warehouse.connect().await?;

    let response = run_named(&args.name, warehouse.as_ref(), body)
        .await
        .with_context(|| format!("report '{}' failed", args.name))?;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    println!("{}", rendered);

    Ok(())
}

/// Print report names, one per line
pub fn run_list() -> Result<()> {
    for name in REPORT_NAMES {
        println!("{}", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(name: &str, params: &str) -> ReportArgs {
        ReportArgs::parse_from(["report", name, "--params", params])
    }

    #[test]
    fn unknown_report_is_rejected_before_connecting() {
        let err = request_body(&args("weekly", "{}")).unwrap_err();
        assert!(err.to_string().contains("unknown report 'weekly'"));
    }

    #[test]
    fn params_must_be_json() {
        let err = request_body(&args("top-products", "{oops")).unwrap_err();
        assert!(err.to_string().contains("--params"));
    }

    #[test]
    fn params_are_passed_through() {
        let body = request_body(&args("daily-product-report", r#"{"page": 2}"#)).unwrap();
        assert_eq!(body["page"], 2);
    }
}
