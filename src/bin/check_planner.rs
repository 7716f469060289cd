//! Utility binary for verifying Gemini access and plan parsing
//! Not part of the main application

use eligibility_bot::config::Config;
use eligibility_bot::planner::{GeminiClient, PlanGenerator};
use std::sync::Arc;

const SAMPLE_CATEGORIES: &str = r#"<ul id="InsurerAccordion">
  <li id="Commercial"><a>Commercial</a>
    <ul class="insurersDetail"><li><a>Aetna</a></li><li><a>UMR-Wausau</a></li></ul>
  </li>
  <li id="Medicare"><a>Medicare</a>
    <ul class="insurersDetail"><li><a>Medicare Part B</a></li></ul>
  </li>
</ul>"#;

const SAMPLE_REPORT: &str = r#"<div id="eligibilityRequestResponse">
  <h3>Eligibility Response</h3>
  <table><tr><td>Status</td><td>Active Coverage</td></tr>
  <tr><td>Plan Begin</td><td>01/01/2024</td></tr>
  <tr><td>Plan End</td><td>12/31/2025</td></tr></table>
</div>"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    println!("Checking plan generation against the Gemini API...\n");

    let config = Config::from_env()?;
    if config.gemini.api_key.is_empty() {
        eprintln!("   ✗ GEMINI_API_KEY is not set");
        return Err("GEMINI_API_KEY not found".into());
    }

    let client = GeminiClient::new(&config.gemini)?;
    println!("1. Model: {}", client.model());
    let planner = PlanGenerator::new(Arc::new(client));

    println!("\n2. Requesting a payer selection plan for 'UMR'...");
    match planner.selection_plan("UMR", SAMPLE_CATEGORIES).await {
        Ok(plan) => println!(
            "   ✓ category: {:?}, payer: {:?}",
            plan.category_text, plan.payer_text
        ),
        Err(e) => eprintln!("   ✗ {}", e),
    }

    println!("\n3. Requesting report fields...");
    match planner.report_fields(SAMPLE_REPORT).await {
        Ok(fields) => println!(
            "   ✓ status: {:?}, begin: {:?}, end: {:?}",
            fields.status, fields.policy_begin, fields.policy_end
        ),
        Err(e) => eprintln!("   ✗ {}", e),
    }

    println!("\n✓ Planner check completed");
    Ok(())
}
