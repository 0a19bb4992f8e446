//! Utility to look up HQ Public contacts from the command line.
//!
//! Usage: `contact_lookup <id|email|mobile> <value>`
//!
//! Reads `HQPUBLIC_BDN_KEY`, `HQPUBLIC_BDN_ACCOUNT` and
//! `HQPUBLIC_BDN_DOMAIN` from the environment or `.env`.

use bdn_api::config::Config;
use bdn_api::HqPublicClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bdn_api=debug,contact_lookup=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (kind, value) = match (args.next(), args.next()) {
        (Some(kind), Some(value)) => (kind, value),
        _ => anyhow::bail!("usage: contact_lookup <id|email|mobile> <value>"),
    };

    let config = Config::from_env()?;
    let client = HqPublicClient::from_config(&config)?;

    let result = match kind.as_str() {
        "id" => {
            let contact_id: i64 = value
                .parse()
                .map_err(|_| anyhow::anyhow!("contact id must be a number, got '{}'", value))?;
            match client.get_contact_by_id(contact_id).await? {
                Some(contact) => serde_json::Value::from(contact),
                None => {
                    tracing::info!("No contact with id {}", contact_id);
                    serde_json::json!({})
                }
            }
        }
        "email" => client.get_contacts_by_email(&value).await?,
        "mobile" => client.get_contacts_by_mobile(&value).await?,
        other => anyhow::bail!("unknown lookup '{}'; expected id, email or mobile", other),
    };

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
