use anyhow::Context;
use clap::Parser;
use homegarden_core::domain::model::UrlVerdict;
use homegarden_core::utils::error::ErrorSeverity;
use homegarden_core::utils::logger;
use homegarden_core::{CliConfig, Command, GardenError, GardenServices, TomlConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let config = TomlConfig::from_file(&cli.config)
        .with_context(|| format!("failed to load config file '{}'", cli.config))?;

    if config.json_logs() {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI args: {:?}", cli);

    let services = match GardenServices::from_config(config) {
        Ok(services) => services,
        Err(e) => exit_with(&e),
    };

    match cli.command {
        Command::Nearby {
            lat,
            lon,
            radius,
            limit,
        } => {
            let query = match services.config.build_query(lat, lon, radius, limit) {
                Ok(query) => query,
                Err(e) => exit_with(&e),
            };
            let result = match services.proximity.find_nearby(query).await {
                Ok(result) => result,
                Err(e) => exit_with(&e),
            };

            if result.is_degraded() {
                eprintln!("⚠️  Garden store unavailable, no results");
            }
            for nearby in &result.gardens {
                println!(
                    "{:>9.3} km  {}  {}",
                    nearby.distance_km, nearby.garden.id, nearby.garden.name
                );
            }
            tracing::info!(
                "Found {} gardens within {} km",
                result.gardens.len(),
                query.radius_km
            );
        }
        Command::CheckUrl { url } => match services.guard().check(&url).await {
            UrlVerdict::Safe { addresses, .. } => {
                let list: Vec<String> = addresses.iter().map(|ip| ip.to_string()).collect();
                println!("✅ safe ({})", list.join(", "));
            }
            UrlVerdict::Unsafe(reason) => {
                println!("❌ unsafe: {}", reason);
                std::process::exit(1);
            }
        },
        Command::FetchImage { url, output } => {
            let image = match services.fetcher.fetch(&url).await {
                Ok(image) => image,
                Err(e) => exit_with(&e),
            };
            std::fs::write(&output, &image.bytes)
                .with_context(|| format!("failed to write '{}'", output))?;
            println!(
                "📁 Saved {} bytes ({}) from {} to {}",
                image.bytes.len(),
                image.content_type,
                image.source,
                output
            );
        }
    }

    Ok(())
}

fn exit_with(e: &GardenError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 2,
        ErrorSeverity::Medium => 3,
        ErrorSeverity::High | ErrorSeverity::Critical => 1,
    };
    std::process::exit(exit_code);
}
