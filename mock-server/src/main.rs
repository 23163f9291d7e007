use clap::Parser;
use mock_odoo::{Fixture, MockOdoo};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Mock Odoo XML-RPC server for local development and tests.
#[derive(Parser, Debug)]
#[command(name = "mock-odoo", version)]
struct Args {
    /// HTTP port
    #[arg(short, long, env = "PORT", default_value_t = 8069)]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1")]
    bind: String,

    /// JSON fixture with database, users and records; the demo data is used
    /// when omitted
    #[arg(short, long)]
    fixtures: Option<std::path::PathBuf>,

    /// Log filter, e.g. `info` or `mock_odoo=debug`
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let odoo = match &args.fixtures {
        Some(path) => {
            let fixture: Fixture = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            MockOdoo::from_fixture(fixture)
        }
        None => MockOdoo::demo(),
    };

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, database = %odoo.database, "listening");
    mock_odoo::run_with(listener, odoo).await?;
    Ok(())
}
