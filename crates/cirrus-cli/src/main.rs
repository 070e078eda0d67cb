//! cirrus - declarative OpenStack resource management.
//!
//! Each subcommand observes the remote resource, converges it onto the
//! declared state (or queries it), and prints a JSON result on stdout.
//! Cloud credentials come from the standard `OS_*` environment.

mod params;
mod report;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cirrus_cloud::{CloudConfig, OpenStackCloud};
use cirrus_converge::{converge, would_change};

use params::{FlavorArgs, UserInfoArgs};

/// Declarative OpenStack resource management.
#[derive(Parser, Debug)]
#[command(name = "cirrus")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Converge a compute flavor onto its declared state.
    Flavor(FlavorArgs),
    /// List identity users matching a name, domain and filters.
    UserInfo(UserInfoArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        report::failure(&format!("{e:#}"));
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = CloudConfig::from_env()?;
    let cloud = OpenStackCloud::connect(&config).await?;

    match args.command {
        Command::Flavor(flavor) => run_flavor(&cloud, flavor).await,
        Command::UserInfo(user_info) => run_user_info(&cloud, user_info).await,
    }
}

async fn run_flavor(cloud: &OpenStackCloud, args: FlavorArgs) -> anyhow::Result<()> {
    let check = args.check;
    let spec = args.into_spec()?;

    if check {
        let changed = would_change(cloud, &spec).await?;
        tracing::info!(name = %spec.name, changed, "check mode, no changes applied");
        report::changed_only(changed);
        return Ok(());
    }

    let outcome = converge(cloud, &spec).await?;
    match outcome.flavor {
        Some(flavor) => report::success(outcome.changed, "flavor", &flavor),
        None => report::changed_only(outcome.changed),
    }
    Ok(())
}

async fn run_user_info(cloud: &OpenStackCloud, args: UserInfoArgs) -> anyhow::Result<()> {
    let query = args.into_query()?;
    let users = query.search(cloud).await?;
    report::success(false, "users", &users);
    Ok(())
}
