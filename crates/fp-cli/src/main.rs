use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fanplace")]
#[command(about = "FanPlace operator CLI", long_about = None)]
struct Cli {
    /// Directory holding base.yaml and the per-environment overlays
    #[arg(long, global = true, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Insert demo users, celebs, places, events and ad products (idempotent)
    Seed,

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> environment overlay)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Admin account management
    Admin {
        #[command(subcommand)]
        cmd: AdminCmd,
    },

    /// Order maintenance
    Orders {
        #[command(subcommand)]
        cmd: OrdersCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply embedded SQL migrations.
    Migrate,
}

#[derive(Subcommand)]
enum AdminCmd {
    /// Create an ADMIN user, or promote the existing user with that email.
    Create {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        /// Only used when the user does not exist yet
        #[arg(long)]
        password: String,
    },
}

#[derive(Subcommand)]
enum OrdersCmd {
    /// Reject PENDING orders older than the TTL (same rule as the server sweep)
    ExpireStale {
        #[arg(long)]
        ttl_minutes: i64,
    },

    /// Refund a PAID order at the payment provider and mark it REFUNDED
    Refund {
        #[arg(long)]
        order_id: String,

        #[arg(long, default_value = "requested_by_customer")]
        reason: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = fp_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = fp_db::status(&pool).await?;
                    println!("db_ok={} has_orders_table={}", s.ok, s.has_orders_table);
                }
                DbCmd::Migrate => {
                    fp_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::Seed => {
            let pool = fp_db::connect_from_env().await?;
            let r = fp_db::seed(&pool).await?;
            println!(
                "seeded=true users={} celebs={} places={} events={} products={} orders={}",
                r.users, r.celebs, r.places, r.events, r.products, r.orders
            );
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = fp_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Admin { cmd } => match cmd {
            AdminCmd::Create {
                email,
                name,
                password,
            } => {
                let input = commands::admin::AdminInput::parse(&email, &name, &password)?;
                let runtime = commands::load_runtime(&cli.config_dir)?;
                let pool = fp_db::connect_from_env().await?;
                let outcome =
                    commands::admin::create_or_promote(&pool, &input, runtime.settings.auth.bcrypt_cost)
                        .await?;
                println!(
                    "admin_ready=true user_id={} email={} created={}",
                    outcome.user.id, outcome.user.email, outcome.created
                );
            }
        },

        Commands::Orders { cmd } => match cmd {
            OrdersCmd::ExpireStale { ttl_minutes } => {
                let ttl = commands::orders::parse_ttl(ttl_minutes)?;
                let pool = fp_db::connect_from_env().await?;
                let ids = fp_db::expire_stale_pending_orders(&pool, ttl).await?;
                println!("expired={} ttl_minutes={}", ids.len(), ttl_minutes);
                for id in ids {
                    println!("order_id={id}");
                }
            }

            OrdersCmd::Refund { order_id, reason } => {
                let order_id = commands::parse_uuid(&order_id, "order_id")?;
                let runtime = commands::load_runtime(&cli.config_dir)?;
                let provider = fp_payments::build_provider(&runtime.settings.payments, &runtime.secrets)?;
                let pool = fp_db::connect_from_env().await?;
                let order =
                    commands::orders::refund(&pool, provider.as_ref(), order_id, &reason).await?;
                println!(
                    "refunded=true order_id={} order_number={} status={} provider={} env={}",
                    order.id,
                    order.order_number,
                    order.status.as_str(),
                    provider.name(),
                    runtime.env.as_str()
                );
            }
        },
    }

    Ok(())
}
