mod cart;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gearcart")]
#[command(about = "Storefront cart command line interface")]
struct Cli {
    /// Bearer token for the backend; overrides `GEARCART_API_TOKEN`
    #[arg(long, global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print the cart and its totals
    Show,
    /// Add a product to the cart
    Add {
        /// Catalog product id
        product_id: String,
        /// Units to add
        #[arg(long, short, default_value = "1")]
        quantity: u32,
    },
    /// Set the quantity of a line item; zero or less removes it
    Update {
        product_id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line item
    Remove { product_id: String },
    /// Empty the cart
    Clear,
    /// Log in and merge the guest cart into the remote cart
    Sync,
    /// Compare the backend shipping quote with the local calculation
    Estimate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = gearcart_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        println!("gearcart: no command given; try `gearcart --help`");
        return Ok(());
    };

    let token = cli.token.or_else(|| config.api_token.clone());
    tracing::debug!(env = %config.env, authenticated = token.is_some(), "starting");

    match command {
        Commands::Show => {
            let store = cart::open_store(&config, token.as_deref()).await?;
            cart::print_cart(&store);
        }
        Commands::Add {
            product_id,
            quantity,
        } => {
            let mut store = cart::open_store(&config, token.as_deref()).await?;
            cart::run_add(&mut store, &product_id, quantity).await?;
        }
        Commands::Update {
            product_id,
            quantity,
        } => {
            let mut store = cart::open_store(&config, token.as_deref()).await?;
            cart::run_update(&mut store, &product_id, quantity).await?;
        }
        Commands::Remove { product_id } => {
            let mut store = cart::open_store(&config, token.as_deref()).await?;
            cart::run_remove(&mut store, &product_id).await?;
        }
        Commands::Clear => {
            let mut store = cart::open_store(&config, token.as_deref()).await?;
            cart::run_clear(&mut store).await?;
        }
        Commands::Sync => {
            let Some(token) = token else {
                anyhow::bail!("`sync` needs an API token; set GEARCART_API_TOKEN or pass --token");
            };
            cart::run_sync(&config, &token).await?;
        }
        Commands::Estimate => {
            let store = cart::open_store(&config, token.as_deref()).await?;
            cart::run_estimate(&store).await?;
        }
    }

    Ok(())
}
