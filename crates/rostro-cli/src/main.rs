use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use rostro_auth::{FaceSession, FacialAuthClient, FacialAuthResponse, ImageRef};
use rostro_core::{OperationResult, Product, ProductForm};
use rostro_inventory::{spawn_repository, ProductRepository};
use rostro_store::{KeyValueStore, SqliteStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "rostro", about = "Rostro inventory and facial login CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the product inventory
    #[command(subcommand)]
    Products(ProductCommand),
    /// Facial registration and login
    #[command(subcommand)]
    Face(FaceCommand),
    /// Show face registration, inventory and storage status
    Status,
}

#[derive(Subcommand)]
enum ProductCommand {
    /// List all products
    List,
    /// Show the product with this barcode
    Find { barcode: String },
    /// Handle a scanned barcode: show the product or report it as new
    Scan { barcode: String },
    /// Add a new product
    Add(NewProductArgs),
    /// Edit an existing product (the barcode cannot change)
    Update {
        id: String,
        #[command(flatten)]
        fields: EditProductArgs,
    },
    /// Delete a product by ID
    Delete { id: String },
}

#[derive(Args)]
struct NewProductArgs {
    #[arg(long)]
    barcode: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    price: f64,
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    quantity: i64,
    #[arg(long)]
    category: String,
}

#[derive(Args)]
struct EditProductArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    price: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    quantity: Option<i64>,
    #[arg(long)]
    category: Option<String>,
}

#[derive(Subcommand)]
enum FaceCommand {
    /// Register your face under a CUIL
    Register {
        /// CUIL identifying the person (e.g., "20-12345678-3")
        #[arg(short, long)]
        cuil: String,
        /// Captured photo: a path or file:// URI
        image: String,
    },
    /// Log in with a captured photo
    Login {
        /// Captured photo: a path or file:// URI
        image: String,
    },
    /// Forget the local face registration flag
    Forget,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&config.db_path).await?);

    match cli.command {
        Commands::Products(cmd) => {
            let repo = spawn_repository(store, config.repository_config());
            repo.ready().await?;
            let outcome = run_products(&repo, cmd).await;
            repo.shutdown().await?;
            outcome?;
        }
        Commands::Face(cmd) => {
            let client = FacialAuthClient::new(config.api_base_url.clone());
            let mut session = FaceSession::open(client, store).await;
            run_face(&mut session, cmd).await?;
        }
        Commands::Status => {
            let client = FacialAuthClient::new(config.api_base_url.clone());
            let session = FaceSession::open(client, store.clone()).await;
            let repo = spawn_repository(store, config.repository_config());
            repo.ready().await?;
            let snapshot = repo.snapshot();
            repo.shutdown().await?;

            let status = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "db_path": config.db_path.display().to_string(),
                "api_base_url": config.api_base_url.as_str(),
                "has_registered_face": session.has_registered_face(),
                "products": snapshot.products.len(),
                "unsynced": snapshot.dirty,
                "store": snapshot.health,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}

async fn run_products(repo: &ProductRepository, cmd: ProductCommand) -> Result<()> {
    match cmd {
        ProductCommand::List => {
            let products = repo.products();
            if products.is_empty() {
                println!("No products");
            }
            for p in &products {
                print_row(p);
            }
        }
        ProductCommand::Find { barcode } => match repo.get_product_by_barcode(&barcode) {
            Some(p) => println!("{}", serde_json::to_string_pretty(&p)?),
            None => bail!("no product with barcode {barcode}"),
        },
        ProductCommand::Scan { barcode } => match repo.get_product_by_barcode(&barcode) {
            Some(p) => {
                println!("Product \"{}\" is already registered:", p.name);
                print_row(&p);
                println!("Edit it with: rostro products update {}", p.id);
            }
            None => {
                println!("Barcode {barcode} is not registered");
                println!("Add it with: rostro products add --barcode {barcode} ...");
            }
        },
        ProductCommand::Add(args) => {
            if let Some(existing) = repo.get_product_by_barcode(&args.barcode) {
                bail!(
                    "barcode {} already belongs to \"{}\" ({})",
                    args.barcode,
                    existing.name,
                    existing.id
                );
            }
            let form = ProductForm {
                barcode: args.barcode,
                name: args.name,
                description: args.description,
                price: args.price,
                quantity: args.quantity,
                category: args.category,
            };
            report(repo.add_product(form).await, "Product added")?;
        }
        ProductCommand::Update { id, fields } => {
            let Some(existing) = repo.products().into_iter().find(|p| p.id == id) else {
                bail!("no product with id {id}");
            };
            let mut form = existing.to_form();
            if let Some(name) = fields.name {
                form.name = name;
            }
            if let Some(description) = fields.description {
                form.description = description;
            }
            if let Some(price) = fields.price {
                form.price = price;
            }
            if let Some(quantity) = fields.quantity {
                form.quantity = quantity;
            }
            if let Some(category) = fields.category {
                form.category = category;
            }
            report(repo.update_product(&id, form).await, "Product updated")?;
        }
        ProductCommand::Delete { id } => {
            report(repo.delete_product(&id).await, "Product deleted")?;
        }
    }

    if repo.is_dirty() {
        tracing::warn!(health = ?repo.health(), "changes kept in memory but not persisted");
    }
    Ok(())
}

async fn run_face(session: &mut FaceSession, cmd: FaceCommand) -> Result<()> {
    match cmd {
        FaceCommand::Register { cuil, image } => {
            let image = ImageRef::parse(&image)?;
            let response = session.register(&cuil, &image).await;
            report_face(&response, "Face registered")?;
        }
        FaceCommand::Login { image } => {
            if !session.has_registered_face() {
                println!("No face registered on this device yet; trying anyway");
            }
            let image = ImageRef::parse(&image)?;
            let response = session.login(&image).await;
            report_face(&response, "Face recognized")?;
        }
        FaceCommand::Forget => {
            session.forget().await;
            println!("Local face registration cleared");
        }
    }
    Ok(())
}

fn print_row(p: &Product) {
    println!(
        "{:<36}  {:<15}  {:<24}  {:>10.2}  {:>5}  {}",
        p.id, p.barcode, p.name, p.price, p.quantity, p.category
    );
}

fn report(result: OperationResult, success: &str) -> Result<()> {
    if result.is_success() {
        println!("{success}");
        return Ok(());
    }
    bail!(result.error.unwrap_or_else(|| "operation failed".to_string()))
}

fn report_face(response: &FacialAuthResponse, success: &str) -> Result<()> {
    if !response.success {
        bail!(response
            .message
            .clone()
            .unwrap_or_else(|| "facial authentication failed".to_string()));
    }
    match &response.cuil {
        Some(cuil) => println!("{success} (CUIL {cuil})"),
        None => println!("{success}"),
    }
    Ok(())
}
