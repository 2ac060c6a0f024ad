use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use customer_manager::config;
use customer_manager::db::{self, CustomerStore};
use customer_manager::models::{ClientDraft, ClientFilter, ClientUpdate};

#[derive(Parser)]
#[command(name = "customer_manager", version, about = "Client and phone records over PostgreSQL")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or drop the clients and phones tables
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },
    /// Manage client records
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },
    /// Manage phone numbers
    Phone {
        #[command(subcommand)]
        action: PhoneAction,
    },
    /// Run a seeded end-to-end walkthrough against the configured database
    Demo,
}

#[derive(Subcommand)]
enum SchemaAction {
    Create,
    Drop,
}

#[derive(Subcommand)]
enum ClientAction {
    /// Add a client; all three fields are required, phones are optional
    Add {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// May be given more than once
        #[arg(long = "phone")]
        phones: Vec<String>,
    },
    /// Remove a client and every phone it owns
    Remove { id: i32 },
    /// Update the supplied fields, leaving the rest untouched
    Update {
        id: i32,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    /// Print the ids of clients matching every supplied filter
    Find {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Print every client with its phones
    List,
}

#[derive(Subcommand)]
enum PhoneAction {
    Add { client_id: i32, phone: String },
    Remove { phone: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = config::init()?;

    // Initialize the store
    let store = db::init(&config).await?;
    info!("database connection established");

    // Release the pool whether the command worked or not
    let result = run(&store, cli.command).await;
    store.close().await;

    result
}

async fn run(store: &CustomerStore, command: Command) -> Result<()> {
    match command {
        Command::Schema { action } => match action {
            SchemaAction::Create => {
                store.create_schema().await?;
                println!("schema created");
            }
            SchemaAction::Drop => {
                store.drop_schema().await?;
                println!("schema dropped");
            }
        },
        Command::Client { action } => match action {
            ClientAction::Add {
                first_name,
                last_name,
                email,
                phones,
            } => {
                let draft = ClientDraft {
                    first_name,
                    last_name,
                    email,
                    phones,
                };
                let client_id = store.add_client(&draft).await?;
                println!("{client_id}");
            }
            ClientAction::Remove { id } => {
                store.remove_client(id).await?;
                println!("client {id} removed");
            }
            ClientAction::Update {
                id,
                first_name,
                last_name,
                email,
            } => {
                let update = ClientUpdate {
                    first_name,
                    last_name,
                    email,
                };
                store.update_client(id, &update).await?;
                println!("client {id} updated");
            }
            ClientAction::Find {
                first_name,
                last_name,
                email,
                phone,
            } => {
                let filter = ClientFilter {
                    first_name,
                    last_name,
                    email,
                    phone,
                };
                for id in store.find_client_ids(&filter).await? {
                    println!("{id}");
                }
            }
            ClientAction::List => print_clients(store).await?,
        },
        Command::Phone { action } => match action {
            PhoneAction::Add { client_id, phone } => {
                store.add_phone(client_id, &phone).await?;
                println!("phone {phone} added to client {client_id}");
            }
            PhoneAction::Remove { phone } => {
                store.remove_phone(&phone).await?;
                println!("phone {phone} removed");
            }
        },
        Command::Demo => run_demo(store).await?,
    }

    Ok(())
}

async fn print_clients(store: &CustomerStore) -> Result<()> {
    for client in store.list_clients().await? {
        let phones = store.phones_for_client(client.id).await?;
        let numbers: Vec<&str> = phones.iter().map(|p| p.phone.as_str()).collect();
        println!(
            "{:>4}  {} {}  <{}>  [{}]",
            client.id,
            client.first_name,
            client.last_name,
            client.email,
            numbers.join(", ")
        );
    }

    Ok(())
}

/// Walks every store operation against a freshly reset schema.
async fn run_demo(store: &CustomerStore) -> Result<()> {
    // First run has nothing to drop yet
    if store.drop_schema().await.is_err() {
        info!("no existing tables to drop");
    }
    store.create_schema().await?;

    let elena = store
        .add_client(&ClientDraft {
            first_name: Some("Elena".to_string()),
            last_name: Some("Anisimova".to_string()),
            email: Some("eanisimova@test.com".to_string()),
            phones: vec!["555-55-55".to_string(), "9-888-707-55-66".to_string()],
        })
        .await?;
    println!("added client {elena} with two phones");

    store
        .add_client(&ClientDraft {
            first_name: Some("Pavel".to_string()),
            last_name: Some("Potapov".to_string()),
            email: Some("ppotapov@test.com".to_string()),
            phones: Vec::new(),
        })
        .await?;
    store
        .add_client(&ClientDraft {
            first_name: Some("Pavel".to_string()),
            last_name: Some("Anokhin".to_string()),
            email: Some("1@2.com".to_string()),
            phones: Vec::new(),
        })
        .await?;

    let anokhin = store
        .find_client_ids(&ClientFilter {
            email: Some("1@2.com".to_string()),
            ..Default::default()
        })
        .await?
        .first()
        .copied()
        .context("no client with email 1@2.com")?;
    store.add_phone(anokhin, "222-22-22").await?;
    store
        .update_client(
            anokhin,
            &ClientUpdate {
                email: Some("one@two.com".to_string()),
                ..Default::default()
            },
        )
        .await?;
    println!("client {anokhin} got a phone and a new email");

    let potapov = store
        .find_client_ids(&ClientFilter {
            email: Some("ppotapov@test.com".to_string()),
            ..Default::default()
        })
        .await?
        .first()
        .copied()
        .context("no client with email ppotapov@test.com")?;
    store.remove_client(potapov).await?;
    println!("removed client {potapov}");

    let by_phone = store
        .find_client_ids(&ClientFilter {
            phone: Some("555-55-55".to_string()),
            ..Default::default()
        })
        .await?
        .first()
        .copied()
        .context("no client owns 555-55-55")?;
    store
        .update_client(
            by_phone,
            &ClientUpdate {
                email: Some("e_anisimova@test.com".to_string()),
                ..Default::default()
            },
        )
        .await?;
    store.remove_phone("555-55-55").await?;
    println!("client {by_phone} keeps the second phone only");

    print_clients(store).await
}
