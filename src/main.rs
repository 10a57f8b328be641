use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use consultgrid::blob::FsBlobStore;
use consultgrid::catalog::TimeGrid;
use consultgrid::config::Config;
use consultgrid::identity::InMemoryIdentity;
use consultgrid::ingest::TableReader;
use consultgrid::model::{AccountId, Role};
use consultgrid::notify::NotifyHub;
use consultgrid::schedule::derive_snapshot;
use consultgrid::service::{Collaborators, Consultation, FileUpload, NewAccount};
use consultgrid::store::{DocumentStore, WalStore};

#[derive(Parser)]
#[command(name = "consultgrid")]
#[command(about = "Consultation availability: timetable derivation and account administration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive availability from a timetable (.xlsx or .csv) and print it as JSON
    Derive {
        #[arg(long)]
        file: PathBuf,
    },
    /// Create a teacher or admin account
    Provision {
        #[arg(long, value_enum)]
        role: ProvisionRole,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long = "subject")]
        subjects: Vec<String>,
    },
    /// List every stored account as JSON
    Accounts,
    /// Approve or reject a pending student
    Decide {
        #[arg(long)]
        admin: String,
        #[arg(long)]
        student: String,
        #[arg(value_enum)]
        decision: DecisionArg,
    },
    /// Replace a teacher's availability from a timetable, acting as an admin
    Import {
        #[arg(long)]
        admin: String,
        #[arg(long)]
        teacher: String,
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ProvisionRole {
    Teacher,
    Admin,
}

impl From<ProvisionRole> for Role {
    fn from(role: ProvisionRole) -> Self {
        match role {
            ProvisionRole::Teacher => Role::Teacher,
            ProvisionRole::Admin => Role::Admin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DecisionArg {
    Approve,
    Reject,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    consultgrid::observability::init(config.metrics_port)?;

    if let Commands::Derive { file } = &cli.command {
        let bytes = Bytes::from(std::fs::read(file)?);
        let grid = TimeGrid::standard();
        let rows = TableReader::new().rows(&file.to_string_lossy(), bytes)?;
        let snapshot = derive_snapshot(&grid, rows)?;
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    std::fs::create_dir_all(&config.data_dir)?;
    let store = Arc::new(WalStore::open(config.wal_path())?);
    info!("  data_dir: {}", config.data_dir.display());
    info!("  decision_policy: {:?}", config.decision_policy);

    // Credentials live only for the duration of one run; the operator acts
    // through stored account ids.
    let svc = Consultation::new(
        TimeGrid::standard(),
        Collaborators {
            identity: Arc::new(InMemoryIdentity::new()),
            store: store.clone(),
            blobs: Arc::new(FsBlobStore::new(config.blob_root())),
            tables: TableReader::new(),
        },
        Arc::new(NotifyHub::new()),
    )
    .with_policy(config.decision_policy);

    match cli.command {
        Commands::Derive { .. } => {}
        Commands::Provision {
            role,
            name,
            email,
            password,
            subjects,
        } => {
            let account = svc
                .provision_account(NewAccount {
                    role: role.into(),
                    name,
                    email,
                    password,
                    subjects,
                })
                .await?;
            println!("{}", account.id);
        }
        Commands::Accounts => {
            let accounts = store.list().await?;
            println!("{}", serde_json::to_string_pretty(&accounts)?);
        }
        Commands::Decide {
            admin,
            student,
            decision,
        } => {
            let session = svc.session_for(&AccountId::new(admin)).await?;
            let student = AccountId::new(student);
            let outcome = match decision {
                DecisionArg::Approve => svc.approve_student(&session, &student).await?,
                DecisionArg::Reject => svc.reject_student(&session, &student).await?,
            };
            println!("{outcome:?}");
        }
        Commands::Import {
            admin,
            teacher,
            file,
        } => {
            let session = svc.session_for(&AccountId::new(admin)).await?;
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let upload = FileUpload::new(file_name, std::fs::read(&file)?);
            let snapshot = svc
                .upload_schedule_for(&session, &AccountId::new(teacher), upload)
                .await?;
            for miss in &snapshot.misses {
                eprintln!("skipped row with unrecognised time label {:?}", miss.raw);
            }
            println!(
                "{} available, {} booked",
                snapshot.available().count(),
                snapshot.booked().count()
            );
        }
    }

    store.compact_if_due(config.compact_threshold).await?;
    Ok(())
}
