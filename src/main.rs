//! docscan - document log with OCR-ready capture
//!
//! Command-line front end: preprocess images for recognition, scan text into
//! document fields and manage the document log.

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use docscan::capture::Raster;
use docscan::config::{self, AppConfig};
use docscan::storage::documents::{
    CategoryFilter, DocumentCategory, DocumentFilter, DocumentStatus, DocumentStore, NewDocument,
};
use docscan::vision::{preprocess, PreprocessOptions, Region, SegmentationMode};

/// docscan - document capture, preprocessing and OCR
#[derive(Parser, Debug)]
#[command(name = "docscan")]
#[command(about = "Document log with OCR-ready image preprocessing")]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the preprocessing pipeline and write the engine-ready PNG
    Preprocess {
        /// Source image
        image: PathBuf,
        #[command(flatten)]
        pipeline: PipelineArgs,
        /// Where to write the processed PNG
        #[arg(short, long)]
        output: PathBuf,
        /// Also print the image as a data URL
        #[arg(long)]
        data_url: bool,
    },

    /// Recognize text in an image and print it
    #[cfg(feature = "tesseract")]
    Scan {
        /// Source image
        image: PathBuf,
        #[command(flatten)]
        pipeline: PipelineArgs,
        /// Form field the text is meant for
        #[arg(long, default_value = "notes")]
        field: docscan::storage::FormField,
        /// Store the text in a new document
        #[arg(long)]
        save: bool,
        /// Date of the new document (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        date: String,
    },

    /// Manage the document log
    Documents {
        #[command(subcommand)]
        action: DocumentsCommand,
    },
}

#[derive(ClapArgs, Debug)]
struct PipelineArgs {
    /// Text granularity: paragraph, line or word (config default when omitted)
    #[arg(short, long)]
    mode: Option<SegmentationMode>,
    /// Region to extract as x,y,width,height in source pixels
    #[arg(long)]
    crop: Option<Region>,
    /// Light text on a dark background
    #[arg(long)]
    invert: bool,
}

impl PipelineArgs {
    fn options(&self, config: &AppConfig) -> PreprocessOptions {
        PreprocessOptions::new(
            self.mode.unwrap_or(config.scanner.default_mode),
            self.invert || config.scanner.invert,
        )
    }
}

#[derive(Subcommand, Debug)]
enum DocumentsCommand {
    /// List documents
    List {
        #[arg(long)]
        status: Option<DocumentStatus>,
        /// Category name, "pickup/delivery" or "all"
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
    },
    /// Add a document
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        reference: String,
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "Registered")]
        category: DocumentCategory,
        #[arg(long, default_value = "")]
        notes: String,
    },
    /// Delete a document by id
    Delete { id: String },
    /// Search title, reference number and notes
    Search {
        term: String,
        #[arg(long)]
        status: Option<DocumentStatus>,
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };
    let config = config::load_or_create_config(&config_path)?;

    // Initialize logging; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Loaded configuration from {:?}", config_path);

    match args.command {
        Command::Preprocess {
            image,
            pipeline,
            output,
            data_url,
        } => run_preprocess(&config, image, &pipeline, output, data_url).await,
        #[cfg(feature = "tesseract")]
        Command::Scan {
            image,
            pipeline,
            field,
            save,
            date,
        } => run_scan(&config, image, &pipeline, field, save, date).await,
        Command::Documents { action } => run_documents(&config, action),
    }
}

async fn read_raster(path: &Path) -> Result<Raster> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    Raster::decode(&bytes).with_context(|| format!("Could not load the selected image {:?}", path))
}

async fn run_preprocess(
    config: &AppConfig,
    image: PathBuf,
    pipeline: &PipelineArgs,
    output: PathBuf,
    data_url: bool,
) -> Result<()> {
    let source = read_raster(&image).await?;
    let encoded = preprocess(&source, pipeline.crop, &pipeline.options(config))?;

    tokio::fs::write(&output, &encoded.png)
        .await
        .with_context(|| format!("Failed to write {:?}", output))?;
    println!(
        "Wrote {}x{} image (scale {}x) to {}",
        encoded.width,
        encoded.height,
        encoded.scale,
        output.display()
    );
    if data_url {
        println!("{}", encoded.to_data_url());
    }
    Ok(())
}

#[cfg(feature = "tesseract")]
async fn run_scan(
    config: &AppConfig,
    image: PathBuf,
    pipeline: &PipelineArgs,
    field: docscan::storage::FormField,
    save: bool,
    date: String,
) -> Result<()> {
    use docscan::capture::NoCamera;
    use docscan::scanner::{ExtractTarget, ScanController};
    use docscan::storage::DocumentDraft;
    use docscan::vision::tesseract::TesseractEngine;
    use docscan::vision::RecognitionSession;
    use std::sync::Arc;

    let bytes = tokio::fs::read(&image)
        .await
        .with_context(|| format!("Failed to read {:?}", image))?;

    let session = RecognitionSession::new(Arc::new(TesseractEngine::new()))
        .with_language(config.scanner.language.clone())
        .with_dpi(config.scanner.dpi);
    let mut controller =
        ScanController::new(field, Arc::new(NoCamera)).with_options(pipeline.options(config));

    controller.load_image(&bytes)?;

    let target = match pipeline.crop {
        Some(region) => ExtractTarget::Region(region),
        None => ExtractTarget::FullImage,
    };

    let mut progress = controller.subscribe_progress();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            tracing::debug!("Scan progress {}%", *progress.borrow());
        }
    });

    controller.extract(target, &session).await?;
    let commit = controller.confirm()?;
    drop(controller);
    let _ = reporter.await;

    println!("{}", commit.text);

    if save {
        let mut store = DocumentStore::open(&config.storage.documents_path()?)?;
        let mut draft = DocumentDraft::new();
        draft.document.date = date;
        draft.apply_commit(commit);
        let doc = store.create(draft.into_new_document())?;
        println!("Saved as document {}", doc.id);
    }
    Ok(())
}

fn run_documents(config: &AppConfig, action: DocumentsCommand) -> Result<()> {
    let path = config.storage.documents_path()?;
    let mut store = DocumentStore::open(&path)?;

    match action {
        DocumentsCommand::List { status, category } => {
            let filter = DocumentFilter {
                term: None,
                status,
                category,
            };
            print_documents(&store, &filter);
        }
        DocumentsCommand::Search {
            term,
            status,
            category,
        } => {
            let filter = DocumentFilter {
                term: Some(term),
                status,
                category,
            };
            print_documents(&store, &filter);
        }
        DocumentsCommand::Add {
            title,
            reference,
            date,
            category,
            notes,
        } => {
            let doc = store.create(NewDocument {
                title,
                reference_number: reference,
                date,
                category,
                notes,
                ..Default::default()
            })?;
            println!("Added document {}", doc.id);
        }
        DocumentsCommand::Delete { id } => {
            if store.delete(&id)? {
                println!("Deleted document {}", id);
            } else {
                anyhow::bail!("No document with id {}", id);
            }
        }
    }
    Ok(())
}

fn print_documents(store: &DocumentStore, filter: &DocumentFilter) {
    let mut shown = 0;
    for doc in store.search(filter) {
        println!(
            "{}  {}  {:<18} {:<9} {}  {}",
            doc.id, doc.date, doc.category, doc.status, doc.reference_number, doc.title
        );
        shown += 1;
    }
    println!("{} of {} documents", shown, store.len());
}
