mod cli;
mod utils;

use std::io::stdout;
use std::path::Path;
use std::process::exit;
use std::str::FromStr;
use std::sync::Arc;

use clap::ArgMatches;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{build_cli, CliCommand, DeleteCmd, PhotosCmd, UploadCmd, DRY_RUN};
use crate::utils::rewrite_message;
use shelter_photos::file::{list_files, read_payloads};
use shelter_photos::{
    HttpFetcher, MemoryStore, ObjectStore, PhotoConfig, PhotoPayload, PhotoService, StoreClient,
    SyncError, SyncResult,
};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shelter_photos=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = build_cli();
    let config = PhotoConfig::load().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration due to error = {}", err);
        exit(1);
    });

    let (name, sub) = match matches.subcommand() {
        (name, Some(sub)) => (name, sub),
        _ => {
            eprintln!("No command was provided, run `shelter-photos help` to learn more");
            exit(1);
        }
    };

    let dry_run = matches.is_present(DRY_RUN) || sub.is_present(DRY_RUN);
    let store: Arc<dyn ObjectStore> = if dry_run {
        Arc::new(MemoryStore::new(&config.store))
    } else {
        match StoreClient::new(&config.store) {
            Ok(client) => Arc::new(client),
            Err(err) => {
                eprintln!("Failed to create store client due to error = {}", err);
                exit(1);
            }
        }
    };

    let result = match CliCommand::from_str(name) {
        Ok(cmd) => run(cmd, sub, store, &config).await,
        Err(invalid_cmd) => Err(SyncError::Usage(invalid_cmd)),
    };

    println!();
    match result {
        Ok(_) => exit(0),
        Err(err) => {
            eprintln!("❌  Failed due to error='{}'", err);
            exit(1);
        }
    }
}

async fn run(cmd: CliCommand, sub: &ArgMatches<'_>, store: Arc<dyn ObjectStore>, config: &PhotoConfig) -> SyncResult<()> {
    tracing::debug!(command = cmd.to_str(), "running command");

    if let CliCommand::Buckets = cmd {
        return list_buckets(store.as_ref()).await;
    }

    let service = PhotoService::connect(store, Arc::new(HttpFetcher::new()), config).await;
    if !service.status().is_ready() {
        tracing::warn!(status = ?service.status(), "photo bucket is not ready");
    }

    match cmd {
        CliCommand::Verify => print_json(service.status()),
        CliCommand::Photos => photos(&service, PhotosCmd::build(sub)).await,
        CliCommand::Upload => upload(&service, UploadCmd::build(sub)).await,
        CliCommand::Delete => delete(&service, DeleteCmd::build(sub)).await,
        CliCommand::Buckets => Ok(()),
    }
}

async fn list_buckets(store: &dyn ObjectStore) -> SyncResult<()> {
    let bucket_names = store.list_buckets().await?;

    println!("📚 found {} buckets:", bucket_names.len());
    bucket_names.iter().for_each(|b| println!("\t{}", b));

    Ok(())
}

async fn photos(service: &PhotoService, cmd: PhotosCmd) -> SyncResult<()> {
    if cmd.main_only {
        for name in &cmd.names {
            match service.resolve_main_photo(name).await {
                Some(url) => println!("{}\t{}", name, url),
                None => println!("{}\t-", name),
            }
        }
        return Ok(());
    }

    for (name, urls) in service.resolve_catalog(&cmd.names).await {
        println!("🐈 {} ({} photos)", name, urls.len());
        urls.iter().for_each(|u| println!("\t{}", u));
    }
    Ok(())
}

async fn upload(service: &PhotoService, cmd: UploadCmd) -> SyncResult<()> {
    let mut payloads = match &cmd.folder {
        Some(folder) => read_payloads(list_files(Path::new(folder))?).await?,
        None => Vec::new(),
    };
    for raw in &cmd.payloads {
        payloads.push(PhotoPayload::parse(raw)?);
    }

    if payloads.is_empty() {
        println!("No photos to add");
        return Ok(());
    }
    println!("loaded {} photos", payloads.len());

    let mut out = stdout();
    let result = service
        .upload_and_reconcile(&cmd.name, &payloads, |done, total| {
            if let Err(err) = rewrite_message(&mut out, &format!("uploaded {} / {} files", done, total)) {
                tracing::debug!(error = %err, "cannot redraw progress");
            }
        })
        .await?;
    println!();

    print_json(&result)
}

async fn delete(service: &PhotoService, cmd: DeleteCmd) -> SyncResult<()> {
    let result = service.delete_and_reconcile(&cmd.url, &cmd.name).await?;
    if !result.outcome.deleted_from_store() {
        println!("Photo was not found in the bucket, it is only dropped from view");
    }

    print_json(&result)
}

fn print_json<T: serde::Serialize>(value: &T) -> SyncResult<()> {
    println!("{}", json::to_string_pretty(value)?);
    Ok(())
}
