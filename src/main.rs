use clap::Parser;
use log::{debug, info, warn};
use snafu::{prelude::*, ErrorCompat};
use std::fs;
use std::path::Path;

mod args;
pub mod ingest;

use crate::args::{Args, Command};
use crate::ingest::config_reader::{resolve_locations, Locations};
use crate::ingest::store::Store;
use crate::ingest::transaction::{import_upload, ImportOptions, StagedUpload};
use crate::ingest::*;
use survey_master::columns::DeclaredKind;
use survey_master::StoreSnapshot;

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

/// Writes the result to a file, or prints it for 'stdout' or no destination.
fn write_output(out: Option<&str>, pretty_js: &str) -> IngestResult<()> {
    match out {
        Some(p) if p != "stdout" => {
            info!("Writing result to {:?}", p);
            fs::write(p, pretty_js).context(WritingOutputSnafu { path: p })
        }
        _ => {
            println!("{}", pretty_js);
            Ok(())
        }
    }
}

async fn run_import(
    locations: &Locations,
    file: &str,
    overwrite: bool,
    kind: Option<&str>,
    out: Option<&str>,
) -> IngestResult<()> {
    let kind: DeclaredKind = match kind {
        Some(k) => match k.parse() {
            Ok(x) => x,
            Err(msg) => whatever!("{}", msg),
        },
        None => DeclaredKind::default(),
    };
    let store = Store::open(&locations.store_path);
    let upload = StagedUpload::stage(Path::new(file), &locations.upload_dir)?;
    let summary = import_upload(&store, upload, ImportOptions { overwrite, kind }).await?;
    let pretty_js = serde_json::to_string_pretty(&summary).context(SerializingStoreSnafu {})?;
    write_output(out, &pretty_js)
}

fn survey_listing(snapshot: &StoreSnapshot) -> Vec<String> {
    snapshot
        .surveys
        .iter()
        .map(|s| {
            let count = snapshot
                .questions
                .iter()
                .filter(|q| q.survey_id == s.survey_id)
                .count();
            format!(
                "{}\t{}\t{} questions",
                s.survey_id,
                s.survey_name.as_deref().unwrap_or(""),
                count
            )
        })
        .collect()
}

async fn run_list(locations: &Locations) -> IngestResult<()> {
    let store = Store::open(&locations.store_path);
    let snapshot = store.read().await?;
    debug!("run_list: {} surveys", snapshot.surveys.len());
    for line in survey_listing(&snapshot) {
        println!("{}", line);
    }
    Ok(())
}

async fn run(args: &Args) -> IngestResult<()> {
    let locations = resolve_locations(
        args.config.as_deref().map(Path::new),
        args.store.as_deref(),
        args.upload_dir.as_deref(),
    )?;
    info!("Using store {:?}", locations.store_path);
    match &args.command {
        Command::Import {
            file,
            overwrite,
            kind,
            out,
        } => run_import(&locations, file, *overwrite, kind.as_deref(), out.as_deref()).await,
        Command::List => run_list(&locations).await,
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    debug!("args: {:?}", args);

    if let Err(e) = run(&args).await {
        warn!("Error occured {:?}", e);
        eprintln!("An error occured: {}", e);
        if let IngestError::Rejected { rejection } = &e {
            match serde_json::to_string_pretty(rejection) {
                Ok(js) => eprintln!("{}", js),
                Err(err) => eprintln!("(could not render the rejection: {})", err),
            }
        }
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
