use crate::cli::UploadArgs;
use crate::{report, target};
use hoist_config::{Config, Target};
use hoist_library::collect::{LocalDirectory, pick_files};
use hoist_library::upload::Outcome;
use hoist_library::{Session, Settings};
use miette::{IntoDiagnostic, Result, miette};
use std::io::Write;

const REDACTED: &str = "********";

pub async fn upload(config: Config, args: UploadArgs) -> Result<()> {
    let backend = target::connect(config.target.as_ref(), args.to.as_deref(), args.dry_run).await?;
    let compressor = if config.compression.enabled && !args.no_compress {
        Some(hoist_compress::ImageCompressor::new(config.compression.options()).map_err(report)?)
    } else {
        None
    };
    let settings = Settings {
        max_batch_bytes: config.max_batch_bytes(),
        compressor,
        compression_timeout: config.compression.timeout(),
        upload_options: config.upload.options(),
    };
    let mut session = Session::new(backend, settings);

    let batch = if args.flat {
        let files = pick_files(&args.directory).await.map_err(report)?;
        let fallback = args.directory.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        session.select_files(files, &fallback).map_err(report)?
    } else {
        let directory = LocalDirectory::open(&args.directory).await.map_err(report)?;
        session.select_directory(&directory).await.map_err(report)?
    };
    eprintln!(
        "Uploading {} files from \"{}\" ({:.1} MB)",
        batch.len(),
        batch.folder_name(),
        hoist_library::guard::total_megabytes(batch)
    );

    let mut progress = session.progress();
    let printer = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let percent = *progress.borrow_and_update();
            eprint!("\r{percent:5.1}%");
            let _ = std::io::stderr().flush();
        }
    });

    let outcome = if args.settle { settle(&mut session).await } else { submit(&mut session).await };
    printer.abort();
    eprintln!();
    outcome
}

async fn submit(session: &mut Session) -> Result<()> {
    let receipts = session.submit().await.map_err(report)?;
    for receipt in &receipts {
        println!("{}", receipt.url);
    }
    eprintln!("Files uploaded successfully");
    Ok(())
}

async fn settle(session: &mut Session) -> Result<()> {
    let results = session.submit_settled().await.map_err(report)?;
    let total = results.len();
    let mut failed = 0;
    for result in results {
        match result.outcome {
            Outcome::Success(receipt) => println!("{}", receipt.url),
            Outcome::Failure(err) => {
                failed += 1;
                eprintln!("\nfailed: {} ({err})", result.relative_path);
            },
        }
    }
    if failed > 0 {
        return Err(miette!("{failed} of {total} files could not be uploaded"));
    }
    eprintln!("Files uploaded successfully");
    Ok(())
}

pub fn show_config(config: &Config) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{:#?}", redacted(config)).into_diagnostic()?;
    if let Some(path) = hoist_config::default_path() {
        writeln!(stdout, "\n# default configuration file: {}", path.display()).into_diagnostic()?;
    }
    Ok(())
}

/// A copy of `config` that is safe to print.
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if let Some(Target::S3 { key_secret, .. }) = &mut config.target {
        *key_secret = REDACTED.to_string();
    }
    config
}
