//! Ingest command - run the full index pipeline under the sync lock

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tokio::sync::mpsc;

use yepmem_ingest::{EventKind, IngestPipeline, ProgressEvent};

use crate::progress::{finish_spinner, finish_spinner_error, spinner, update_spinner};
use crate::GlobalOptions;

/// Arguments for the ingest command
#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Emit SSE-formatted events on stdout instead of a spinner
    #[arg(long)]
    json: bool,
}

/// Execute the ingest command
pub async fn execute(args: IngestArgs, global: GlobalOptions) -> Result<()> {
    let workdir = global.workdir();
    let store_path = global.store_path();

    let pipeline = IngestPipeline::from_config(&workdir, &store_path)
        .context("Failed to initialize the ingest pipeline")?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        ctrlc_handler(move || cancel.store(true, Ordering::Relaxed));
    }

    let (tx, mut rx) = mpsc::channel::<ProgressEvent>(64);

    let pb = if args.json {
        None
    } else {
        spinner("Starting ingest", global.quiet)
    };

    let runner = async {
        // move the sender in so the event stream closes when the run ends
        let tx = tx;
        pipeline.run(&cancel, &tx).await
    };
    let printer = async {
        while let Some(event) = rx.recv().await {
            if args.json {
                print!("{}", event.to_sse());
            } else {
                update_spinner(&pb, &event.message);
            }
            if event.kind == EventKind::Error && !args.json && !global.quiet {
                eprintln!("{}", event.message);
            }
        }
    };

    let (outcome, ()) = tokio::join!(runner, printer);

    match outcome {
        Ok(outcome) => {
            finish_spinner(
                pb,
                &format!(
                    "Indexed {} files ({} chunks), {} sessions, {} edges",
                    outcome.files_indexed,
                    outcome.code_chunks,
                    outcome.transcript_chunks,
                    outcome.graph_edges
                ),
            );
            Ok(())
        }
        Err(e) => {
            finish_spinner_error(pb, "Ingest failed");
            Err(e.into())
        }
    }
}

/// Install a best-effort Ctrl-C hook; ingest keeps running if the handler
/// cannot be registered (e.g. when a host already owns the signal).
fn ctrlc_handler(on_interrupt: impl Fn() + Send + 'static) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt();
        }
    });
}
