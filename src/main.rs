//! kubectl-status - human-readable status of Kubernetes objects
//!
//! Installed on the PATH, kubectl picks it up as `kubectl status`.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use kubestatus::cli::{self, Args};
use kubestatus::config::{ConfigLoader, RenderOptions};
use kubestatus::kube::{self as cluster, KubeStore, ManifestStore, ObjectStore};
use kubestatus::render::TemplateEngine;
use kubestatus::repository::ObjectRepository;
use kubestatus::{ErrorAggregate, QueryTarget, Session};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = cli::init_logging(args.debug, args.log_file.as_deref()) {
        eprintln!("error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(errors)) => {
            for error in errors.errors() {
                eprintln!("error: {}", error);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Setup failures are the outer error; session failures the inner one
async fn run(args: Args) -> Result<Result<(), ErrorAggregate>> {
    let config = ConfigLoader::load().context("Failed to load configuration")?;
    let options = args.render_options(config);
    if let Err(e) = options.validate() {
        return Ok(Err(e.into()));
    }

    let manifests = load_manifests(&options)?;
    let documents = manifests
        .as_ref()
        .map(|store| store.objects().clone().into_vec());
    let target = match QueryTarget::build(&args.resources, documents, options.local) {
        Ok(target) => target,
        Err(e) => return Ok(Err(e.into())),
    };

    let (store, default_namespace): (Arc<dyn ObjectStore>, String) = if options.local {
        (Arc::new(manifests.unwrap_or_default()), "default".to_string())
    } else {
        let connection = cluster::create_client(args.context.as_deref()).await?;
        (
            Arc::new(KubeStore::new(connection.client)),
            connection.default_namespace,
        )
    };

    let repo = ObjectRepository::connect(store)
        .await
        .context("Failed to load the resource type catalog")?;
    let engine = TemplateEngine::with_overrides(options.config.templates_dir.as_deref())?;
    tracing::debug!(
        "Includes {:?}, max depth {}",
        options.includes(),
        options.max_depth()
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupted");
            on_interrupt.cancel();
        }
    });

    let mut session = Session::new(repo, engine, options, default_namespace);
    let mut stdout = std::io::stdout();
    let result = session.run(&target, &mut stdout, cancel).await;
    stdout.flush().context("Failed to flush output")?;
    Ok(result)
}

/// Documents of every `--filename`, `None` when no file was given
fn load_manifests(options: &RenderOptions) -> Result<Option<ManifestStore>> {
    if options.filenames.is_empty() {
        return Ok(None);
    }
    let store = ManifestStore::load(&options.filenames).context("Failed to read manifests")?;
    Ok(Some(store))
}
