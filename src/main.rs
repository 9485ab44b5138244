use anyhow::{bail, Context};
use clap::Parser;
use recover_patterns::config::cli::{
    BatchArgs, Command, PayloadKind, SuperviseArgs, UnwindArgs,
};
use recover_patterns::core::{batch, unwind};
use recover_patterns::utils::{logger, panic_hook};
use recover_patterns::{
    CliConfig, LineHandler, RecoverError, RestartPolicy, Server, Settings, SupervisionEnd,
    Supervisor,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if settings.log_json {
        logger::init_json_logger(cli.verbose, settings.log_level.as_deref());
    } else {
        logger::init_cli_logger(cli.verbose, settings.log_level.as_deref());
    }
    panic_hook::install();

    if cli.verbose {
        tracing::debug!("Effective settings: {:?}", settings);
    }

    match cli.command {
        Command::Serve(_) => serve(&settings).await,
        Command::Supervise(args) => supervise(&settings, args).await,
        Command::Unwind(args) => run_unwind(args),
        Command::Batch(args) => run_batch(args),
    }
}

async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let server = Server::bind(settings, LineHandler)
        .await
        .with_context(|| format!("failed to listen on {}", settings.listen))?;
    let stats = server.stats();

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let snapshot = stats.snapshot();
    tracing::info!(
        "📊 accepted={} completed={} failed={} contained={}",
        snapshot.accepted,
        snapshot.completed,
        snapshot.failed,
        snapshot.contained
    );
    Ok(())
}

async fn supervise(settings: &Settings, args: SuperviseArgs) -> anyhow::Result<()> {
    let fail_times = args.fail_times;
    let calls = Arc::new(AtomicU64::new(0));
    let action = move || {
        let calls = Arc::clone(&calls);
        async move {
            let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if fail_times.map_or(true, |limit| call <= limit) {
                panic!("attempt {} went wrong", call);
            }
            tracing::info!("attempt {} did its work", call);
            Ok::<(), RecoverError>(())
        }
    };

    let supervisor =
        Supervisor::new(args.label, action).with_policy(RestartPolicy::from_config(settings));
    let handle = supervisor.spawn();

    let end = tokio::select! {
        end = handle.join() => end,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("🛑 Interrupted");
            return Ok(());
        }
    };

    match end {
        SupervisionEnd::Completed { restarts } => {
            println!("✅ finished after {} restart(s)", restarts);
            Ok(())
        }
        SupervisionEnd::Failed { error, .. } => Err(error.into()),
        SupervisionEnd::GaveUp { restarts, last } => {
            bail!("gave up after {} restart(s), last fault: {}", restarts, last)
        }
        SupervisionEnd::Aborted { restarts } => bail!("aborted after {} restart(s)", restarts),
    }
}

fn run_unwind(args: UnwindArgs) -> anyhow::Result<()> {
    let idiomatic = unwind::search(args.depth, args.value);
    tracing::info!("escape via Result: {:?}", idiomatic);

    let raise = move || match args.payload {
        PayloadKind::Int => unwind::unwind_from_depth(args.depth, args.value),
        PayloadKind::Text => unwind::unwind_from_depth(args.depth, args.value.to_string()),
    };

    let value = if args.lenient {
        unwind::recover_as_or_default::<i64, _>(raise)
    } else {
        unwind::recover_as::<i64, _>(raise)
            .context("recovering the unwound value")?
            .unwrap_or_default()
    };

    println!("{}", value);
    Ok(())
}

fn run_batch(args: BatchArgs) -> anyhow::Result<()> {
    let report = batch::run_batch(args.mode, &args.inputs);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &report.error {
            None => println!("✅ {} step(s) ok", report.steps_run),
            Some(e) => println!("❌ step {} failed: {}", report.steps_run, e),
        }
    }

    if report.succeeded() {
        Ok(())
    } else {
        std::process::exit(2);
    }
}
