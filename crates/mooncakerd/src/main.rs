use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use taskvisor::{ControllerConfig, Subscribe, SupervisorConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mooncaker_api::{AdminCredentials, AdminService, HttpApi, serve};
use mooncaker_core::{
    Console, GuardedSink, KeyBroker, KeyQueue, KeySink, KeySource, KeyStore, LogNotifier,
    NotifierHandle, WorkerPolicy, WorkerSupervisor,
};
use mooncaker_notify::MailNotifier;
use mooncaker_observe::{Subscriber, init_logger};
use mooncaker_workers::{HttpCrawlJob, TelegramTransport, bot_task, crawler_task, relay_task};

mod config;
use config::{Args, Config};

/// How long workers get to stop after shutdown was requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) configuration: fatal before anything is served
    let args = Args::parse();
    let cfg = Config::load(&args)
        .with_context(|| format!("cannot start with '{}'", args.config.display()))?;
    if args.check {
        println!("configuration '{}' is valid", args.config.display());
        return Ok(());
    }

    // 2) logger
    let _log_guard = init_logger(&cfg.logger)?;
    info!(config = %args.config.display(), "logger initialized");

    // 3) key handoff and notifications
    let store = match cfg.crawler.initial_key.clone() {
        Some(key) => KeyStore::with_key(key),
        None => KeyStore::new(),
    };
    let notifier: NotifierHandle = if cfg.mail.enabled {
        Arc::new(MailNotifier::new(&cfg.mail.mail_config())?)
    } else {
        warn!("mail is disabled; operator notices are only logged");
        Arc::new(LogNotifier)
    };
    let console = Console::new(Arc::new(store.clone())).with_log_file(cfg.logger.file.clone());
    let queue = Arc::new(KeyQueue::new());

    // 4) workers
    let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Subscriber)];
    let workers = WorkerSupervisor::new(
        SupervisorConfig::default(),
        ControllerConfig::default(),
        subscribers,
    )
    .await?;
    let policy = WorkerPolicy::default();

    if cfg.crawler.enabled {
        let job = HttpCrawlJob::from_config(&cfg.crawler)?;
        let source: Arc<dyn KeySource> = Arc::new(store.clone());
        let broker = KeyBroker::new(source, Arc::clone(&notifier), cfg.mail.recipients.clone())
            .with_wait_timeout(cfg.crawler.key_wait_timeout);
        let task = crawler_task(
            Arc::new(job),
            broker,
            cfg.crawler.initial_key.clone(),
            cfg.crawler.interval,
        );
        workers.submit(task, &policy).await?;
        info!(url = %cfg.crawler.url, "crawler submitted");
    }

    if cfg.bot.enabled {
        let transport = TelegramTransport::from_config(&cfg.bot)?;
        let guard = GuardedSink::new(Arc::new(queue.sender()), cfg.bot.allow_list.clone())
            .observing(Arc::new(store.clone()));
        workers
            .submit(bot_task(Arc::new(transport), console.clone(), guard), &policy)
            .await?;

        let sink: Arc<dyn KeySink> = Arc::new(store.clone());
        workers
            .submit(relay_task(Arc::clone(&queue), sink), &policy)
            .await?;
        info!(allowed = cfg.bot.allow_list.len(), "chat bot submitted");
    }

    // 5) admin api
    let cancel = CancellationToken::new();
    let credentials = AdminCredentials::new(&cfg.admin)?;
    let service = AdminService::new(
        &cfg.http,
        credentials,
        console,
        Arc::clone(&notifier),
        cfg.mail.recipients.clone(),
    );
    let router = HttpApi::new(Arc::new(service)).router();
    let mut server = tokio::spawn(serve(router, cfg.http.bind, cancel.clone()));

    // 6) shutdown
    let early_exit = tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for shutdown signal")?;
            info!("shutdown signal received");
            None
        }
        res = &mut server => Some(res),
    };
    cancel.cancel();
    store.close();
    queue.close();

    let served = match early_exit {
        Some(res) => res,
        None => server.await,
    };
    let result = match served {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, "admin api failed");
            Err(anyhow::Error::new(e).context("admin api failed"))
        }
        Err(e) => {
            error!(error = %e, "admin api task panicked");
            Err(anyhow::anyhow!("admin api task panicked: {e}"))
        }
    };

    workers.join(SHUTDOWN_GRACE).await;
    info!("mooncaker stopped");
    result
}
