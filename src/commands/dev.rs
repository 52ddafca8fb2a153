use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::commands::{cancel_on_signal, Project};
use crate::docker::DockerApi;
use crate::environment::health::{wait_healthy, HealthChecker, HealthPolicy, HealthReport, HttpChecker};
use crate::environment::Environment;
use crate::hasura::cli::HasuraCli;
use crate::hasura::seed::SeedPlan;
use crate::hasura::{HasuraClient, SeedApplier};
use crate::layout::LinkedProject;
use crate::ports::{check_startup_ports, format_port_conflicts};
use crate::process::{ProcessRunner, TokioProcessRunner};
use crate::proxy::{self, RouteTable};
use crate::ui::summary::print_routes;
use crate::watcher::GitWatcher;

/// Where migrations, metadata and seeds are sent.
#[derive(Debug, Clone)]
struct HasuraTarget {
    endpoint: String,
    admin_secret: String,
}

pub struct DevOptions {
    pub port: Option<u16>,
    pub linked: bool,
    pub no_seed: bool,
}

pub async fn run(config_file: Option<&Path>, opts: DevOptions) -> Result<()> {
    let project = Project::load(config_file)?;
    let proxy_port = opts.port.unwrap_or(project.config.project.proxy_port);

    let mut env = project.environment().await?;
    let cancel = env.cancel_token();
    cancel_on_signal(cancel.clone());

    let result = run_until_cancelled(&mut env, &project, &opts, proxy_port, &cancel).await;

    // The single cleanup path, whatever ended the session.
    cancel.cancel();
    match env.shutdown(false).await {
        Ok(report) => {
            for (service, err) in &report.failed {
                warn!(service = %service, error = %err, "container left running");
            }
            info!(stopped = report.stopped.len(), "environment stopped");
        }
        Err(e) => warn!(error = %format!("{e:#}"), "shutdown failed"),
    }

    result
}

async fn run_until_cancelled(
    env: &mut Environment,
    project: &Project,
    opts: &DevOptions,
    proxy_port: u16,
    cancel: &CancellationToken,
) -> Result<()> {
    let conflicts = check_startup_ports(&env.services, proxy_port);
    if !conflicts.is_empty() {
        bail!("{}", format_port_conflicts(&conflicts));
    }
    let listener = proxy::bind(proxy_port).await?;

    let policy = HealthPolicy::default();
    let checker = Arc::new(HttpChecker::new(policy.request_timeout)?);
    let runner = TokioProcessRunner;

    let provisioned = tokio::select! {
        res = provision(env, project, opts, checker, policy, &runner) => Some(res),
        _ = cancel.cancelled() => None,
    };
    let Provisioned {
        health,
        target,
        seed_plan,
    } = match provisioned {
        Some(res) => res?,
        None => {
            info!("interrupted during startup");
            return Ok(());
        }
    };

    if let Some(target) = &target {
        spawn_git_watcher(project, target.clone(), cancel.clone());
    }

    let routes = RouteTable::from_services(&env.services);
    print_routes(&project.config.project.name, &routes, proxy_port, Some(&health));
    let server = tokio::spawn(proxy::serve(listener, routes, cancel.clone()));

    if let (Some(target), SeedPlan::Seed) = (&target, seed_plan) {
        let database = &project.config.hasura.database;
        match HasuraClient::new(&target.endpoint, &target.admin_secret, database) {
            Ok(client) => seed(project, seed_plan, &client).await,
            Err(e) => warn!(error = %format!("{e:#}"), "seeding skipped"),
        }
    }

    server.await.context("proxy task panicked")??;
    Ok(())
}

/// The result of bringing the environment up, short of serving it.
struct Provisioned {
    health: HealthReport,
    target: Option<HasuraTarget>,
    seed_plan: SeedPlan,
}

/// Sample the seed plan, start everything, wait for health, then apply
/// migrations and metadata. Any failure is fatal.
async fn provision<D, P, R>(
    env: &mut Environment<D>,
    project: &Project,
    opts: &DevOptions,
    checker: Arc<P>,
    policy: HealthPolicy,
    runner: &R,
) -> Result<Provisioned>
where
    D: DockerApi,
    P: HealthChecker,
    R: ProcessRunner,
{
    // Must happen before any container starts: the database creates the marker.
    let seed_plan = SeedPlan::sample(
        &project.layout,
        &project.config.project.first_run_marker,
        opts.no_seed,
    );

    let health = start(env, project, checker, policy).await?;

    let target = hasura_target(env, project, opts.linked)?;
    match &target {
        Some(target) => {
            let hasura = &project.config.hasura;
            HasuraCli::new(runner, &hasura.cli, &hasura.database, &project.layout)
                .apply_migrations_and_metadata(&target.endpoint, &target.admin_secret)
                .await?;
        }
        None => {
            warn!(service = %project.config.hasura.service, "hasura is not available, skipping migrations")
        }
    }

    Ok(Provisioned {
        health,
        target,
        seed_plan,
    })
}

/// Images, network, containers, then health.
async fn start<D: DockerApi, P: HealthChecker>(
    env: &mut Environment<D>,
    project: &Project,
    checker: Arc<P>,
    policy: HealthPolicy,
) -> Result<HealthReport> {
    let failures = env.prepare_images().await?;
    for failure in &failures {
        error!("{}", failure);
    }
    if !failures.is_empty() {
        print_pull_guidance(&failures);
        if project.config.project.strict_images {
            bail!("{} image(s) could not be pulled", failures.len());
        }
    }

    env.prepare_network().await?;
    env.run_all().await?;

    let report = wait_healthy(&env.services, checker, policy, &env.cancel_token()).await;
    let failed = report.failures();
    if !failed.is_empty() {
        let names: Vec<String> = failed.iter().map(|f| f.to_string()).collect();
        bail!("health checks failed:\n  - {}", names.join("\n  - "));
    }
    Ok(report)
}

fn print_pull_guidance(failures: &[crate::error::EnvError]) {
    eprintln!();
    eprintln!("  {}", "Some images could not be pulled. Pull them manually:".yellow());
    for failure in failures {
        if let crate::error::EnvError::ImagePull { image, .. } = failure {
            eprintln!("    docker image pull {}", image);
        }
    }
    eprintln!();
}

fn hasura_target<D: DockerApi>(
    env: &Environment<D>,
    project: &Project,
    linked: bool,
) -> Result<Option<HasuraTarget>> {
    let hasura = &project.config.hasura;

    if linked {
        let linked = LinkedProject::load(&project.layout.linked_project_path())?;
        return Ok(Some(HasuraTarget {
            endpoint: linked.hasura_endpoint(),
            admin_secret: linked.admin_secret,
        }));
    }

    let service = env.services.get(&hasura.service);
    let admin_secret = hasura
        .admin_secret
        .clone()
        .or_else(|| service.and_then(|s| s.admin_secret.clone()))
        .unwrap_or_default();

    if let Some(endpoint) = &hasura.endpoint {
        return Ok(Some(HasuraTarget {
            endpoint: endpoint.clone(),
            admin_secret,
        }));
    }

    Ok(service
        .and_then(|s| s.address())
        .map(|address| HasuraTarget {
            endpoint: format!("http://{}", address),
            admin_secret,
        }))
}

/// Seeding problems are logged; they never end the session.
async fn seed<A: SeedApplier>(project: &Project, plan: SeedPlan, applier: &A) {
    let dir = project.layout.seeds_dir(&project.config.hasura.database);
    match plan.run(&dir, applier).await {
        Ok(Some(report)) if !report.failed.is_empty() => {
            warn!(failed = report.failed.len(), "some seeds were not applied")
        }
        Ok(_) => {}
        Err(e) => warn!(error = %format!("{e:#}"), "seeding failed"),
    }
}

/// Re-apply migrations and metadata whenever the checked-out branch or
/// its remote ref changes.
fn spawn_git_watcher(project: &Project, target: HasuraTarget, cancel: CancellationToken) {
    let git_dir = project.layout.git_dir();
    if !git_dir.is_dir() {
        return;
    }
    let mut watch = match GitWatcher::new(&git_dir).watch() {
        Ok(watch) => watch,
        Err(e) => {
            warn!(error = %e, "cannot watch git directory");
            return;
        }
    };

    let layout = project.layout.clone();
    let cli = project.config.hasura.cli.clone();
    let database = project.config.hasura.database.clone();
    tokio::spawn(async move {
        let runner = TokioProcessRunner;
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => break,
                event = watch.events.recv() => event,
            };
            let Some(event) = event else { break };

            info!(event = ?event, "git change, re-applying migrations");
            let hasura = HasuraCli::new(&runner, &cli, &database, &layout);
            if let Err(e) = hasura
                .apply_migrations_and_metadata(&target.endpoint, &target.admin_secret)
                .await
            {
                warn!(error = %format!("{e:#}"), "failed to re-apply migrations");
            }
        }
    });
}
