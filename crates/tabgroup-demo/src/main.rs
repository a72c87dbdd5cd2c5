//! Tab group demo host
//!
//! Drives the engine over in-memory form views: a scripted booking flow, a
//! dump of tab header affordances, and the effective manifest.

mod logging;
mod source;
mod views;

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde_json::json;
use std::path::PathBuf;
use tabgroup_core::{
    SaveAllOutcome, SaveMode, TabGroup, TabGroupEvent, TabManifest, TabStatus,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::logging::{init_logging, LogConfig, LogFormat};
use crate::source::load_manifest;
use crate::views::{booking_registry, FormStore};

fn cli() -> Command {
    Command::new("tabgroup-demo")
        .version(tabgroup_core::VERSION)
        .about("Tab group engine demo over a loan booking screen")
        .subcommand_required(true)
        .arg(
            Arg::new("manifest")
                .long("manifest")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Manifest file (.yaml, .toml or .json); defaults to the bundled booking screen"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Increase log verbosity (-v info, -vv debug, -vvv trace)"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("compact")
                .value_parser(["compact", "json"])
                .help("Log output format"),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the scripted booking flow and print engine events")
                .arg(
                    Arg::new("save-mode")
                        .long("save-mode")
                        .value_parser(["parent", "internal"])
                        .help("Override the manifest's save mode"),
                )
                .arg(
                    Arg::new("timeout-ms")
                        .long("timeout-ms")
                        .value_parser(value_parser!(u64))
                        .help("Override the per-tab auto-load timeout"),
                )
                .arg(
                    Arg::new("concurrency")
                        .long("concurrency")
                        .value_parser(value_parser!(usize))
                        .help("Override the auto-load concurrency limit"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print every tab's status and header affordance")
                .arg(
                    Arg::new("settle")
                        .long("settle")
                        .action(ArgAction::SetTrue)
                        .help("Run background loads before inspecting"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(Command::new("manifest").about("Print the effective manifest as JSON"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let verbosity = matches.get_count("verbose");
    let format = matches
        .get_one::<String>("log-format")
        .and_then(|name| LogFormat::parse(name))
        .unwrap_or_default();
    init_logging(&LogConfig::from_verbosity(verbosity).with_format(format))?;

    let manifest = load_manifest(matches.get_one::<PathBuf>("manifest").map(PathBuf::as_path))?;

    match matches.subcommand() {
        Some(("simulate", args)) => simulate(manifest, args).await,
        Some(("inspect", args)) => inspect(manifest, args).await,
        Some(("manifest", _)) => {
            println!("{}", serde_json::to_string_pretty(&manifest)?);
            Ok(())
        }
        Some((other, _)) => anyhow::bail!("unknown subcommand '{other}'"),
        None => anyhow::bail!("a subcommand is required"),
    }
}

/// Resolve the manifest and initialize a group, printing events as they arrive
async fn build_group(
    manifest: TabManifest,
    store: &FormStore,
) -> anyhow::Result<(TabGroup, JoinHandle<()>)> {
    let (config, tabs) = manifest.resolve(&booking_registry(store))?;
    let mut group = TabGroup::new(config);
    let printer = tokio::spawn(print_events(group.subscribe()));
    group.set_tabs(tabs).await?;
    Ok((group, printer))
}

async fn print_events(mut events: mpsc::UnboundedReceiver<TabGroupEvent>) {
    while let Some(event) = events.recv().await {
        match serde_json::to_string(&event) {
            Ok(line) => println!("  event {line}"),
            Err(err) => tracing::warn!(error = %err, "unprintable event"),
        }
    }
}

fn tab_index(group: &TabGroup, id: &str) -> anyhow::Result<usize> {
    group
        .index_of(id)
        .with_context(|| format!("manifest has no '{id}' tab"))
}

async fn simulate(mut manifest: TabManifest, args: &ArgMatches) -> anyhow::Result<()> {
    match args.get_one::<String>("save-mode").map(String::as_str) {
        Some("parent") => manifest.group.save_mode = SaveMode::Parent,
        Some("internal") => manifest.group.save_mode = SaveMode::Internal,
        _ => {}
    }
    if let Some(&timeout_ms) = args.get_one::<u64>("timeout-ms") {
        manifest.group.auto_load_timeout_ms = timeout_ms;
    }
    if let Some(&concurrency) = args.get_one::<usize>("concurrency") {
        manifest.group.auto_load_concurrency = concurrency;
    }
    manifest.group.validate()?;

    let store = FormStore::new();
    let (mut group, printer) = build_group(manifest, &store).await?;
    println!("Running booking flow ({:?} save mode)", group.config().save_mode);

    let customer = tab_index(&group, "customer")?;
    let loan = tab_index(&group, "loan")?;
    let documents = tab_index(&group, "documents")?;

    println!("> settle background loads");
    let loaded = group.settle().await;
    println!("  {loaded} tabs loaded in the background");

    println!("> fill customer name only");
    store.edit("customer", "name", json!("Ada Lovelace"))?;
    println!("  switch to loan: {:?}", group.select(loan).await?);

    println!("> complete and save customer");
    store.edit("customer", "email", json!("ada@example.com"))?;
    println!("  saved: {}", group.save_tab(customer).await?);
    println!("  switch to loan: {:?}", group.select(loan).await?);

    println!("> open documents with an empty loan");
    println!("  switch to documents: {:?}", group.select(documents).await?);
    println!(
        "  blocked by: {} (documents mounted: {})",
        group.invalid_tab_labels().join(", "),
        store.is_mounted("documents")
    );

    println!("> fill loan and retry");
    store.edit("loan", "amount", json!(25_000))?;
    store.edit("loan", "term-months", json!(36))?;
    println!("  switch to documents: {:?}", group.select(documents).await?);

    println!("> save all");
    let outcome = group.save_all().await?;
    let summary = match &outcome {
        SaveAllOutcome::Aggregated(payload) => {
            format!("payload {}", serde_json::to_string_pretty(&payload.to_json())?)
        }
        SaveAllOutcome::Saved(ids) => {
            let saved: Vec<String> = ids
                .iter()
                .map(|id| format!("{id} ({} saves)", store.saves(id)))
                .collect();
            format!("saved {}", saved.join(", "))
        }
        SaveAllOutcome::Blocked(block) => {
            format!("blocked on '{}' ({:?})", block.id, block.reason)
        }
    };

    drop(group);
    printer.await?;
    println!("  {summary}");

    if outcome.is_success() {
        Ok(())
    } else {
        anyhow::bail!("save-all did not complete")
    }
}

async fn inspect(manifest: TabManifest, args: &ArgMatches) -> anyhow::Result<()> {
    let store = FormStore::new();
    let (mut group, printer) = build_group(manifest, &store).await?;
    if args.get_flag("settle") {
        group.settle().await;
    }

    let rows: Vec<(String, TabStatus, _)> = (0..group.len())
        .filter_map(|i| {
            let tab = group.tab(i)?;
            Some((tab.id.clone(), group.status(i)?, group.affordance(i)?))
        })
        .collect();
    drop(group);
    printer.await?;

    if args.get_flag("json") {
        let out: Vec<_> = rows
            .iter()
            .map(|(id, status, affordance)| {
                json!({ "id": id, "status": status, "affordance": affordance })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (index, (id, status, affordance)) in rows.iter().enumerate() {
        let marker = if affordance.click_to_load { "*" } else { " " };
        println!(
            "[{index}]{marker} {id:<12} {:<14} loaded={:<5} {}",
            format!("{:?}", affordance.icon),
            status.loaded,
            affordance.tooltip
        );
    }
    Ok(())
}
