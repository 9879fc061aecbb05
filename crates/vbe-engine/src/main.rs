use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::io::Read;
use std::path::Path;
use tracing_subscriber::EnvFilter;
use vbe_engine::{EngineConfig, VariableEngine};
use vbe_snapshot::{NodeId, TreeNode, VariableTree};
use vbe_store::ScopedState;

fn tree_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("tree")
            .long("tree")
            .required(true)
            .help("JSON file holding an array of tree nodes"),
    )
    .arg(
        Arg::new("node")
            .long("node")
            .required(true)
            .help("Target node id"),
    )
}

fn cli() -> Command {
    Command::new("vbe")
        .version(vbe_engine::VERSION)
        .about("Branch-aware variable state for tree-shaped conversations")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("TOML engine configuration"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply generated text to a state and print the cleaned text")
                .arg(
                    Arg::new("state")
                        .long("state")
                        .help("JSON file with the starting scoped state"),
                )
                .arg(
                    Arg::new("text")
                        .long("text")
                        .help("File with generated text (stdin if omitted)"),
                ),
        )
        .subcommand(tree_args(
            Command::new("restore").about("Reconstruct the variable state of a node"),
        ))
        .subcommand(tree_args(
            Command::new("validate").about("Check the snapshot chain leading to a node"),
        ))
        .subcommand(tree_args(
            Command::new("stats").about("Storage statistics for the path to a node"),
        ))
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn read_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {path}"))
}

fn load_engine(matches: &ArgMatches) -> Result<VariableEngine> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => EngineConfig::from_file(Path::new(path))?,
        None => EngineConfig::default(),
    };
    Ok(VariableEngine::new(config)?)
}

fn load_tree(args: &ArgMatches) -> Result<(VariableTree, NodeId)> {
    let path = args
        .get_one::<String>("tree")
        .context("--tree is required")?;
    let nodes: Vec<TreeNode> =
        serde_json::from_str(&read_file(path)?).with_context(|| format!("parsing {path}"))?;
    let tree = VariableTree::from_nodes(nodes)?;
    let node = args
        .get_one::<String>("node")
        .context("--node is required")?;
    Ok((tree, NodeId::from(node.as_str())))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(matches: &ArgMatches) -> Result<bool> {
    let mut engine = load_engine(matches)?;

    match matches.subcommand() {
        Some(("apply", args)) => {
            if let Some(path) = args.get_one::<String>("state") {
                let state: ScopedState = serde_json::from_str(&read_file(path)?)
                    .with_context(|| format!("parsing {path}"))?;
                engine.store_mut().load_snapshot(state);
            }
            let text = match args.get_one::<String>("text") {
                Some(path) => read_file(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };

            let outcome = engine.apply_generated_text(&text);
            println!("{}", outcome.text);
            println!();
            print_json(&serde_json::json!({
                "state": engine.export_current_state(),
                "applied": outcome.applied,
                "initialized": outcome.initialized,
                "warnings": outcome.warnings,
                "skipped": outcome
                    .skipped
                    .iter()
                    .map(|s| format!("[{}] {}: {}", s.dialect, s.excerpt, s.error))
                    .collect::<Vec<_>>(),
            }))?;
            Ok(true)
        }
        Some(("restore", args)) => {
            let (tree, node) = load_tree(args)?;
            let summary = engine.switch_to(&tree, &node)?;
            print_json(&serde_json::json!({
                "summary": summary,
                "state": engine.export_current_state(),
            }))?;
            Ok(!summary.broken_chain)
        }
        Some(("validate", args)) => {
            let (tree, node) = load_tree(args)?;
            let validation = engine.validate_variable_state(&tree.path_to(&node)?);
            print_json(&validation)?;
            Ok(validation.is_valid)
        }
        Some(("stats", args)) => {
            let (tree, node) = load_tree(args)?;
            print_json(&engine.get_storage_statistics(&tree.path_to(&node)?))?;
            Ok(true)
        }
        _ => Ok(true),
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json"))?;

    let ok = run(&matches)?;
    std::process::exit(if ok { 0 } else { 1 });
}
