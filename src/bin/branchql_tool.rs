use std::fs;
use std::process::ExitCode;

use branchql::spec::TableSpec;
use clap::Parser;

/// branchql-tool — compile a spec file and print the SQL it plans, without
/// touching a database.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a spec DSL file.
    spec_path: String,

    /// Also print each group's join order and computed output paths.
    #[arg(long)]
    explain_joins: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let source = match fs::read_to_string(&cli.spec_path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("failed to read {}: {e}", cli.spec_path);
            return ExitCode::FAILURE;
        }
    };

    let compiled = match branchql::compile(&source) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("failed to compile spec: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("\nbranchql-tool v{}\n", env!("CARGO_PKG_VERSION"));
    print_group(&compiled.grouped, cli.explain_joins);

    ExitCode::SUCCESS
}

/// Prints the planned SQL for `group`'s own query, then recurses into each
/// many-valued relationship's target as its own independent query group.
fn print_group(group: &TableSpec, explain_joins: bool) {
    println!("-- query group: {}", group.name);
    match branchql::planner::group_select(group) {
        Ok(query) => println!("{}\n", query.sql),
        Err(e) => {
            eprintln!("failed to plan {}: {e}", group.name);
            return;
        }
    }

    if explain_joins {
        match branchql::planner::order_joins(group) {
            Ok(order) => {
                for rel in &order {
                    let path = rel
                        .path
                        .as_ref()
                        .map(|p| p.join("."))
                        .unwrap_or_else(|| "<flattened>".into());
                    println!(
                        "   join order: {} -> {} (path: {})",
                        rel.source_table, rel.target.name, path
                    );
                }
            }
            Err(e) => eprintln!("failed to order joins for {}: {e}", group.name),
        }
        println!();
    }

    for rel in &group.relationships.many {
        print_group(&rel.target, explain_joins);
    }
}
