//! Command line front end.
//!
//! ```bash
//! # Relations only, columns named source/target
//! csv2graph convert --edges relations.csv
//!
//! # Semicolon files with a nodes table, written as GraphML
//! csv2graph convert --edges rel.csv --nodes people.csv -d semicolon -f graphml -o people.graphml
//!
//! # See which columns would be picked
//! csv2graph columns rel.csv
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use csv2graph::{
    convert, AttributeSelection, ColumnOptions, ConversionRequest, ConvertError, DanglingPolicy,
    Delimiter, Format, Role, Selections, Table, TableKind,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csv2graph")]
#[command(about = "Make GEXF or GraphML files from CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a relations file (and optional nodes file) to a graph document
    Convert(ConvertArgs),

    /// Show the normalized columns of a file and the preselected roles
    Columns {
        /// Input file
        input: PathBuf,

        /// Treat the file as a nodes file
        #[arg(long)]
        nodes: bool,

        /// Separator: comma, semicolon, tab or a single character
        #[arg(short, long, default_value = "comma")]
        delimiter: Delimiter,

        /// Print the options as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// File with relations, one edge per row
    #[arg(short, long)]
    edges: Option<PathBuf>,

    /// File with nodes, one node per row
    #[arg(short, long)]
    nodes: Option<PathBuf>,

    /// Separator: comma, semicolon, tab or a single character
    #[arg(short, long, default_value = "comma")]
    delimiter: Delimiter,

    /// Source column in the relations file
    #[arg(long)]
    source: Option<String>,

    /// Target column in the relations file
    #[arg(long)]
    target: Option<String>,

    /// Label column in the nodes file
    #[arg(long)]
    label: Option<String>,

    /// Relation column to include as edge attribute (repeatable; default: all)
    #[arg(long = "attr")]
    attrs: Vec<String>,

    /// Include no edge attributes
    #[arg(long, conflicts_with = "attrs")]
    no_attrs: bool,

    /// Output format
    #[arg(short, long, default_value = "gexf")]
    format: Format,

    /// Output file, `-` for stdout (default: output.gexf / output.graphml)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fail when a relation points at a node missing from the nodes file
    #[arg(long)]
    strict_nodes: bool,

    /// JSON file with saved column selections; flags take precedence
    #[arg(long)]
    selections: Option<PathBuf>,

    /// Print errors as JSON on stderr
    #[arg(long)]
    json_errors: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let json_errors = matches!(&cli.command, Commands::Convert(args) if args.json_errors);

    let result = match cli.command {
        Commands::Convert(args) => cmd_convert(args),
        Commands::Columns {
            input,
            nodes,
            delimiter,
            json,
        } => cmd_columns(&input, nodes, delimiter, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<ConvertError>() {
                Some(convert_err) if json_errors => {
                    let report = serde_json::to_string(&convert_err.report())
                        .unwrap_or_else(|_| format!("{{\"message\":{:?}}}", convert_err.to_string()));
                    eprintln!("{report}");
                }
                _ => eprintln!("Error: {err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn read_input(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_selections(args: &ConvertArgs) -> Result<Selections> {
    let mut selections = match &args.selections {
        Some(path) => {
            let raw = read_input(path)?;
            serde_json::from_slice(&raw)
                .with_context(|| format!("Failed to parse selections {}", path.display()))?
        }
        None => Selections::default(),
    };

    if args.source.is_some() {
        selections.source = args.source.clone();
    }
    if args.target.is_some() {
        selections.target = args.target.clone();
    }
    if args.label.is_some() {
        selections.label = args.label.clone();
    }
    if args.no_attrs {
        selections.attributes = AttributeSelection::Only(Vec::new());
    } else if !args.attrs.is_empty() {
        selections.attributes = AttributeSelection::Only(args.attrs.clone());
    }

    Ok(selections)
}

fn cmd_convert(args: ConvertArgs) -> Result<()> {
    let request = ConversionRequest {
        edges: args.edges.as_deref().map(read_input).transpose()?,
        nodes: args.nodes.as_deref().map(read_input).transpose()?,
        delimiter: args.delimiter,
        selections: load_selections(&args)?,
        format: args.format,
        dangling: if args.strict_nodes {
            DanglingPolicy::Reject
        } else {
            DanglingPolicy::Create
        },
    };

    let output = convert(&request)?;

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(output.file_name));
    if path.as_os_str() == "-" {
        io::stdout()
            .write_all(output.body.as_bytes())
            .context("Failed to write to stdout")?;
        return Ok(());
    }

    fs::write(&path, &output.body)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "Wrote {} nodes and {} edges to {}",
        output.node_count,
        output.edge_count,
        path.display()
    );
    Ok(())
}

fn cmd_columns(input: &Path, nodes: bool, delimiter: Delimiter, json: bool) -> Result<()> {
    let (kind, roles): (TableKind, &[Role]) = if nodes {
        (TableKind::Nodes, &[Role::Label])
    } else {
        (TableKind::Edges, &[Role::Source, Role::Target])
    };

    let table = Table::load(kind, &read_input(input)?, delimiter)?;
    let options: Vec<_> = roles
        .iter()
        .map(|role| ColumnOptions::for_role(*role, table.columns()))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    println!("Columns: {}", table.columns().join(", "));
    println!("Rows:    {}", table.row_count());
    for opts in &options {
        match opts.default_choice().as_deref() {
            Some(column) => println!("{}: {}", opts.role, column),
            None => println!("{}: (none, choose one with --{})", opts.role, opts.role),
        }
    }
    Ok(())
}
