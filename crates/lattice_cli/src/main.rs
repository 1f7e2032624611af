//! `lattice` command line tool.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lattice_props::{PrimeProduct, PropertySet};
use lattice_style::{JsonFileStore, ResolutionCache};
use lattice_topology::{ClassRegistry, Content, Document, ParseResult, Tree};
use lattice_wire::{ErrorCorrection, Packager, PackagerConfig, capacity};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lattice")]
#[command(version, about = "Pack topology documents into compact payloads", long_about = None)]
struct Cli {
    /// Packager config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a source file into a payload
    Pack {
        /// Source file, or `-` for stdin
        source: PathBuf,

        /// Write the payload bytes here instead of printing a URL fragment
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode a payload file or base64url fragment back into source
    Unpack { payload: String },

    /// Print the parsed trees, slots and warnings
    Inspect {
        /// Source file, or `-` for stdin
        source: PathBuf,
    },

    /// Print the resolution for a prime product or `axis:value,...` list
    Resolve { product: String },

    /// Show payload sizes and the symbol needed at each correction level
    Estimate {
        /// Source file, or `-` for stdin
        source: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let config = match &cli.config {
        Some(path) => PackagerConfig::load_from(path)?,
        None => PackagerConfig::default(),
    };

    match cli.command {
        Command::Pack { source, output } => pack(config, &source, output.as_deref()),
        Command::Unpack { payload } => unpack(config, &payload),
        Command::Inspect { source } => inspect(&source),
        Command::Resolve { product } => resolve(&config, &product),
        Command::Estimate { source } => estimate(config, &source),
    }
}

fn read_source(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("Failed to read source from stdin")?;
        return Ok(source);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read source from {}", path.display()))
}

fn pack(config: PackagerConfig, source: &Path, output: Option<&Path>) -> Result<()> {
    let source = read_source(source)?;
    let packager = Packager::new(config);
    let package = smol::block_on(packager.pack(&source))?;

    for warning in &package.warnings {
        eprintln!("warning: {warning}");
    }
    match package.estimate {
        Some(estimate) => eprintln!(
            "{} bytes ({} before compression), version {} at level {}",
            package.payload.len(),
            package.binary_len,
            estimate.version,
            estimate.level
        ),
        None => eprintln!(
            "{} bytes does not fit any symbol at level {}",
            package.payload.len(),
            packager.config().error_correction
        ),
    }

    match output {
        Some(path) => std::fs::write(path, &package.payload)
            .with_context(|| format!("Failed to write payload to {}", path.display()))?,
        None => println!("{}", package.to_url_fragment()),
    }
    Ok(())
}

fn unpack(config: PackagerConfig, payload: &str) -> Result<()> {
    let packager = Packager::new(config);
    let path = Path::new(payload);
    let document = if path.is_file() {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read payload from {}", path.display()))?;
        smol::block_on(packager.unpack(&bytes))?
    } else {
        smol::block_on(packager.unpack_fragment(payload))?
    };
    print!("{}", document.to_source());
    std::io::stdout().flush()?;
    Ok(())
}

fn inspect(source: &Path) -> Result<()> {
    let ParseResult { document, warnings } = lattice_topology::parse(&read_source(source)?);
    print!("{}", describe(&document));
    for warning in &warnings {
        println!("warning: {warning}");
    }
    Ok(())
}

/// Human readable listing of every tree in `document`.
fn describe(document: &Document) -> String {
    let mut out = String::new();
    for (name, value) in &document.directives {
        out.push_str(&format!("@{name} {value}\n"));
    }
    describe_tree(&mut out, "main", &document.tree);
    for (name, view) in &document.views {
        describe_tree(&mut out, name, view);
    }
    out
}

fn describe_tree(out: &mut String, name: &str, tree: &Tree) {
    let registry = ClassRegistry::standard();
    let slots = tree.slot_counts;
    out.push_str(&format!(
        "[{name}] {} nodes, depth {}, slots owner={} user={} computed={}\n",
        tree.len(),
        tree.depth(),
        slots.owner,
        slots.user,
        slots.computed
    ));
    for (_, node) in tree.walk() {
        let properties = node.properties(registry);
        out.push_str(&format!(
            "{:indent$}{} #{} {{{properties}}}",
            "",
            node.class_path,
            node.prime(registry),
            indent = (node.depth + 1) * 2
        ));
        if let Some(action) = &node.action {
            out.push_str(&format!(" act={action}"));
        }
        match &node.content {
            Content::None => {}
            Content::Texture => out.push_str(" ~"),
            Content::Text(text) => out.push_str(&format!(" {text:?}")),
            Content::Fields(fields) => out.push_str(&format!(" fields={fields:?}")),
            Content::Grid(grid) => {
                out.push_str(&format!(" columns={:?} rows={:?}", grid.columns, grid.rows))
            }
            Content::Bound(variables) => {
                for variable in variables {
                    out.push_str(&format!(" {}[{}]", variable.binding.sigil(), variable.slot));
                    if let Some((owner, user)) = variable.derived_from {
                        out.push_str(&format!("=o{owner}*u{user}"));
                    }
                }
            }
        }
        out.push('\n');
    }
}

/// A decimal product or a textual property list.
fn parse_product(input: &str) -> Result<PrimeProduct> {
    let input = input.trim();
    if input.chars().all(|c| c.is_ascii_digit()) {
        return input
            .parse()
            .with_context(|| format!("'{input}' is not a valid product"));
    }
    let properties: PropertySet = input
        .parse()
        .with_context(|| format!("'{input}' is neither a product nor a property list"))?;
    Ok(lattice_props::encode(&properties))
}

fn resolve(config: &PackagerConfig, product: &str) -> Result<()> {
    let product = parse_product(product)?;
    let cache = match &config.cache_path {
        Some(path) => ResolutionCache::with_store(Arc::new(JsonFileStore::new(path.clone()))),
        None => ResolutionCache::new(),
    };
    let resolution = cache
        .resolve(product)
        .with_context(|| format!("Failed to resolve product {product}"))?;
    println!("{}", serde_json::to_string_pretty(&*resolution)?);
    smol::block_on(cache.flush());
    let stats = cache.stats();
    log::debug!("cache hits={} misses={} entries={}", stats.hits, stats.misses, stats.entries);
    Ok(())
}

fn estimate(config: PackagerConfig, source: &Path) -> Result<()> {
    let source = read_source(source)?;
    let raw = Packager::new(PackagerConfig {
        compress: false,
        ..config.clone()
    });
    let gzip = Packager::new(PackagerConfig {
        compress: true,
        ..config
    });
    let raw = smol::block_on(raw.pack(&source))?;
    let gzip = smol::block_on(gzip.pack(&source))?;

    let best = gzip.payload.len().min(raw.payload.len());
    println!("binary  {} bytes", raw.payload.len());
    println!("framed  {} bytes", gzip.payload.len());
    println!("url     {} chars", capacity::base64url_len(best));
    for level in ErrorCorrection::ALL {
        match capacity::estimate(best, level) {
            Some(estimate) => println!(
                "{level}  version {:>2}, {} of {} bytes free",
                estimate.version, estimate.headroom, estimate.capacity
            ),
            None => println!(
                "{level}  too large (max {} bytes)",
                capacity::max_capacity(level)
            ),
        }
    }
    Ok(())
}
