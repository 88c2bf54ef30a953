use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use goat::breakpoints::{BreakpointTable, Orientation, Size};
use goat::compiler::{Goat, GoatProps};
use goat::diff::diff_schemas;
use goat::format::Formatter;
use goat::html::{to_html, to_html_pretty};
use goat::i18n::Dictionary;
use goat::node::{Node, Props};
use goat::registry::Registry;
use goat::resolve::resolve_refs;
use goat::schema::{load_schema, parse_breakpoints, SchemaFormat};
use goat::visitor::{walk, SectionFinder};

#[derive(Parser)]
#[command(name = "goat")]
#[command(about = "Compile schema views into HTML", long_about = None)]
#[command(version)]
struct Cli {
    /// Exclude paths matching these patterns (can be used multiple times)
    #[arg(long, global = true, num_args = 0..)]
    exclude: Vec<String>,

    /// Show summary statistics after diff output
    #[arg(long, global = true)]
    summary: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct RenderOptions {
    /// Root name, used as the default managerName
    #[arg(long, default_value = "app")]
    name: String,

    /// JSON/YAML file that `$root/path` references resolve against
    #[arg(long)]
    data: Option<PathBuf>,

    /// JSON/YAML map of section name -> overriding props
    #[arg(long)]
    mutations: Option<PathBuf>,

    /// JSON/YAML dictionaries: {"en": {"key": "text"}, ...}
    #[arg(long)]
    dict: Option<PathBuf>,

    /// Current language for translations and number formats
    #[arg(long, default_value = "en")]
    lang: String,

    /// Language used when a key is missing in the current one
    #[arg(long)]
    fallback_lang: Option<String>,

    /// Mark wrappers and unwrapped sections for visual debugging
    #[arg(long)]
    test: bool,

    /// Viewport width; containers render a loading placeholder without it
    #[arg(long)]
    width: Option<u32>,

    /// Viewport height (defaults to the width)
    #[arg(long)]
    height: Option<u32>,

    /// Section that receives the children given with --child
    #[arg(long)]
    children_in: Option<String>,

    /// Text children appended to the --children-in section
    #[arg(long = "child")]
    children: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render schema files to HTML
    Render {
        /// Schema files or directories (supports multiple paths and glob patterns)
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        options: RenderOptions,

        /// One node per line, indented
        #[arg(long)]
        pretty: bool,
    },

    /// List the sections of schema files
    Inspect {
        /// Schema files or directories (supports multiple paths and glob patterns)
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,

        /// Only sections of this component
        #[arg(short, long)]
        component: Option<String>,
    },

    /// Compare two schemas section by section
    Diff {
        old: PathBuf,
        new: PathBuf,

        /// JSON/YAML file both schemas' references resolve against
        #[arg(long)]
        data: Option<PathBuf>,

        /// Unchanged lines kept around each change
        #[arg(long, default_value_t = 3)]
        context: usize,
    },

    /// Compute the breakpoint for a size
    Breakpoint {
        #[arg(long)]
        width: u32,

        #[arg(long)]
        height: Option<u32>,

        /// Breakpoint table as JSON, e.g. '{"xs":0,"md":768}'
        #[arg(long)]
        table: Option<String>,
    },

    /// List registered components
    Components,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render { paths, options, pretty } => {
            let files = collect_schema_files(&paths, &cli.exclude)?;
            if files.is_empty() {
                anyhow::bail!("No schema files found in the given paths");
            }
            let registry = Registry::with_builtins();
            for file in &files {
                let html = render_file(&registry, file, &options, pretty)?;
                if files.len() > 1 {
                    println!("<!-- {} -->", file.display());
                }
                println!("{html}");
            }
        }

        Commands::Inspect { paths, component } => {
            let files = collect_schema_files(&paths, &cli.exclude)?;
            for file in &files {
                let schema = load_schema(file).with_context(|| format!("Failed to load {}", file.display()))?;
                let mut finder = match &component {
                    Some(component) => SectionFinder::for_component(component.clone()),
                    None => SectionFinder::new(),
                };
                walk(&mut finder, &schema);

                println!("{}:", file.display());
                for found in &finder.matches {
                    let inactive = if found.active { "" } else { " [inactive]" };
                    println!("  {} {} ({}){}", found.path, found.name, found.component, inactive);
                }
            }
        }

        Commands::Diff { old, new, data, context } => {
            let data = load_optional(data.as_ref())?;
            let load = |path: &Path| -> Result<Value> {
                let schema = load_schema(path).with_context(|| format!("Failed to load schema {}", path.display()))?;
                Ok(match &data {
                    Some(data) => resolve_refs(&schema, data),
                    None => schema,
                })
            };
            let diff = diff_schemas(&load(&old)?, &load(&new)?, context);
            if diff.is_empty() {
                println!("No differences");
            } else {
                print!("{}", diff.render(&old.display().to_string(), &new.display().to_string()));
            }
            if cli.summary {
                println!("\n{}", diff.stats());
            }
        }

        Commands::Breakpoint { width, height, table } => {
            let table = match table {
                Some(text) => parse_breakpoints(&text).context("Invalid --table")?,
                None => BreakpointTable::default(),
            };
            let size = Size::new(width, height.unwrap_or(width));
            let breakpoint = table.resolve_or_first(width).unwrap_or("-");
            println!("{} {}", breakpoint, Orientation::from_size(size));
        }

        Commands::Components => {
            let registry = Registry::with_builtins();
            for (kind, name) in registry.entries() {
                let marker = if registry.is_wrapper_excluded(name) { " (no wrapper)" } else { "" };
                println!("{:<12} {}{}", kind.as_str(), name, marker);
            }
        }
    }

    Ok(())
}

fn load_optional(path: Option<&PathBuf>) -> Result<Option<Value>> {
    path.map(|p| load_schema(p).with_context(|| format!("Failed to load {}", p.display())))
        .transpose()
}

/// Compile one schema file with the given options
fn render_file(registry: &Registry, path: &Path, options: &RenderOptions, pretty: bool) -> Result<String> {
    let mut schema = load_schema(path).with_context(|| format!("Failed to load schema {}", path.display()))?;
    if let Some(data) = load_optional(options.data.as_ref())? {
        schema = resolve_refs(&schema, &data);
    }

    let mutations: Map<String, Value> = match load_optional(options.mutations.as_ref())? {
        Some(Value::Object(map)) => map,
        Some(_) => anyhow::bail!("--mutations must be a map of section name to props"),
        None => Map::new(),
    };

    let mut dictionary = Dictionary::new(options.lang.clone());
    if let Some(fallback) = &options.fallback_lang {
        dictionary = dictionary.with_fallback(fallback.clone());
    }
    if let Some(dicts) = load_optional(options.dict.as_ref())? {
        dictionary.add_dictionaries(&dicts);
    }

    let mut props = GoatProps::new(options.name.clone()).test_mode(options.test);
    if let Some(target) = &options.children_in {
        let children = options.children.iter().map(|c| Node::text(c.clone())).collect();
        props = props.with_children(target.clone(), children);
    }

    let goat = Goat::new(registry, props)
        .with_translator(&dictionary)
        .with_formatter(Formatter::new(options.lang.clone()))
        .with_mutations(move |name: &str, _node: &Props| mutations.get(name).and_then(Value::as_object).cloned());

    let mut ctx = goat.context();
    if let Some(width) = options.width {
        ctx = ctx.with_viewport(Size::new(width, options.height.unwrap_or(width)));
    }

    let node = goat.build_content(schema, None);
    Ok(if pretty { to_html_pretty(&node, &ctx) } else { to_html(&node, &ctx) })
}

fn is_schema_file(path: &Path) -> bool {
    path.is_file() && SchemaFormat::from_path(path).is_some()
}

fn has_wildcards(text: &str) -> bool {
    text.contains(['*', '?', '['])
}

/// One `--exclude` entry: a glob when it has wildcards, otherwise a substring
#[derive(Debug)]
enum Exclusion {
    Glob(glob::Pattern),
    Substring(String),
}

impl Exclusion {
    fn parse(pattern: &str) -> Result<Self> {
        if has_wildcards(pattern) {
            let glob = glob::Pattern::new(pattern).with_context(|| format!("Invalid --exclude pattern {pattern}"))?;
            Ok(Exclusion::Glob(glob))
        } else {
            Ok(Exclusion::Substring(pattern.to_string()))
        }
    }

    fn matches(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        match self {
            Exclusion::Glob(glob) => glob.matches(&text),
            Exclusion::Substring(part) => text.contains(part.as_str()),
        }
    }
}

/// Schema files named by one command-line path: a glob, a file or a directory
fn schema_files_in(path: &Path) -> Result<Vec<PathBuf>> {
    let text = path.to_string_lossy();
    if has_wildcards(&text) {
        let mut files = Vec::new();
        for entry in glob(&text).with_context(|| format!("Invalid glob {text}"))? {
            match entry {
                Ok(file) if is_schema_file(&file) => files.push(file),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unreadable glob entry"),
            }
        }
        return Ok(files);
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if path.is_dir() {
        return Ok(WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| is_schema_file(e.path()))
            .map(|e| e.into_path())
            .collect());
    }
    anyhow::bail!("Path not found: {}", path.display())
}

/// Every schema file under `paths`, minus those matching an exclusion
fn collect_schema_files(paths: &[PathBuf], exclude: &[String]) -> Result<Vec<PathBuf>> {
    let exclusions = exclude.iter().map(|p| Exclusion::parse(p)).collect::<Result<Vec<_>>>()?;
    let mut files = Vec::new();
    for path in paths {
        files.extend(schema_files_in(path)?);
    }
    files.retain(|file| !exclusions.iter().any(|e| e.matches(file)));
    Ok(files)
}
