use clap::{Parser, Subcommand};
use reroader::arrange::{alphabetize_groups, categories_by_initial};
use reroader::sortfile::SortFile;
use reroader::view::{LabelOrder, UNSORTED};
use reroader::workshop::{default_workshop_dir, Workshop, WorkshopOptions, WORKSHOP_DIR_ENV};
use reroader::{Entry, GroupKind};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reroader", about = "Inspect and reorganise Rivals of Aether workshop order files")]
struct Cli {
    /// Workshop directory holding order.roa and categories.roa
    #[arg(short, long, global = true, env = WORKSHOP_DIR_ENV)]
    dir: Option<PathBuf>,
    /// Do not look for newly installed entries on load
    #[arg(long, global = true)]
    no_scan: bool,
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print characters grouped by category
    Show {
        /// Only this category
        #[arg(short, long)]
        label: Option<String>,
        /// List another group instead: buddies, stages or skins
        #[arg(short, long, value_parser = parse_group)]
        group: Option<GroupKind>,
    },
    /// Show file locations and group sizes
    Info,
    /// Load both files and verify they re-encode byte for byte
    Check,
    /// Add installed entries missing from the order file
    Scan {
        #[arg(long)]
        dry_run: bool,
    },
    /// Write (or bring up to date) the editable sort file
    Export {
        #[arg(short, long, default_value = "sort.json")]
        output: PathBuf,
    },
    /// Write the order from an edited sort file back to the workshop
    Apply {
        #[arg(default_value = "sort.json")]
        input: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Alphabetize buddies, stages and skins
    Arrange {
        /// Also sort characters by name and rebuild categories by first letter
        #[arg(long)]
        by_initial: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let dir = cli
        .dir
        .or_else(default_workshop_dir)
        .ok_or("no workshop directory: pass --dir or set ROA_WORKSHOP_DIR")?;
    let opts = WorkshopOptions {
        scan_on_open: !cli.no_scan && !matches!(cli.command, Commands::Check | Commands::Scan { .. }),
        ..WorkshopOptions::default()
    };
    let mut ws = Workshop::open(&dir, opts)?;

    match cli.command {

        // ── Show ─────────────────────────────────────────────────────────────
        Commands::Show { label, group: Some(kind) } if kind != GroupKind::Characters => {
            if label.is_some() {
                println!("note: --label only applies to characters");
            }
            println!("{kind} ({})", ws.order.group(kind).len());
            for entry in ws.order.group(kind) {
                print_entry(entry);
            }
        }
        Commands::Show { label, .. } => {
            for bucket in ws.view().buckets() {
                if label.as_ref().is_some_and(|l| *l != bucket.label) {
                    continue;
                }
                println!("{} ({})", display_label(&bucket.label), bucket.entries.len());
                for entry in &bucket.entries {
                    print_entry(entry);
                }
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info => {
            println!("── Workshop ─────────────────────────────────────────────");
            println!("  Directory      {}", ws.dir().display());
            println!("  Order file     {}", ws.order_path().display());
            println!("  Categories     {}", ws.categories_path().display());
            for (kind, entries) in ws.order.groups().iter() {
                println!("  {:<14} {}", kind.label(), entries.len());
            }
            println!("  Category marks {}", ws.categories.categories().len());
            for c in ws.categories.categories() {
                println!("    {:>5}  {} ({})", c.index, c.label_str(), hex::encode(&c.label));
            }
            if let Some(scan) = ws.last_scan() {
                println!("  Scan           {}", scan.summary());
            }
            println!("  Unsaved        {}", ws.is_dirty());
        }

        // ── Check ────────────────────────────────────────────────────────────
        Commands::Check => {
            for w in ws.order.warnings() {
                println!("  warning: group at offset {} declares {} entries, holds {}",
                    w.offset, w.expected, w.actual);
            }
            println!("OK: {} and {} round-trip exactly",
                ws.order_path().display(), ws.categories_path().display());
        }

        // ── Scan ─────────────────────────────────────────────────────────────
        Commands::Scan { dry_run } => {
            let report = ws.rescan();
            println!("{}", report.summary());
            for (kind, entry) in &report.added {
                println!("  + {:<10} {}", kind.label(), entry);
            }
            for (path, err) in &report.skipped {
                println!("  ! {} ({err})", path.display());
            }
            if !dry_run && ws.is_dirty() {
                ws.save()?;
            }
        }

        // ── Export ───────────────────────────────────────────────────────────
        Commands::Export { output } => {
            let mut sort = if output.is_file() {
                SortFile::load(&output)?
            } else {
                let view = ws.view();
                SortFile::from_view(&view, &LabelOrder::of(&view))
            };
            let report = sort.sync(ws.order.characters());
            println!("{} duplicate(s) removed, {} moved to _removed, {} added to unsorted",
                report.duplicates_removed.len(),
                report.moved_to_removed.len(),
                report.added_to_unsorted.len());
            sort.save(&output)?;
            println!("Wrote: {}", output.display());
        }

        // ── Apply ────────────────────────────────────────────────────────────
        Commands::Apply { input, dry_run } => {
            let mut sort = SortFile::load(&input)?;
            let (synced, warnings) = ws.apply_sort_file(&mut sort)?;
            for w in &warnings {
                println!("  warning: {w:?}");
            }
            if !synced.is_empty() {
                println!("{} duplicate(s) removed, {} moved to _removed, {} added to unsorted",
                    synced.duplicates_removed.len(),
                    synced.moved_to_removed.len(),
                    synced.added_to_unsorted.len());
                if !dry_run {
                    sort.save(&input)?;
                }
            }
            if dry_run {
                println!("Dry run: {} characters in {} categories",
                    ws.order.characters().len(), ws.categories.categories().len());
            } else if ws.is_dirty() {
                ws.save()?;
            } else {
                println!("No changes.");
            }
        }

        // ── Arrange ──────────────────────────────────────────────────────────
        Commands::Arrange { by_initial } => {
            alphabetize_groups(&mut ws.order);
            if by_initial {
                ws.order.group_mut(GroupKind::Characters).sort_by_cached_key(Entry::sort_name);
                let categories = categories_by_initial(ws.order.characters())?;
                ws.categories.replace(categories);
            }
            if ws.is_dirty() {
                ws.save()?;
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_group(s: &str) -> Result<GroupKind, String> {
    GroupKind::from_label(s)
        .ok_or_else(|| format!("unknown group {s:?}; expected characters, buddies, stages or skins"))
}

fn display_label(label: &str) -> &str {
    if label == UNSORTED { "(unsorted)" } else { label }
}

fn print_entry(entry: &Entry) {
    let version = entry.version();
    let version = if version < 0.0 { "?".to_string() } else { version.to_string() };
    println!("  {:<32} {:<20} v{:<6} {}", entry.name(), entry.author(), version, entry.id());
}
