use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gifgrid", version)]
struct Cli {
    /// Log stage boundaries (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cut a GIF into one looping GIF per button.
    Slice(SliceArgs),
    /// List known device models.
    Models(ModelsArgs),
    /// Print canvas size, frame count and duration of a GIF.
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
struct SliceArgs {
    /// Input GIF.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Device model key, e.g. `xl` or `mini`.
    #[arg(long)]
    model: String,

    /// Output directory for tiles and `tiles.json`.
    #[arg(long)]
    out: PathBuf,

    /// Extra device profiles (JSON array), merged over the built-in table.
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Override rayon worker threads.
    #[arg(long)]
    threads: Option<usize>,

    /// Quantizer speed, 1 (best) to 30 (fastest).
    #[arg(long, default_value_t = 10)]
    speed: i32,

    /// Tile loop behaviour: a repeat count, `infinite` or `source`.
    #[arg(long, default_value = "infinite", value_parser = parse_loop_count)]
    loop_count: gifgrid::LoopCount,

    /// Replace existing tiles in the output directory.
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Encode cells one after another on the calling thread.
    #[arg(long, default_value_t = false)]
    sequential: bool,
}

#[derive(Parser, Debug)]
struct ModelsArgs {
    /// Extra device profiles (JSON array), merged over the built-in table.
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Print the table as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Input GIF.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Print as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Slice(args) => cmd_slice(args),
        Command::Models(args) => cmd_models(args),
        Command::Info(args) => cmd_info(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_loop_count(s: &str) -> Result<gifgrid::LoopCount, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "infinite" | "forever" => Ok(gifgrid::LoopCount::Infinite),
        "source" => Ok(gifgrid::LoopCount::MatchSource),
        n => n
            .parse::<u16>()
            .map(gifgrid::LoopCount::Finite)
            .map_err(|_| format!("expected a repeat count, 'infinite' or 'source', got '{s}'")),
    }
}

fn load_table(profiles: Option<&PathBuf>) -> anyhow::Result<gifgrid::ProfileTable> {
    let builtin = gifgrid::ProfileTable::builtin();
    match profiles {
        Some(path) => {
            let extra = gifgrid::ProfileTable::from_path(path)
                .with_context(|| format!("load profiles '{}'", path.display()))?;
            Ok(builtin.merge(&extra)?)
        }
        None => Ok(builtin.clone()),
    }
}

fn cmd_slice(args: SliceArgs) -> anyhow::Result<()> {
    let table = load_table(args.profiles.as_ref())?;
    let profile = table.get(&args.model)?.clone();

    let mut sink = gifgrid::DirTileSink::new(gifgrid::DirTileSinkOpts {
        overwrite: args.overwrite,
        ..gifgrid::DirTileSinkOpts::new(&args.out)
    });
    sink.check_targets(&profile)?;

    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read gif '{}'", args.in_path.display()))?;
    let opts = gifgrid::SliceOpts {
        encode: gifgrid::EncodeOpts {
            speed: args.speed,
            loop_count: args.loop_count,
        },
        parallel: !args.sequential,
        threads: args.threads,
        ..gifgrid::SliceOpts::default()
    };
    let (tiles, stats) = gifgrid::slice_gif_with_stats(&bytes, &args.model, &table, &opts)
        .with_context(|| format!("slice '{}'", args.in_path.display()))?;

    gifgrid::deliver_tiles(&tiles, &profile, &mut sink)
        .with_context(|| format!("write tiles to '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} tiles ({} frames each) to {}",
        stats.tiles,
        stats.frames,
        args.out.display()
    );
    Ok(())
}

fn cmd_models(args: ModelsArgs) -> anyhow::Result<()> {
    let table = load_table(args.profiles.as_ref())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }
    for p in table.profiles() {
        let aliases = if p.aliases.is_empty() {
            String::new()
        } else {
            format!(" (aliases: {})", p.aliases.join(", "))
        };
        println!(
            "{:<10} {:>4}x{:<4} {}x{} buttons of {}x{}{aliases}",
            p.name,
            p.canvas_width,
            p.canvas_height,
            p.rows,
            p.cols,
            p.tile_width,
            p.tile_height
        );
    }
    Ok(())
}

fn cmd_info(args: InfoArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read gif '{}'", args.in_path.display()))?;
    let info = gifgrid::probe_gif(&bytes)
        .with_context(|| format!("probe '{}'", args.in_path.display()))?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    let repeat = match info.repeat {
        gifgrid::SourceRepeat::Infinite => "infinite".to_string(),
        gifgrid::SourceRepeat::Finite(n) => n.to_string(),
    };
    println!(
        "{}: {} canvas, {} frames, {} cs total, loop {repeat}",
        args.in_path.display(),
        info.canvas,
        info.frame_count,
        info.total_delay_cs
    );
    Ok(())
}
