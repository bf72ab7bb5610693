//! uvtransfer CLI - copy vertex positions between meshes with matching UVs.
//!
//! Usage: uvtransfer <COMMAND> [OPTIONS] <INPUT>...
//!
//! Run `uvtransfer --help` for available commands.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::{ArgAction, Parser, Subcommand};

use uvtransfer::algo::{Progress, TransferOptions};
use uvtransfer::host::{user_message, Scene, SceneObject, UvTransferOperator};
use uvtransfer::io;
use uvtransfer::mesh::Mesh;

#[derive(Parser)]
#[command(name = "uvtransfer")]
#[command(author, version, about = "Transfer vertex positions by nearest UV", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh and UV information
    Info {
        /// Input mesh file
        input: PathBuf,
    },

    /// Copy positions from SOURCE onto TARGET by nearest UV and save the result
    Transfer {
        /// Mesh whose positions are read
        source: PathBuf,

        /// Mesh whose positions are overwritten
        target: PathBuf,

        /// Output mesh file (OBJ)
        output: PathBuf,

        /// UV layer to match on both meshes (default: each mesh's active layer)
        #[arg(long, value_name = "NAME")]
        uv_layer: Option<String>,

        /// Run UV queries on all cores
        #[arg(long, conflicts_with = "sequential")]
        parallel: bool,

        /// Use single-threaded execution (default)
        #[arg(long)]
        sequential: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    // RUST_LOG still overrides the flag.
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input } => {
            cmd_info(&input)?;
        }

        Commands::Transfer {
            source,
            target,
            output,
            uv_layer,
            parallel,
            sequential,
        } => {
            cmd_transfer(
                &source,
                &target,
                &output,
                uv_layer.as_deref(),
                parallel && !sequential,
            )?;
        }
    }

    Ok(())
}

/// Create a progress reporter that displays a progress bar on the terminal.
fn create_progress() -> Progress {
    let max_percent = Arc::new(AtomicUsize::new(0));

    Progress::new(move |current, total, message| {
        if total == 0 {
            return;
        }

        let raw_percent = if current >= total {
            100
        } else {
            ((current * 100) + (total / 2)) / total
        };

        // Only ever move forward.
        let (percent, increased) = loop {
            let old_max = max_percent.load(Ordering::Relaxed);
            let new_max = old_max.max(raw_percent);
            if new_max == old_max {
                break (old_max, false);
            }
            match max_percent.compare_exchange_weak(
                old_max,
                new_max,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break (new_max, true),
                Err(_) => continue,
            }
        };

        if !increased && percent != 100 {
            return;
        }

        let bar_width = 30;
        let filled = (percent * bar_width) / 100;
        eprint!(
            "\r[{}{}] {:3}% {}",
            "=".repeat(filled),
            " ".repeat(bar_width - filled),
            percent,
            message
        );
        let _ = std::io::stderr().flush();

        if current >= total {
            eprintln!();
        }
    })
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mesh: Mesh = io::load(input)?;

    println!("File: {}", input.display());
    println!("Vertices: {}", mesh.num_vertices());
    println!("Faces: {}", mesh.num_faces());
    println!("Loops: {}", mesh.num_loops());

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
    }

    if mesh.is_triangle_mesh() {
        println!("Mesh type: Triangle mesh");
    } else {
        println!("Mesh type: Polygon mesh");
    }

    if mesh.uv_layers().is_empty() {
        println!("UV layers: none");
        return Ok(());
    }

    println!("UV layers:");
    let active = mesh.active_uv_layer_index();
    for (i, layer) in mesh.uv_layers().iter().enumerate() {
        let marker = if Some(i) == active { " (active)" } else { "" };
        println!("  {}{}", layer.name(), marker);
    }
    if let Some((min, max)) = mesh.uv_bounding_box() {
        println!(
            "UV bounds: ({:.4}, {:.4}) to ({:.4}, {:.4})",
            min.x, min.y, max.x, max.y
        );
    }
    println!("Seam vertices: {}", mesh.seam_vertex_count());

    Ok(())
}

fn cmd_transfer(
    source: &Path,
    target: &Path,
    output: &Path,
    uv_layer: Option<&str>,
    parallel: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut source_mesh: Mesh = io::load(source)?;
    let mut target_mesh: Mesh = io::load(target)?;

    if let Some(name) = uv_layer {
        select_uv_layer(&mut source_mesh, name, source)?;
        select_uv_layer(&mut target_mesh, name, target)?;
    }

    println!(
        "Source: {} vertices, {} loops",
        source_mesh.num_vertices(),
        source_mesh.num_loops()
    );
    println!(
        "Target: {} vertices, {} loops",
        target_mesh.num_vertices(),
        target_mesh.num_loops()
    );

    let mut scene = Scene::new();
    let source_id = scene.add_object(SceneObject::mesh(object_name(source), source_mesh));
    let target_id = scene.add_object(SceneObject::mesh(object_name(target), target_mesh));
    scene.select(source_id);
    scene.select(target_id);
    scene.set_active(Some(target_id));

    let operator = UvTransferOperator::new(TransferOptions::default().with_parallel(parallel));
    let mode = if parallel { "parallel" } else { "sequential" };
    let progress = create_progress();

    println!("Transferring positions by UV ({})...", mode);
    let start = Instant::now();
    let (report, _undo) = operator
        .execute_with_progress(&mut scene, &progress)
        .map_err(|e| user_message(&e))?;
    let elapsed = start.elapsed();

    println!(
        "Result: {} vertices written, {}/{} exact UV matches",
        report.vertices_written, report.exact_matches, report.loops_matched
    );
    println!(
        "UV distance: max {:.6}, mean {:.6}",
        report.max_distance, report.mean_distance
    );
    if report.conflicting_vertices > 0 {
        println!(
            "Conflicts: {} vertices matched several source positions (last loop wins)",
            report.conflicting_vertices
        );
    }

    let shaped = scene
        .object(target_id)
        .and_then(|o| o.as_mesh())
        .ok_or("target object disappeared from the scene")?;
    io::save(shaped, output)?;
    println!("Saved: {} ({:.2?})", output.display(), elapsed);

    Ok(())
}

fn select_uv_layer(
    mesh: &mut Mesh,
    name: &str,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let index = mesh
        .uv_layer_by_name(name)
        .ok_or_else(|| format!("{}: no UV layer named '{}'", path.display(), name))?;
    mesh.set_active_uv_layer(index)?;
    Ok(())
}

fn object_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
