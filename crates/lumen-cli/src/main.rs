//! lumen CLI - build and inspect wide BVHs
//!
//! Generates a sphere-grid scene, builds a 4- or 8-wide hierarchy over it,
//! and prints statistics or the result of a single ray probe.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use lumen_bvh::{Hierarchy, Stats};
use lumen_geom::shapes::HitableList;
use lumen_geom::{HitRecord, Hitable};
use lumen_math::{Point3, Ray, Vec3};
use std::path::PathBuf;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "lumen")]
#[command(about = "Build and query wide bounding volume hierarchies", long_about = None)]
struct Cli {
    /// TOML file with [build] and [scene] tables
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log build details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a hierarchy and print its statistics
    Stats {
        #[command(flatten)]
        scene: SceneArgs,
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build a hierarchy and trace one ray through it
    Probe {
        #[command(flatten)]
        scene: SceneArgs,
        /// Ray origin as x,y,z
        #[arg(long, value_parser = parse_vec3, default_value = "0,0,0")]
        origin: Vec3,
        /// Ray direction as x,y,z
        #[arg(long, value_parser = parse_vec3, default_value = "0,0,-1")]
        direction: Vec3,
        /// Lower end of the open hit interval
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        t_min: f64,
        /// Upper end of the open hit interval
        #[arg(long, default_value_t = f64::INFINITY)]
        t_max: f64,
        /// Run the edge query instead of the nearest-hit query
        #[arg(long)]
        edge: bool,
        /// Also run a brute-force query and compare
        #[arg(long)]
        compare: bool,
    },
}

/// Flags that override values from the config file.
#[derive(Args)]
struct SceneArgs {
    /// Spheres along X and Y
    #[arg(long)]
    grid: Option<usize>,
    /// Layers along Z
    #[arg(long)]
    layers: Option<usize>,
    /// Distance between sphere centers
    #[arg(long)]
    spacing: Option<f64>,
    /// Sphere radius
    #[arg(long)]
    radius: Option<f64>,
    /// Hierarchy fan-out (4 or 8)
    #[arg(long)]
    fan_out: Option<usize>,
    /// Split-axis seed
    #[arg(long)]
    seed: Option<u64>,
    /// Maximum primitives per leaf
    #[arg(long)]
    leaf_size: Option<usize>,
    /// Store leaves in their parent's slots
    #[arg(long)]
    inline_leaves: bool,
}

impl SceneArgs {
    fn apply(&self, config: &mut Config) {
        let scene = &mut config.scene;
        if let Some(grid) = self.grid {
            scene.grid = grid;
        }
        if let Some(layers) = self.layers {
            scene.layers = layers;
        }
        if let Some(spacing) = self.spacing {
            scene.spacing = spacing;
        }
        if let Some(radius) = self.radius {
            scene.radius = radius;
        }
        if let Some(fan_out) = self.fan_out {
            scene.fan_out = fan_out;
        }
        if let Some(seed) = self.seed {
            config.build.seed = seed;
        }
        if let Some(leaf_size) = self.leaf_size {
            config.build.max_leaf_primitives = leaf_size;
        }
        if self.inline_leaves {
            config.build.inline_leaves = true;
        }
    }
}

struct Probe {
    ray: Ray,
    t_min: f64,
    t_max: f64,
    edge: bool,
    compare: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Stats { scene, json } => {
            scene.apply(&mut config);
            config.validate()?;
            let stats = match config.scene.fan_out {
                4 => build::<4>(&config)?.stats(),
                8 => build::<8>(&config)?.stats(),
                other => bail!("Unsupported fan-out: {}", other),
            };
            print_stats(&stats, json)?;
        }
        Commands::Probe {
            scene,
            origin,
            direction,
            t_min,
            t_max,
            edge,
            compare,
        } => {
            scene.apply(&mut config);
            config.validate()?;
            if direction.norm() == 0.0 {
                bail!("Ray direction must be non-zero");
            }
            let probe = Probe {
                ray: Ray::new(Point3::from(origin), direction),
                t_min,
                t_max,
                edge,
                compare,
            };
            match config.scene.fan_out {
                4 => run_probe(&build::<4>(&config)?, &probe)?,
                8 => run_probe(&build::<8>(&config)?, &probe)?,
                other => bail!("Unsupported fan-out: {}", other),
            }
        }
    }

    Ok(())
}

fn build<const K: usize>(config: &Config) -> Result<Hierarchy<K>> {
    let spheres = config.scene.spheres();
    Hierarchy::<K>::build_with(spheres, 0.0, 1.0, &config.build)
        .context("Failed to build hierarchy")
}

fn print_stats(stats: &Stats, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    println!("Nodes:             {}", stats.node_count);
    println!("Primitives:        {}", stats.primitive_count);
    println!("Leaf nodes:        {}", stats.leaf_nodes);
    println!("Inner nodes:       {}", stats.inner_nodes);
    println!("Leaf primitives:   {}", stats.total_leaf_primitives);
    println!("Empty slots:       {}", stats.empty_slots);
    println!("Root children:     {}", stats.root_children);
    println!("Prims per slot:    {:.3}", stats.avg_primitives_per_slot);
    println!("Max depth:         {}", stats.max_depth);
    println!(
        "Root bounds:       {:?} .. {:?}",
        stats.root_bounds.min, stats.root_bounds.max
    );
    Ok(())
}

fn run_probe<const K: usize>(hierarchy: &Hierarchy<K>, probe: &Probe) -> Result<()> {
    let Probe {
        ray,
        t_min,
        t_max,
        edge,
        compare,
    } = *probe;

    let reference = compare.then(|| HitableList::new(hierarchy.primitives().to_vec()));

    if edge {
        let found = hierarchy.hit_edge(&ray, t_min, t_max);
        match &found {
            Some((rec, on_edge)) => {
                print_record(rec);
                println!("on edge: {}", on_edge);
            }
            None => println!("miss"),
        }
        if let Some(list) = &reference {
            let expected = list.hit_edge(&ray, t_min, t_max);
            check(
                found.map(|(rec, e)| (rec.t, e)),
                expected.map(|(rec, e)| (rec.t, e)),
            )?;
        }
    } else {
        let found = hierarchy.hit(&ray, t_min, t_max);
        match &found {
            Some((rec, material)) => {
                print_record(rec);
                println!("material: {} (emissive: {})", material.id, material.emissive);
            }
            None => println!("miss"),
        }
        if let Some(list) = &reference {
            let expected = list.hit(&ray, t_min, t_max);
            check(
                found.map(|(rec, m)| (rec.t, m.id)),
                expected.map(|(rec, m)| (rec.t, m.id)),
            )?;
        }
    }

    Ok(())
}

fn print_record(rec: &HitRecord) {
    println!("t:      {}", rec.t);
    println!("point:  ({}, {}, {})", rec.point.x, rec.point.y, rec.point.z);
    println!("normal: ({}, {}, {})", rec.normal.x, rec.normal.y, rec.normal.z);
    println!("uv:     ({}, {})", rec.u, rec.v);
}

fn check<T: PartialEq + std::fmt::Debug>(
    found: Option<(f64, T)>,
    expected: Option<(f64, T)>,
) -> Result<()> {
    if found != expected {
        bail!(
            "Hierarchy disagrees with brute force: got {:?}, expected {:?}",
            found,
            expected
        );
    }
    println!("brute force agrees");
    Ok(())
}

fn parse_vec3(s: &str) -> std::result::Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z, got '{}'", s));
    }
    let mut v = [0.0; 3];
    for (slot, part) in v.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| format!("invalid number '{}'", part))?;
    }
    Ok(Vec3::new(v[0], v[1], v[2]))
}
