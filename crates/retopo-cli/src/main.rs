use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use retopo_base::{Axis, ToolSettings};
use retopo_geometry::{Point2, Point3, Vector3};
use retopo_io::{load_obj, load_settings};
use retopo_mesh::{ElementClass, Mesh};
use retopo_pick::{
    EditGeneration, EditTarget, ElementItem, ElementKinds, MeshObject, Projection, Scene,
    SnapRegistry, Viewport,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "retopo")]
#[command(about = "Retopology picking and snapping queries")]
struct Cli {
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Info(InfoArgs),
    Pick(PickArgs),
    Snap(SnapArgs),
    Visible(VisibleArgs),
}

#[derive(Args)]
struct InfoArgs {
    #[arg(long)]
    mesh: PathBuf,
}

#[derive(Args)]
struct CameraArgs {
    #[arg(long, default_value = "0,0,10")]
    camera: String,
    #[arg(long = "look-at", default_value = "0,0,0")]
    look_at: String,
    #[arg(long, default_value = "1280,720")]
    size: String,
    #[arg(long, default_value_t = 50.0)]
    fov: f64,
}

#[derive(Args)]
struct PickArgs {
    #[arg(long)]
    mesh: PathBuf,
    #[arg(long)]
    at: String,
    #[arg(long)]
    radius: Option<f64>,
    #[arg(long)]
    no_cull: bool,
    #[arg(long, default_value = "vert,edge,face")]
    kinds: String,
    #[command(flatten)]
    camera: CameraArgs,
}

#[derive(Args)]
struct SnapArgs {
    #[arg(long = "target", required = true)]
    targets: Vec<PathBuf>,
    #[arg(long)]
    point: String,
    #[arg(long)]
    axis: Option<Axis>,
}

#[derive(Args)]
struct VisibleArgs {
    #[arg(long = "target", required = true)]
    targets: Vec<PathBuf>,
    #[arg(long)]
    point: String,
    #[command(flatten)]
    camera: CameraArgs,
}

#[derive(Serialize)]
struct InfoReport {
    vertices: usize,
    edges: usize,
    faces: usize,
    interior_verts: usize,
    boundary_verts: usize,
    non_manifold_verts: usize,
    wire_verts: usize,
}

#[derive(Serialize)]
struct PickReport {
    kind: &'static str,
    id: Option<u32>,
    coord: Option<[f64; 2]>,
    world: Option<[f64; 3]>,
    distance: Option<f64>,
}

#[derive(Serialize)]
struct SnapReport {
    input: [f64; 3],
    snapped: [f64; 3],
    index: Option<u64>,
}

#[derive(Serialize)]
struct VisibleReport {
    point: [f64; 3],
    visible: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => ToolSettings::default(),
    };

    match cli.command {
        Command::Info(args) => mesh_info(args),
        Command::Pick(args) => pick(args, &settings),
        Command::Snap(args) => snap(args, &settings),
        Command::Visible(args) => visible(args, &settings),
    }
}

fn mesh_info(args: InfoArgs) -> Result<()> {
    let mesh = load_obj(&args.mesh)?;
    info!(path = %args.mesh.display(), "mesh loaded");
    let mut report = InfoReport {
        vertices: mesh.vertex_count(),
        edges: mesh.edge_count(),
        faces: mesh.face_count(),
        interior_verts: 0,
        boundary_verts: 0,
        non_manifold_verts: 0,
        wire_verts: 0,
    };
    for (id, _) in mesh.vertices() {
        match mesh.classify_vertex(id) {
            ElementClass::Interior => report.interior_verts += 1,
            ElementClass::Boundary => report.boundary_verts += 1,
            ElementClass::NonManifold => report.non_manifold_verts += 1,
            ElementClass::Wire => report.wire_verts += 1,
        }
    }
    print_report(&report)
}

fn pick(args: PickArgs, settings: &ToolSettings) -> Result<()> {
    let mesh = load_obj(&args.mesh)?;
    let viewport = viewport_from(&args.camera)?;
    let (x, y) = parse_pair(&args.at, "--at")?;
    let kinds: ElementKinds = args.kinds.parse().context("invalid --kinds")?;

    let mut pick_settings = settings.pick;
    if let Some(radius) = args.radius {
        pick_settings.highlight_radius = radius;
    }
    if args.no_cull {
        pick_settings.backface_culling = false;
    }

    let object = MeshObject::new(file_stem(&args.mesh), mesh);
    let mut target = EditTarget::new(object, EditGeneration::new());
    let item = target.pick_element(&viewport, Point2::new(x, y), &pick_settings, kinds);
    info!(path = %args.mesh.display(), empty = item.is_empty(), "pick complete");
    print_report(&pick_report(&item))
}

fn snap(args: SnapArgs, settings: &ToolSettings) -> Result<()> {
    let scene = scene_from(&args.targets, settings)?;
    let point = parse_point(&args.point, "--point")?;
    let registry = SnapRegistry::new();
    let handle = registry.acquire(&scene);

    let hit = handle.find_nearest(point);
    let snapped = handle.adjust_point(point, args.axis);
    info!(targets = registry.target_count(), "snap complete");
    print_report(&SnapReport {
        input: point.into(),
        snapped: snapped.into(),
        index: hit.map(|hit| hit.index),
    })
}

fn visible(args: VisibleArgs, settings: &ToolSettings) -> Result<()> {
    let scene = scene_from(&args.targets, settings)?;
    let point = parse_point(&args.point, "--point")?;
    let viewport = viewport_from(&args.camera)?;
    let registry = SnapRegistry::new();
    let handle = registry.acquire(&scene);

    let visible = handle.is_point_on_visible_surface(&viewport, point, None);
    info!(targets = registry.target_count(), visible, "visibility test complete");
    print_report(&VisibleReport {
        point: point.into(),
        visible,
    })
}

fn scene_from(paths: &[PathBuf], settings: &ToolSettings) -> Result<Scene> {
    let mut scene = Scene::new(settings.snap);
    for path in paths {
        let mesh: Mesh = load_obj(path)?;
        info!(path = %path.display(), faces = mesh.face_count(), "snap target loaded");
        scene.add(MeshObject::new(file_stem(path), mesh));
    }
    Ok(scene)
}

fn viewport_from(args: &CameraArgs) -> Result<Viewport> {
    let eye = parse_point(&args.camera, "--camera")?;
    let target = parse_point(&args.look_at, "--look-at")?;
    let (width, height) = parse_pair(&args.size, "--size")?;
    if !(width > 0.0 && height > 0.0) {
        bail!("--size must be positive");
    }
    let forward = target - eye;
    let up = if forward.x.abs() < 1.0e-9 && forward.y.abs() < 1.0e-9 {
        Vector3::new(0.0, 1.0, 0.0)
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    };
    let projection = Projection::Perspective {
        fovy_deg: args.fov,
        near: 0.01,
        far: 1000.0,
    };
    Ok(Viewport::look_at(eye, target, up, projection, width, height))
}

fn pick_report(item: &ElementItem) -> PickReport {
    let (kind, id) = match *item {
        ElementItem::Vertex { id, .. } => ("vertex", Some(id.0)),
        ElementItem::Edge { id, .. } => ("edge", Some(id.0)),
        ElementItem::Face { id, .. } => ("face", Some(id.0)),
        ElementItem::Empty => ("empty", None),
    };
    PickReport {
        kind,
        id,
        coord: item.coord().map(Into::into),
        world: item.world().map(Into::into),
        distance: item.distance(),
    }
}

fn print_report<T: Serialize>(report: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(report).context("serialize report")?;
    println!("{text}");
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string())
}

fn parse_numbers(text: &str, flag: &str, count: usize) -> Result<Vec<f64>> {
    let parts: Vec<&str> = text.split(',').collect();
    if parts.len() != count {
        bail!("{flag} expects {count} comma-separated numbers");
    }
    parts
        .iter()
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid number '{part}' in {flag}"))
        })
        .collect()
}

fn parse_pair(text: &str, flag: &str) -> Result<(f64, f64)> {
    let values = parse_numbers(text, flag, 2)?;
    Ok((values[0], values[1]))
}

fn parse_point(text: &str, flag: &str) -> Result<Point3<f64>> {
    let values = parse_numbers(text, flag, 3)?;
    Ok(Point3::new(values[0], values[1], values[2]))
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
