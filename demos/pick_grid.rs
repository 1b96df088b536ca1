use anyhow::Result;
use retopo_base::{SnapSettings, ToolSettings};
use retopo_geometry::{Matrix4, Point2, Point3, Vector3};
use retopo_mesh::MeshBuilder;
use retopo_pick::{
    EditGeneration, EditTarget, ElementItem, ElementKinds, MeshObject, Projection, Scene,
    SnapRegistry, Viewport,
};

fn main() -> Result<()> {
    let settings = ToolSettings::default();
    let viewport = Viewport::look_at(
        Point3::new(0.0, 0.0, 8.0),
        Point3::new(0.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Projection::default(),
        1280.0,
        720.0,
    );

    let mut scene = Scene::new(SnapSettings::default());
    scene.add(MeshObject::new("reference", MeshBuilder::plane_at_z(6.0, -0.25)?));

    let edit = MeshObject::new("retopo", MeshBuilder::grid(4, 4, 4.0)?)
        .with_matrix(Matrix4::from_translation(Vector3::new(0.0, 0.0, 0.5)));
    scene.active = Some(edit.id);
    let mut target = EditTarget::new(edit, EditGeneration::new());

    for coord in [
        Point2::new(640.0, 360.0),
        Point2::new(700.0, 360.0),
        Point2::new(690.0, 400.0),
    ] {
        let item = target.pick_element(&viewport, coord, &settings.pick, ElementKinds::ALL);
        match item {
            ElementItem::Vertex { id, world, .. } => {
                println!("{coord:?}: vertex {} at {world:?}", id.0)
            }
            ElementItem::Edge { id, world, .. } => {
                println!("{coord:?}: edge {} near {world:?}", id.0)
            }
            ElementItem::Face { id, world, .. } => {
                println!("{coord:?}: face {} at {world:?}", id.0)
            }
            ElementItem::Empty => println!("{coord:?}: nothing"),
        }
    }

    let registry = SnapRegistry::new();
    let snap = registry.acquire(&scene);
    let verts: Vec<_> = target.mesh().vertices().map(|(id, _)| id).collect();
    let moved = snap.adjust_verts(&mut target, &verts, settings.pick.mirror_axis);
    println!("snapped {moved} vertices onto the reference plane");
    Ok(())
}
