use anyhow::Result;
use retopo_base::{Axis, ToolSettings};
use retopo_io::{load_obj, load_settings, polygon_from_mesh, save_obj, save_settings};
use retopo_mesh::{ElementClass, MeshBuilder, VertexId};
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let stamp = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_millis(),
        Err(_) => 0,
    };
    path.push(format!("retopo_{stamp}_{file_name}"));
    path
}

#[test]
fn obj_round_trip_keeps_topology() -> Result<()> {
    let grid = MeshBuilder::grid(3, 2, 3.0)?;
    let path = temp_path("grid.obj");

    save_obj(&grid, &path)?;
    let loaded = load_obj(&path)?;

    assert_eq!(loaded.vertex_count(), grid.vertex_count());
    assert_eq!(loaded.edge_count(), grid.edge_count());
    assert_eq!(loaded.face_count(), grid.face_count());
    assert_eq!(loaded.classify_vertex(VertexId(5)), ElementClass::Interior);

    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn mixed_polygons_are_read() -> Result<()> {
    let path = temp_path("mixed.obj");
    fs::write(
        &path,
        "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nv 2 0 0\nv 2 1 0\nv 3 0.5 0\n\
         f 1 2 3 4\nf 2 5 6 3\nf 5 7 6\n",
    )?;
    let mesh = load_obj(&path)?;
    assert_eq!(mesh.face_count(), 3);
    assert_eq!(mesh.vertex_count(), 7);

    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn missing_obj_is_an_error() {
    assert!(load_obj(temp_path("does_not_exist.obj")).is_err());
}

#[test]
fn polygon_conversion_counts_faces() -> Result<()> {
    let cube = MeshBuilder::cube(2.0)?;
    let polygon = polygon_from_mesh(&cube);
    assert_eq!(polygon.positions().len(), 8);
    assert_eq!(polygon.faces().len(), 6);
    Ok(())
}

#[test]
fn partial_settings_fill_defaults() -> Result<()> {
    let path = temp_path("settings.json");
    fs::write(&path, r#"{ "pick": { "mirror_axis": "x" } }"#)?;
    let settings = load_settings(&path)?;
    assert_eq!(settings.pick.mirror_axis, Some(Axis::X));
    assert_eq!(settings.snap, ToolSettings::default().snap);

    save_settings(&settings, &path)?;
    assert_eq!(load_settings(&path)?, settings);

    let _ = fs::remove_file(&path);
    Ok(())
}

#[test]
fn invalid_settings_are_rejected() -> Result<()> {
    let path = temp_path("bad_settings.json");
    fs::write(&path, r#"{ "pick": { "highlight_radius": -1.0 } }"#)?;
    assert!(load_settings(&path).is_err());
    let _ = fs::remove_file(&path);
    Ok(())
}
