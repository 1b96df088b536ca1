use retopo_base::{MeshId, SnapSettings};
use retopo_geometry::{Matrix4, SquareMatrix};
use retopo_mesh::Mesh;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ObjectKind {
    #[default]
    Mesh,
    Curve,
    Empty,
}

#[derive(Clone, Debug)]
pub struct MeshObject {
    pub id: MeshId,
    pub name: String,
    pub kind: ObjectKind,
    pub visible: bool,
    pub pass_index: u32,
    pub matrix_world: Matrix4<f64>,
    pub mesh: Mesh,
}

impl MeshObject {
    pub fn new(name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            id: MeshId::new(),
            name: name.into(),
            kind: ObjectKind::Mesh,
            visible: true,
            pass_index: 0,
            matrix_world: Matrix4::identity(),
            mesh,
        }
    }

    pub fn with_matrix(mut self, matrix_world: Matrix4<f64>) -> Self {
        self.matrix_world = matrix_world;
        self
    }

    pub fn with_pass_index(mut self, pass_index: u32) -> Self {
        self.pass_index = pass_index;
        self
    }

    pub fn with_kind(mut self, kind: ObjectKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Objects visible to the snap engine plus the one being edited.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub objects: Vec<MeshObject>,
    pub active: Option<MeshId>,
    pub snap: SnapSettings,
}

impl Scene {
    pub fn new(snap: SnapSettings) -> Self {
        Self {
            snap,
            ..Self::default()
        }
    }

    pub fn add(&mut self, object: MeshObject) -> MeshId {
        let id = object.id;
        self.objects.push(object);
        id
    }

    pub fn object(&self, id: MeshId) -> Option<&MeshObject> {
        self.objects.iter().find(|object| object.id == id)
    }

    pub fn object_mut(&mut self, id: MeshId) -> Option<&mut MeshObject> {
        self.objects.iter_mut().find(|object| object.id == id)
    }

    /// Visible mesh objects other than the active one.
    pub fn snap_candidates(&self) -> impl Iterator<Item = &MeshObject> {
        self.objects.iter().filter(move |object| {
            object.visible && object.kind == ObjectKind::Mesh && Some(object.id) != self.active
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retopo_mesh::MeshBuilder;

    #[test]
    fn candidates_skip_active_hidden_and_non_mesh() {
        let mut scene = Scene::default();
        let quad = MeshBuilder::quad(1.0).unwrap();
        let keep = scene.add(MeshObject::new("keep", quad.clone()));
        let active = scene.add(MeshObject::new("active", quad.clone()));
        let mut hidden = MeshObject::new("hidden", quad.clone());
        hidden.visible = false;
        scene.add(hidden);
        scene.add(MeshObject::new("curve", quad).with_kind(ObjectKind::Curve));
        scene.active = Some(active);

        let ids: Vec<MeshId> = scene.snap_candidates().map(|object| object.id).collect();
        assert_eq!(ids, vec![keep]);
    }
}
