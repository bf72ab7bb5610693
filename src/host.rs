//! Selection-driven host layer.
//!
//! The transfer core takes two explicit meshes. This module resolves them
//! from a [`Scene`] the way an interactive editor would: the *active* object
//! is the target and the other selected mesh object is the source. It also
//! records an [`UndoStep`] so a transfer can be reverted.
//!
//! # Example
//!
//! ```
//! use uvtransfer::host::{Scene, SceneObject, UvTransferOperator};
//! use uvtransfer::mesh::{build_from_polygons, Mesh};
//! use nalgebra::{Point2, Point3};
//!
//! let square = |z: f64| {
//!     let corners = vec![
//!         Point3::new(0.0, 0.0, z),
//!         Point3::new(1.0, 0.0, z),
//!         Point3::new(1.0, 1.0, z),
//!         Point3::new(0.0, 1.0, z),
//!     ];
//!     let mut mesh: Mesh = build_from_polygons(&corners, &[vec![0, 1, 2, 3]]).unwrap();
//!     mesh.add_uv_layer("UVMap", corners.iter().map(|p| Point2::new(p.x, p.y)).collect())
//!         .unwrap();
//!     mesh
//! };
//!
//! let mut scene = Scene::new();
//! let sculpt = scene.add_object(SceneObject::mesh("Sculpt", square(0.0)));
//! let cage = scene.add_object(SceneObject::mesh("Cage", square(5.0)));
//! scene.select(sculpt);
//! scene.select(cage);
//! scene.set_active(Some(cage));
//!
//! let operator = UvTransferOperator::default();
//! assert!(operator.poll(&scene));
//! let (report, undo) = operator.execute(&mut scene).unwrap();
//! assert_eq!(report.loops_matched, 4);
//!
//! undo.undo(&mut scene).unwrap();
//! ```

use nalgebra::Point3;

use crate::algo::transfer::{uv_transfer_with_progress, TransferOptions, TransferReport};
use crate::algo::Progress;
use crate::error::{Result, TransferError};
use crate::mesh::{Mesh, MeshIndex};

/// Message shown when either object lacks UVs.
pub const MISSING_UVS_MESSAGE: &str = "Please make sure both objects have UVs";

/// Identifies an object within a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Position of the object in the scene.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Data carried by a scene object.
#[derive(Debug, Clone)]
pub enum ObjectData<I: MeshIndex = u32> {
    /// A polygon mesh.
    Mesh(Mesh<I>),
    /// An object without geometry (empty, light, camera...).
    Empty,
}

/// A named object in a scene.
#[derive(Debug, Clone)]
pub struct SceneObject<I: MeshIndex = u32> {
    /// Object name, unique by convention.
    pub name: String,
    /// Attached data.
    pub data: ObjectData<I>,
}

impl<I: MeshIndex> SceneObject<I> {
    /// Create a mesh object.
    pub fn mesh(name: impl Into<String>, mesh: Mesh<I>) -> Self {
        Self {
            name: name.into(),
            data: ObjectData::Mesh(mesh),
        }
    }

    /// Create an object without geometry.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: ObjectData::Empty,
        }
    }

    /// Whether the object is a mesh.
    pub fn is_mesh(&self) -> bool {
        matches!(self.data, ObjectData::Mesh(_))
    }

    /// The mesh, if this is a mesh object.
    pub fn as_mesh(&self) -> Option<&Mesh<I>> {
        match &self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            ObjectData::Empty => None,
        }
    }

    /// Mutable access to the mesh, if this is a mesh object.
    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh<I>> {
        match &mut self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            ObjectData::Empty => None,
        }
    }
}

/// A collection of objects with a selection and an active object.
#[derive(Debug, Clone)]
pub struct Scene<I: MeshIndex = u32> {
    objects: Vec<SceneObject<I>>,
    /// Selected objects in selection order.
    selected: Vec<ObjectId>,
    active: Option<ObjectId>,
}

impl<I: MeshIndex> Default for Scene<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> Scene<I> {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            selected: Vec::new(),
            active: None,
        }
    }

    /// Add an object and return its ID. The object starts unselected.
    pub fn add_object(&mut self, object: SceneObject<I>) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the scene has no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Get an object.
    pub fn object(&self, id: ObjectId) -> Option<&SceneObject<I>> {
        self.objects.get(id.0)
    }

    /// Get an object mutably.
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject<I>> {
        self.objects.get_mut(id.0)
    }

    /// Find an object by name.
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().position(|o| o.name == name).map(ObjectId)
    }

    /// Add an object to the selection.
    pub fn select(&mut self, id: ObjectId) {
        if id.0 < self.objects.len() && !self.selected.contains(&id) {
            self.selected.push(id);
        }
    }

    /// Remove an object from the selection.
    pub fn deselect(&mut self, id: ObjectId) {
        self.selected.retain(|&s| s != id);
    }

    /// Clear the selection.
    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    /// Selected objects in selection order.
    pub fn selected(&self) -> &[ObjectId] {
        &self.selected
    }

    /// Set or clear the active object.
    pub fn set_active(&mut self, id: Option<ObjectId>) {
        self.active = id.filter(|id| id.0 < self.objects.len());
    }

    /// The active object.
    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    /// Borrow the source mesh immutably and the target mesh mutably.
    fn mesh_pair(
        &mut self,
        source: ObjectId,
        target: ObjectId,
    ) -> Result<(&Mesh<I>, &mut Mesh<I>)> {
        if source == target {
            return Err(TransferError::invalid_state(
                "source and target must be different objects",
            ));
        }
        if source.0 >= self.objects.len() || target.0 >= self.objects.len() {
            return Err(TransferError::invalid_state("object is not part of the scene"));
        }

        let (source_obj, target_obj) = if source.0 < target.0 {
            let (head, tail) = self.objects.split_at_mut(target.0);
            (&head[source.0], &mut tail[0])
        } else {
            let (head, tail) = self.objects.split_at_mut(source.0);
            (&tail[0], &mut head[target.0])
        };

        let target_name = target_obj.name.clone();
        let source_mesh = source_obj
            .as_mesh()
            .ok_or_else(|| TransferError::InvalidObjectType {
                name: source_obj.name.clone(),
            })?;
        let target_mesh = target_obj
            .as_mesh_mut()
            .ok_or(TransferError::InvalidObjectType { name: target_name })?;
        Ok((source_mesh, target_mesh))
    }
}

/// The two objects taking part in a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferPair {
    /// Object whose positions are read.
    pub source: ObjectId,
    /// Object whose positions are overwritten (the active object).
    pub target: ObjectId,
}

/// Resolve the source and target objects from the selection.
///
/// Requires an active mesh object and exactly two selected mesh objects. The
/// active object is the target; the other selected object is the source.
pub fn resolve_pair<I: MeshIndex>(scene: &Scene<I>) -> Result<TransferPair> {
    let target = scene
        .active()
        .ok_or_else(|| TransferError::invalid_state("no active object"))?;
    let target_obj = scene
        .object(target)
        .ok_or_else(|| TransferError::invalid_state("active object is not part of the scene"))?;
    if !target_obj.is_mesh() {
        return Err(TransferError::InvalidObjectType {
            name: target_obj.name.clone(),
        });
    }

    let selected = scene.selected();
    if selected.len() != 2 {
        return Err(TransferError::InsufficientSelection {
            selected: selected.len(),
        });
    }
    for &id in selected {
        if let Some(obj) = scene.object(id).filter(|o| !o.is_mesh()) {
            return Err(TransferError::InvalidObjectType {
                name: obj.name.clone(),
            });
        }
    }

    let source = selected
        .iter()
        .copied()
        .find(|&id| id != target)
        .ok_or(TransferError::InsufficientSelection { selected: 1 })?;

    Ok(TransferPair { source, target })
}

/// Snapshot of a target's positions taken before a transfer.
#[derive(Debug, Clone)]
pub struct UndoStep {
    object: ObjectId,
    positions: Vec<Point3<f64>>,
}

impl UndoStep {
    /// The object this step restores.
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Restore the recorded positions.
    pub fn undo<I: MeshIndex>(self, scene: &mut Scene<I>) -> Result<()> {
        let obj = scene
            .object_mut(self.object)
            .ok_or_else(|| TransferError::invalid_state("undo target no longer exists"))?;
        let name = obj.name.clone();
        let mesh = obj
            .as_mesh_mut()
            .ok_or(TransferError::InvalidObjectType { name })?;
        mesh.set_positions(&self.positions)
    }
}

/// Transfers vertex positions from the selected mesh onto the active mesh by
/// nearest UV coordinate.
#[derive(Debug, Clone, Default)]
pub struct UvTransferOperator {
    /// Transfer options.
    pub options: TransferOptions,
}

impl UvTransferOperator {
    /// Create an operator with the given options.
    pub fn new(options: TransferOptions) -> Self {
        Self { options }
    }

    /// Whether the operator can run on the current selection.
    pub fn poll<I: MeshIndex>(&self, scene: &Scene<I>) -> bool {
        resolve_pair(scene).is_ok()
    }

    /// Run the transfer and return its report with an undo step.
    ///
    /// Fails before any mutation if the selection is invalid or either mesh
    /// lacks UVs.
    pub fn execute<I: MeshIndex>(
        &self,
        scene: &mut Scene<I>,
    ) -> Result<(TransferReport, UndoStep)> {
        self.execute_with_progress(scene, &Progress::none())
    }

    /// [`UvTransferOperator::execute`] with progress reporting.
    pub fn execute_with_progress<I: MeshIndex>(
        &self,
        scene: &mut Scene<I>,
        progress: &Progress,
    ) -> Result<(TransferReport, UndoStep)> {
        let pair = resolve_pair(scene)?;
        let (source, target) = scene.mesh_pair(pair.source, pair.target)?;

        let snapshot = target.positions();
        let report = uv_transfer_with_progress(source, target, &self.options, progress)?;

        Ok((
            report,
            UndoStep {
                object: pair.target,
                positions: snapshot,
            },
        ))
    }
}

/// A message suitable for showing to the user.
///
/// Precondition failures explain what to change in the selection; other
/// errors are reported as they are.
pub fn user_message(err: &TransferError) -> String {
    match err {
        TransferError::MissingUvData { .. } => MISSING_UVS_MESSAGE.to_string(),
        other if other.is_precondition() => format!(
            "{}; select exactly two mesh objects and make the target active",
            other
        ),
        other => other.to_string(),
    }
}
