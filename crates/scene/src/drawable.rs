//! Drawable objects and the registry that owns them.
//!
//! Meshes are shared: many drawables may hold the same `Arc<M>`. Everything
//! else on a drawable is owned by it. Ids come from the registry's
//! [`IdAllocator`], never from global state.

use std::sync::Arc;

use glam::Vec3;
use tracing::debug;

use crate::transform::TransformComponent;

/// Drawable identifier, unique within one registry.
pub type DrawableId = u32;

/// Hands out increasing ids.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: DrawableId,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator whose first id is `first`.
    pub fn starting_at(first: DrawableId) -> Self {
        Self { next: first }
    }

    /// Returns the next id.
    ///
    /// # Panics
    ///
    /// Panics once the id space is exhausted.
    pub fn allocate(&mut self) -> DrawableId {
        let id = self.next;
        self.next = self
            .next
            .checked_add(1)
            .unwrap_or_else(|| panic!("drawable id space exhausted"));
        id
    }

    /// Id the next call to [`IdAllocator::allocate`] returns.
    pub fn peek(&self) -> DrawableId {
        self.next
    }
}

/// Marks a drawable as a point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLightComponent {
    pub intensity: f32,
    /// Billboard radius in world units.
    pub radius: f32,
}

impl Default for PointLightComponent {
    fn default() -> Self {
        Self {
            intensity: 1.0,
            radius: 0.1,
        }
    }
}

/// One object in the scene.
///
/// Not `Clone`: ids are unique.
#[derive(Debug)]
pub struct Drawable<M> {
    id: DrawableId,
    pub mesh: Option<Arc<M>>,
    pub transform: TransformComponent,
    pub color: Vec3,
    pub point_light: Option<PointLightComponent>,
}

impl<M> Drawable<M> {
    fn new(id: DrawableId) -> Self {
        Self {
            id,
            mesh: None,
            transform: TransformComponent::default(),
            color: Vec3::ZERO,
            point_light: None,
        }
    }

    #[inline]
    pub fn id(&self) -> DrawableId {
        self.id
    }

    pub fn with_mesh(&mut self, mesh: Arc<M>) -> &mut Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_transform(&mut self, transform: TransformComponent) -> &mut Self {
        self.transform = transform;
        self
    }

    pub fn with_color(&mut self, color: Vec3) -> &mut Self {
        self.color = color;
        self
    }
}

/// Owns every drawable in the scene, in spawn order.
///
/// Render systems borrow the registry immutably for the whole pass, so
/// nothing can be spawned or removed while draws are being recorded.
#[derive(Debug)]
pub struct DrawableRegistry<M> {
    ids: IdAllocator,
    drawables: Vec<Drawable<M>>,
}

impl<M> Default for DrawableRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> DrawableRegistry<M> {
    pub fn new() -> Self {
        Self::with_allocator(IdAllocator::new())
    }

    pub fn with_allocator(ids: IdAllocator) -> Self {
        Self {
            ids,
            drawables: Vec::new(),
        }
    }

    /// Adds an empty drawable and returns it for setup.
    pub fn spawn(&mut self) -> &mut Drawable<M> {
        let id = self.ids.allocate();
        debug!("Spawned drawable {}", id);
        self.drawables.push(Drawable::new(id));
        let index = self.drawables.len() - 1;
        &mut self.drawables[index]
    }

    /// Adds a point light drawable at the origin.
    pub fn spawn_point_light(
        &mut self,
        intensity: f32,
        radius: f32,
        color: Vec3,
    ) -> &mut Drawable<M> {
        let drawable = self.spawn();
        drawable.color = color;
        drawable.transform.scale = Vec3::splat(radius);
        drawable.point_light = Some(PointLightComponent { intensity, radius });
        drawable
    }

    pub fn get(&self, id: DrawableId) -> Option<&Drawable<M>> {
        self.position(id).map(|index| &self.drawables[index])
    }

    pub fn get_mut(&mut self, id: DrawableId) -> Option<&mut Drawable<M>> {
        self.position(id).map(|index| &mut self.drawables[index])
    }

    /// Removes and returns a drawable. Its id is never handed out again.
    pub fn remove(&mut self, id: DrawableId) -> Option<Drawable<M>> {
        let index = self.position(id)?;
        debug!("Removed drawable {}", id);
        Some(self.drawables.remove(index))
    }

    // Ids are increasing in spawn order, and removal keeps order.
    fn position(&self, id: DrawableId) -> Option<usize> {
        self.drawables
            .binary_search_by_key(&id, Drawable::id)
            .ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Drawable<M>> {
        self.drawables.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Drawable<M>> {
        self.drawables.iter_mut()
    }

    /// Drawables that have a mesh to draw.
    pub fn with_meshes(&self) -> impl Iterator<Item = (&Drawable<M>, &M)> {
        self.drawables
            .iter()
            .filter_map(|drawable| drawable.mesh.as_deref().map(|mesh| (drawable, mesh)))
    }

    /// Drawables carrying a point light.
    pub fn point_lights(&self) -> impl Iterator<Item = (&Drawable<M>, PointLightComponent)> {
        self.drawables
            .iter()
            .filter_map(|drawable| drawable.point_light.map(|light| (drawable, light)))
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeMesh(&'static str);

    #[test]
    fn test_ids_are_sequential_and_unique() {
        let mut registry: DrawableRegistry<FakeMesh> = DrawableRegistry::new();
        let a = registry.spawn().id();
        let b = registry.spawn().id();
        let c = registry.spawn().id();
        assert_eq!((a, b, c), (0, 1, 2));
    }

    #[test]
    fn test_registries_do_not_share_ids() {
        let mut first: DrawableRegistry<FakeMesh> = DrawableRegistry::new();
        let mut second: DrawableRegistry<FakeMesh> = DrawableRegistry::new();
        first.spawn();
        first.spawn();
        assert_eq!(second.spawn().id(), 0);
    }

    #[test]
    fn test_custom_allocator() {
        let mut registry: DrawableRegistry<FakeMesh> =
            DrawableRegistry::with_allocator(IdAllocator::starting_at(100));
        assert_eq!(registry.spawn().id(), 100);
        assert_eq!(registry.spawn().id(), 101);
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut registry: DrawableRegistry<FakeMesh> = DrawableRegistry::new();
        let a = registry.spawn().id();
        let b = registry.spawn().id();
        assert!(registry.remove(a).is_some());
        assert!(registry.remove(a).is_none());
        assert!(registry.get(b).is_some());
        assert_eq!(registry.spawn().id(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_mesh_is_shared() {
        let mesh = Arc::new(FakeMesh("cube"));
        let mut registry = DrawableRegistry::new();
        registry.spawn().with_mesh(mesh.clone());
        registry.spawn().with_mesh(mesh.clone());
        assert_eq!(Arc::strong_count(&mesh), 3);

        drop(registry);
        assert_eq!(Arc::strong_count(&mesh), 1);
    }

    #[test]
    fn test_with_meshes_skips_empty_drawables() {
        let mut registry = DrawableRegistry::new();
        registry.spawn().with_mesh(Arc::new(FakeMesh("cube")));
        registry.spawn();
        registry.spawn_point_light(1.0, 0.1, Vec3::ONE);
        registry.spawn().with_mesh(Arc::new(FakeMesh("quad")));

        let names: Vec<&str> = registry.with_meshes().map(|(_, mesh)| mesh.0).collect();
        assert_eq!(names, vec!["cube", "quad"]);
    }

    #[test]
    fn test_point_lights() {
        let mut registry: DrawableRegistry<FakeMesh> = DrawableRegistry::new();
        registry.spawn();
        let light = registry.spawn_point_light(0.5, 0.2, Vec3::X).id();

        let lights: Vec<_> = registry.point_lights().collect();
        assert_eq!(lights.len(), 1);
        assert_eq!(lights[0].0.id(), light);
        assert_eq!(lights[0].1.intensity, 0.5);
        assert_eq!(lights[0].0.transform.scale, Vec3::splat(0.2));
    }

    #[test]
    fn test_get_mut_updates_transform() {
        let mut registry: DrawableRegistry<FakeMesh> = DrawableRegistry::new();
        let id = registry.spawn().id();
        if let Some(drawable) = registry.get_mut(id) {
            drawable.transform.translation = Vec3::new(1.0, 2.0, 3.0);
        }
        assert_eq!(
            registry.get(id).map(|d| d.transform.translation),
            Some(Vec3::new(1.0, 2.0, 3.0))
        );
    }
}
