//! Long-lived resource context shared by all primitive compilations against
//! one device incarnation.

use tracing::debug;

use crate::cache::VertexLayoutCache;
use crate::device::{BufferHandle, IndexFormat, LifetimeHint, RenderDevice};
use crate::error::CompileError;
use crate::index::SINGLE_QUAD_INDICES;
use crate::vertex::VertexLayoutDesc;

/// Owns the vertex-layout cache and the shared single-quad index buffer.
///
/// Stamped with the device generation at construction; when the device is
/// recreated every handle held here is stale and teardown must not pass them
/// back to the device.
#[derive(Debug)]
pub struct GraphicsResourceContext {
    generation: u64,
    layouts: VertexLayoutCache,
    shared_quad_index: Option<BufferHandle>,
}

impl GraphicsResourceContext {
    pub fn new(device: &dyn RenderDevice) -> Self {
        Self {
            generation: device.generation(),
            layouts: VertexLayoutCache::new(),
            shared_quad_index: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn layout_cache(&self) -> &VertexLayoutCache {
        &self.layouts
    }

    /// Cached layout lookup; see [`VertexLayoutCache::get`].
    pub fn layout(
        &mut self,
        device: &dyn RenderDevice,
        desc: &VertexLayoutDesc,
    ) -> Result<crate::device::LayoutHandle, CompileError> {
        self.layouts.get(device, desc)
    }

    /// The shared index buffer covering exactly one quad, created on first
    /// use and reused by every single-quad non-indexed compilation. Never
    /// released per-primitive.
    pub fn shared_quad_index(
        &mut self,
        device: &dyn RenderDevice,
    ) -> Result<BufferHandle, CompileError> {
        if let Some(handle) = self.shared_quad_index {
            return Ok(handle);
        }
        let handle = device.create_index_buffer(
            bytemuck::cast_slice(&SINGLE_QUAD_INDICES),
            IndexFormat::Uint16,
            LifetimeHint::Static,
        )?;
        self.shared_quad_index = Some(handle);
        Ok(handle)
    }

    /// Whether `buffer` is the shared single-quad index buffer.
    pub fn is_shared_quad_index(&self, buffer: BufferHandle) -> bool {
        self.shared_quad_index == Some(buffer)
    }

    /// Releases everything held here. If the device has been recreated since
    /// this context was built, the handles are stale and are dropped without
    /// device calls.
    pub fn teardown(&mut self, device: &dyn RenderDevice) {
        if device.generation() == self.generation {
            if let Some(handle) = self.shared_quad_index.take() {
                device.destroy_buffer(handle);
            }
            self.layouts.free_all(device);
        } else {
            debug!(
                held = self.generation,
                current = device.generation(),
                "context stale at teardown, dropping handles"
            );
            self.shared_quad_index = None;
            self.layouts.clear_without_destroy();
        }
    }

    /// Teardown followed by a re-stamp against the (possibly new) device.
    pub fn reset(&mut self, device: &dyn RenderDevice) {
        self.teardown(device);
        self.generation = device.generation();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::NullDevice;

    #[test]
    fn shared_quad_index_is_created_once() {
        let device = NullDevice::new();
        let mut ctx = GraphicsResourceContext::new(&device);
        let a = ctx.shared_quad_index(&device).unwrap();
        let b = ctx.shared_quad_index(&device).unwrap();
        assert_eq!(a, b);
        assert_eq!(device.buffer_creations(), 1);
        assert_eq!(
            device.buffer_contents(a).unwrap(),
            bytemuck::cast_slice::<u16, u8>(&SINGLE_QUAD_INDICES)
        );
    }

    #[test]
    fn teardown_releases_live_handles() {
        let device = NullDevice::new();
        let mut ctx = GraphicsResourceContext::new(&device);
        ctx.shared_quad_index(&device).unwrap();
        ctx.teardown(&device);
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn stale_teardown_never_touches_the_device() {
        let device = NullDevice::new();
        let mut ctx = GraphicsResourceContext::new(&device);
        ctx.shared_quad_index(&device).unwrap();
        device.bump_generation();
        // Would panic inside NullDevice if a stale handle were destroyed.
        ctx.teardown(&device);
        assert!(!ctx.is_shared_quad_index(BufferHandle(0)));
    }

    #[test]
    fn reset_restamps_generation() {
        let device = NullDevice::new();
        let mut ctx = GraphicsResourceContext::new(&device);
        device.bump_generation();
        ctx.reset(&device);
        assert_eq!(ctx.generation(), device.generation());
    }
}
