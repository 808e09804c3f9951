//! In-memory [`RenderDevice`] for tests.
//!
//! Records every creation, destruction and draw, validates synthesized
//! shader modules the way a real backend would, and panics if a handle from
//! a previous device generation reaches it. Supports fail-after-N injection
//! for unwind testing.

use std::cell::RefCell;

use hashbrown::HashMap;

use crate::device::{
    BufferHandle, DrawCall, IndexFormat, LayoutHandle, LifetimeHint, NativeVertexElement,
    RenderDevice,
};
use crate::error::DeviceError;
use helio_dxbc::{parse_signature_chunk, DxbcContainer, CHUNK_ISGN};

#[derive(Debug, Clone)]
pub struct BufferRecord {
    pub contents: Vec<u8>,
    pub hint: LifetimeHint,
    /// `Some` for index buffers.
    pub index_format: Option<IndexFormat>,
}

#[derive(Debug, Clone)]
pub struct LayoutRecord {
    pub elements: Vec<NativeVertexElement>,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    generation: u64,
    buffers: HashMap<u64, BufferRecord>,
    layouts: HashMap<u64, LayoutRecord>,
    buffer_creations: u64,
    layout_creations: u64,
    /// `Some(n)`: the next `n` creations succeed, then every creation fails.
    allow_creations: Option<u32>,
    draws: Vec<DrawCall>,
}

impl State {
    fn take_creation_budget(&mut self) -> Result<(), DeviceError> {
        match &mut self.allow_creations {
            None => Ok(()),
            Some(0) => Err(DeviceError::OutOfMemory),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Recording device double. Interior mutability so it satisfies the
/// `&self`-based [`RenderDevice`] surface.
#[derive(Debug, Default)]
pub struct NullDevice {
    state: RefCell<State>,
}

impl NullDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates device loss and recreation: bumps the generation and forgets
    /// every live resource, so any later touch of an old handle panics.
    pub fn bump_generation(&self) {
        let mut s = self.state.borrow_mut();
        s.generation += 1;
        s.buffers.clear();
        s.layouts.clear();
    }

    /// The next `n` creation calls succeed; every one after that fails with
    /// [`DeviceError::OutOfMemory`].
    pub fn fail_after_creations(&self, n: u32) {
        self.state.borrow_mut().allow_creations = Some(n);
    }

    pub fn buffer_creations(&self) -> u64 {
        self.state.borrow().buffer_creations
    }

    pub fn layout_creations(&self) -> u64 {
        self.state.borrow().layout_creations
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_layouts(&self) -> usize {
        self.state.borrow().layouts.len()
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .buffers
            .get(&buffer.0)
            .map(|r| r.contents.clone())
    }

    pub fn buffer_index_format(&self, buffer: BufferHandle) -> Option<IndexFormat> {
        self.state
            .borrow()
            .buffers
            .get(&buffer.0)
            .and_then(|r| r.index_format)
    }

    pub fn layout_elements(&self, layout: LayoutHandle) -> Option<Vec<NativeVertexElement>> {
        self.state
            .borrow()
            .layouts
            .get(&layout.0)
            .map(|r| r.elements.clone())
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.state.borrow().draws.clone()
    }

    pub fn draw_count(&self) -> usize {
        self.state.borrow().draws.len()
    }
}

/// Validates `module` the way a backend would before accepting an input
/// layout: container well-formed, digest correct, input signature matching
/// the bound elements one-to-one.
fn validate_shader_module(
    elements: &[NativeVertexElement],
    module: &[u8],
) -> Result<(), DeviceError> {
    let container = DxbcContainer::parse(module)
        .map_err(|e| DeviceError::InvalidShaderModule(e.to_string()))?;
    if !container.checksum_matches() {
        return Err(DeviceError::InvalidShaderModule(
            "container digest mismatch".into(),
        ));
    }
    let isgn = container
        .get_chunk(CHUNK_ISGN)
        .ok_or_else(|| DeviceError::InvalidShaderModule("missing input signature".into()))?;
    let records = parse_signature_chunk(isgn.data)
        .map_err(|e| DeviceError::InvalidShaderModule(e.to_string()))?;
    if records.len() != elements.len() {
        return Err(DeviceError::InvalidShaderModule(format!(
            "signature declares {} inputs, layout binds {}",
            records.len(),
            elements.len()
        )));
    }
    for (record, element) in records.iter().zip(elements) {
        if record.semantic_name != element.semantic.name()
            || record.semantic_index != element.semantic.index()
        {
            return Err(DeviceError::InvalidShaderModule(format!(
                "signature input {}{} does not match element {:?}",
                record.semantic_name, record.semantic_index, element.semantic
            )));
        }
    }
    Ok(())
}

impl RenderDevice for NullDevice {
    fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    fn max_vertex_attributes(&self) -> u32 {
        16
    }

    fn create_vertex_buffer(
        &self,
        contents: &[u8],
        hint: LifetimeHint,
    ) -> Result<BufferHandle, DeviceError> {
        let mut s = self.state.borrow_mut();
        s.take_creation_budget()?;
        s.buffer_creations += 1;
        let id = s.next_id();
        s.buffers.insert(
            id,
            BufferRecord {
                contents: contents.to_vec(),
                hint,
                index_format: None,
            },
        );
        Ok(BufferHandle(id))
    }

    fn create_index_buffer(
        &self,
        contents: &[u8],
        format: IndexFormat,
        hint: LifetimeHint,
    ) -> Result<BufferHandle, DeviceError> {
        assert_eq!(
            contents.len() % format.byte_size() as usize,
            0,
            "index buffer size not a multiple of the element width"
        );
        let mut s = self.state.borrow_mut();
        s.take_creation_budget()?;
        s.buffer_creations += 1;
        let id = s.next_id();
        s.buffers.insert(
            id,
            BufferRecord {
                contents: contents.to_vec(),
                hint,
                index_format: Some(format),
            },
        );
        Ok(BufferHandle(id))
    }

    fn create_input_layout(
        &self,
        elements: &[NativeVertexElement],
        shader_module: &[u8],
    ) -> Result<LayoutHandle, DeviceError> {
        validate_shader_module(elements, shader_module)?;
        let mut s = self.state.borrow_mut();
        s.take_creation_budget()?;
        s.layout_creations += 1;
        let id = s.next_id();
        s.layouts.insert(
            id,
            LayoutRecord {
                elements: elements.to_vec(),
            },
        );
        Ok(LayoutHandle(id))
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        let mut s = self.state.borrow_mut();
        assert!(
            s.buffers.remove(&buffer.0).is_some(),
            "destroy of unknown or stale buffer {buffer:?}"
        );
    }

    fn destroy_input_layout(&self, layout: LayoutHandle) {
        let mut s = self.state.borrow_mut();
        assert!(
            s.layouts.remove(&layout.0).is_some(),
            "destroy of unknown or stale layout {layout:?}"
        );
    }

    fn draw(&self, call: &DrawCall) {
        let mut s = self.state.borrow_mut();
        assert!(
            s.buffers.contains_key(&call.vertex_buffer.0),
            "draw with unknown or stale vertex buffer"
        );
        assert!(
            s.layouts.contains_key(&call.layout.0),
            "draw with unknown or stale layout"
        );
        if let Some((buffer, _)) = call.index_buffer {
            assert!(
                s.buffers.contains_key(&buffer.0),
                "draw with unknown or stale index buffer"
            );
        }
        s.draws.push(call.clone());
    }
}
