//! Vertex-layout cache.
//!
//! Device layout objects are expensive to create (each needs a synthesized
//! shader module for signature validation), so they are cached keyed by the
//! structural vertex declaration. Entries carry a reference count that grows
//! on every hit; individual release is not exposed, the cache is torn down
//! wholesale via [`VertexLayoutCache::free_all`].

use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use tracing::debug;

use crate::device::{LayoutHandle, NativeVertexElement, RenderDevice};
use crate::error::{CompileError, DeviceError};
use crate::vertex::format_map::{map_element_format, register_component_class};
use crate::vertex::VertexLayoutDesc;
use helio_dxbc::{synthesize_vertex_module, InputSignatureElement};

#[derive(Debug)]
struct CachedLayout {
    handle: LayoutHandle,
    refcount: u64,
}

/// Cache of device vertex-layout objects keyed by declaration.
#[derive(Debug, Default)]
pub struct VertexLayoutCache {
    entries: HashMap<VertexLayoutDesc, CachedLayout>,
    hits: u64,
    misses: u64,
}

impl VertexLayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    #[cfg(test)]
    pub(crate) fn refcount_of(&self, desc: &VertexLayoutDesc) -> Option<u64> {
        self.entries.get(desc).map(|e| e.refcount)
    }

    /// Returns the layout handle for `desc`, creating and inserting it on a
    /// miss.
    ///
    /// The descriptor must already be in native form (aligned offsets, no
    /// conversions); the compiler guarantees that by repacking first. If the
    /// cache cannot reserve room for the new entry, the freshly created
    /// device object is destroyed and the call fails; an uncached handle is
    /// never handed out.
    pub fn get(
        &mut self,
        device: &dyn RenderDevice,
        desc: &VertexLayoutDesc,
    ) -> Result<LayoutHandle, CompileError> {
        if let Some(entry) = self.entries.get_mut(desc) {
            entry.refcount += 1;
            self.hits += 1;
            return Ok(entry.handle);
        }
        self.misses += 1;

        let elements = native_elements(desc)?;
        let module = synthesized_module(desc)?;
        let handle = device.create_input_layout(&elements, &module)?;

        if self.entries.try_reserve(1).is_err() {
            device.destroy_input_layout(handle);
            return Err(CompileError::Device(DeviceError::OutOfMemory));
        }
        match self.entries.entry(desc.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(CachedLayout {
                    handle,
                    refcount: 1,
                });
            }
            // get_mut above rules this out.
            Entry::Occupied(_) => unreachable!("layout inserted twice"),
        }
        debug!(attributes = desc.attributes.len(), cached = self.entries.len(), "vertex layout created");
        Ok(handle)
    }

    /// Destroys every cached layout object and empties the cache.
    pub fn free_all(&mut self, device: &dyn RenderDevice) {
        for (_, entry) in self.entries.drain() {
            device.destroy_input_layout(entry.handle);
        }
    }

    /// Empties the cache without touching the device. For teardown after the
    /// underlying device is already gone.
    pub fn clear_without_destroy(&mut self) {
        self.entries.clear();
    }
}

fn native_elements(desc: &VertexLayoutDesc) -> Result<Vec<NativeVertexElement>, CompileError> {
    let mut out = Vec::with_capacity(desc.attributes.len());
    for attr in &desc.attributes {
        let format = map_element_format(attr.ty, attr.components)?;
        out.push(NativeVertexElement {
            semantic: attr.semantic,
            format: format.format,
            offset: attr.offset,
        });
    }
    Ok(out)
}

fn synthesized_module(desc: &VertexLayoutDesc) -> Result<Vec<u8>, CompileError> {
    let elements: Vec<InputSignatureElement> = desc
        .attributes
        .iter()
        .enumerate()
        .map(|(register, attr)| InputSignatureElement {
            semantic_name: attr.semantic.name(),
            semantic_index: attr.semantic.index(),
            register: register as u32,
            component_count: attr.components,
            component_class: register_component_class(attr.ty),
        })
        .collect();
    Ok(synthesize_vertex_module(&elements)?)
}
