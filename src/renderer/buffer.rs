//! Instance buffers
//!
//! `GrowableBuffer` is the CPU-side arena filled during a frame;
//! `GpuInstanceBuffer` is its GPU mirror. Both double when full and never
//! shrink, so steady-state frames allocate nothing.

use bytemuck::Pod;

/// Smallest capacity either buffer will allocate
pub const MIN_CAPACITY: usize = 64;

/// Capacity after growing `current` until it holds `needed` items
pub fn grown_capacity(current: usize, needed: usize) -> usize {
    let mut capacity = current.max(MIN_CAPACITY);
    while capacity < needed {
        capacity *= 2;
    }
    capacity
}

/// Append-only arena of plain-old-data instances
#[derive(Debug, Clone)]
pub struct GrowableBuffer<T: Pod> {
    items: Vec<T>,
    capacity: usize,
}

impl<T: Pod> Default for GrowableBuffer<T> {
    fn default() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }
}

impl<T: Pod> GrowableBuffer<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Bytes per element
    pub const fn stride() -> usize {
        std::mem::size_of::<T>()
    }

    /// Reset the length; storage is kept
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.capacity *= 2;
            self.items.reserve_exact(self.capacity - self.items.len());
        }
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.items)
    }
}

/// Vertex buffer holding one instance array, regrown on demand
pub struct GpuInstanceBuffer {
    buffer: wgpu::Buffer,
    /// Capacity in elements
    capacity: usize,
    stride: usize,
    label: &'static str,
    /// Instances written by the last upload
    len: u32,
}

impl GpuInstanceBuffer {
    pub fn new<T: Pod>(device: &wgpu::Device, label: &'static str) -> Self {
        let stride = std::mem::size_of::<T>();
        Self {
            buffer: Self::allocate(device, label, MIN_CAPACITY * stride),
            capacity: MIN_CAPACITY,
            stride,
            label,
            len: 0,
        }
    }

    fn allocate(device: &wgpu::Device, label: &'static str, size: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: size as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Copy the arena to the GPU, growing first if it no longer fits
    pub fn upload<T: Pod>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &GrowableBuffer<T>,
    ) {
        debug_assert_eq!(self.stride, std::mem::size_of::<T>());
        if data.len() > self.capacity {
            self.capacity = grown_capacity(self.capacity, data.len());
            self.buffer = Self::allocate(device, self.label, self.capacity * self.stride);
            log::debug!("{} grown to {} instances", self.label, self.capacity);
        }
        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, data.as_bytes());
        }
        self.len = data.len() as u32;
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..(self.len as usize * self.stride) as wgpu::BufferAddress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_doubles() {
        let mut buf: GrowableBuffer<[f32; 2]> = GrowableBuffer::with_capacity(4);
        for i in 0..9 {
            buf.push([i as f32, 0.0]);
        }
        assert_eq!(buf.len(), 9);
        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.as_bytes().len(), 9 * GrowableBuffer::<[f32; 2]>::stride());
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut buf: GrowableBuffer<u32> = GrowableBuffer::with_capacity(2);
        for i in 0..5 {
            buf.push(i);
        }
        let capacity = buf.capacity();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), capacity);
        buf.push(7);
        assert_eq!(buf.as_slice(), &[7]);
    }

    #[test]
    fn test_grown_capacity() {
        assert_eq!(grown_capacity(0, 1), MIN_CAPACITY);
        assert_eq!(grown_capacity(64, 65), 128);
        assert_eq!(grown_capacity(64, 500), 512);
        assert_eq!(grown_capacity(256, 10), 256);
    }
}
