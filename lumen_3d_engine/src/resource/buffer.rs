//! Buffer with its backing memory

use std::sync::Arc;
use crate::error::{Lumen3dError, Lumen3dResult};
use crate::device::{BufferDesc, BufferHandle, GraphicsDevice, MemoryHandle};
use crate::resource::Owned;

/// GPU buffer and the memory bound to it
///
/// Field order is drop order: the buffer is destroyed before its memory is freed.
#[derive(Debug, Default)]
pub struct Buffer {
    buffer: Owned<BufferHandle>,
    memory: Owned<MemoryHandle>,
    size: u64,
}

impl Buffer {
    pub fn new(device: &Arc<dyn GraphicsDevice>, desc: &BufferDesc) -> Lumen3dResult<Self> {
        let (buffer, memory) = device.create_buffer(desc)?;
        Ok(Self {
            buffer: Owned::new(device, buffer),
            memory: Owned::new(device, memory),
            size: desc.size,
        })
    }

    pub fn null() -> Self {
        Self::default()
    }

    pub fn is_null(&self) -> bool {
        self.buffer.is_null()
    }

    pub fn handle(&self) -> BufferHandle {
        self.buffer.handle()
    }

    pub fn memory(&self) -> MemoryHandle {
        self.memory.handle()
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Write into host-visible memory
    pub fn write(&self, offset: u64, data: &[u8]) -> Lumen3dResult<()> {
        let device = self
            .memory
            .device()
            .ok_or_else(|| Lumen3dError::InvalidResource("write to a null buffer".to_string()))?;
        if offset + data.len() as u64 > self.size {
            return Err(Lumen3dError::InvalidResource(format!(
                "write of {} bytes at {} overflows buffer of {} bytes",
                data.len(), offset, self.size
            )));
        }
        device.write_memory(self.memory.handle(), offset, data)
    }
}
