//! Guest memory transfers (`SURFACE_DMA`).
//!
//! Every transfer goes through the level's shadow, which doubles as the whole-level
//! scratch buffer: partial readback of block-compressed data is not possible, so the host
//! image is synced into the shadow in full, patched or copied box by box at the guest's
//! pitch, and written back in full.

use core::fmt;
use std::cell::{Ref, RefCell};
use std::collections::HashMap;

use svga3d_protocol::state::TransferType;
use svga3d_protocol::{CopyBox, GuestImage, GuestPtr, SurfaceImageId};

use crate::context::Host;
use crate::error::CommandError;
use crate::format::FormatConverter;
use crate::surface::{BackingKind, MipLevel, Surface};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuestMemoryError {
    pub gmr_id: u32,
    pub offset: u64,
    pub len: usize,
}

impl fmt::Display for GuestMemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "guest memory access out of bounds: gmr={}, offset=0x{:x}, len=0x{:x}",
            self.gmr_id, self.offset, self.len
        )
    }
}

impl std::error::Error for GuestMemoryError {}

impl From<GuestMemoryError> for CommandError {
    fn from(err: GuestMemoryError) -> Self {
        CommandError::GuestMemory(err.to_string())
    }
}

/// Guest memory regions (GMRs) as seen by the device.
pub trait GuestMemory {
    fn read(&self, gmr_id: u32, offset: u64, dst: &mut [u8]) -> Result<(), GuestMemoryError>;
    fn write(&self, gmr_id: u32, offset: u64, src: &[u8]) -> Result<(), GuestMemoryError>;
}

/// In-memory regions keyed by GMR id, for tests and tools.
#[derive(Clone, Debug, Default)]
pub struct VecGuestMemory {
    regions: RefCell<HashMap<u32, Vec<u8>>>,
}

impl VecGuestMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (or replaces) region `gmr_id` as `size` zero bytes.
    pub fn define_region(&self, gmr_id: u32, size: usize) {
        self.regions.borrow_mut().insert(gmr_id, vec![0; size]);
    }

    pub fn region(&self, gmr_id: u32) -> Option<Ref<'_, [u8]>> {
        Ref::filter_map(self.regions.borrow(), |r| r.get(&gmr_id).map(Vec::as_slice)).ok()
    }

    fn span(gmr_id: u32, offset: u64, len: usize, region_len: usize) -> Result<core::ops::Range<usize>, GuestMemoryError> {
        let err = GuestMemoryError { gmr_id, offset, len };
        let start = usize::try_from(offset).map_err(|_| err.clone())?;
        let end = start.checked_add(len).ok_or(err.clone())?;
        if end > region_len {
            return Err(err);
        }
        Ok(start..end)
    }
}

impl GuestMemory for VecGuestMemory {
    fn read(&self, gmr_id: u32, offset: u64, dst: &mut [u8]) -> Result<(), GuestMemoryError> {
        let regions = self.regions.borrow();
        let region = regions.get(&gmr_id).ok_or(GuestMemoryError {
            gmr_id,
            offset,
            len: dst.len(),
        })?;
        let range = Self::span(gmr_id, offset, dst.len(), region.len())?;
        dst.copy_from_slice(&region[range]);
        Ok(())
    }

    fn write(&self, gmr_id: u32, offset: u64, src: &[u8]) -> Result<(), GuestMemoryError> {
        let mut regions = self.regions.borrow_mut();
        let region = regions.get_mut(&gmr_id).ok_or(GuestMemoryError {
            gmr_id,
            offset,
            len: src.len(),
        })?;
        let range = Self::span(gmr_id, offset, src.len(), region.len())?;
        region[range].copy_from_slice(src);
        Ok(())
    }
}

/// A copy box clipped to the level and converted to block units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BlockSpan {
    /// Host origin, in blocks.
    x: u32,
    y: u32,
    z: u32,
    /// Guest origin, in blocks.
    src_x: u32,
    src_y: u32,
    src_z: u32,
    /// Extent in blocks.
    w: u32,
    h: u32,
    d: u32,
}

fn block_span(surface: &Surface, level: &MipLevel, b: &CopyBox) -> Result<Option<BlockSpan>, CommandError> {
    let block = surface.host_format.block;
    let size = level.size;
    let aligned = |v: u32, unit: u32| v % unit == 0;
    if !aligned(b.x, block.width)
        || !aligned(b.y, block.height)
        || !aligned(b.srcx, block.width)
        || !aligned(b.srcy, block.height)
    {
        return Err(CommandError::InvalidBox { sid: surface.sid });
    }
    if b.x >= size.width || b.y >= size.height || b.z >= size.depth {
        return Err(CommandError::InvalidBox { sid: surface.sid });
    }
    let w = b.w.min(size.width - b.x);
    let h = b.h.min(size.height - b.y);
    let d = b.d.min(size.depth - b.z);
    if w == 0 || h == 0 || d == 0 {
        return Ok(None);
    }
    Ok(Some(BlockSpan {
        x: b.x / block.width,
        y: b.y / block.height,
        z: b.z,
        src_x: b.srcx / block.width,
        src_y: b.srcy / block.height,
        src_z: b.srcz,
        w: block.blocks_wide(w),
        h: block.blocks_high(h),
        d,
    }))
}

/// Moves the boxes of one surface image between guest memory and the host.
///
/// `guest.pitch == 0` means the guest rows are laid out at the level's own pitch.
#[allow(clippy::too_many_arguments)]
pub fn surface_dma(
    surface: &mut Surface,
    host: &mut Host,
    converter: &mut dyn FormatConverter,
    memory: &dyn GuestMemory,
    guest: GuestImage,
    image: SurfaceImageId,
    transfer: TransferType,
    boxes: &[CopyBox],
) -> Result<(), CommandError> {
    surface.check_image(image.face, image.mipmap)?;
    if surface.kind() == BackingKind::Renderbuffer {
        return Err(CommandError::Unsupported("dma to a renderbuffer surface"));
    }
    if surface.is_depth() && surface.is_backed() {
        return Err(CommandError::Unsupported("dma to a backed depth/stencil surface"));
    }
    let write = match transfer {
        TransferType::WriteHostVram => true,
        TransferType::ReadHostVram => false,
        TransferType::Invalid => return Err(CommandError::unknown("transfer type", transfer.as_u32())),
    };

    let (spans, level_pitch, level_rows) = {
        let level = surface
            .level(image.face, image.mipmap)
            .ok_or(CommandError::InvalidImage {
                sid: image.sid,
                face: image.face,
                mipmap: image.mipmap,
            })?;
        let mut spans = Vec::with_capacity(boxes.len());
        for b in boxes {
            if let Some(span) = block_span(surface, level, b)? {
                spans.push(span);
            }
        }
        (spans, level.pitch, level.rows)
    };
    if spans.is_empty() {
        return Ok(());
    }
    let block_bytes = surface.host_format.block.bytes;
    let guest_pitch = if guest.pitch == 0 { level_pitch } else { guest.pitch };
    let guest_slice = u64::from(guest_pitch) * u64::from(level_rows);

    tracing::debug!(
        sid = image.sid,
        face = image.face,
        mip = image.mipmap,
        %transfer,
        boxes = spans.len(),
        "surface dma"
    );

    // The host may hold rendered contents the shadow has not seen.
    surface.sync_level(host, image.face, image.mipmap)?;

    {
        let level = surface
            .level_mut(image.face, image.mipmap)
            .ok_or(CommandError::InvalidImage {
                sid: image.sid,
                face: image.face,
                mipmap: image.mipmap,
            })?;
        let host_slice = level.slice_bytes();
        // Writes land in a whole-level scratch copy so a guest fault part way through
        // leaves the shadow untouched.
        let mut scratch = Vec::new();
        let target: &mut [u8] = if write {
            scratch.try_reserve_exact(level.data.len())?;
            scratch.extend_from_slice(&level.data);
            &mut scratch
        } else {
            &mut level.data
        };
        for s in &spans {
            let row_bytes = (s.w * block_bytes) as usize;
            for z in 0..s.d {
                for y in 0..s.h {
                    let host_off = (s.z + z) as usize * host_slice
                        + (s.y + y) as usize * level_pitch as usize
                        + (s.x * block_bytes) as usize;
                    let guest_off = u64::from(guest.ptr.offset)
                        + u64::from(s.src_z + z) * guest_slice
                        + u64::from(s.src_y + y) * u64::from(guest_pitch)
                        + u64::from(s.src_x * block_bytes);
                    let row = target
                        .get_mut(host_off..host_off + row_bytes)
                        .ok_or(CommandError::InvalidBox { sid: image.sid })?;
                    transfer_row(memory, guest.ptr, guest_off, row, write)?;
                }
            }
        }
        if write {
            level.data = scratch;
        }
    }

    if write {
        surface.flush_level(host, converter, image.face, image.mipmap)?;
    }
    Ok(())
}

fn transfer_row(
    memory: &dyn GuestMemory,
    ptr: GuestPtr,
    offset: u64,
    row: &mut [u8],
    write_host: bool,
) -> Result<(), GuestMemoryError> {
    if write_host {
        memory.read(ptr.gmr_id, offset, row)
    } else {
        memory.write(ptr.gmr_id, offset, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceDesc;
    use svga3d_protocol::SurfaceFormat;

    #[test]
    fn vec_memory_bounds() {
        let mem = VecGuestMemory::new();
        mem.define_region(7, 16);
        mem.write(7, 12, &[1, 2, 3, 4]).unwrap();
        let mut out = [0u8; 4];
        mem.read(7, 12, &mut out).unwrap();
        assert_eq!(out, [1, 2, 3, 4]);
        assert!(mem.read(7, 13, &mut out).is_err());
        assert!(mem.read(8, 0, &mut out).is_err());
        assert_eq!(mem.region(7).map(|r| r.len()), Some(16));
    }

    #[test]
    fn spans_are_clipped_and_in_blocks() {
        let s = Surface::define(1, &SurfaceDesc::texture_2d(SurfaceFormat::Dxt1, 16, 8)).unwrap();
        let level = s.level(0, 0).unwrap();
        let b = CopyBox {
            x: 4,
            y: 4,
            z: 0,
            w: 64,
            h: 64,
            d: 1,
            srcx: 0,
            srcy: 0,
            srcz: 0,
        };
        let span = block_span(&s, level, &b).unwrap().unwrap();
        assert_eq!((span.x, span.y, span.w, span.h), (1, 1, 3, 1));

        let misaligned = CopyBox { x: 2, ..b };
        assert!(matches!(block_span(&s, level, &misaligned), Err(CommandError::InvalidBox { .. })));
        let outside = CopyBox { x: 16, ..b };
        assert!(block_span(&s, level, &outside).is_err());
    }
}
