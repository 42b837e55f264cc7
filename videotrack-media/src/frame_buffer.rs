//! Input/output frame buffers handed to video processors

use crate::tracks::{VideoFrame, VideoResolution};
use bytes::{Bytes, BytesMut};

/// Bytes per pixel (RGBA)
pub const BYTES_PER_PIXEL: usize = 4;

/// A resizable RGBA pixel buffer.
///
/// Resizing reallocates and clears the contents, so callers should only
/// resize when the resolution actually changed.
#[derive(Debug)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    data: BytesMut,
    generation: u64,
}

impl FrameBuffer {
    /// Create a zeroed buffer
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: BytesMut::zeroed(byte_len(width, height)),
            generation: 0,
        }
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Current resolution
    pub fn resolution(&self) -> VideoResolution {
        VideoResolution::new(self.width, self.height)
    }

    /// Number of times this buffer has been resized
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bytes in one row of pixels
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Raw RGBA bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable RGBA bytes
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Reallocate at a new size; contents are cleared
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data = BytesMut::zeroed(byte_len(width, height));
        self.generation += 1;
    }

    /// Zero every pixel
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Draw `frame` at the origin, cropping whatever does not fit
    pub fn draw(&mut self, frame: &VideoFrame) {
        let src_stride = frame.stride();
        let dst_stride = self.stride();
        let row_bytes = src_stride.min(dst_stride);
        if row_bytes == 0 {
            return;
        }

        let rows = frame.height.min(self.height) as usize;
        for row in 0..rows {
            let src_start = row * src_stride;
            let Some(src) = frame.data.get(src_start..src_start + row_bytes) else {
                break;
            };
            let dst_start = row * dst_stride;
            self.data[dst_start..dst_start + row_bytes].copy_from_slice(src);
        }
    }

    /// Copy the current contents out as a frame
    pub fn to_frame(&self, timestamp: u64) -> VideoFrame {
        VideoFrame {
            width: self.width,
            height: self.height,
            data: Bytes::copy_from_slice(&self.data),
            timestamp,
        }
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * BYTES_PER_PIXEL
}

/// The input buffer (raw decoder output) and output buffer (processed
/// output), always kept at the same resolution
#[derive(Debug)]
pub struct FrameBufferPair {
    /// Receives the source frame
    pub input: FrameBuffer,
    /// Receives the processor's output
    pub output: FrameBuffer,
}

impl FrameBufferPair {
    /// Create both buffers, zeroed, at the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            input: FrameBuffer::new(width, height),
            output: FrameBuffer::new(width, height),
        }
    }

    /// Resize both buffers when the source width changed.
    ///
    /// Returns whether a resize happened.
    pub fn fit_to(&mut self, width: u32, height: u32) -> bool {
        if self.input.width() == width {
            return false;
        }
        self.input.resize(width, height);
        self.output.resize(width, height);
        true
    }

    /// Zero both buffers
    pub fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
    }
}
