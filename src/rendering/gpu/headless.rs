use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use log::trace;
use scenepack_files::chunk::types::ImageHeader;

use crate::rendering::gpu::{BufferKind, GpuError, GpuHandle, GpuUploader};

#[derive(Debug, Clone, PartialEq)]
pub enum UploadRecord {
    Buffer {
        handle: GpuHandle,
        kind: BufferKind,
        label: String,
        size: usize,
        contents: Option<Vec<u8>>,
    },
    Image {
        handle: GpuHandle,
        header: ImageHeader,
        label: String,
        size: usize,
        contents: Option<Vec<u8>>,
    },
}

impl UploadRecord {
    pub fn handle(&self) -> GpuHandle {
        match self {
            UploadRecord::Buffer { handle, .. } | UploadRecord::Image { handle, .. } => *handle,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            UploadRecord::Buffer { size, .. } | UploadRecord::Image { size, .. } => *size,
        }
    }

    pub fn contents(&self) -> Option<&[u8]> {
        match self {
            UploadRecord::Buffer { contents, .. } | UploadRecord::Image { contents, .. } => contents.as_deref(),
        }
    }
}

/// An uploader without a device: hands out sequential handles and records what would have been uploaded.
/// Used for dry runs and to assert on GPU traffic in tests.
#[derive(Debug, Default)]
pub struct HeadlessUploader {
    next_handle: AtomicU64,
    keep_contents: bool,
    fail_after: Option<usize>,
    uploads: Mutex<Vec<UploadRecord>>,
}

impl HeadlessUploader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps a copy of every uploaded byte, instead of only the sizes.
    pub fn with_contents(mut self) -> Self {
        self.keep_contents = true;
        self
    }

    /// Every upload after the first `count` successful ones fails, simulating a device running out of memory.
    pub fn with_failure_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn uploads(&self) -> Vec<UploadRecord> {
        self.uploads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn uploaded_bytes(&self) -> usize {
        self.uploads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(UploadRecord::size)
            .sum()
    }

    fn record(&self, make: impl FnOnce(GpuHandle, Option<Vec<u8>>) -> UploadRecord, bytes: &[u8]) -> Option<GpuHandle> {
        let mut uploads = self.uploads.lock().unwrap_or_else(PoisonError::into_inner);
        if self.fail_after.is_some_and(|count| uploads.len() >= count) {
            return None;
        }

        let handle = GpuHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let contents = self.keep_contents.then(|| bytes.to_vec());
        uploads.push(make(handle, contents));
        Some(handle)
    }
}

impl GpuUploader for HeadlessUploader {
    fn upload_buffer(&self, kind: BufferKind, label: &str, bytes: &[u8]) -> Result<GpuHandle, GpuError> {
        trace!("Uploading {:?} buffer \"{}\" ({} bytes)", kind, label, bytes.len());
        self.record(
            |handle, contents| UploadRecord::Buffer {
                handle,
                kind,
                label: label.to_string(),
                size: bytes.len(),
                contents,
            },
            bytes,
        )
        .ok_or_else(|| GpuError::BufferCreation {
            kind,
            label: label.to_string(),
            size: bytes.len(),
            reason: "out of device memory".to_string(),
        })
    }

    fn upload_image(&self, header: &ImageHeader, label: &str, bytes: &[u8]) -> Result<GpuHandle, GpuError> {
        trace!(
            "Uploading image \"{}\" ({}x{}, {:?}, {} mips)",
            label, header.width, header.height, header.format, header.mip_count
        );
        self.record(
            |handle, contents| UploadRecord::Image {
                handle,
                header: *header,
                label: label.to_string(),
                size: bytes.len(),
                contents,
            },
            bytes,
        )
        .ok_or_else(|| GpuError::ImageCreation {
            label: label.to_string(),
            width: header.width,
            height: header.height,
            reason: "out of device memory".to_string(),
        })
    }
}
