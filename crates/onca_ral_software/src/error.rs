use core::fmt;

use crate::vertex::PrimitiveClass;

/// Software-rasterizer error
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// `WorkerPool::new` was asked to spin up zero workers
    ZeroWorkers,
    /// A draw's vertex count isn't a multiple of its primitive class' vertex count
    VertexCountMismatch { primclass: PrimitiveClass, count: usize },
    /// A scissor rectangle is empty or inverted (`left >= right` or `top >= bottom`)
    InvalidScissor { left: i32, top: i32, right: i32, bottom: i32 },
    /// A page index passed to the page tracker is out of the 512-page VRAM range
    PageOutOfRange(u32),
    /// A page's use counter would overflow its 16-bit saturating range
    PageCounterOverflow(u32),
    /// A page's use counter would underflow below zero
    PageCounterUnderflow(u32),
    /// `EdgeBuffer` received more descriptors than its reserved capacity
    EdgeBufferOverflow { capacity: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ZeroWorkers =>
                f.write_str("worker pool requires at least 1 worker thread"),
            Error::VertexCountMismatch { primclass, count } =>
                write!(f, "{count} vertices is not a valid count for primitive class {primclass:?}"),
            Error::InvalidScissor { left, top, right, bottom } =>
                write!(f, "invalid scissor rect: [{left}, {right}) x [{top}, {bottom})"),
            Error::PageOutOfRange(page) =>
                write!(f, "page index {page} is out of the 512-page VRAM range"),
            Error::PageCounterOverflow(page) =>
                write!(f, "use counter for page {page} overflowed"),
            Error::PageCounterUnderflow(page) =>
                write!(f, "use counter for page {page} underflowed"),
            Error::EdgeBufferOverflow { capacity } =>
                write!(f, "edge buffer exceeded its reserved capacity of {capacity} descriptors"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;
