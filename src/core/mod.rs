//! Core module: Lock-Free MPMC Ring Buffer
//!
//! Prinsip desain:
//! - Lock-Free: Hanya atomic operations, tidak ada Mutex/RwLock
//! - No-Allocation: Semua slot pre-allocated saat init
//! - FIFO Total Order: Publish dipaksa mengikuti claim order

mod ring_buffer;

pub use ring_buffer::RingBuffer;
