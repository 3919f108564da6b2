//! Caduceus - Lock-Free MPMC Ring Buffer
//!
//! Arsitektur:
//! - Lock-Free: Atomic-only, tidak ada Mutex di data path
//! - Claim/Publish: Ticket-based protocol dengan empat counter monotonik
//! - No-Allocation: Semua slot pre-allocated saat inisialisasi
//! - Blocking: write/read busy-wait dengan backoff, tanpa varian try
//!
//! Dua operasi saja: [`RingBuffer::write_next`] memindahkan value ke dalam
//! buffer, [`RingBuffer::read_next`] menyerahkan value ke visitor. Berapa
//! pun jumlah producer dan consumer thread boleh memanggil keduanya
//! bersamaan - urutan delivery tetap FIFO terhadap urutan claim.

pub mod core;

pub use crate::core::RingBuffer;
