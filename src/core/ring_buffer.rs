//! Lock-Free Multi-Producer Multi-Consumer (MPMC) Ring Buffer
//!
//! Implementasi menggunakan ticket-based claim/publish protocol dengan
//! empat counter monotonik. Tidak ada Mutex, tidak ada alokasi setelah
//! inisialisasi.
//!
//! Protocol per operasi (writer dan reader simetris):
//! 1. Claim: CAS pada `next_write` / `next_read` untuk mengambil satu index
//! 2. Copy: tulis/baca slot `index % N` - exclusive, tanpa sinkronisasi
//! 3. Publish: tunggu giliran lalu majukan `still_writing` / `still_reading`
//!
//! Counter TIDAK pernah direduksi ke [0, N) - monotonik penuh, modulo hanya
//! saat indexing ke storage. Setiap pass lewat buffer otomatis ter-tag oleh
//! nilai counter, jadi dua index dari pass berbeda tidak pernah ambigu.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

#[cfg(feature = "trace")]
macro_rules! trace_log {
    ($($arg:tt)*) => { println!($($arg)*) };
}

#[cfg(not(feature = "trace"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

/// Slot dalam ring buffer - menyimpan data dengan ukuran tetap
#[repr(C, align(64))] // Cache line alignment untuk menghindari false sharing
struct Slot<T> {
    data: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    const fn new() -> Self {
        Self {
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

/// Padding untuk cache line isolation (64 bytes pada x86-64)
#[repr(C, align(64))]
struct CacheLinePadded<T> {
    value: T,
}

impl<T> CacheLinePadded<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

/// Batas busy-spin sebelum yield via sleep singkat
const SPIN_LIMIT: u32 = 8;

/// Spin-wait dengan backoff: busy-poll SPIN_LIMIT kali, lalu sleep 1ns,
/// ulangi. Murah saat kontensi ringan, tidak membakar CPU saat menunggu lama.
#[inline(always)]
fn backoff(trial: &mut u32) {
    if *trial < SPIN_LIMIT {
        *trial += 1;
        std::hint::spin_loop();
    } else {
        *trial = 0;
        thread::sleep(Duration::from_nanos(1));
    }
}

/// Lock-Free MPMC Ring Buffer
///
/// Empat counter monotonik mempartisi ruang index menjadi empat region:
/// sudah dibaca (`< still_reading`), bebas untuk writer, sudah di-claim
/// writer tapi belum publish, dan sudah publish menunggu reader
/// (`< still_writing`). Invariant:
///
/// `still_reading <= next_read <= still_writing <= next_write`
/// `next_write - still_reading <= N`
///
/// Counter wrap pada lebar `usize` - buffer benar sampai 2^64 claim pada
/// target 64-bit, batas residual yang sama dengan umur praktis process.
///
/// `N` boleh berapa saja asal positif, TIDAK harus power of 2. Mapping slot
/// memakai modulo murni, bukan bitmask.
#[repr(C)]
pub struct RingBuffer<T, const N: usize> {
    // Masing-masing counter di cache line sendiri - writer dan reader
    // menghantam pasangan counter yang berbeda
    next_write: CacheLinePadded<AtomicUsize>,
    still_writing: CacheLinePadded<AtomicUsize>,
    next_read: CacheLinePadded<AtomicUsize>,
    still_reading: CacheLinePadded<AtomicUsize>,
    // Pre-allocated buffer di heap - tidak ada alokasi setelah init
    buffer: Box<[Slot<T>]>,
}

// SAFETY: RingBuffer aman untuk Send/Sync karena:
// - Claim CAS memberi tiap index tepat satu pemilik
// - Gate pada still_reading/still_writing menjamin slot tidak dipakai
//   dua sisi sekaligus
// - Publish dengan Release, gate dengan Acquire - data selalu visible
unsafe impl<T: Send, const N: usize> Send for RingBuffer<T, N> {}
unsafe impl<T: Send, const N: usize> Sync for RingBuffer<T, N> {}

impl<T, const N: usize> Default for RingBuffer<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> RingBuffer<T, N> {
    /// Membuat ring buffer baru dengan kapasitas N.
    ///
    /// Alokasi hanya terjadi sekali saat inisialisasi.
    /// Setelah itu, tidak ada alokasi di hot path.
    ///
    /// # Panics
    /// Panic jika N == 0
    pub fn new() -> Self {
        assert!(N > 0, "N must be positive");

        // Alokasi buffer di heap untuk menghindari stack overflow
        let mut buffer = Vec::with_capacity(N);
        for _ in 0..N {
            buffer.push(Slot::new());
        }

        Self {
            next_write: CacheLinePadded::new(AtomicUsize::new(0)),
            still_writing: CacheLinePadded::new(AtomicUsize::new(0)),
            next_read: CacheLinePadded::new(AtomicUsize::new(0)),
            still_reading: CacheLinePadded::new(AtomicUsize::new(0)),
            buffer: buffer.into_boxed_slice(),
        }
    }

    /// Menulis satu value ke buffer (Producer side)
    ///
    /// Blocking: busy-wait dengan backoff selama buffer penuh. Selalu
    /// berhasil begitu ada slot bebas, tidak ada mode kegagalan.
    /// Boleh dipanggil dari banyak thread sekaligus.
    pub fn write_next(&self, value: T) {
        trace_log!("Entered write_next(){}", self.state_string());
        let write_index = self.acquire_write_index();

        let slot = &self.buffer[write_index % N];
        // SAFETY: claim CAS menjamin hanya kita yang memegang index ini,
        // dan gate still_reading menjamin reader slot lama sudah selesai.
        // Slot selalu kosong di titik ini (value lama sudah dipindah keluar
        // oleh read_next), jadi write() tidak mem-leak apa pun.
        unsafe {
            (*slot.data.get()).write(value);
        }

        self.release_write_index(write_index);
    }

    /// Membaca satu value dari buffer (Consumer side)
    ///
    /// Blocking: busy-wait dengan backoff selama buffer kosong. Value
    /// dipindahkan keluar dari slot, lalu `read_func` dipanggil tepat satu
    /// kali dengan reference ke value tersebut. Reference hanya valid
    /// selama pemanggilan. Value di-drop setelah `read_func` kembali.
    ///
    /// Slot sudah dibebaskan SEBELUM `read_func` jalan - visitor yang
    /// lambat atau panic tidak pernah menahan publish boundary, jadi tidak
    /// bisa men-deadlock producer/consumer lain.
    pub fn read_next<F: FnOnce(&T)>(&self, read_func: F) {
        trace_log!("Entered read_next(){}", self.state_string());
        let read_index = self.acquire_read_index();

        let slot = &self.buffer[read_index % N];
        // SAFETY: gate still_writing menjamin writer index ini sudah
        // publish (Acquire/Release pairing), dan claim CAS menjamin tidak
        // ada reader lain di index yang sama. Setelah assume_init_read,
        // slot kembali dianggap uninitialized.
        let value = unsafe { (*slot.data.get()).assume_init_read() };

        self.release_read_index(read_index);
        read_func(&value);
    }

    /// Jumlah value yang sudah publish dan belum di-claim reader.
    /// Snapshot dari dua counter yang berlomba - hanya approximate
    /// saat ada thread lain yang aktif.
    #[inline(always)]
    pub fn len(&self) -> usize {
        let still_writing = self.still_writing.value.load(Ordering::Acquire);
        let next_read = self.next_read.value.load(Ordering::Acquire);
        still_writing.wrapping_sub(next_read)
    }

    /// Cek apakah buffer kosong (tidak ada yang bisa dibaca)
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cek apakah buffer penuh (writer berikutnya akan menunggu)
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        let next_write = self.next_write.value.load(Ordering::Acquire);
        let still_reading = self.still_reading.value.load(Ordering::Acquire);
        next_write.wrapping_sub(still_reading) >= N
    }

    /// Kapasitas buffer
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Claim phase (writer): CAS next_write, dengan gate "slot target tidak
    /// sedang menyimpan data yang belum dibaca".
    fn acquire_write_index(&self) -> usize {
        let mut trial = 0u32;
        loop {
            let write_index = self.next_write.value.load(Ordering::Relaxed);
            let still_reading = self.still_reading.value.load(Ordering::Acquire);

            // Buffer penuh: index yang mau kita claim masih satu pass penuh
            // di depan reader paling lambat
            if write_index.wrapping_sub(still_reading) >= N {
                backoff(&mut trial);
                continue;
            }

            if self
                .next_write
                .value
                .compare_exchange_weak(
                    write_index,
                    write_index.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                trace_log!(
                    "Acquired write index {} ({}){}",
                    write_index,
                    write_index % N,
                    self.state_string()
                );
                return write_index;
            }

            backoff(&mut trial);
        }
    }

    /// Publish phase (writer): tunggu semua writer dengan index lebih kecil
    /// selesai publish, lalu majukan boundary satu langkah. Memaksa
    /// visibility dalam claim order walaupun copy data selesai out-of-order.
    fn release_write_index(&self, write_index: usize) {
        let mut trial = 0u32;
        while self.still_writing.value.load(Ordering::Acquire) != write_index {
            backoff(&mut trial);
        }
        // Hanya pemilik write_index yang bisa sampai sini, store biasa cukup
        self.still_writing
            .value
            .store(write_index.wrapping_add(1), Ordering::Release);
        trace_log!(
            "Released write index {} ({}){}",
            write_index,
            write_index % N,
            self.state_string()
        );
    }

    /// Claim phase (reader): CAS next_read, dengan gate "tidak membaca
    /// melewati apa yang sudah dipublish writer".
    fn acquire_read_index(&self) -> usize {
        let mut trial = 0u32;
        loop {
            let read_index = self.next_read.value.load(Ordering::Relaxed);
            let still_writing = self.still_writing.value.load(Ordering::Acquire);

            // Buffer kosong: semua yang dipublish sudah di-claim. Kedua load
            // di atas tidak saling terurut - next_read yang terbaca bisa
            // lebih baru daripada still_writing (reader lain sudah CAS,
            // still_writing kita masih basi). Cek equality saja akan
            // meloloskan pasangan basi seperti itu, jadi gate harus
            // directional. Invariant next_read <= still_writing <= next_read+N
            // membatasi selisih sebenarnya ke [0, N], jadi view signed exact.
            if still_writing.wrapping_sub(read_index) as isize <= 0 {
                backoff(&mut trial);
                continue;
            }

            if self
                .next_read
                .value
                .compare_exchange_weak(
                    read_index,
                    read_index.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                )
                .is_ok()
            {
                trace_log!(
                    "Acquired read index {} ({}){}",
                    read_index,
                    read_index % N,
                    self.state_string()
                );
                return read_index;
            }

            backoff(&mut trial);
        }
    }

    /// Publish phase (reader): simetris dengan release_write_index,
    /// membebaskan slot untuk dipakai ulang oleh producer.
    fn release_read_index(&self, read_index: usize) {
        let mut trial = 0u32;
        while self.still_reading.value.load(Ordering::Acquire) != read_index {
            backoff(&mut trial);
        }
        self.still_reading
            .value
            .store(read_index.wrapping_add(1), Ordering::Release);
        trace_log!(
            "Released read index {} ({}){}",
            read_index,
            read_index % N,
            self.state_string()
        );
    }

    /// Dump keempat counter untuk trace logging
    #[cfg(feature = "trace")]
    fn state_string(&self) -> String {
        format!(
            "; Current state: nw={} sw={} nr={} sr={}",
            self.next_write.value.load(Ordering::Relaxed),
            self.still_writing.value.load(Ordering::Relaxed),
            self.next_read.value.load(Ordering::Relaxed),
            self.still_reading.value.load(Ordering::Relaxed),
        )
    }
}

impl<T, const N: usize> Drop for RingBuffer<T, N> {
    fn drop(&mut self) {
        // Satu-satunya region yang masih berisi value hidup adalah
        // [next_read, still_writing): sudah ditulis-publish, belum pernah
        // di-claim reader. Tidak ada operasi in-flight saat drop (&mut self).
        let still_writing = self.still_writing.value.load(Ordering::Relaxed);
        let mut index = self.next_read.value.load(Ordering::Relaxed);
        while index != still_writing {
            let slot = &self.buffer[index % N];
            // SAFETY: slot di region ini initialized dan tidak akan
            // disentuh lagi.
            unsafe {
                std::ptr::drop_in_place((*slot.data.get()).as_mut_ptr());
            }
            index = index.wrapping_add(1);
        }
    }
}
