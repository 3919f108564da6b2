//! Caduceus - Lock-Free MPMC Ring Buffer
//!
//! Demo runner:
//! - Single-thread latency: write/read cycle, ns per operasi
//! - MPMC throughput: P producer x C consumer dengan conservation check

use caduceus::core::RingBuffer;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

fn main() {
    println!("🚀 Caduceus Ring Buffer - PoC v0.1");
    println!("===================================\n");

    benchmark_single_thread();
    benchmark_mpmc(4, 4);
    benchmark_mpmc(16, 16);

    println!("\n✅ All benchmarks complete!");
}

fn benchmark_single_thread() {
    println!("📊 Single-Thread Benchmark (Claim/Publish MPMC)");
    println!("-----------------------------------------------");

    const ITERATIONS: usize = 1_000_000;
    let rb: RingBuffer<u64, 65536> = RingBuffer::new();

    // Warm up
    for i in 0..1000 {
        rb.write_next(i);
    }
    for _ in 0..1000 {
        rb.read_next(|_| {});
    }

    // Benchmark write (sampai kapasitas, buffer mulai kosong)
    let start = Instant::now();
    for i in 0..65536u64 {
        rb.write_next(i);
    }
    let write_duration = start.elapsed();

    // Benchmark read (drain penuh)
    let start = Instant::now();
    for _ in 0..65536 {
        rb.read_next(|_| {});
    }
    let read_duration = start.elapsed();

    // Benchmark write+read cycle
    let start = Instant::now();
    for i in 0..ITERATIONS {
        rb.write_next(i as u64);
        rb.read_next(|_| {});
    }
    let cycle_duration = start.elapsed();

    let write_ns = write_duration.as_nanos() as f64 / 65536.0;
    let read_ns = read_duration.as_nanos() as f64 / 65536.0;
    let cycle_ns = cycle_duration.as_nanos() as f64 / ITERATIONS as f64;

    println!("  Write latency: {:.2} ns/op", write_ns);
    println!("  Read latency:  {:.2} ns/op", read_ns);
    println!(
        "  Cycle latency: {:.2} ns/op ({:.3} μs/op)",
        cycle_ns,
        cycle_ns / 1000.0
    );
    println!(
        "  Throughput:    {:.2} M cycles/sec\n",
        ITERATIONS as f64 / cycle_duration.as_secs_f64() / 1_000_000.0
    );
}

fn benchmark_mpmc(producers: usize, consumers: usize) {
    println!(
        "📊 MPMC Benchmark ({} producers x {} consumers)",
        producers, consumers
    );
    println!("-----------------------------------------------");

    const TOTAL_VALUES: usize = 1_000_000;
    let per_producer = TOTAL_VALUES / producers;
    let per_consumer = TOTAL_VALUES / consumers;

    let rb: Arc<RingBuffer<u64, 65536>> = Arc::new(RingBuffer::new());
    let consumed_sum = Arc::new(AtomicU64::new(0));

    let start = Instant::now();

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|_| {
            let rb = Arc::clone(&rb);
            let consumed_sum = Arc::clone(&consumed_sum);
            thread::spawn(move || {
                let mut local_sum = 0u64;
                for _ in 0..per_consumer {
                    rb.read_next(|v| local_sum += *v);
                }
                consumed_sum.fetch_add(local_sum, Ordering::Relaxed);
            })
        })
        .collect();

    let producer_handles: Vec<_> = (0..producers)
        .map(|p| {
            let rb = Arc::clone(&rb);
            thread::spawn(move || {
                let offset = (p * per_producer) as u64;
                for j in 0..per_producer as u64 {
                    rb.write_next(offset + j);
                }
            })
        })
        .collect();

    for handle in producer_handles {
        handle.join().expect("producer panicked");
    }
    for handle in consumer_handles {
        handle.join().expect("consumer panicked");
    }

    let duration = start.elapsed();

    // Conservation check: jumlah semua value yang dibaca harus sama dengan
    // jumlah semua value yang ditulis (0 + 1 + ... + TOTAL_VALUES-1)
    let expected_sum = (TOTAL_VALUES as u64 * (TOTAL_VALUES as u64 - 1)) / 2;
    let actual_sum = consumed_sum.load(Ordering::Relaxed);

    println!("  Values:     {}", TOTAL_VALUES);
    println!(
        "  Duration:   {:.2} ms",
        duration.as_secs_f64() * 1000.0
    );
    println!(
        "  Throughput: {:.2} M values/sec",
        TOTAL_VALUES as f64 / duration.as_secs_f64() / 1_000_000.0
    );

    if actual_sum == expected_sum {
        println!("  Conservation: ✅ OK (sum = {})\n", actual_sum);
    } else {
        println!(
            "  Conservation: ⚠️  MISMATCH (expected {}, got {})\n",
            expected_sum, actual_sum
        );
    }
}
