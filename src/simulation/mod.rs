//! Random cycle generation for stress testing and benchmarks.
