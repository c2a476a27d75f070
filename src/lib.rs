//! Heap Footprint
//!
//! Type-topology histograms and retained-footprint trees built from
//! recorded object graph traversals.
//!
//! A walker records one observation per visited instance: the path it was
//! reached by, its type, and its shallow size. The same stream is grouped
//! two ways:
//!
//! - the **class histogram**, keyed by the chain of types, answering
//!   "which kinds of objects hold the memory";
//! - the **heap tree**, keyed by the full labeled path, answering
//!   "which fields retain how much".
//!
//! ## Getting Started
//!
//! ```bash
//! heap-footprint analyze --input walk.jsonl --report footprint
//! heap-footprint --help
//! ```
//!
//! Library use goes through [`aggregator::HeapLayoutBuilder`]:
//!
//! ```ignore
//! let mut builder = HeapLayoutBuilder::new(HistogramDeduplicator::with_defaults());
//! let list = builder.add_observation(Observation::root("java.util.LinkedList", 32))?;
//! builder.add_observation(Observation::field(list, "first", "java.util.LinkedList$Node", 24))?;
//! let layout = builder.build()?;
//! print!("{}", report::footprint(&layout));
//! ```

pub mod aggregator;
pub mod commands;
pub mod flamegraph;
pub mod output;
pub mod parser;
pub mod report;
pub mod utils;
