//! Configuration and constants for the aggregator and the CLI.

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Sizes are gathered in units of the object alignment.
// A 32-bit field then covers 32 GiB at 8-byte alignment instead of 4 GiB.
pub const SIZE_ALIGNMENT: u64 = 8;
pub const SIZE_SHIFT: u32 = SIZE_ALIGNMENT.trailing_zeros();

/// Largest value a packed 32-bit field can hold
pub const MAX_PACKED: u64 = u32::MAX as u64;

/// Label of the synthetic row that sums up a whole tree
pub const TOTAL_LABEL: &str = "(total)";

/// Label the walker uses for array elements
pub const ARRAY_INDEX_LABEL: &str = "[i]";

/// Width of one indentation step in drill-down reports
pub const INDENT_CHARS: usize = 3;

/// Suffix appended to rows whose path hit a terminal type
pub const ELISION_MARKER: &str = " (...)";

/// Types whose instances are counted but never descended into
pub const DEFAULT_TERMINAL_TYPES: &[&str] = &[
    "sun.nio.ch.FileChannelImpl",
    "java.io.FileDescriptor",
    "java.nio.channels.FileChannel",
];

// Mutually referential fields folded onto one synthetic label per owning type.
// Without these, a linked structure becomes an ever deeper slide to the right.
pub const DEFAULT_MERGED_FIELDS: &[(&str, &[(&str, &str)])] = &[
    (
        "java.util.LinkedList",
        &[("first", "first/last"), ("last", "first/last")],
    ),
    (
        "java.util.LinkedList$Node",
        &[("prev", "prev/next"), ("next", "prev/next")],
    ),
    (
        "java.util.TreeMap$Entry",
        &[
            ("parent", "parent/left/right"),
            ("left", "parent/left/right"),
            ("right", "parent/left/right"),
        ],
    ),
    (
        "java.util.LinkedHashMap",
        &[("head", "head/tail"), ("tail", "head/tail")],
    ),
    (
        "java.util.LinkedHashMap$Entry",
        &[
            ("next", "next/before/after"),
            ("before", "next/before/after"),
            ("after", "next/before/after"),
        ],
    ),
    (
        "java.util.concurrent.ConcurrentSkipListMap$Index",
        &[("down", "down/right"), ("right", "down/right")],
    ),
    (
        "java.util.concurrent.ConcurrentHashMap$TreeBin",
        &[("first", "first/root"), ("root", "first/root")],
    ),
    (
        "com.google.common.cache.LocalCache$StrongAccessWriteEntry",
        &[
            ("nextAccess", "nextAccess/previousAccess/nextWrite/previousWrite"),
            ("previousAccess", "nextAccess/previousAccess/nextWrite/previousWrite"),
            ("nextWrite", "nextAccess/previousAccess/nextWrite/previousWrite"),
            ("previousWrite", "nextAccess/previousAccess/nextWrite/previousWrite"),
        ],
    ),
];
