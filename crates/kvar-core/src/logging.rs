//! Structured logging schema and field name constants for kvar.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation can query triage decisions by the same names no matter
//! which crate emitted them.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, session creation), triage completions |
//! | DEBUG | Path decisions, cache hits/misses, config choices |
//! | TRACE | Per-item iteration (keyword rules, image content keys) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID for one triage submission.
/// Format: UUIDv7 (time-ordered).
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "triage", "inference"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "coordinator", "session", "ollama", "ollama_vision", "openai"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "analyze_text", "analyze_images", "triage"
pub const OPERATION: &str = "op";

// ─── Triage fields ─────────────────────────────────────────────────────────

/// Analysis path chosen by the coordinator.
pub const ANALYSIS_PATH: &str = "analysis_path";

/// Whether the image description cache produced a hit.
pub const CACHE_HIT: &str = "cache_hit";

/// Number of images attached to a request.
pub const IMAGE_COUNT: &str = "image_count";

/// Session generation counter for supersession tracking.
pub const GENERATION: &str = "generation";

/// Final category of a classification.
pub const CATEGORY: &str = "category";

/// Final priority of a classification.
pub const PRIORITY: &str = "priority";

/// Final confidence of a classification.
pub const CONFIDENCE: &str = "confidence";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";
