/// Pure merge and aggregation of recorded attendance.
pub mod aggregator;
/// Attendance records, the one-call record contract and the aggregated view.
pub mod attendance_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Enrollment ledger.
pub mod enrollment_service;
/// Event registry.
pub mod event_service;
/// Health check service.
pub mod health_service;
/// In-memory attendance recorder sessions.
pub mod recorder_service;
/// Per-player statistics listing and corrections.
pub mod statistics_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Member profiles and role resolution.
pub mod user_service;
