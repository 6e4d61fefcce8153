// ─── Lilith Launcher Core ───
// Update-download-execute-recover pipeline for the Lilith client.
//
// Architecture:
//   core/
//     prefs        — per-user launch preferences (channel + debug toggles)
//     version/     — channel endpoints + version descriptor feed
//     cache        — work dir + by-name artifact lookup
//     downloader/  — streaming fetch with a concurrent progress reporter
//     supervisor   — child spawn, stdout streaming, exit classification
//     orchestrator — the launch state machine + crash recovery
//     events       — typed notifications for the external shell
//     http         — shared HTTP client
//     error        — central error type

pub mod cache;
pub mod downloader;
pub mod error;
pub mod events;
pub mod http;
pub mod orchestrator;
pub mod prefs;
pub mod supervisor;
pub mod version;
