// Application layer - Detectors, dispatch and the per-screen session flows
pub mod action_guard;
pub mod contact_service;
pub mod detector;
pub mod dispatcher;
pub mod fall_detector;
pub mod news_service;
pub mod ports;
pub mod profile_service;
pub mod session;
pub mod session_service;
pub mod shake_detector;
pub mod signal_source;
pub mod stillness_detector;
pub mod tap_detector;
pub mod trekking_service;

#[cfg(test)]
pub mod test_support;
